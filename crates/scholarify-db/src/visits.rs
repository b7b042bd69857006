use anyhow::Result;
use chrono::NaiveDate;

use crate::Database;

impl Database {
    /// Counts a site visit once per (session, day). Returns true when this
    /// call recorded it.
    pub fn record_site_visit(&self, session_key: &str, date: NaiveDate) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO site_visits (session_key, date) VALUES (?1, ?2)",
                rusqlite::params![session_key, date],
            )?;
            Ok(inserted > 0)
        })
    }
}
