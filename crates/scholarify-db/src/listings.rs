use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use rusqlite::types::Value;
use scholarify_types::models::ListingStatus;
use tracing::info;

use crate::models::{
    LISTING_COLUMNS, ListingFields, ListingFilter, ListingRow, SearchScope, listing_from_row,
};
use crate::{Database, OptionalExt};

impl Database {
    // -- Listings --

    /// Inserts a listing; the stored status follows the deadline rule.
    pub fn insert_listing(&self, fields: &ListingFields, today: NaiveDate) -> Result<ListingRow> {
        self.with_conn_mut(|conn| {
            let status = fields.status.on_save(fields.deadline, today);
            let now = Utc::now();
            conn.execute(
                "INSERT INTO listings (type, title, image, organization, country, city, deadline,
                    remote, level, description, apply_url, source_url, tags, is_verified,
                    is_featured, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)",
                rusqlite::params![
                    fields.listing_type.as_str(),
                    fields.title,
                    fields.image,
                    fields.organization,
                    fields.country,
                    fields.city,
                    fields.deadline,
                    fields.remote,
                    fields.level,
                    fields.description,
                    fields.apply_url,
                    fields.source_url,
                    fields.tags,
                    fields.is_verified,
                    fields.is_featured,
                    status.as_str(),
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            query_listing(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("Listing vanished after insert: {}", id))
        })
    }

    /// Loads the listing, lets `apply` edit its fields and saves it back with
    /// the status recomputed. Returns `None` when the listing does not exist.
    pub fn update_listing<F>(&self, id: i64, today: NaiveDate, apply: F) -> Result<Option<ListingRow>>
    where
        F: FnOnce(&mut ListingFields),
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(existing) = query_listing(&tx, id)? else {
                return Ok(None);
            };

            let mut fields = ListingFields::from(existing);
            apply(&mut fields);
            let status = fields.status.on_save(fields.deadline, today);

            tx.execute(
                "UPDATE listings SET type = ?1, title = ?2, image = ?3, organization = ?4,
                    country = ?5, city = ?6, deadline = ?7, remote = ?8, level = ?9,
                    description = ?10, apply_url = ?11, source_url = ?12, tags = ?13,
                    is_verified = ?14, is_featured = ?15, status = ?16, updated_at = ?17
                 WHERE id = ?18",
                rusqlite::params![
                    fields.listing_type.as_str(),
                    fields.title,
                    fields.image,
                    fields.organization,
                    fields.country,
                    fields.city,
                    fields.deadline,
                    fields.remote,
                    fields.level,
                    fields.description,
                    fields.apply_url,
                    fields.source_url,
                    fields.tags,
                    fields.is_verified,
                    fields.is_featured,
                    status.as_str(),
                    Utc::now(),
                    id,
                ],
            )?;
            let updated = query_listing(&tx, id)?;
            tx.commit()?;
            Ok(updated)
        })
    }

    pub fn delete_listing(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM listings WHERE id = ?1", [id])? > 0))
    }

    pub fn get_listing(&self, id: i64) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| query_listing(conn, id))
    }

    /// Only ACTIVE listings are publicly visible.
    pub fn get_active_listing(&self, id: i64) -> Result<Option<ListingRow>> {
        Ok(self
            .get_listing(id)?
            .filter(|l| l.status == ListingStatus::Active))
    }

    pub fn search_listings(&self, filter: &ListingFilter, today: NaiveDate) -> Result<Vec<ListingRow>> {
        let mut sql = format!("SELECT {LISTING_COLUMNS} FROM listings l WHERE 1 = 1");
        let mut params: Vec<Value> = Vec::new();

        if let Some(status) = filter.status {
            params.push(Value::Text(status.as_str().to_string()));
            sql.push_str(&format!(" AND l.status = ?{}", params.len()));
        }
        if let Some(q) = filter.query.as_deref().filter(|q| !q.is_empty()) {
            let columns: &[&str] = match filter.scope {
                SearchScope::Site => &["l.title", "l.organization", "l.country", "l.city", "l.tags"],
                SearchScope::Admin => &["l.title", "l.organization", "l.country", "l.tags"],
            };
            params.push(Value::Text(like_pattern(q)));
            sql.push_str(&format!(" AND ({})", like_any(columns, params.len())));
        }
        if let Some(t) = filter.listing_type.as_deref().filter(|t| !t.is_empty()) {
            params.push(Value::Text(t.to_string()));
            sql.push_str(&format!(" AND l.type = ?{}", params.len()));
        }
        if let Some(country) = filter.country.as_deref().filter(|c| !c.is_empty()) {
            params.push(Value::Text(country.to_string()));
            sql.push_str(&format!(" AND l.country = ?{} COLLATE NOCASE", params.len()));
        }
        let flags = [
            ("l.remote", filter.remote),
            ("l.is_featured", filter.featured),
            ("l.is_verified", filter.verified),
        ];
        for (column, wanted) in flags {
            if let Some(wanted) = wanted {
                sql.push_str(&format!(" AND {column} = {}", i32::from(wanted)));
            }
        }
        if filter.deadline_soon {
            params.push(Value::Text(today.to_string()));
            sql.push_str(&format!(
                " AND l.deadline IS NOT NULL AND l.deadline >= ?{} ORDER BY l.deadline ASC, l.id ASC",
                params.len()
            ));
        } else {
            sql.push_str(" ORDER BY l.created_at DESC, l.id DESC");
        }

        // SQLite needs a LIMIT before an OFFSET; -1 means unbounded.
        params.push(Value::Integer(filter.limit.map(i64::from).unwrap_or(-1)));
        sql.push_str(&format!(" LIMIT ?{}", params.len()));
        params.push(Value::Integer(i64::from(filter.offset)));
        sql.push_str(&format!(" OFFSET ?{}", params.len()));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params), listing_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Expires every listing whose deadline passed without a re-save.
    pub fn expire_overdue_listings(&self, today: NaiveDate) -> Result<usize> {
        let changed = self.with_conn_mut(|conn| {
            Ok(conn.execute(
                "UPDATE listings SET status = 'EXPIRED', updated_at = ?1
                 WHERE deadline IS NOT NULL AND deadline < ?2 AND status != 'EXPIRED'",
                rusqlite::params![Utc::now(), today],
            )?)
        })?;
        if changed > 0 {
            info!("Expired {} listings past their deadline", changed);
        }
        Ok(changed)
    }

    // -- Saved listings --

    /// Toggle a bookmark: removes it if present, inserts it if not.
    /// Returns `None` when the listing does not exist, else the new state.
    pub fn toggle_saved_listing(&self, user_id: &str, listing_id: i64) -> Result<Option<bool>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM listings WHERE id = ?1)",
                [listing_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(None);
            }

            let removed = tx.execute(
                "DELETE FROM saved_listings WHERE user_id = ?1 AND listing_id = ?2",
                rusqlite::params![user_id, listing_id],
            )?;
            let saved = if removed > 0 {
                false
            } else {
                tx.execute(
                    "INSERT OR IGNORE INTO saved_listings (user_id, listing_id, created_at)
                     VALUES (?1, ?2, ?3)",
                    rusqlite::params![user_id, listing_id, Utc::now()],
                )?;
                true
            };
            tx.commit()?;
            Ok(Some(saved))
        })
    }

    pub fn is_listing_saved(&self, user_id: &str, listing_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let saved = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM saved_listings WHERE user_id = ?1 AND listing_id = ?2)",
                rusqlite::params![user_id, listing_id],
                |row| row.get(0),
            )?;
            Ok(saved)
        })
    }

    /// The user's bookmarks, most recently saved first.
    pub fn saved_listings(&self, user_id: &str) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {LISTING_COLUMNS} FROM saved_listings s
                 JOIN listings l ON l.id = s.listing_id
                 WHERE s.user_id = ?1
                 ORDER BY s.created_at DESC, s.id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], listing_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Listing views --

    /// Counts a view once per (listing, session, day). Returns true when this
    /// call recorded it.
    pub fn record_listing_view(&self, listing_id: i64, session_key: &str, date: NaiveDate) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO listing_views (listing_id, session_key, date) VALUES (?1, ?2, ?3)",
                rusqlite::params![listing_id, session_key, date],
            )?;
            Ok(inserted > 0)
        })
    }
}

fn query_listing(conn: &Connection, id: i64) -> Result<Option<ListingRow>> {
    let sql = format!("SELECT {LISTING_COLUMNS} FROM listings l WHERE l.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([id], listing_from_row).optional()
}

/// Case-insensitive substring pattern with LIKE wildcards escaped.
pub(crate) fn like_pattern(q: &str) -> String {
    let mut escaped = String::with_capacity(q.len() + 2);
    escaped.push('%');
    for c in q.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// `a LIKE ?n OR b LIKE ?n ...` over `columns` for placeholder `n`.
pub(crate) fn like_any(columns: &[&str], n: usize) -> String {
    columns
        .iter()
        .map(|c| format!("{c} LIKE ?{n} ESCAPE '\\'"))
        .collect::<Vec<_>>()
        .join(" OR ")
}
