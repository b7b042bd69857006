use std::collections::HashMap;

use anyhow::Result;
use chrono::{Days, NaiveDate};
use rusqlite::Connection;
use scholarify_types::api::{
    CountryCount, DashboardResponse, DayCount, GenderStats, ListingResponse, ViewedListing,
};

use crate::Database;
use crate::models::{LISTING_COLUMNS, listing_from_row};

const TOP_N: i64 = 8;

impl Database {
    /// Aggregates for the staff dashboard, relative to `today`.
    pub fn dashboard(&self, today: NaiveDate) -> Result<DashboardResponse> {
        let start_7 = today - Days::new(6);
        let soon = today + Days::new(7);

        self.with_conn(|conn| {
            let total_listings = count(conn, "SELECT COUNT(*) FROM listings", [])?;
            let remote = count(conn, "SELECT COUNT(*) FROM listings WHERE remote = 1", [])?;
            let remote_pct = if total_listings > 0 {
                (remote as f64 / total_listings as f64 * 1000.0).round_ties_even() / 10.0
            } else {
                0.0
            };

            let total_listing_views = count(conn, "SELECT COUNT(*) FROM listing_views", [])?;
            let views_last_7_days = count(
                conn,
                "SELECT COUNT(*) FROM listing_views WHERE date >= ?1",
                [start_7],
            )?;

            Ok(DashboardResponse {
                today,
                soon,

                total_listings,
                jobs: count(conn, "SELECT COUNT(*) FROM listings WHERE type = 'JOB'", [])?,
                scholarships: count(conn, "SELECT COUNT(*) FROM listings WHERE type = 'SCHOLARSHIP'", [])?,
                courses: count(conn, "SELECT COUNT(*) FROM listings WHERE type = 'COURSE'", [])?,

                featured: count(conn, "SELECT COUNT(*) FROM listings WHERE is_featured = 1", [])?,
                remote,
                remote_pct,

                closing_soon: count(
                    conn,
                    "SELECT COUNT(*) FROM listings
                     WHERE deadline IS NOT NULL AND deadline BETWEEN ?1 AND ?2",
                    [today, soon],
                )?,
                expired: count(
                    conn,
                    "SELECT COUNT(*) FROM listings WHERE deadline IS NOT NULL AND deadline < ?1",
                    [today],
                )?,

                total_listing_views,
                views_last_7_days,
                views_by_day: views_by_day(conn, start_7)?,

                site_visits_today: count(
                    conn,
                    "SELECT COUNT(*) FROM site_visits WHERE date = ?1",
                    [today],
                )?,
                site_visits_last_7_days: count(
                    conn,
                    "SELECT COUNT(*) FROM site_visits WHERE date >= ?1",
                    [start_7],
                )?,

                gender: GenderStats {
                    male: count(conn, "SELECT COUNT(*) FROM profiles WHERE gender = 'M'", [])?,
                    female: count(conn, "SELECT COUNT(*) FROM profiles WHERE gender = 'F'", [])?,
                    na: count(conn, "SELECT COUNT(*) FROM profiles WHERE gender = 'N'", [])?,
                },

                top_countries: top_countries(conn)?,
                top_viewed_listings: top_viewed_listings(conn)?,
                latest_listings: latest_listings(conn)?,

                gallery_images: count(
                    conn,
                    "SELECT COUNT(*) FROM gallery_images WHERE is_published = 1",
                    [],
                )?,
                gallery_likes: count(conn, "SELECT COUNT(*) FROM gallery_likes", [])?,
                gallery_views: count(
                    conn,
                    "SELECT COALESCE(SUM(views), 0) FROM gallery_images WHERE is_published = 1",
                    [],
                )?,
                contact_messages: count(conn, "SELECT COUNT(*) FROM contact_messages", [])?,
                unread_messages: count(
                    conn,
                    "SELECT COUNT(*) FROM contact_messages WHERE is_read = 0",
                    [],
                )?,
            })
        })
    }
}

fn count<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<i64> {
    Ok(conn.query_row(sql, params, |row| row.get(0))?)
}

/// Seven zero-filled days ending today.
fn views_by_day(conn: &Connection, start: NaiveDate) -> Result<Vec<DayCount>> {
    let mut stmt = conn.prepare(
        "SELECT date, COUNT(*) FROM listing_views WHERE date >= ?1 GROUP BY date",
    )?;
    let counts: HashMap<NaiveDate, i64> = stmt
        .query_map([start], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<_, _>>()?;

    Ok(start
        .iter_days()
        .take(7)
        .map(|date| DayCount {
            date,
            count: counts.get(&date).copied().unwrap_or(0),
        })
        .collect())
}

fn top_countries(conn: &Connection) -> Result<Vec<CountryCount>> {
    let mut stmt = conn.prepare(
        "SELECT country, COUNT(*) AS c FROM listings
         WHERE country <> ''
         GROUP BY country
         ORDER BY c DESC, country ASC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([TOP_N], |row| {
            Ok(CountryCount {
                country: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn top_viewed_listings(conn: &Connection) -> Result<Vec<ViewedListing>> {
    let sql = format!(
        "SELECT {LISTING_COLUMNS}, v.views FROM (
            SELECT listing_id, COUNT(*) AS views FROM listing_views GROUP BY listing_id
         ) v
         JOIN listings l ON l.id = v.listing_id
         ORDER BY v.views DESC, l.id ASC
         LIMIT ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([TOP_N], |row| {
            Ok(ViewedListing {
                listing: listing_from_row(row)?.into(),
                views: row.get(19)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn latest_listings(conn: &Connection) -> Result<Vec<ListingResponse>> {
    let sql = format!(
        "SELECT {LISTING_COLUMNS} FROM listings l ORDER BY l.created_at DESC, l.id DESC LIMIT ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([TOP_N], |row| Ok(listing_from_row(row)?.into()))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
