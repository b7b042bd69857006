use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use rusqlite::types::Value;
use tracing::info;

use crate::listings::{like_any, like_pattern};
use crate::models::{
    GALLERY_COLUMNS, GalleryEntry, GalleryImageFields, GalleryImageRow, LikeOwner,
    gallery_image_from_row,
};
use crate::{Database, OptionalExt};

impl Database {
    // -- Gallery images --

    pub fn insert_gallery_image(&self, fields: &GalleryImageFields) -> Result<GalleryImageRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO gallery_images (title, caption, image, is_published, sort_order, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    fields.title,
                    fields.caption,
                    fields.image,
                    fields.is_published,
                    fields.sort_order,
                    Utc::now(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            query_image(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("Gallery image vanished after insert: {}", id))
        })
    }

    /// Edits an image's metadata. The view counter is not writable here.
    pub fn update_gallery_image<F>(&self, id: i64, apply: F) -> Result<Option<GalleryImageRow>>
    where
        F: FnOnce(&mut GalleryImageFields),
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(existing) = query_image(&tx, id)? else {
                return Ok(None);
            };

            let mut fields = GalleryImageFields {
                title: existing.title,
                caption: existing.caption,
                image: existing.image,
                is_published: existing.is_published,
                sort_order: existing.sort_order,
            };
            apply(&mut fields);

            tx.execute(
                "UPDATE gallery_images
                 SET title = ?1, caption = ?2, image = ?3, is_published = ?4, sort_order = ?5
                 WHERE id = ?6",
                rusqlite::params![
                    fields.title,
                    fields.caption,
                    fields.image,
                    fields.is_published,
                    fields.sort_order,
                    id,
                ],
            )?;
            let updated = query_image(&tx, id)?;
            tx.commit()?;
            Ok(updated)
        })
    }

    pub fn delete_gallery_image(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute("DELETE FROM gallery_images WHERE id = ?1", [id])? > 0)
        })
    }

    /// Bulk publish/unpublish. Returns how many rows matched.
    pub fn set_gallery_published(&self, ids: &[i64], published: bool) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        self.with_conn_mut(|conn| {
            let placeholders: Vec<String> = (2..=ids.len() + 1).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "UPDATE gallery_images SET is_published = ?1 WHERE id IN ({})",
                placeholders.join(", ")
            );
            let mut params: Vec<Value> = Vec::with_capacity(ids.len() + 1);
            params.push(Value::Integer(i64::from(published)));
            params.extend(ids.iter().map(|id| Value::Integer(*id)));

            let updated = conn.execute(&sql, rusqlite::params_from_iter(params))?;
            info!("Gallery: set is_published={} on {} images", published, updated);
            Ok(updated)
        })
    }

    /// Every image, in display order, for staff. `query` matches title or caption.
    pub fn list_gallery_images(&self, query: Option<&str>) -> Result<Vec<GalleryImageRow>> {
        let mut sql = format!("SELECT {GALLERY_COLUMNS} FROM gallery_images g");
        let mut params: Vec<Value> = Vec::new();
        if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
            params.push(Value::Text(like_pattern(q)));
            sql.push_str(&format!(" WHERE {}", like_any(&["g.title", "g.caption"], 1)));
        }
        sql.push_str(" ORDER BY g.sort_order ASC, g.created_at DESC, g.id DESC");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params), gallery_image_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Published images newest first, with like counts and whether `owner`
    /// liked each one.
    pub fn published_gallery(&self, owner: LikeOwner<'_>) -> Result<Vec<GalleryEntry>> {
        self.with_conn(|conn| {
            let (owner_clause, owner_value) = owner_filter(owner);
            let sql = format!(
                "SELECT {GALLERY_COLUMNS},
                    (SELECT COUNT(*) FROM gallery_likes WHERE gallery_likes.image_id = g.id),
                    EXISTS(SELECT 1 FROM gallery_likes
                           WHERE gallery_likes.image_id = g.id AND {owner_clause})
                 FROM gallery_images g
                 WHERE g.is_published = 1
                 ORDER BY g.created_at DESC, g.id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_value], |row| {
                    Ok(GalleryEntry {
                        image: gallery_image_from_row(row)?,
                        likes: row.get(8)?,
                        liked: row.get(9)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Bumps the view counter of a published image by one and returns it.
    pub fn increment_gallery_views(&self, id: i64) -> Result<Option<GalleryImageRow>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE gallery_images SET views = views + 1 WHERE id = ?1 AND is_published = 1",
                [id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_image(conn, id)
        })
    }

    // -- Gallery likes --

    /// Toggle a like on a published image: removes it if present, inserts it
    /// if not. Returns `None` for unknown or unpublished images, else
    /// `(liked, total likes on the image)`.
    pub fn toggle_gallery_like(&self, image_id: i64, owner: LikeOwner<'_>) -> Result<Option<(bool, i64)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let published: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM gallery_images WHERE id = ?1 AND is_published = 1)",
                [image_id],
                |row| row.get(0),
            )?;
            if !published {
                return Ok(None);
            }

            let (owner_clause, owner_value) = owner_filter(owner);
            let removed = tx.execute(
                &format!("DELETE FROM gallery_likes WHERE image_id = ?2 AND {owner_clause}"),
                rusqlite::params![owner_value, image_id],
            )?;

            let liked = if removed > 0 {
                false
            } else {
                let (user_id, session_key) = match owner {
                    LikeOwner::User(id) => (Some(id), ""),
                    LikeOwner::Session(key) => (None, key),
                };
                tx.execute(
                    "INSERT OR IGNORE INTO gallery_likes (image_id, user_id, session_key, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![image_id, user_id, session_key, Utc::now()],
                )?;
                true
            };

            let likes: i64 = tx.query_row(
                "SELECT COUNT(*) FROM gallery_likes WHERE image_id = ?1",
                [image_id],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok(Some((liked, likes)))
        })
    }
}

/// Predicate on `gallery_likes` matching the owner bound to `?1`.
fn owner_filter(owner: LikeOwner<'_>) -> (&'static str, String) {
    match owner {
        LikeOwner::User(id) => ("gallery_likes.user_id = ?1", id.to_string()),
        LikeOwner::Session(key) => ("gallery_likes.session_key = ?1", key.to_string()),
    }
}

fn query_image(conn: &Connection, id: i64) -> Result<Option<GalleryImageRow>> {
    let sql = format!("SELECT {GALLERY_COLUMNS} FROM gallery_images g WHERE g.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([id], gallery_image_from_row).optional()
}
