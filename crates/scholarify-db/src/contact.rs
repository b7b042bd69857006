use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};
use rusqlite::types::Value;
use scholarify_types::models::MessageAction;

use crate::listings::{like_any, like_pattern};
use crate::models::{ContactMessageRow, MessageFilter};
use crate::{Database, OptionalExt};

const MESSAGE_COLUMNS: &str =
    "id, name, email, subject, message, created_at, is_read, replied, replied_at";

impl Database {
    pub fn insert_contact_message(
        &self,
        name: &str,
        email: &str,
        subject: &str,
        message: &str,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO contact_messages (name, email, subject, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![name, email, subject, message, Utc::now()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Newest first.
    pub fn list_contact_messages(&self, filter: &MessageFilter) -> Result<Vec<ContactMessageRow>> {
        let mut sql = format!("SELECT {MESSAGE_COLUMNS} FROM contact_messages WHERE 1 = 1");
        let mut params: Vec<Value> = Vec::new();

        if let Some(q) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            params.push(Value::Text(like_pattern(q)));
            let columns = ["name", "email", "subject", "message"];
            sql.push_str(&format!(" AND ({})", like_any(&columns, params.len())));
        }
        for (column, wanted) in [("is_read", filter.is_read), ("replied", filter.replied)] {
            if let Some(wanted) = wanted {
                sql.push_str(&format!(" AND {column} = {}", i32::from(wanted)));
            }
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params), message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Marks the message read and returns it.
    pub fn open_contact_message(&self, id: i64) -> Result<Option<ContactMessageRow>> {
        self.with_conn_mut(|conn| {
            conn.execute("UPDATE contact_messages SET is_read = 1 WHERE id = ?1", [id])?;
            query_message(conn, id)
        })
    }

    /// Applies a staff action to the given messages. Returns how many matched.
    pub fn apply_message_action(&self, ids: &[i64], action: MessageAction) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let set_clause = match action {
            MessageAction::MarkRead => "is_read = 1",
            MessageAction::MarkUnread => "is_read = 0",
            MessageAction::MarkReplied => "replied = 1, replied_at = ?1",
            MessageAction::MarkNotReplied => "replied = 0, replied_at = NULL",
        };

        self.with_conn_mut(|conn| {
            let mut params: Vec<Value> = Vec::with_capacity(ids.len() + 1);
            // ?1 is reserved for the reply timestamp; unused placeholders are fine.
            params.push(Value::Text(Utc::now().format("%F %T%.f%:z").to_string()));
            params.extend(ids.iter().map(|id| Value::Integer(*id)));

            let placeholders: Vec<String> = (2..=ids.len() + 1).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "UPDATE contact_messages SET {set_clause} WHERE id IN ({})",
                placeholders.join(", ")
            );
            Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?)
        })
    }
}

fn query_message(conn: &Connection, id: i64) -> Result<Option<ContactMessageRow>> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM contact_messages WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([id], message_from_row).optional()
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<ContactMessageRow> {
    Ok(ContactMessageRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        subject: row.get(3)?,
        message: row.get(4)?,
        created_at: row.get(5)?,
        is_read: row.get(6)?,
        replied: row.get(7)?,
        replied_at: row.get(8)?,
    })
}
