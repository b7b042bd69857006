use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};
use tracing::info;

use crate::models::{NewUser, ProfileRow, UserRow, parse_col};
use crate::{Database, OptionalExt};

const USER_COLUMNS: &str =
    "id, username, email, password, first_name, last_name, is_active, is_staff, created_at";

impl Database {
    // -- Users --

    /// Inserts the user and its profile in one transaction, so a user never
    /// exists without exactly one profile.
    pub fn create_user(&self, new: &NewUser<'_>) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (id, username, email, password, first_name, last_name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    new.id,
                    new.username,
                    new.email,
                    new.password_hash,
                    new.first_name,
                    new.last_name,
                    Utc::now(),
                ],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO profiles (user_id, gender, phone) VALUES (?1, ?2, ?3)",
                rusqlite::params![new.id, new.gender.code(), new.phone],
            )?;
            let user = query_user(&tx, "id", new.id)?
                .ok_or_else(|| anyhow::anyhow!("User vanished after insert: {}", new.id))?;
            tx.commit()?;
            Ok(user)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Case-insensitive, matching the unique index on `users.email`.
    pub fn email_taken(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let taken = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 COLLATE NOCASE)",
                [email],
                |row| row.get(0),
            )?;
            Ok(taken)
        })
    }

    pub fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id, gender, phone FROM profiles WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(ProfileRow {
                        user_id: row.get(0)?,
                        gender: parse_col(row, 1)?,
                        phone: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Returns false when no such user exists.
    pub fn set_staff(&self, username: &str, is_staff: bool) -> Result<bool> {
        let changed = self.with_conn_mut(|conn| {
            Ok(conn.execute(
                "UPDATE users SET is_staff = ?1 WHERE username = ?2",
                rusqlite::params![is_staff, username],
            )?)
        })?;
        if changed > 0 {
            info!("User {} staff flag set to {}", username, is_staff);
        }
        Ok(changed > 0)
    }

    // -- Revoked tokens --

    pub fn revoke_token(&self, jti: &str, expires_at: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO revoked_tokens (jti, expires_at) VALUES (?1, ?2)",
                rusqlite::params![jti, expires_at],
            )?;
            Ok(())
        })
    }

    pub fn is_token_revoked(&self, jti: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let revoked = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = ?1)",
                [jti],
                |row| row.get(0),
            )?;
            Ok(revoked)
        })
    }

    /// Drops revocations whose token would be rejected as expired anyway.
    pub fn prune_revoked_tokens(&self, now_ts: i64) -> Result<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute("DELETE FROM revoked_tokens WHERE expires_at < ?1", [now_ts])?)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], user_from_row).optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        is_active: row.get(6)?,
        is_staff: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::is_constraint_violation;
    use scholarify_types::models::Gender;

    pub(crate) fn seed_user(db: &Database, id: &str, username: &str) -> UserRow {
        let email = format!("{username}@example.com");
        db.create_user(&NewUser {
            id,
            username,
            email: &email,
            password_hash: "hash",
            first_name: "Test",
            last_name: "",
            gender: Gender::Female,
            phone: "",
        })
        .unwrap()
    }

    #[test]
    fn profile_is_created_with_user() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db, "u1", "tuser");
        assert!(user.is_active);
        assert!(!user.is_staff);

        let profile = db.get_profile("u1").unwrap().expect("profile row");
        assert_eq!(profile.user_id, "u1");
        assert_eq!(profile.gender, Gender::Female);

        let profiles: i64 = db
            .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM profiles", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(profiles, 1);
    }

    #[test]
    fn duplicate_email_is_a_constraint_violation() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "u1", "alice");
        assert!(db.email_taken("ALICE@example.com").unwrap());

        let err = db
            .create_user(&NewUser {
                id: "u2",
                username: "alice2",
                email: "Alice@Example.com",
                password_hash: "hash",
                first_name: "A",
                last_name: "",
                gender: Gender::PreferNotToSay,
                phone: "",
            })
            .err()
            .expect("duplicate email must fail");
        assert!(is_constraint_violation(&err));
        // The failed transaction must not leave a dangling profile behind.
        assert!(db.get_profile("u2").unwrap().is_none());
    }

    #[test]
    fn staff_flag_and_token_revocation() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "u1", "boss");
        assert!(db.set_staff("boss", true).unwrap());
        assert!(!db.set_staff("nobody", true).unwrap());
        assert!(db.get_user_by_username("boss").unwrap().unwrap().is_staff);

        db.revoke_token("jti-1", 100).unwrap();
        db.revoke_token("jti-1", 100).unwrap();
        assert!(db.is_token_revoked("jti-1").unwrap());
        assert_eq!(db.prune_revoked_tokens(50).unwrap(), 0);
        assert_eq!(db.prune_revoked_tokens(101).unwrap(), 1);
        assert!(!db.is_token_revoked("jti-1").unwrap());
    }
}
