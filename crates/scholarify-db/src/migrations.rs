use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (accounts, listings, pages)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL,
                password    TEXT NOT NULL,
                first_name  TEXT NOT NULL DEFAULT '',
                last_name   TEXT NOT NULL DEFAULT '',
                is_active   INTEGER NOT NULL DEFAULT 1,
                is_staff    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE UNIQUE INDEX idx_users_email ON users(email COLLATE NOCASE);

            CREATE TABLE profiles (
                user_id     TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                gender      TEXT NOT NULL DEFAULT 'N' CHECK (gender IN ('M', 'F', 'N')),
                phone       TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE revoked_tokens (
                jti         TEXT PRIMARY KEY,
                expires_at  INTEGER NOT NULL
            );

            CREATE TABLE listings (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                type            TEXT NOT NULL CHECK (type IN ('JOB', 'SCHOLARSHIP', 'COURSE')),
                title           TEXT NOT NULL,
                image           TEXT,
                organization    TEXT NOT NULL DEFAULT '',
                country         TEXT NOT NULL DEFAULT '',
                city            TEXT NOT NULL DEFAULT '',
                deadline        TEXT,
                remote          INTEGER NOT NULL DEFAULT 0,
                level           TEXT NOT NULL DEFAULT '',
                description     TEXT NOT NULL DEFAULT '',
                apply_url       TEXT NOT NULL DEFAULT '',
                source_url      TEXT NOT NULL DEFAULT '',
                tags            TEXT NOT NULL DEFAULT '',
                is_verified     INTEGER NOT NULL DEFAULT 0,
                is_featured     INTEGER NOT NULL DEFAULT 0,
                status          TEXT NOT NULL DEFAULT 'DRAFT'
                                CHECK (status IN ('DRAFT', 'ACTIVE', 'EXPIRED')),
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_listings_status_created ON listings(status, created_at);
            CREATE INDEX idx_listings_deadline ON listings(deadline);

            CREATE TABLE listing_views (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                listing_id  INTEGER NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
                session_key TEXT NOT NULL,
                date        TEXT NOT NULL,
                UNIQUE(listing_id, session_key, date)
            );

            CREATE INDEX idx_listing_views_date ON listing_views(date);

            CREATE TABLE saved_listings (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                listing_id  INTEGER NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, listing_id)
            );

            CREATE TABLE gallery_images (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL DEFAULT '',
                caption         TEXT NOT NULL DEFAULT '',
                image           TEXT NOT NULL,
                is_published    INTEGER NOT NULL DEFAULT 1,
                sort_order      INTEGER NOT NULL DEFAULT 0 CHECK (sort_order >= 0),
                views           INTEGER NOT NULL DEFAULT 0 CHECK (views >= 0),
                created_at      TEXT NOT NULL
            );

            -- A like belongs to a user, or to an anonymous session when no user is set.
            CREATE TABLE gallery_likes (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                image_id    INTEGER NOT NULL REFERENCES gallery_images(id) ON DELETE CASCADE,
                user_id     TEXT REFERENCES users(id) ON DELETE CASCADE,
                session_key TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL
            );

            CREATE UNIQUE INDEX uq_like_per_user_per_image
                ON gallery_likes(image_id, user_id) WHERE user_id IS NOT NULL;
            CREATE UNIQUE INDEX uq_like_per_session_per_image
                ON gallery_likes(image_id, session_key) WHERE session_key <> '';

            CREATE TABLE site_visits (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                session_key TEXT NOT NULL,
                date        TEXT NOT NULL,
                UNIQUE(session_key, date)
            );

            CREATE TABLE contact_messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL,
                subject     TEXT NOT NULL DEFAULT '',
                message     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                is_read     INTEGER NOT NULL DEFAULT 0,
                replied     INTEGER NOT NULL DEFAULT 0,
                replied_at  TEXT
            );

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
