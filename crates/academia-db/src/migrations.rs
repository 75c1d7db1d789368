use academia_types::models::Role;
use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE categories (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL UNIQUE,
                description TEXT
            );

            CREATE TABLE users (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                name             TEXT NOT NULL,
                email            TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash    TEXT NOT NULL,
                category_id      INTEGER REFERENCES categories(id),
                is_admin         INTEGER NOT NULL DEFAULT 0,
                is_developer     INTEGER NOT NULL DEFAULT 0,
                is_active        INTEGER NOT NULL DEFAULT 0,
                pending_approval INTEGER NOT NULL DEFAULT 1,
                profile_image    TEXT,
                created_at       TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE sessions (
                token_hash  TEXT PRIMARY KEY,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                expires_at  TEXT NOT NULL
            );

            CREATE TABLE notifications (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                message     TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                is_read     INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_notifications_user
                ON notifications(user_id, is_read);

            CREATE TABLE courses (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                category    TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                file_url    TEXT,
                author_id   INTEGER NOT NULL REFERENCES users(id)
            );

            -- user_id has no foreign key; anonymous views store NULL
            CREATE TABLE course_visits (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER,
                course_id   INTEGER NOT NULL REFERENCES courses(id),
                timestamp   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_course_visits_course
                ON course_visits(course_id, timestamp);

            CREATE TABLE student_profiles (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                level       TEXT,
                school      TEXT,
                phone       TEXT,
                birth_date  TEXT,
                gender      TEXT,
                city        TEXT
            );

            CREATE TABLE settings (
                id                   INTEGER PRIMARY KEY CHECK (id = 1),
                platform_name        TEXT NOT NULL,
                platform_description TEXT NOT NULL DEFAULT '',
                support_email        TEXT NOT NULL DEFAULT '',
                logo_filename        TEXT
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

/// Reference data every deployment needs: the role categories and the
/// settings singleton. Safe to run on every boot.
pub fn seed(conn: &Connection) -> Result<()> {
    for (role, description) in Role::CATEGORIES {
        conn.execute(
            "INSERT OR IGNORE INTO categories (name, description) VALUES (?1, ?2)",
            (role.as_str(), description),
        )?;
    }

    conn.execute(
        "INSERT OR IGNORE INTO settings (id, platform_name) VALUES (1, 'Academia')",
        [],
    )?;

    Ok(())
}
