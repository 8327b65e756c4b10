use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Ordered schema migrations. Versions are applied once each and recorded
/// in `schema_version`.
const MIGRATIONS: &[(i64, &str, &str)] = &[(1, "initial schema", V1_INITIAL)];

const V1_INITIAL: &str = "
    CREATE TABLE user (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        username        VARCHAR(64) NOT NULL UNIQUE,
        email           VARCHAR(120) NOT NULL UNIQUE,
        password_hash   VARCHAR(128) NOT NULL,
        last_seen       TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE category (
        id      INTEGER PRIMARY KEY AUTOINCREMENT,
        title   VARCHAR(64) NOT NULL UNIQUE
    );

    CREATE TABLE post (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        title       VARCHAR(256) NOT NULL,
        body        TEXT NOT NULL,
        timestamp   TEXT NOT NULL DEFAULT (datetime('now')),
        user_id     INTEGER NOT NULL REFERENCES user(id),
        category_id INTEGER REFERENCES category(id),
        vote_count  INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX idx_post_timestamp ON post(timestamp);
    CREATE INDEX idx_post_user ON post(user_id, timestamp);
    CREATE INDEX idx_post_category ON post(category_id, timestamp);

    CREATE TABLE comment (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        body        TEXT NOT NULL,
        timestamp   TEXT NOT NULL DEFAULT (datetime('now')),
        user_id     INTEGER NOT NULL REFERENCES user(id),
        post_id     INTEGER NOT NULL REFERENCES post(id)
    );

    CREATE INDEX idx_comment_timestamp ON comment(timestamp);
    CREATE INDEX idx_comment_post ON comment(post_id, timestamp);
    CREATE INDEX idx_comment_user ON comment(user_id, timestamp);

    -- One row per (user, post): the voter set. direction is +1 or -1.
    CREATE TABLE user_vote (
        user_id     INTEGER NOT NULL REFERENCES user(id),
        post_id     INTEGER NOT NULL REFERENCES post(id),
        direction   INTEGER NOT NULL CHECK (direction IN (-1, 1)),
        PRIMARY KEY (user_id, post_id)
    );

    CREATE INDEX idx_user_vote_post ON user_vote(post_id);
";

/// Apply pending migrations. Returns how many were applied.
pub fn run(conn: &Connection) -> Result<usize> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let current: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    let mut applied = 0;
    for &(version, name, sql) in MIGRATIONS {
        if version <= current {
            continue;
        }

        info!("Running migration v{} ({})", version, name);
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
        tx.commit()?;
        applied += 1;
    }

    if applied > 0 {
        info!("Database migrations complete (schema v{})", current + applied as i64);
    }
    Ok(applied)
}

/// Highest applied schema version, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<i64> {
    let version =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;
    Ok(version)
}
