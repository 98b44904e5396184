//! SQLite schema definitions

use rusqlite::Connection;

pub const SCHEMA_VERSION: u32 = 1;

/// Initialize the database schema
///
/// Uniqueness of users and of (file, grantee) share pairs, and the cascade
/// from files to shares, are enforced here rather than in Rust.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            credential_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL            -- Unix timestamp
        );

        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            storage_key TEXT NOT NULL UNIQUE,      -- blob store key
            original_filename TEXT NOT NULL,
            size INTEGER NOT NULL,
            content_type TEXT NOT NULL,
            digest TEXT NOT NULL,                  -- base58 Blake3
            uploaded_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_files_owner
            ON files(owner_id);

        CREATE TABLE IF NOT EXISTS file_shares (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            permission TEXT NOT NULL CHECK (permission IN ('READ', 'WRITE')),
            shared_at INTEGER NOT NULL,
            UNIQUE(file_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_shares_file
            ON file_shares(file_id);
        CREATE INDEX IF NOT EXISTS idx_shares_user
            ON file_shares(user_id);
    "#,
    )?;

    // Set schema version
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (version) VALUES (?)",
        [SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Check schema version
pub fn check_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<u32>>(0)
    })
    .map(|v| v.unwrap_or(0))
}
