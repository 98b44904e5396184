//! SQLite metadata store

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use fileshare_storage::BlobKey;
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, ffi};

use super::schema::init_schema;
use crate::error::{AuthError, AuthResult};
use crate::metadata::MetadataStore;
use crate::model::{
    ContentUpdate, File, FileId, FileShare, NewFile, NewShare, NewUser, Permission, ShareId, User,
    UserId,
};

const USER_COLUMNS: &str = "id, username, email, credential_hash, created_at";
const FILE_COLUMNS: &str =
    "id, owner_id, storage_key, original_filename, size, content_type, digest, uploaded_at";
const SHARE_COLUMNS: &str = "id, file_id, user_id, permission, shared_at";

/// SQLite-backed metadata store
pub struct SqliteMetadataStore {
    conn: Mutex<Connection>,
}

impl SqliteMetadataStore {
    /// Open or create a database at the given path
    pub fn open(path: &str) -> AuthResult<Self> {
        let conn = Connection::open(path).map_err(AuthError::write)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> AuthResult<Self> {
        let conn = Connection::open_in_memory().map_err(AuthError::write)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> AuthResult<Self> {
        init_schema(&conn).map_err(AuthError::write)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn constraint_code(e: &rusqlite::Error) -> Option<i32> {
    match e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            Some(err.extended_code)
        }
        _ => None,
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::new(row.get(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        credential_hash: row.get(3)?,
        created_at: row.get::<_, i64>(4)? as u64,
    })
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<File> {
    let key: String = row.get(2)?;
    let storage_key = BlobKey::parse(&key)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(File {
        id: FileId::new(row.get(0)?),
        owner: UserId::new(row.get(1)?),
        storage_key,
        original_filename: row.get(3)?,
        size: row.get::<_, i64>(4)? as u64,
        content_type: row.get(5)?,
        digest: row.get(6)?,
        uploaded_at: row.get::<_, i64>(7)? as u64,
    })
}

fn share_from_row(row: &Row<'_>) -> rusqlite::Result<FileShare> {
    let permission: String = row.get(3)?;
    let permission = permission
        .parse::<Permission>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(FileShare {
        id: ShareId::new(row.get(0)?),
        file_id: FileId::new(row.get(1)?),
        grantee: UserId::new(row.get(2)?),
        permission,
        shared_at: row.get::<_, i64>(4)? as u64,
    })
}

fn find_file_on(conn: &Connection, id: FileId) -> AuthResult<Option<File>> {
    conn.query_row(
        &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?"),
        [id.get()],
        file_from_row,
    )
    .optional()
    .map_err(AuthError::read)
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn insert_user(&self, user: NewUser) -> AuthResult<User> {
        let conn = self.conn();

        let inserted = conn.execute(
            "INSERT INTO users (username, email, credential_hash, created_at) VALUES (?, ?, ?, ?)",
            (
                &user.username,
                &user.email,
                &user.credential_hash,
                user.created_at as i64,
            ),
        );

        match inserted {
            Ok(_) => {}
            Err(e) if constraint_code(&e) == Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                return Err(AuthError::AlreadyExists(format!(
                    "Username '{}' or email '{}' is already registered",
                    user.username, user.email
                )));
            }
            Err(e) => return Err(AuthError::write(e)),
        }

        Ok(User {
            id: UserId::new(conn.last_insert_rowid()),
            username: user.username,
            email: user.email,
            credential_hash: user.credential_hash,
            created_at: user.created_at,
        })
    }

    async fn find_user(&self, id: UserId) -> AuthResult<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
                [id.get()],
                user_from_row,
            )
            .optional()
            .map_err(AuthError::read)
    }

    async fn find_user_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"),
                [username],
                user_from_row,
            )
            .optional()
            .map_err(AuthError::read)
    }

    async fn list_users(&self) -> AuthResult<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))
            .map_err(AuthError::read)?;

        let users = stmt
            .query_map([], user_from_row)
            .map_err(AuthError::read)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(AuthError::read)?;

        Ok(users)
    }

    async fn insert_file(&self, file: NewFile) -> AuthResult<File> {
        let conn = self.conn();

        let inserted = conn.execute(
            r#"INSERT INTO files
               (owner_id, storage_key, original_filename, size, content_type, digest, uploaded_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            (
                file.owner.get(),
                file.storage_key.as_str(),
                &file.original_filename,
                file.size as i64,
                &file.content_type,
                &file.digest,
                file.uploaded_at as i64,
            ),
        );

        match inserted {
            Ok(_) => {}
            Err(e) if constraint_code(&e) == Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                return Err(AuthError::NotFound(format!("User {}", file.owner)));
            }
            Err(e) => return Err(AuthError::write(e)),
        }

        Ok(File {
            id: FileId::new(conn.last_insert_rowid()),
            owner: file.owner,
            storage_key: file.storage_key,
            original_filename: file.original_filename,
            size: file.size,
            content_type: file.content_type,
            digest: file.digest,
            uploaded_at: file.uploaded_at,
        })
    }

    async fn find_file(&self, id: FileId) -> AuthResult<Option<File>> {
        find_file_on(&self.conn(), id)
    }

    async fn files_owned_by(&self, owner: UserId) -> AuthResult<Vec<File>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {FILE_COLUMNS} FROM files WHERE owner_id = ? ORDER BY id ASC"
            ))
            .map_err(AuthError::read)?;

        let files = stmt
            .query_map([owner.get()], file_from_row)
            .map_err(AuthError::read)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(AuthError::read)?;

        Ok(files)
    }

    async fn update_file_content(&self, id: FileId, update: ContentUpdate) -> AuthResult<File> {
        let conn = self.conn();

        let updated = conn
            .execute(
                "UPDATE files SET storage_key = ?, size = ?, digest = ? WHERE id = ?",
                (
                    update.storage_key.as_str(),
                    update.size as i64,
                    &update.digest,
                    id.get(),
                ),
            )
            .map_err(AuthError::write)?;

        if updated == 0 {
            return Err(AuthError::NotFound(format!("File {id}")));
        }

        find_file_on(&conn, id)?.ok_or_else(|| AuthError::NotFound(format!("File {id}")))
    }

    async fn delete_file(&self, id: FileId) -> AuthResult<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(AuthError::write)?;

        tx.execute("DELETE FROM file_shares WHERE file_id = ?", [id.get()])
            .map_err(AuthError::write)?;
        let deleted = tx
            .execute("DELETE FROM files WHERE id = ?", [id.get()])
            .map_err(AuthError::write)?;

        tx.commit().map_err(AuthError::write)?;
        Ok(deleted > 0)
    }

    async fn insert_share(&self, share: NewShare) -> AuthResult<FileShare> {
        let conn = self.conn();

        let inserted = conn.execute(
            "INSERT INTO file_shares (file_id, user_id, permission, shared_at) VALUES (?, ?, ?, ?)",
            (
                share.file_id.get(),
                share.grantee.get(),
                share.permission.as_str(),
                share.shared_at as i64,
            ),
        );

        match inserted {
            Ok(_) => {}
            Err(e) => {
                return Err(match constraint_code(&e) {
                    Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                        AuthError::InvalidGrant("File already shared with this user".into())
                    }
                    Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => AuthError::NotFound(format!(
                        "File {} or user {}",
                        share.file_id, share.grantee
                    )),
                    _ => AuthError::write(e),
                });
            }
        }

        Ok(FileShare {
            id: ShareId::new(conn.last_insert_rowid()),
            file_id: share.file_id,
            grantee: share.grantee,
            permission: share.permission,
            shared_at: share.shared_at,
        })
    }

    async fn find_share(&self, id: ShareId) -> AuthResult<Option<FileShare>> {
        self.conn()
            .query_row(
                &format!("SELECT {SHARE_COLUMNS} FROM file_shares WHERE id = ?"),
                [id.get()],
                share_from_row,
            )
            .optional()
            .map_err(AuthError::read)
    }

    async fn find_share_for(
        &self,
        file: FileId,
        grantee: UserId,
    ) -> AuthResult<Option<FileShare>> {
        self.conn()
            .query_row(
                &format!("SELECT {SHARE_COLUMNS} FROM file_shares WHERE file_id = ? AND user_id = ?"),
                [file.get(), grantee.get()],
                share_from_row,
            )
            .optional()
            .map_err(AuthError::read)
    }

    async fn shares_for_file(&self, file: FileId) -> AuthResult<Vec<FileShare>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SHARE_COLUMNS} FROM file_shares WHERE file_id = ? ORDER BY id ASC"
            ))
            .map_err(AuthError::read)?;

        let shares = stmt
            .query_map([file.get()], share_from_row)
            .map_err(AuthError::read)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(AuthError::read)?;

        Ok(shares)
    }

    async fn shares_for_grantee(&self, grantee: UserId) -> AuthResult<Vec<FileShare>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SHARE_COLUMNS} FROM file_shares WHERE user_id = ? ORDER BY id ASC"
            ))
            .map_err(AuthError::read)?;

        let shares = stmt
            .query_map([grantee.get()], share_from_row)
            .map_err(AuthError::read)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(AuthError::read)?;

        Ok(shares)
    }

    async fn delete_share(&self, id: ShareId) -> AuthResult<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM file_shares WHERE id = ?", [id.get()])
            .map_err(AuthError::write)?;
        Ok(deleted > 0)
    }

    async fn delete_shares_for_file(&self, file: FileId) -> AuthResult<usize> {
        self.conn()
            .execute("DELETE FROM file_shares WHERE file_id = ?", [file.get()])
            .map_err(AuthError::write)
    }
}
