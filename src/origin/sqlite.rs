use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::{json, Value};
use tracing::info;

use crate::error::{CacheError, Result};
use crate::origin::OriginStore;

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE,
    email TEXT NOT NULL
)";

/// User directory stored in a SQLite `users` table, keyed by username.
///
/// Values are `{"username": ..., "email": ...}` records. Statements run on
/// the blocking pool against one shared connection.
#[derive(Debug, Clone)]
pub struct SqliteUserOrigin {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserOrigin {
    /// Opens the database at `path`, creating it and the `users` table if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let source = path.display().to_string();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::origin(&source, e))?;
        }

        let db_path = path.clone();
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(db_path)?;
            conn.execute(CREATE_USERS, [])?;
            Ok::<_, rusqlite::Error>(conn)
        })
        .await
        .map_err(|e| CacheError::origin(&source, e))?
        .map_err(|e| CacheError::origin(&source, e))?;
        info!(path = %path.display(), "Opened user directory");

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts the user, or updates the email of an existing username.
    ///
    /// Returns the stored record.
    pub async fn upsert_user(&self, username: &str, email: &str) -> Result<Value> {
        let (name, mail) = (username.to_string(), email.to_string());
        self.with_conn(username, move |conn| {
            conn.execute(
                "INSERT INTO users (username, email) VALUES (?1, ?2)
                 ON CONFLICT(username) DO UPDATE SET email = excluded.email",
                params![name, mail],
            )
        })
        .await?;

        Ok(user_record(username, email))
    }

    /// Deletes the user. Returns whether a row was removed.
    pub async fn remove_user(&self, username: &str) -> Result<bool> {
        let name = username.to_string();
        let removed = self
            .with_conn(username, move |conn| {
                conn.execute("DELETE FROM users WHERE username = ?1", params![name])
            })
            .await?;
        Ok(removed > 0)
    }

    async fn with_conn<T, F>(&self, key: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let outcome = tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| "connection lock poisoned".to_string())?;
            f(&guard).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| CacheError::origin(key, e))?;

        outcome.map_err(|message| CacheError::origin(key, message))
    }
}

fn user_record(username: &str, email: &str) -> Value {
    json!({
        "username": username,
        "email": email,
    })
}

#[async_trait]
impl OriginStore for SqliteUserOrigin {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch_value(&self, key: &str) -> Result<Option<Value>> {
        let name = key.to_string();
        self.with_conn(key, move |conn| {
            let row = conn.query_row(
                "SELECT username, email FROM users WHERE username = ?1",
                params![name],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            );
            match row {
                Ok((username, email)) => Ok(Some(user_record(&username, &email))),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
    }
}
