//! Persistence for the single Gemini API key the lab works with.

use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as B64_ENGINE;
use base64::Engine;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use r2d2_sqlite::rusqlite::{params, OptionalExtension};
use time::OffsetDateTime;

use crate::db::DbPool;
use crate::errors::LabError;

/// Fixed key the credential is stored under.
pub const CREDENTIAL_KEY: &str = "gemini_api_key";

pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<Option<String>, LabError>;
    fn set(&self, value: &str) -> Result<(), LabError>;
    fn clear(&self) -> Result<(), LabError>;
}

/// SQLite-backed store; the secret is base64-encoded at rest.
#[derive(Clone)]
pub struct SqliteCredentialStore {
    pool: DbPool,
}

impl SqliteCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, LabError> {
        self.pool.get().map_err(|e| LabError::Storage(e.to_string()))
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn get(&self) -> Result<Option<String>, LabError> {
        let conn = self.conn()?;
        let secret: Option<String> = conn
            .query_row(
                "SELECT secret FROM credentials WHERE name = ?1",
                params![CREDENTIAL_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage)?;

        let Some(encoded) = secret else {
            return Ok(None);
        };
        let decoded = B64_ENGINE
            .decode(encoded.as_bytes())
            .map_err(|_| LabError::Storage("Failed to decode stored credential".into()))?;
        let value = String::from_utf8(decoded)
            .map_err(|_| LabError::Storage("Stored credential was not valid UTF-8".into()))?;
        Ok(Some(value))
    }

    fn set(&self, value: &str) -> Result<(), LabError> {
        let conn = self.conn()?;
        let encoded = B64_ENGINE.encode(value.as_bytes());
        let now = OffsetDateTime::now_utc().unix_timestamp();
        conn.execute(
            "INSERT INTO credentials (name, secret, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(name) DO UPDATE SET secret = excluded.secret, updated_at = excluded.updated_at",
            params![CREDENTIAL_KEY, encoded, now],
        )
        .map_err(storage)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), LabError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM credentials WHERE name = ?1",
            params![CREDENTIAL_KEY],
        )
        .map_err(storage)?;
        Ok(())
    }
}

/// Process-local store, used when nothing should touch disk.
#[derive(Default)]
pub struct MemoryCredentialStore {
    value: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>, LabError> {
        self.value
            .lock()
            .map_err(|_| LabError::Storage("credential lock poisoned".into()))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<String>, LabError> {
        Ok(self.slot()?.clone())
    }

    fn set(&self, value: &str) -> Result<(), LabError> {
        *self.slot()? = Some(value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), LabError> {
        *self.slot()? = None;
        Ok(())
    }
}

fn storage(err: r2d2_sqlite::rusqlite::Error) -> LabError {
    LabError::Storage(err.to_string())
}
