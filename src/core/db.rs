//! Durable key-value storage backed by SQLite.
//!
//! Plays the role of the browser's `localStorage`: string keys to
//! string values that survive restarts. Writes that depend on the
//! current value go through `update` which runs inside an immediate
//! transaction so separate processes sharing the file can't lose
//! each other's updates.
use anyhow::{Context, Error, Result};
use rusqlite::{OptionalExtension, TransactionBehavior};
use tokio_rusqlite::Connection;

pub const SESSION_ID_KEY: &str = "medipulseSessionId";
pub const LANGUAGE_KEY: &str = "medipulseLanguage";
pub const CHAT_HISTORY_KEY: &str = "chatHistory";
pub const PATIENT_ID_KEY: &str = "patientId";

pub fn initialize_db(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )
}

pub async fn async_db(db_path: &str) -> Result<Connection, Error> {
    let db = Connection::open(db_path)
        .await
        .with_context(|| format!("Failed to open local store at {}", db_path))?;
    Ok(db)
}

#[derive(Clone)]
pub struct LocalStore {
    db: Connection,
}

impl LocalStore {
    /// Wraps an open connection, creating the schema if needed.
    pub async fn new(db: Connection) -> Result<Self, Error> {
        db.call(|conn| {
            initialize_db(conn)?;
            Ok(())
        })
        .await?;
        Ok(Self { db })
    }

    pub async fn open(db_path: &str) -> Result<Self, Error> {
        Self::new(async_db(db_path).await?).await
    }

    pub async fn in_memory() -> Result<Self, Error> {
        Self::new(Connection::open_in_memory().await?).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_owned();
        let value = self
            .db
            .call(move |conn| {
                let value = conn
                    .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| row.get(0))
                    .optional()?;
                Ok(value)
            })
            .await?;
        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let key = key.to_owned();
        let value = value.to_owned();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO kv (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    [key, value],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<(), Error> {
        let key = key.to_owned();
        self.db
            .call(move |conn| {
                conn.execute("DELETE FROM kv WHERE key = ?", [key])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Atomically read-modify-write a single key.
    ///
    /// `f` receives the current value and returns the value to store
    /// (`None` removes the key) along with a result handed back to
    /// the caller. If `f` fails nothing is written.
    pub async fn update<F, T>(&self, key: &str, f: F) -> Result<T, Error>
    where
        F: FnOnce(Option<String>) -> Result<(Option<String>, T), Error> + Send + 'static,
        T: Send + 'static,
    {
        let key = key.to_owned();
        let out = self
            .db
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let current: Option<String> = tx
                    .query_row("SELECT value FROM kv WHERE key = ?", [&key], |row| {
                        row.get(0)
                    })
                    .optional()?;

                let (next, out) =
                    f(current).map_err(|e| tokio_rusqlite::Error::Other(e.into()))?;

                match next {
                    Some(value) => {
                        tx.execute(
                            "INSERT INTO kv (key, value) VALUES (?1, ?2)
                             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                            [&key, &value],
                        )?;
                    }
                    None => {
                        tx.execute("DELETE FROM kv WHERE key = ?", [&key])?;
                    }
                }
                tx.commit()?;
                Ok(out)
            })
            .await?;
        Ok(out)
    }
}
