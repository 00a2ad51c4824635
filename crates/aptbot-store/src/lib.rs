//! SQLite adapter for the registry-store port.
//!
//! rusqlite connections are blocking, so every query runs on the tokio
//! blocking pool. Upsert atomicity comes from the unique index on
//! (chat_id, user_id) plus `ON CONFLICT DO UPDATE`; the application never
//! takes its own locks around the store.

use std::path::Path;

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};

use aptbot_core::{
    domain::{ApartmentRecord, ChatId, Resident, UserId},
    registry::RegistryStore,
    Error, Result,
};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct SqliteRegistry {
    pool: DbPool,
}

impl SqliteRegistry {
    /// Open (or create) the registry database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_manager(SqliteConnectionManager::file(path), 10)
    }

    /// In-memory registry for tests. Single connection: each pooled
    /// connection would otherwise get its own private database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_manager(SqliteConnectionManager::memory(), 1)
    }

    fn from_manager(manager: SqliteConnectionManager, max_size: u32) -> Result<Self> {
        let pool = Pool::builder()
            .max_size(max_size)
            .build(manager)
            .map_err(store_err)?;

        let registry = Self { pool };
        let conn = registry.pool.get().map_err(store_err)?;
        init_schema(&conn)?;
        Ok(registry)
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get().map_err(store_err)?;
            op(&conn).map_err(store_err)
        })
        .await
        .map_err(|e| Error::Store(format!("blocking task failed: {e}")))?
    }
}

fn store_err(e: impl std::fmt::Display) -> Error {
    Error::Store(e.to_string())
}

fn init_schema(conn: &Connection) -> Result<()> {
    migrate_legacy_schema(conn)?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS apartment_info (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             user_id BIGINT NOT NULL,
             username TEXT,
             chat_id BIGINT NOT NULL,
             apartment_number INTEGER NOT NULL
         );
         CREATE UNIQUE INDEX IF NOT EXISTS apartment_resident
             ON apartment_info (chat_id, user_id);
         CREATE INDEX IF NOT EXISTS apartment_info_chat
             ON apartment_info (chat_id);
         CREATE INDEX IF NOT EXISTS apartment_info_number
             ON apartment_info (apartment_number);",
    )
    .map_err(store_err)
}

/// Early deployments keyed rows on (chat_id, username) and had no user_id
/// column. Usernames are mutable and optional, so those rows cannot be
/// carried over; the table is rebuilt keyed on user_id.
fn migrate_legacy_schema(conn: &Connection) -> Result<()> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'apartment_info'",
            [],
            |row| Ok(row.get::<_, i64>(0)? > 0),
        )
        .map_err(store_err)?;
    if !table_exists {
        return Ok(());
    }

    let mut stmt = conn
        .prepare("PRAGMA table_info(apartment_info)")
        .map_err(store_err)?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(store_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(store_err)?;
    if columns.iter().any(|c| c == "user_id") {
        return Ok(());
    }

    tracing::warn!("legacy username-keyed apartment_info found, rebuilding keyed on user_id");
    conn.execute_batch("DROP TABLE apartment_info").map_err(store_err)
}

#[async_trait]
impl RegistryStore for SqliteRegistry {
    async fn find_by_user(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Option<ApartmentRecord>> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT username, apartment_number FROM apartment_info
                 WHERE chat_id = ?1 AND user_id = ?2",
                params![chat_id.0, user_id.0],
                |row| {
                    Ok(ApartmentRecord {
                        chat_id,
                        user_id,
                        username: row.get(0)?,
                        apartment_number: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
    }

    async fn upsert(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        username: Option<&str>,
        apartment_number: u32,
    ) -> Result<()> {
        let username = username.map(|s| s.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO apartment_info (user_id, username, chat_id, apartment_number)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (chat_id, user_id)
                 DO UPDATE SET apartment_number = excluded.apartment_number,
                               username = excluded.username",
                params![user_id.0, username, chat_id.0, apartment_number],
            )
            .map(|_| ())
        })
        .await
    }

    async fn find_by_apartment(
        &self,
        chat_id: ChatId,
        apartment_number: u32,
    ) -> Result<Vec<Resident>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, username FROM apartment_info
                 WHERE chat_id = ?1 AND apartment_number = ?2
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![chat_id.0, apartment_number], |row| {
                Ok(Resident {
                    user_id: UserId(row.get(0)?),
                    username: row.get(1)?,
                })
            })?;
            rows.collect()
        })
        .await
    }

    async fn list_all(&self, chat_id: ChatId) -> Result<Vec<ApartmentRecord>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, username, apartment_number FROM apartment_info
                 WHERE chat_id = ?1
                 ORDER BY apartment_number ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![chat_id.0], |row| {
                Ok(ApartmentRecord {
                    chat_id,
                    user_id: UserId(row.get(0)?),
                    username: row.get(1)?,
                    apartment_number: row.get(2)?,
                })
            })?;
            rows.collect()
        })
        .await
    }

    async fn delete(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM apartment_info WHERE chat_id = ?1 AND user_id = ?2",
                params![chat_id.0, user_id.0],
            )
            .map(|_| ())
        })
        .await
    }
}
