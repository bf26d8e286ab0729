use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    collections::HashMap,
    fs,
    path::Path,
    str::FromStr,
    sync::Arc,
};
use tokio::sync::Mutex;

mod products;

pub use products::{ProductStore, SlotProductStore, DEFAULT_PRODUCTS_KEY};

/// Keyed string slots, the local-storage shaped persistence the catalog sits on.
#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn read_slot(&self, key: &str) -> Result<Option<String>>;
    async fn write_slot(&self, key: &str, value: &str) -> Result<()>;
}

/// SQLite-backed slot store.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        create_database_dir(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url '{database_url}'"))?
            .create_if_missing(true);

        // every connection to an in-memory database sees its own empty database
        let pool_options = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run storage migrations")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }
}

#[async_trait]
impl SlotStore for Storage {
    async fn read_slot(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT slot_value FROM kv_slots WHERE slot_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read slot '{key}'"))?;
        row.map(|r| r.try_get::<String, _>(0))
            .transpose()
            .with_context(|| format!("slot '{key}' does not hold text"))
    }

    async fn write_slot(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_slots (slot_key, slot_value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(slot_key) DO UPDATE SET slot_value = excluded.slot_value, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write slot '{key}'"))?;
        Ok(())
    }
}

/// Process-local slot store. Clones share the same slots.
#[derive(Clone, Default)]
pub struct MemorySlots {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotStore for MemorySlots {
    async fn read_slot(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.lock().await.get(key).cloned())
    }

    async fn write_slot(&self, key: &str, value: &str) -> Result<()> {
        self.slots
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// The database file named by a `sqlite://` or `sqlite:` url, without query
/// parameters. In-memory databases have none.
fn database_file(database_url: &str) -> Option<&Path> {
    if is_in_memory(database_url) {
        return None;
    }
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split_once('?').map_or(rest, |(path, _)| path);
    (!path.is_empty()).then(|| Path::new(path))
}

fn create_database_dir(database_url: &str) -> Result<()> {
    let Some(dir) = database_file(database_url)
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
    else {
        return Ok(());
    };

    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create database directory '{}'", dir.display()))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
