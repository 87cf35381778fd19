/*!
 * Cache store implementations.
 */

use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use rusqlite::{OptionalExtension, params};
use std::collections::HashMap;

use super::connection::DatabaseConnection;
use super::models::{CacheKey, CacheRecord, StoreStats};
use crate::errors::CacheError;

/// Durable key-value store for fetch results
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a record; a record that fails verification is `CacheError::Corrupted`
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheRecord>, CacheError>;

    /// Insert or overwrite the record under its key
    async fn put(&self, record: &CacheRecord) -> Result<(), CacheError>;

    /// Remove every record, returning how many were removed
    async fn invalidate_all(&self) -> Result<u64, CacheError>;

    async fn stats(&self) -> Result<StoreStats, CacheError>;
}

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteCacheStore {
    db: DatabaseConnection,
}

impl SqliteCacheStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn new_in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(DatabaseConnection::new_in_memory()?))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheRecord>, CacheError> {
        let source = key.source.clone();
        let kind = key.kind.as_str();
        let name = key.name.clone();

        let row: Option<(String, String, String)> = self
            .db
            .execute_async(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT payload, content_hash, fetched_at FROM fetch_cache
                         WHERE source = ?1 AND kind = ?2 AND name = ?3",
                        params![source, kind, name],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    )
                    .optional()?)
            })
            .await?;

        match row {
            Some((payload, content_hash, fetched_at)) => {
                debug!("Cache row found for {}", key);
                CacheRecord::from_stored(key.clone(), &payload, content_hash, fetched_at).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, record: &CacheRecord) -> Result<(), CacheError> {
        let source = record.key.source.clone();
        let kind = record.key.kind.as_str();
        let name = record.key.name.clone();
        let payload = record.payload.encode()?;
        let content_hash = record.content_hash.clone();
        let fetched_at = record.fetched_at.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO fetch_cache (source, kind, name, payload, content_hash, fetched_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(source, kind, name) DO UPDATE SET
                        payload = excluded.payload,
                        content_hash = excluded.content_hash,
                        fetched_at = excluded.fetched_at
                    "#,
                    params![source, kind, name, payload, content_hash, fetched_at],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<u64, CacheError> {
        let deleted = self
            .db
            .execute_async(|conn| {
                let deleted = conn.execute("DELETE FROM fetch_cache", [])?;
                conn.execute("VACUUM", [])?;
                Ok(deleted as u64)
            })
            .await?;
        Ok(deleted)
    }

    async fn stats(&self) -> Result<StoreStats, CacheError> {
        Ok(self.db.stats()?)
    }
}

/// Process-local store; nothing survives the run
#[derive(Default)]
pub struct MemoryCacheStore {
    records: RwLock<HashMap<CacheKey, CacheRecord>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheRecord>, CacheError> {
        Ok(self.records.read().get(key).cloned())
    }

    async fn put(&self, record: &CacheRecord) -> Result<(), CacheError> {
        self.records.write().insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<u64, CacheError> {
        let mut records = self.records.write();
        let count = records.len() as u64;
        records.clear();
        Ok(count)
    }

    async fn stats(&self) -> Result<StoreStats, CacheError> {
        Ok(StoreStats { record_count: self.len() as i64, file_size_bytes: 0 })
    }
}
