/*!
 * SQLite connection management for the fetch cache.
 *
 * Access is serialized through a mutex; async callers run their queries on
 * tokio's blocking pool via `execute_async`.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::models::StoreStats;
use super::schema;

/// Default database filename
const DEFAULT_DB_FILENAME: &str = "cache.db";

/// Default database directory name under the user's data directory
const DEFAULT_DB_DIRNAME: &str = "storydoc";

const IN_MEMORY_PATH: &str = ":memory:";

/// Database connection wrapper with thread-safe access
#[derive(Clone)]
pub struct DatabaseConnection {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open the cache database at the default location
    pub fn new_default() -> Result<Self> {
        let db_path = Self::default_database_path()?;
        Self::new(&db_path)
    }

    /// Open (or create) the cache database at `db_path`
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create cache directory: {:?}", parent))?;
            }
        }

        info!("Opening fetch cache at: {:?}", db_path);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open cache database: {:?}", db_path))?;
        schema::initialize_schema(&conn)?;

        Ok(Self { db_path, connection: Arc::new(Mutex::new(conn)) })
    }

    /// Create an in-memory database (tests and `--no-store` style runs)
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory cache database");
        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        schema::initialize_schema(&conn)?;

        Ok(Self { db_path: PathBuf::from(IN_MEMORY_PATH), connection: Arc::new(Mutex::new(conn)) })
    }

    /// `<data_local_dir>/storydoc/cache.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        Ok(base_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run `f` with the connection on the current thread
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .connection
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to acquire database lock: {}", e))?;
        f(&conn)
    }

    /// Run `f` with the connection on the blocking pool
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| anyhow::anyhow!("Failed to acquire database lock: {}", e))?;
            f(&conn)
        })
        .await
        .context("Database task panicked")?
    }

    /// Record count and file size
    pub fn stats(&self) -> Result<StoreStats> {
        self.execute(|conn| {
            let record_count: i64 = conn
                .query_row("SELECT COUNT(*) FROM fetch_cache", [], |row| row.get(0))
                .unwrap_or(0);

            let file_size_bytes = if self.db_path.to_string_lossy() != IN_MEMORY_PATH {
                std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0)
            } else {
                0
            };

            Ok(StoreStats { record_count, file_size_bytes })
        })
    }
}
