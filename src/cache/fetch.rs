/*!
 * Fetch cache policy.
 *
 * `FetchCache` puts a `CacheStore` in front of a `ScriptRetriever`:
 * - a verified record is used unless force refresh is on
 * - a record that fails verification or parsing is a miss for this call only
 * - a store failure is a warning, never an error for the caller
 * - every successful fetch is written back immediately
 *
 * Keys carry the retriever's source id, so one store can serve several
 * sources. Retrievers that opt out of caching are passed straight through.
 */

use log::{debug, warn};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use super::models::{CacheKey, CachePayload, CacheRecord};
use super::store::CacheStore;
use crate::errors::{AppError, CacheError, RetrievalError};
use crate::retrieval::{Listing, ListingEntry, ListingKind, ScriptRetriever};
use crate::script::{ParseReport, ScriptParser};

/// Per-run cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub corrupt: usize,
    pub writes: usize,
    pub errors: usize,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hit(s), {} miss(es), {} corrupt, {} write(s), {} store error(s)",
            self.hits, self.misses, self.corrupt, self.writes, self.errors
        )
    }
}

pub struct FetchCache {
    store: Arc<dyn CacheStore>,
    force_refresh: bool,
    stats: Mutex<CacheStats>,
}

impl FetchCache {
    pub fn new(store: Arc<dyn CacheStore>, force_refresh: bool) -> Self {
        Self { store, force_refresh, stats: Mutex::new(CacheStats::default()) }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    /// Listing for `name`, from the cache when possible
    pub async fn listing(
        &self,
        retriever: &dyn ScriptRetriever,
        kind: ListingKind,
        name: &str,
    ) -> Result<Listing, RetrievalError> {
        if !retriever.cacheable() {
            return retriever.fetch_listing(kind, name).await;
        }

        let key = CacheKey::listing(retriever.source_id(), kind, name);

        if let Some(CachePayload::Listing(listing)) = self.lookup(&key).await {
            self.stats.lock().hits += 1;
            debug!("Cache hit for {}", key);
            return Ok(listing);
        }

        let listing = retriever.fetch_listing(kind, name).await?;
        self.store_payload(key, CachePayload::Listing(listing.clone())).await;
        Ok(listing)
    }

    /// Parsed script for `entry`, from the cache when possible
    ///
    /// Cached text the parser rejects counts as corrupt and is refetched.
    /// Fresh text the parser rejects is an error and is not cached.
    pub async fn script(
        &self,
        retriever: &dyn ScriptRetriever,
        entry: &ListingEntry,
        parser: &ScriptParser,
    ) -> Result<ParseReport, AppError> {
        if !retriever.cacheable() {
            let text = retriever.fetch_script(entry).await?;
            return Ok(parser.parse(&text)?);
        }

        let key = CacheKey::script(retriever.source_id(), &entry.target);

        if let Some(CachePayload::RawText(text)) = self.lookup(&key).await {
            match parser.parse(&text) {
                Ok(report) => {
                    self.stats.lock().hits += 1;
                    debug!("Cache hit for {}", key);
                    return Ok(report);
                }
                Err(e) => {
                    self.stats.lock().corrupt += 1;
                    warn!("Cached script {} is unusable ({}); fetching again", key, e);
                }
            }
        }

        let text = retriever.fetch_script(entry).await?;
        let report = parser.parse(&text)?;
        self.store_payload(key, CachePayload::RawText(text)).await;
        Ok(report)
    }

    /// Verified payload for `key`, or `None` on miss, corruption, store error or force refresh
    async fn lookup(&self, key: &CacheKey) -> Option<CachePayload> {
        if self.force_refresh {
            self.stats.lock().misses += 1;
            return None;
        }

        match self.store.get(key).await {
            Ok(Some(record)) => Some(record.payload),
            Ok(None) => {
                self.stats.lock().misses += 1;
                None
            }
            Err(e @ CacheError::Corrupted { .. }) => {
                self.stats.lock().corrupt += 1;
                warn!("{}; fetching again", e);
                None
            }
            Err(e) => {
                self.stats.lock().errors += 1;
                warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn store_payload(&self, key: CacheKey, payload: CachePayload) {
        let result = match CacheRecord::new(key.clone(), payload) {
            Ok(record) => self.store.put(&record).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => self.stats.lock().writes += 1,
            Err(e) => {
                self.stats.lock().errors += 1;
                warn!("Cache write skipped for {}: {}", key, e);
            }
        }
    }
}
