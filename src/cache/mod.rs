/*!
 * Fetch cache.
 *
 * Memoizes listings and raw script text so repeated runs skip retrieval:
 * - `connection` and `schema`: the SQLite database
 * - `models`: keys, payloads and hash-verified records
 * - `store`: the `CacheStore` trait with SQLite and in-memory stores
 * - `fetch`: the `FetchCache` lookup and write-back policy
 */

pub mod connection;
pub mod fetch;
pub mod models;
pub mod schema;
pub mod store;

pub use connection::DatabaseConnection;
pub use fetch::{CacheStats, FetchCache};
pub use models::{CacheKey, CachePayload, CacheRecord, RecordKind, StoreStats, hash_text};
pub use store::{CacheStore, MemoryCacheStore, SqliteCacheStore};
