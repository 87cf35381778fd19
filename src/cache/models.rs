/*!
 * Fetch cache records.
 */

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::errors::CacheError;
use crate::retrieval::{Listing, ListingKind};

/// What a cached payload holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    ChapterListing,
    CharacterListing,
    Script,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::ChapterListing => "chapter_listing",
            RecordKind::CharacterListing => "character_listing",
            RecordKind::Script => "script",
        }
    }
}

impl From<ListingKind> for RecordKind {
    fn from(kind: ListingKind) -> Self {
        match kind {
            ListingKind::Chapter => RecordKind::ChapterListing,
            ListingKind::Character => RecordKind::CharacterListing,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chapter_listing" => Ok(RecordKind::ChapterListing),
            "character_listing" => Ok(RecordKind::CharacterListing),
            "script" => Ok(RecordKind::Script),
            _ => Err(CacheError::Store(format!("Unknown record kind: {}", s))),
        }
    }
}

/// Cache key: the source, the record kind, and the name or script target
///
/// The source id keeps data from different wikis and directories apart even
/// when they use the same names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: String,
    pub kind: RecordKind,
    pub name: String,
}

impl CacheKey {
    pub fn new(source: impl Into<String>, kind: RecordKind, name: impl Into<String>) -> Self {
        Self { source: source.into(), kind, name: name.into() }
    }

    pub fn listing(source: impl Into<String>, kind: ListingKind, name: impl Into<String>) -> Self {
        Self::new(source, kind.into(), name)
    }

    pub fn script(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(source, RecordKind::Script, target)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} [{}]", self.kind, self.name, self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePayload {
    RawText(String),
    Listing(Listing),
}

impl CachePayload {
    /// Stored text form: raw text as-is, listings as JSON
    pub fn encode(&self) -> Result<String, CacheError> {
        match self {
            CachePayload::RawText(text) => Ok(text.clone()),
            CachePayload::Listing(listing) => serde_json::to_string(listing)
                .map_err(|e| CacheError::Store(format!("Failed to encode listing: {}", e))),
        }
    }

    fn decode(key: &CacheKey, stored: &str) -> Result<Self, CacheError> {
        match key.kind {
            RecordKind::Script => Ok(CachePayload::RawText(stored.to_string())),
            RecordKind::ChapterListing | RecordKind::CharacterListing => serde_json::from_str(stored)
                .map(CachePayload::Listing)
                .map_err(|e| CacheError::Corrupted { key: key.to_string(), reason: format!("undecodable listing: {}", e) }),
        }
    }
}

/// A memoized retrieval result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    pub key: CacheKey,
    pub payload: CachePayload,
    /// RFC 3339 time of the fetch
    pub fetched_at: String,
    /// SHA-256 of the encoded payload
    pub content_hash: String,
}

impl CacheRecord {
    /// Record for a fresh fetch, stamped now
    pub fn new(key: CacheKey, payload: CachePayload) -> Result<Self, CacheError> {
        let content_hash = hash_text(&payload.encode()?);
        Ok(Self { key, payload, fetched_at: Utc::now().to_rfc3339(), content_hash })
    }

    /// Rebuild a record from its stored columns, rejecting tampered or truncated payloads
    pub fn from_stored(key: CacheKey, stored: &str, content_hash: String, fetched_at: String) -> Result<Self, CacheError> {
        if hash_text(stored) != content_hash {
            return Err(CacheError::Corrupted { key: key.to_string(), reason: "content hash mismatch".to_string() });
        }
        let payload = CachePayload::decode(&key, stored)?;
        Ok(Self { key, payload, fetched_at, content_hash })
    }
}

/// Compute the SHA-256 hex digest of text
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Size of a cache store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub record_count: i64,
    pub file_size_bytes: u64,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cached records: {}, Size: {} KB", self.record_count, self.file_size_bytes / 1024)
    }
}
