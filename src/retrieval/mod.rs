/*!
 * Raw text retrieval.
 *
 * A `ScriptRetriever` lists the script entries under a chapter or character
 * name and fetches the raw text of one entry. Implementations:
 * - `HttpRetriever`: a MediaWiki-style wiki
 * - `DirectoryRetriever`: a local directory tree
 */

pub mod http;
pub mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::RetrievalError;

pub use http::HttpRetriever;
pub use local::DirectoryRetriever;

/// What a requested name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    /// A story chapter or event
    Chapter,
    /// A character whose records are exported
    Character,
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingKind::Chapter => write!(f, "chapter"),
            ListingKind::Character => write!(f, "character"),
        }
    }
}

/// One script belonging to a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Human-readable title of the script
    pub title: String,
    /// Retriever-specific locator (page name or file path)
    pub target: String,
}

impl ListingEntry {
    pub fn new(title: impl Into<String>, target: impl Into<String>) -> Self {
        Self { title: title.into(), target: target.into() }
    }
}

/// Ordered script entries for one name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub entries: Vec<ListingEntry>,
}

impl Listing {
    pub fn new(entries: Vec<ListingEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source of listings and raw script text
#[async_trait]
pub trait ScriptRetriever: Send + Sync {
    /// Stable identifier of the source, part of every cache key
    fn source_id(&self) -> String;

    /// Whether results from this source go through the fetch cache
    fn cacheable(&self) -> bool {
        true
    }

    /// Script entries under `name`, in source order
    async fn fetch_listing(&self, kind: ListingKind, name: &str) -> Result<Listing, RetrievalError>;

    /// Raw text of one script
    async fn fetch_script(&self, entry: &ListingEntry) -> Result<String, RetrievalError>;
}
