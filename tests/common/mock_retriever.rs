/*!
 * Mock retriever for testing
 *
 * Serves scripted listings and text from memory so no test touches the
 * network. Calls are recorded in a shared tracker; names can be configured
 * to fail or to respond after a delay.
 */

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use storydoc::errors::RetrievalError;
use storydoc::retrieval::{Listing, ListingEntry, ListingKind, ScriptRetriever};

/// Tracks retriever calls
#[derive(Debug, Default)]
pub struct CallTracker {
    /// Listing requests, in call order
    pub listings: Vec<(ListingKind, String)>,
    /// Script targets requested, in call order
    pub scripts: Vec<String>,
}

impl CallTracker {
    pub fn total(&self) -> usize {
        self.listings.len() + self.scripts.len()
    }
}

#[derive(Debug, Default)]
pub struct MockRetriever {
    listings: HashMap<(ListingKind, String), Vec<ListingEntry>>,
    scripts: HashMap<String, String>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    source: Option<String>,
    tracker: Arc<Mutex<CallTracker>>,
}

impl MockRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with one script per `(title, text)` pair
    pub fn with_name(mut self, kind: ListingKind, name: &str, scripts: &[(&str, &str)]) -> Self {
        let entries = scripts
            .iter()
            .map(|(title, text)| {
                let target = format!("{}/{}", name, title);
                self.scripts.insert(target.clone(), text.to_string());
                ListingEntry::new(*title, target)
            })
            .collect();
        self.listings.insert((kind, name.to_string()), entries);
        self
    }

    pub fn with_chapter(self, name: &str, scripts: &[(&str, &str)]) -> Self {
        self.with_name(ListingKind::Chapter, name, scripts)
    }

    pub fn with_character(self, name: &str, scripts: &[(&str, &str)]) -> Self {
        self.with_name(ListingKind::Character, name, scripts)
    }

    /// Listing requests for `name` fail with a server error
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Listing requests for `name` complete after `delay`
    pub fn delayed(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    /// Report `source` as the source id instead of `mock`
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn tracker(&self) -> Arc<Mutex<CallTracker>> {
        self.tracker.clone()
    }
}

#[async_trait]
impl ScriptRetriever for MockRetriever {
    fn source_id(&self) -> String {
        self.source.clone().unwrap_or_else(|| "mock".to_string())
    }

    async fn fetch_listing(&self, kind: ListingKind, name: &str) -> Result<Listing, RetrievalError> {
        self.tracker.lock().unwrap().listings.push((kind, name.to_string()));

        if let Some(delay) = self.delays.get(name) {
            tokio::time::sleep(*delay).await;
        }

        if self.failing.contains(name) {
            return Err(RetrievalError::Status { name: name.to_string(), status_code: 503 });
        }

        match self.listings.get(&(kind, name.to_string())) {
            Some(entries) => Ok(Listing::new(entries.clone())),
            None => Err(RetrievalError::NotFound(name.to_string())),
        }
    }

    async fn fetch_script(&self, entry: &ListingEntry) -> Result<String, RetrievalError> {
        self.tracker.lock().unwrap().scripts.push(entry.target.clone());

        self.scripts
            .get(&entry.target)
            .cloned()
            .ok_or_else(|| RetrievalError::NotFound(entry.target.clone()))
    }
}
