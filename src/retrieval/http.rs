/*!
 * Wiki retriever.
 *
 * Listings come from the MediaWiki `cargoquery` API; script text is the
 * content of the page's `<pre id="datas_txt">` block.
 */

use async_trait::async_trait;
use log::{debug, error, warn};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{Listing, ListingEntry, ListingKind, ScriptRetriever};
use crate::app_config::{CargoQuery, FetchConfig};
use crate::errors::RetrievalError;

static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<pre[^>]*\bid\s*=\s*["']datas_txt["'][^>]*>(.*?)</pre>"#).expect("Invalid script block regex")
});

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("Invalid tag regex"));

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("Invalid entity regex"));

// Column aliases used in cargo queries
const NAME_ALIAS: &str = "entry_page";
const TITLE_ALIAS: &str = "entry_title";
const TARGET_ALIAS: &str = "entry_target";

#[derive(Debug, Deserialize)]
struct CargoResponse {
    #[serde(default)]
    cargoquery: Vec<CargoRow>,
}

#[derive(Debug, Deserialize)]
struct CargoRow {
    title: CargoFields,
}

#[derive(Debug, Deserialize)]
struct CargoFields {
    #[serde(rename = "entry_page", default)]
    page: Option<String>,
    #[serde(rename = "entry_title", default)]
    title: Option<String>,
    #[serde(rename = "entry_target", default)]
    target: Option<String>,
}

/// Retriever for a MediaWiki site with the Cargo extension
pub struct HttpRetriever {
    client: Client,
    home_url: Url,
    api_url: Url,
    chapter_query: Option<CargoQuery>,
    character_query: CargoQuery,
    max_retries: u32,
    backoff_base_ms: u64,
    request_delay_ms: u64,
}

impl HttpRetriever {
    pub fn from_config(config: &FetchConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            home_url: Url::parse(&config.home_url)?,
            api_url: Url::parse(&config.api_url)?,
            chapter_query: config.chapter_query.clone(),
            character_query: config.character_query.clone(),
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_ms,
            request_delay_ms: config.request_delay_ms,
        })
    }

    fn cargo_url(&self, query: &CargoQuery, name: &str) -> Url {
        let fields = format!(
            "{}={},{}={},{}={}",
            query.name_field, NAME_ALIAS, query.title_field, TITLE_ALIAS, query.target_field, TARGET_ALIAS
        );
        let condition = format!("{}=\"{}\"", query.name_field, name.replace('"', "\\\""));

        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("action", "cargoquery")
            .append_pair("format", "json")
            .append_pair("tables", &query.table)
            .append_pair("fields", &fields)
            .append_pair("where", &condition)
            .append_pair("limit", &query.limit.to_string());
        if let Some(order) = &query.order_by {
            url.query_pairs_mut().append_pair("order_by", order);
        }
        url
    }

    fn page_url(&self, target: &str) -> Result<Url, RetrievalError> {
        let path = format!("w/{}", target.replace('?', "%3F").replace('#', "%23"));
        self.home_url.join(&path).map_err(|e| RetrievalError::InvalidResponse {
            name: target.to_string(),
            message: format!("cannot build page URL: {}", e),
        })
    }

    async fn query_listing(&self, query: &CargoQuery, name: &str) -> Result<Listing, RetrievalError> {
        let body = self.get_text(name, self.cargo_url(query, name)).await?;
        let response: CargoResponse = serde_json::from_str(&body).map_err(|e| RetrievalError::InvalidResponse {
            name: name.to_string(),
            message: format!("cargoquery returned invalid JSON: {}", e),
        })?;

        let entries: Vec<ListingEntry> = response
            .cargoquery
            .into_iter()
            .map(|row| row.title)
            .filter(|fields| fields.page.as_deref().is_none_or(|page| page == name))
            .filter_map(|fields| {
                let target = fields.target.filter(|t| !t.trim().is_empty())?;
                let title = fields.title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| target.clone());
                Some(ListingEntry::new(decode_entities(&title), decode_entities(&target)))
            })
            .collect();

        if entries.is_empty() {
            return Err(RetrievalError::NotFound(name.to_string()));
        }
        Ok(Listing::new(entries))
    }

    /// GET `url` with retries, returning the body
    async fn get_text(&self, name: &str, url: Url) -> Result<String, RetrievalError> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.max_retries {
            debug!("GET {} (attempt {}/{})", url, attempt + 1, self.max_retries + 1);
            let result = self.send_once(name, url.clone()).await;

            if self.request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.request_delay_ms)).await;
            }

            match result {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() => {
                    error!("{} - attempt {}/{}", e, attempt + 1, self.max_retries + 1);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            attempt += 1;

            if attempt <= self.max_retries {
                let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1));
                let jitter_ms = rand::rng().random_range(0..=self.backoff_base_ms / 4);
                tokio::time::sleep(Duration::from_millis(backoff_ms + jitter_ms)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| RetrievalError::RequestFailed {
            name: name.to_string(),
            message: format!("request failed after {} attempts", self.max_retries + 1),
        }))
    }

    async fn send_once(&self, name: &str, url: Url) -> Result<String, RetrievalError> {
        let response = self.client.get(url).send().await.map_err(|e| RetrievalError::RequestFailed {
            name: name.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RetrievalError::NotFound(name.to_string()));
        }
        if !status.is_success() {
            return Err(RetrievalError::Status { name: name.to_string(), status_code: status.as_u16() });
        }

        response.text().await.map_err(|e| RetrievalError::RequestFailed {
            name: name.to_string(),
            message: format!("failed to read response body: {}", e),
        })
    }
}

#[async_trait]
impl ScriptRetriever for HttpRetriever {
    fn source_id(&self) -> String {
        format!("wiki:{}", self.home_url)
    }

    async fn fetch_listing(&self, kind: ListingKind, name: &str) -> Result<Listing, RetrievalError> {
        match kind {
            ListingKind::Character => self.query_listing(&self.character_query, name).await,
            ListingKind::Chapter => match &self.chapter_query {
                Some(query) => self.query_listing(query, name).await,
                None => Ok(Listing::new(vec![ListingEntry::new(name, name)])),
            },
        }
    }

    async fn fetch_script(&self, entry: &ListingEntry) -> Result<String, RetrievalError> {
        let url = self.page_url(&entry.target)?;
        let html = self.get_text(&entry.target, url).await?;

        match extract_script(&html) {
            Some(text) => Ok(text),
            None => {
                warn!("Page for '{}' has no script block", entry.title);
                Err(RetrievalError::InvalidResponse {
                    name: entry.target.clone(),
                    message: "page has no <pre id=\"datas_txt\"> block".to_string(),
                })
            }
        }
    }
}

/// Script text inside `<pre id="datas_txt">`, with markup removed and entities decoded
pub fn extract_script(html: &str) -> Option<String> {
    let inner = SCRIPT_BLOCK.captures(html)?.get(1)?.as_str();
    let without_tags = TAG.replace_all(inner, "");
    Some(decode_entities(&without_tags))
}

/// Decode named and numeric HTML character references in one pass
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "amp" => Some('&'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
