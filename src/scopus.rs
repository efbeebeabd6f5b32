//! Scopus Search API Client
//!
//! Fetches search results from the Elsevier Scopus API, page by page, up to
//! a caller-chosen maximum.
//!
//! API Details:
//! - `GET /content/search/scopus?query=..&count=..&start=..`
//! - Auth via the `X-ELS-APIKey` header
//! - Total hits reported as `search-results.opensearch:totalResults` (a string)

use crate::error::{BiblioError, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Scopus search endpoint
pub const SCOPUS_API_URL: &str = "https://api.elsevier.com/content/search/scopus";

/// Query shown in the dashboard form by default
pub const DEFAULT_QUERY: &str = r#"TITLE-ABS-KEY ("inteligencia artificial" AND bibliotecas)"#;

/// Allowed page sizes
pub const COUNT_RANGE: std::ops::RangeInclusive<usize> = 10..=200;

/// Allowed maximum number of documents to analyse
pub const MAX_RESULTS_RANGE: std::ops::RangeInclusive<usize> = 25..=2000;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 40;

/// Retries on HTTP 429 before giving up
const MAX_RETRIES: u32 = 3;

/// Raw search outcome: total hits reported by Scopus and the fetched entries
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResult {
    pub total_results: usize,
    pub entries: Vec<Value>,
}

/// Search parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchParams {
    pub query: String,
    /// Results per page
    pub count: usize,
    /// Upper bound on fetched entries
    pub max_results: usize,
}

impl SearchParams {
    /// Trim the query and check the page/maximum ranges.
    pub fn validated(query: &str, count: usize, max_results: usize) -> Result<Self> {
        let query = query.trim();
        if query.is_empty() {
            return Err(BiblioError::Validation("Informe uma consulta Scopus.".to_string()));
        }
        if !COUNT_RANGE.contains(&count) {
            return Err(BiblioError::Validation(format!(
                "count must be between {} and {} (got {})",
                COUNT_RANGE.start(),
                COUNT_RANGE.end(),
                count
            )));
        }
        if !MAX_RESULTS_RANGE.contains(&max_results) {
            return Err(BiblioError::Validation(format!(
                "max_results must be between {} and {} (got {})",
                MAX_RESULTS_RANGE.start(),
                MAX_RESULTS_RANGE.end(),
                max_results
            )));
        }
        Ok(Self {
            query: query.to_string(),
            count,
            max_results,
        })
    }
}

/// Scopus API client
pub struct ScopusClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ScopusClient {
    /// Create a new ScopusClient
    ///
    /// # Arguments
    ///
    /// * `api_key` - Elsevier API key
    pub fn new(api_key: &str) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(BiblioError::Validation(
                "Informe sua chave da API Elsevier.".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BiblioError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: SCOPUS_API_URL.to_string(),
        })
    }

    /// Point the client at another endpoint (mirrors, proxies, local stubs)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Fetch up to `max_results` entries for `query`.
    pub async fn search(&self, params: &SearchParams) -> Result<SearchResult> {
        info!(
            query = %params.query,
            count = params.count,
            max_results = params.max_results,
            "Starting Scopus search"
        );

        let first = self.get_page(&params.query, params.count, 0).await?;
        let total = parse_total(&first);
        let mut entries = parse_entries(first);

        let max_to_fetch = total.min(params.max_results);
        for start in page_starts(params.count, max_to_fetch) {
            let page = self.get_page(&params.query, params.count, start).await?;
            let page_entries = parse_entries(page);
            debug!(start = start, count = page_entries.len(), "Fetched Scopus page");
            entries.extend(page_entries);
        }

        entries.truncate(max_to_fetch);
        info!(total = total, fetched = entries.len(), "Scopus search complete");

        Ok(SearchResult {
            total_results: total,
            entries,
        })
    }

    /// Fetch one page, backing off on HTTP 429
    async fn get_page(&self, query: &str, count: usize, start: usize) -> Result<Value> {
        let mut retries = 0;

        loop {
            let response = self
                .client
                .get(&self.base_url)
                .header("Accept", "application/json")
                .header("X-ELS-APIKey", &self.api_key)
                .query(&[
                    ("query", query.to_string()),
                    ("count", count.to_string()),
                    ("start", start.to_string()),
                ])
                .send()
                .await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.json().await?);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if retries < MAX_RETRIES {
                    let backoff = Duration::from_secs(2u64.pow(retries));
                    warn!(
                        retries = retries,
                        backoff_secs = backoff.as_secs(),
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    retries += 1;
                    continue;
                }
                return Err(BiblioError::RateLimited(60));
            }

            return Err(BiblioError::Api {
                code: status.as_u16() as i32,
                message: format!("Erro HTTP na API Scopus: {}", status),
            });
        }
    }
}

/// Start offsets of the pages after the first one
fn page_starts(count: usize, max_to_fetch: usize) -> impl Iterator<Item = usize> {
    (count..max_to_fetch).step_by(count.max(1))
}

/// Total hits; anything missing or unparseable counts as zero
pub fn parse_total(payload: &Value) -> usize {
    match payload.pointer("/search-results/opensearch:totalResults") {
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().map(|n| n as usize).unwrap_or(0),
        _ => 0,
    }
}

/// Entries of a page; a missing or null `entry` field yields nothing
pub fn parse_entries(payload: Value) -> Vec<Value> {
    match payload {
        Value::Object(mut root) => match root.remove("search-results") {
            Some(Value::Object(mut results)) => match results.remove("entry") {
                Some(Value::Array(entries)) => entries,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
