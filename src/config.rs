//! Runtime configuration defaults and environment lookups.
//!
//! Command-line flags take precedence; these helpers supply the fallbacks.

use std::time::Duration;

/// Environment variable holding the LLM API key
pub const ENV_LLM_KEY: &str = "OPENAI_API_KEY";

/// Environment variable overriding the LLM base URL
pub const ENV_LLM_BASE_URL: &str = "OPENAI_BASE_URL";

/// Environment variable holding the Elsevier API key
pub const ENV_SCOPUS_KEY: &str = "SCOPUS_API_KEY";

/// Legacy lowercase name still honoured for the Elsevier key
pub const ENV_SCOPUS_KEY_LEGACY: &str = "api_key";

/// Default dashboard port
pub const DEFAULT_PORT: u16 = 8501;

/// Default lifetime of memoized searches, in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default page size for Scopus requests
pub const DEFAULT_COUNT: usize = 25;

/// Default cap on analysed documents
pub const DEFAULT_MAX_RESULTS: usize = 200;

/// First non-empty value among `explicit` and the given environment variables
pub fn resolve_secret<F>(explicit: Option<String>, env_names: &[&str], lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .into_iter()
        .chain(env_names.iter().filter_map(|name| lookup(*name)))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Elsevier key from the flag, `SCOPUS_API_KEY` or `api_key`
pub fn scopus_api_key(explicit: Option<String>) -> Option<String> {
    resolve_secret(
        explicit,
        &[ENV_SCOPUS_KEY, ENV_SCOPUS_KEY_LEGACY],
        |name| std::env::var(name).ok(),
    )
}

pub fn cache_ttl(secs: u64) -> Duration {
    Duration::from_secs(secs)
}
