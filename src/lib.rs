//! # rustbiblio
//!
//! Map-reduce text summarization and Scopus bibliometrics - Rust CLI & dashboard
//!
//! ## Modules
//!
//! - [`chunker`] - Overlapping, boundary-aware text chunking
//! - [`completion`] - Completion client trait and OpenAI-compatible client
//! - [`summarizer`] - Map-reduce summarization pipeline
//! - [`prompts`] - Map and reduce prompt templates
//! - [`scopus`] - Scopus search API client
//! - [`cache`] - Search result memoization
//! - [`bibliometrics`] - Normalization and descriptive statistics
//! - [`export`] - CSV / XLSX exports
//! - [`dashboard`] - HTML rendering
//! - [`config`] - Defaults and environment lookups
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustbiblio::completion::{LlmConfig, OpenAiClient, DEFAULT_BASE_URL};
//! use rustbiblio::summarizer::{self, SummarizeConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OpenAiClient::new(LlmConfig {
//!         base_url: DEFAULT_BASE_URL.to_string(),
//!         api_key: std::env::var("OPENAI_API_KEY")?,
//!     })?;
//!     let text = std::fs::read_to_string("report.txt")?;
//!     let summary = summarizer::run(&client, &SummarizeConfig::default(), &text, None).await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

pub mod bibliometrics;
pub mod cache;
pub mod chunker;
pub mod completion;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod prompts;
pub mod scopus;
pub mod summarizer;

pub use error::{BiblioError, Result};
