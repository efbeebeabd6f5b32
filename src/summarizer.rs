//! Map-reduce summarization of long texts.
//!
//! The text is split into overlapping chunks, each chunk is condensed by one
//! completion call (map), and the partial summaries are merged by a final
//! completion call (reduce). Map calls may run concurrently up to a configured
//! limit; the reduce stage always sees partial summaries in chunk order.

use crate::chunker::{self, Chunk};
use crate::completion::{CompletionClient, CompletionError};
use crate::error::{BiblioError, Result, Stage};
use crate::prompts::map_reduce::{build_map_prompt, build_reduce_prompt};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Default model name
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default characters per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// Default overlapping characters between chunks
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Summarization settings
#[derive(Debug, Clone)]
pub struct SummarizeConfig {
    pub model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub temperature: f32,
    /// Maximum map-stage calls in flight (1 = sequential)
    pub max_concurrency: usize,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            temperature: 0.0,
            max_concurrency: 1,
        }
    }
}

/// Condensed version of a single chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialSummary {
    pub chunk_index: usize,
    pub text: String,
}

fn provider_error(stage: Stage, chunk_index: Option<usize>, err: CompletionError) -> BiblioError {
    match err {
        CompletionError::Retryable(message) => BiblioError::RetryableProvider {
            stage,
            chunk_index,
            message,
        },
        CompletionError::Fatal(message) => BiblioError::FatalProvider {
            stage,
            chunk_index,
            message,
        },
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
}

/// Summarize one chunk with a single completion call (no retries).
pub async fn summarize_chunk(
    client: &dyn CompletionClient,
    chunk: &Chunk,
    model: &str,
    temperature: f32,
) -> Result<PartialSummary> {
    debug!(chunk = chunk.index, chars = chunk.text.chars().count(), "Summarizing chunk");

    let prompt = build_map_prompt(&chunk.text);
    let text = client
        .complete(&prompt, model, temperature)
        .await
        .map_err(|e| provider_error(Stage::Map, Some(chunk.index), e))?;

    Ok(PartialSummary {
        chunk_index: chunk.index,
        text,
    })
}

/// Merge partial summaries (already in chunk order) with a single completion call.
pub async fn synthesize(
    client: &dyn CompletionClient,
    partials: &[PartialSummary],
    model: &str,
    temperature: f32,
) -> Result<String> {
    let texts: Vec<&str> = partials.iter().map(|p| p.text.as_str()).collect();
    let prompt = build_reduce_prompt(&texts);

    debug!(partials = partials.len(), "Synthesizing final summary");

    client
        .complete(&prompt, model, temperature)
        .await
        .map_err(|e| provider_error(Stage::Reduce, None, e))
}

/// Run the full chunk → map → reduce pipeline.
///
/// Fails with `InvalidInput` or `InvalidConfiguration` before any provider
/// call. The first map failure aborts the run without reaching the reduce
/// stage. Setting `cancel` stops new map calls from being issued and makes
/// the run return `Cancelled`.
pub async fn run(
    client: &dyn CompletionClient,
    config: &SummarizeConfig,
    text: &str,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<String> {
    if text.trim().is_empty() {
        return Err(BiblioError::InvalidInput("Input text is empty.".to_string()));
    }
    if config.max_concurrency == 0 {
        return Err(BiblioError::InvalidConfiguration(
            "concurrency must be at least 1".to_string(),
        ));
    }

    let chunks = chunker::split(text, config.chunk_size, config.chunk_overlap)?;
    let cancel = cancel.as_deref();

    info!(
        chunks = chunks.len(),
        model = %config.model,
        concurrency = config.max_concurrency,
        "Starting map-reduce summarization"
    );

    let mut partials: Vec<PartialSummary> = stream::iter(chunks.iter())
        .map(|chunk| async move {
            if is_cancelled(cancel) {
                return Err(BiblioError::Cancelled);
            }
            summarize_chunk(client, chunk, &config.model, config.temperature).await
        })
        .buffer_unordered(config.max_concurrency)
        .try_collect()
        .await?;

    // Completion order is arbitrary under concurrency
    partials.sort_by_key(|p| p.chunk_index);

    if is_cancelled(cancel) {
        return Err(BiblioError::Cancelled);
    }

    let summary = synthesize(client, &partials, &config.model, config.temperature).await?;

    info!(
        partials = partials.len(),
        summary_chars = summary.chars().count(),
        "Summarization complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::map_reduce::REDUCE_PROMPT_TEMPLATE;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    fn is_reduce(prompt: &str) -> bool {
        let header = REDUCE_PROMPT_TEMPLATE.lines().next().unwrap_or_default();
        prompt.starts_with(header)
    }

    fn chunk_text(prompt: &str) -> &str {
        prompt.split_once("Trecho:\n").map(|(_, c)| c).unwrap_or(prompt)
    }

    /// Echoes each chunk back as `S<chunk>` and records every prompt.
    #[derive(Default)]
    struct StubClient {
        prompts: Mutex<Vec<String>>,
        calls: AtomicUsize,
        /// First-issued map calls finish last
        stagger: bool,
        fail_on_call: Option<(usize, CompletionError)>,
        cancel_after_first: Option<Arc<AtomicBool>>,
    }

    impl StubClient {
        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }

        fn reduce_prompts(&self) -> Vec<String> {
            self.prompts().into_iter().filter(|p| is_reduce(p)).collect()
        }
    }

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn complete(
            &self,
            prompt: &str,
            _model: &str,
            _temperature: f32,
        ) -> std::result::Result<String, CompletionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());

            if let Some(flag) = &self.cancel_after_first {
                flag.store(true, Ordering::SeqCst);
            }
            if let Some((at, err)) = &self.fail_on_call {
                if *at == n {
                    return Err(err.clone());
                }
            }
            if is_reduce(prompt) {
                return Ok("FINAL".to_string());
            }
            if self.stagger {
                let delay = 60u64.saturating_sub(n as u64 * 15);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Ok(format!("S<{}>", chunk_text(prompt)))
        }
    }

    fn config(chunk_size: usize, chunk_overlap: usize, max_concurrency: usize) -> SummarizeConfig {
        SummarizeConfig {
            chunk_size,
            chunk_overlap,
            max_concurrency,
            ..Default::default()
        }
    }

    const TEXT: &str = "Primeiro parágrafo sobre bibliotecas.\n\n\
                        Segundo parágrafo sobre inteligência artificial.\n\n\
                        Terceiro parágrafo sobre métricas de citação.\n\n\
                        Quarto parágrafo com conclusões finais.";

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let client = StubClient::default();
        for text in ["", "   \n\t  "] {
            let result = run(&client, &SummarizeConfig::default(), text, None).await;
            assert!(matches!(result, Err(BiblioError::InvalidInput(_))));
        }
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_makes_no_calls() {
        let client = StubClient::default();
        let result = run(&client, &config(100, 100, 1), TEXT, None).await;
        assert!(matches!(result, Err(BiblioError::InvalidConfiguration(_))));

        let result = run(&client, &config(100, 10, 0), TEXT, None).await;
        assert!(matches!(result, Err(BiblioError::InvalidConfiguration(_))));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_text_single_map_call() {
        let client = StubClient::default();
        let summary = run(&client, &SummarizeConfig::default(), "Texto curto.", None)
            .await
            .unwrap();

        assert_eq!(summary, "FINAL");
        let prompts = client.prompts();
        assert_eq!(prompts.len(), 2);
        assert_eq!(chunk_text(&prompts[0]), "Texto curto.");
        assert!(prompts[1].contains("[Parte 1/1]\nS<Texto curto.>"));
    }

    #[tokio::test]
    async fn test_reduce_prompt_keeps_chunk_order_under_concurrency() {
        let (size, overlap) = (60, 10);
        let chunks = chunker::split(TEXT, size, overlap).unwrap();
        assert!(chunks.len() >= 4);

        let client = StubClient {
            stagger: true,
            ..Default::default()
        };
        run(&client, &config(size, overlap, 4), TEXT, None).await.unwrap();

        let expected: Vec<String> = chunks
            .iter()
            .map(|c| format!("S<{}>", c.text))
            .collect();
        let reduce = client.reduce_prompts();
        assert_eq!(reduce.len(), 1);
        assert_eq!(reduce[0], build_reduce_prompt(&expected));
    }

    #[tokio::test]
    async fn test_retryable_map_error_aborts_without_reduce() {
        let client = StubClient {
            fail_on_call: Some((1, CompletionError::Retryable("429".to_string()))),
            ..Default::default()
        };
        let result = run(&client, &config(60, 10, 1), TEXT, None).await;

        match result {
            Err(BiblioError::RetryableProvider {
                stage, chunk_index, ..
            }) => {
                assert_eq!(stage, Stage::Map);
                assert_eq!(chunk_index, Some(1));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        assert!(client.reduce_prompts().is_empty());
    }

    #[tokio::test]
    async fn test_fatal_reduce_error_is_surfaced() {
        let chunks = chunker::split(TEXT, 60, 10).unwrap();
        let client = StubClient {
            fail_on_call: Some((chunks.len(), CompletionError::Fatal("401".to_string()))),
            ..Default::default()
        };
        let result = run(&client, &config(60, 10, 2), TEXT, None).await;

        assert!(matches!(
            result,
            Err(BiblioError::FatalProvider {
                stage: Stage::Reduce,
                chunk_index: None,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_cancel_stops_new_calls() {
        let flag = Arc::new(AtomicBool::new(false));
        let client = StubClient {
            cancel_after_first: Some(Arc::clone(&flag)),
            ..Default::default()
        };
        let result = run(&client, &config(60, 10, 1), TEXT, Some(Arc::clone(&flag))).await;

        assert!(matches!(result, Err(BiblioError::Cancelled)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert!(client.reduce_prompts().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let flag = Arc::new(AtomicBool::new(true));
        let client = StubClient::default();
        let result = run(&client, &SummarizeConfig::default(), TEXT, Some(flag)).await;

        assert!(matches!(result, Err(BiblioError::Cancelled)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }
}
