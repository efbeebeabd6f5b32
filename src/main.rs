//! rustbiblio - Map-reduce summarizer and Scopus bibliometrics
//!
//! ## Usage
//!
//! ### Summarize a text file
//! ```bash
//! rustbiblio summarize report.txt --chunk-size 2000 --chunk-overlap 200
//! ```
//!
//! ### Bibliometric analysis from the command line
//! ```bash
//! rustbiblio search 'TITLE-ABS-KEY("machine learning")' --max-results 200
//! ```
//!
//! ### Dashboard
//! ```bash
//! rustbiblio serve --port 8501
//! ```

use anyhow::{Context, Result};
use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::{Parser, Subcommand};
use rustbiblio::{
    bibliometrics::{self, BibliometricReport},
    cache::SearchCache,
    completion::{LlmConfig, OpenAiClient, DEFAULT_BASE_URL},
    config,
    dashboard::{self, FormValues},
    export,
    scopus::{ScopusClient, SearchParams, DEFAULT_QUERY},
    summarizer::{self, SummarizeConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_MODEL},
    BiblioError,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Map-reduce summarizer and Scopus bibliometrics
#[derive(Parser)]
#[command(name = "rustbiblio")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a .txt file with map-reduce
    Summarize {
        /// Path to a UTF-8 text file
        input_file: PathBuf,

        /// Model name
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,

        /// Characters per chunk
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Overlapping characters between chunks
        #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
        chunk_overlap: usize,

        /// Sampling temperature
        #[arg(long, default_value_t = 0.0)]
        temperature: f32,

        /// Maximum concurrent chunk summaries (1 = sequential)
        #[arg(long, default_value_t = 1)]
        concurrency: usize,

        /// OpenAI-compatible API base URL
        #[arg(long, env = config::ENV_LLM_BASE_URL, default_value = DEFAULT_BASE_URL)]
        llm_base_url: String,

        /// LLM API key
        #[arg(long, env = config::ENV_LLM_KEY, hide_env_values = true)]
        llm_key: Option<String>,
    },

    /// Search Scopus, print statistics and export CSV/XLSX
    Search {
        /// Scopus query
        query: String,

        /// Results per page (10-200)
        #[arg(long, default_value_t = config::DEFAULT_COUNT)]
        count: usize,

        /// Maximum documents to analyse (25-2000)
        #[arg(long, default_value_t = config::DEFAULT_MAX_RESULTS)]
        max_results: usize,

        /// Elsevier API key (falls back to SCOPUS_API_KEY / api_key)
        #[arg(long)]
        api_key: Option<String>,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,
    },

    /// Run the bibliometric dashboard
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Default Elsevier API key (falls back to SCOPUS_API_KEY / api_key)
        #[arg(long)]
        api_key: Option<String>,

        /// Seconds a search stays cached
        #[arg(long, default_value_t = config::DEFAULT_CACHE_TTL_SECS)]
        cache_ttl: u64,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (stderr keeps stdout for the summary)
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Summarize {
            input_file,
            model,
            chunk_size,
            chunk_overlap,
            temperature,
            concurrency,
            llm_base_url,
            llm_key,
        } => {
            let config = SummarizeConfig {
                model,
                chunk_size,
                chunk_overlap,
                temperature,
                max_concurrency: concurrency,
            };
            run_summarize(input_file, config, llm_base_url, llm_key).await
        }
        Commands::Search {
            query,
            count,
            max_results,
            api_key,
            output,
        } => run_search(query, count, max_results, api_key, output).await,
        Commands::Serve {
            port,
            host,
            api_key,
            cache_ttl,
        } => run_server(host, port, api_key, cache_ttl).await,
    }
}

// ============================================================================
// Summarizer
// ============================================================================

async fn run_summarize(
    input_file: PathBuf,
    config: SummarizeConfig,
    llm_base_url: String,
    llm_key: Option<String>,
) -> Result<()> {
    if !input_file.exists() {
        anyhow::bail!("File not found: {}", input_file.display());
    }

    let text = std::fs::read_to_string(&input_file)
        .with_context(|| format!("Failed to read {}", input_file.display()))?;

    let api_key = llm_key.unwrap_or_default();
    let client = OpenAiClient::new(LlmConfig {
        base_url: llm_base_url,
        api_key,
    })?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling after in-flight requests");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    info!(file = %input_file.display(), chars = text.chars().count(), "Summarizing file");

    let summary = summarizer::run(&client, &config, &text, Some(cancel))
        .await
        .context("Summarization failed")?;

    println!("{}", summary);
    Ok(())
}

// ============================================================================
// Search Pipeline
// ============================================================================

async fn run_search(
    query: String,
    count: usize,
    max_results: usize,
    api_key: Option<String>,
    output_dir: PathBuf,
) -> Result<()> {
    let api_key = config::scopus_api_key(api_key)
        .context("Missing Elsevier API key (use --api-key, SCOPUS_API_KEY or api_key)")?;
    let params = SearchParams::validated(&query, count, max_results)?;

    let client = ScopusClient::new(&api_key)?;
    let result = client.search(&params).await?;
    let report = bibliometrics::analyze(&result)?;

    if report.records.is_empty() {
        println!("Nenhum documento retornado para essa busca.");
        return Ok(());
    }

    print_report(&report);

    let (csv_path, xlsx_path) = export::save_exports(&output_dir, &report.records)?;
    println!("\nSaved: {}", csv_path.display());
    println!("Saved: {}", xlsx_path.display());
    Ok(())
}

fn print_report(report: &BibliometricReport) {
    let o = &report.overview;
    let year = |y: Option<i32>| y.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string());

    println!(
        "Documentos coletados: {} (total no Scopus: {})",
        o.documents, report.total_results
    );
    println!("Citações totais: {}", o.total_citations);
    println!("Média citações: {:.2}", o.mean_citations);
    println!("Período: {} - {}", year(o.first_year), year(o.last_year));

    if !report.by_year.is_empty() {
        println!("\n--- Publicações por ano ---");
        for row in &report.by_year {
            println!("{:>6}  {}", row.year, row.publications);
        }
    }

    for (title, rows) in [
        ("Top autores", &report.top_authors),
        ("Top periódicos", &report.top_journals),
        ("Termos mais frequentes nos títulos", &report.top_terms),
    ] {
        if rows.is_empty() {
            continue;
        }
        println!("\n--- {} ---", title);
        for row in rows {
            println!("{:>5}  {}", row.count, row.label);
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(host: String, port: u16, api_key: Option<String>, cache_ttl: u64) -> Result<()> {
    info!(host = %host, port = port, cache_ttl = cache_ttl, "Starting dashboard server");

    let default_api_key = config::scopus_api_key(api_key);
    if default_api_key.is_none() {
        warn!("No default Elsevier API key; requests must send X-ELS-APIKey");
    }

    let app_state = Arc::new(AppState {
        default_api_key,
        cache: SearchCache::new(config::cache_ttl(cache_ttl)),
    });

    let app = Router::new()
        .route("/", get(index_handler).post(index_handler))
        .route("/health", get(health_handler))
        .route("/api/search", post(search_handler))
        .route("/export.csv", get(export_csv_handler).post(export_csv_handler))
        .route("/export.xlsx", get(export_xlsx_handler).post(export_xlsx_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

struct AppState {
    default_api_key: Option<String>,
    cache: SearchCache,
}

/// Error wrapper mapping library errors onto HTTP statuses
struct ApiError(BiblioError);

impl From<BiblioError> for ApiError {
    fn from(e: BiblioError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BiblioError::Validation(_) | BiblioError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            BiblioError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            BiblioError::Api { .. } | BiblioError::Network(_) | BiblioError::Parse(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        let body = serde_json::json!({
            "status": "error",
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Search parameters shared by the page, the JSON API and the exports.
///
/// Read from the query string on GET and from the form body on POST.
#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: Option<String>,
    /// Elsevier key typed into the dashboard form
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default = "default_count")]
    count: usize,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

fn default_count() -> usize {
    config::DEFAULT_COUNT
}

fn default_max_results() -> usize {
    config::DEFAULT_MAX_RESULTS
}

impl SearchRequest {
    /// Key typed into the form, if any
    fn form_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Elsevier key for a request: form field, then `X-ELS-APIKey`, then the server default
fn resolve_api_key(
    state: &AppState,
    headers: &HeaderMap,
    req: &SearchRequest,
) -> rustbiblio::Result<String> {
    req.form_key()
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("X-ELS-APIKey")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
        })
        .or_else(|| state.default_api_key.clone())
        .ok_or_else(|| BiblioError::Validation("Informe sua chave da API Elsevier.".to_string()))
}

/// Run (or reuse) a search and analyse it
async fn fetch_report(
    state: &AppState,
    headers: &HeaderMap,
    req: &SearchRequest,
) -> rustbiblio::Result<BibliometricReport> {
    let params = SearchParams::validated(
        req.query.as_deref().unwrap_or_default(),
        req.count,
        req.max_results,
    )?;
    let api_key = resolve_api_key(state, headers, req)?;

    let result = match state.cache.get(&api_key, &params) {
        Some(result) => result,
        None => {
            let client = ScopusClient::new(&api_key)?;
            let result = client.search(&params).await?;
            state.cache.insert(&api_key, &params, result)
        }
    };

    bibliometrics::analyze(&result)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Dashboard page
async fn index_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(req): Form<SearchRequest>,
) -> Html<String> {
    let form = FormValues {
        query: req.query.clone().unwrap_or_else(|| DEFAULT_QUERY.to_string()),
        count: req.count,
        max_results: req.max_results,
        api_key: req.form_key().unwrap_or_default().to_string(),
        server_has_key: state.default_api_key.is_some(),
    };

    if req.query.is_none() {
        return Html(dashboard::render_page(&form, None, None));
    }

    match fetch_report(&state, &headers, &req).await {
        Ok(report) => Html(dashboard::render_page(&form, Some(&report), None)),
        Err(e) => {
            warn!(error = %e, "Dashboard search failed");
            Html(dashboard::render_page(&form, None, Some(&e.to_string())))
        }
    }
}

/// JSON search endpoint
async fn search_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SearchRequest>,
) -> Result<Json<BibliometricReport>, ApiError> {
    info!(query = ?req.query, count = req.count, max_results = req.max_results, "Search request");
    Ok(Json(fetch_report(&state, &headers, &req).await?))
}

fn attachment(content_type: &str, extension: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}.{}\"",
        export::EXPORT_FILE_STEM,
        extension
    );
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

/// CSV download
async fn export_csv_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(req): Form<SearchRequest>,
) -> Result<Response, ApiError> {
    let report = fetch_report(&state, &headers, &req).await?;
    let bytes = export::to_csv_bytes(&report.records)?;
    Ok(attachment(export::CSV_CONTENT_TYPE, "csv", bytes))
}

/// Excel download
async fn export_xlsx_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(req): Form<SearchRequest>,
) -> Result<Response, ApiError> {
    let report = fetch_report(&state, &headers, &req).await?;
    let bytes = export::to_xlsx_bytes(&report.records)?;
    Ok(attachment(export::XLSX_CONTENT_TYPE, "xlsx", bytes))
}
