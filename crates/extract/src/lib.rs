pub mod agents;
pub mod fallback;
pub mod insights;
pub mod llm;
pub mod parse;
pub mod prompt;
pub mod retry;
pub mod schema;
pub mod validation;

pub use agents::ExtractionContext;
pub use llm::{LlmClient, LlmError, OllamaClient, OpenAiClient, ScriptedLlmClient};
pub use retry::RetryPolicy;
pub use schema::{DataPoint, ExtractionResult, Metric, StrategicInsights, Table, TableMetadata, TimeSeries, Trend};
pub use validation::ValidationProfile;

use ingest::{Chunker, ChunkerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use schema::RawExtraction;

/// Runs the extraction agents and the validation agent over a document.
/// Holds only immutable settings and the backend handle; everything
/// request-specific lives in the `ExtractionContext` built per call.
#[derive(Clone)]
pub struct Extractor {
    llm: Arc<dyn LlmClient>,
    retry: RetryPolicy,
    chunker_config: ChunkerConfig,
    call_timeout: Duration,
}

impl Extractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            retry: RetryPolicy::default(),
            chunker_config: ChunkerConfig::default(),
            call_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_chunker_config(mut self, config: ChunkerConfig) -> Self {
        self.chunker_config = config;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn backend(&self) -> &str {
        self.llm.name()
    }

    pub fn context(&self, use_chunking: bool) -> ExtractionContext {
        ExtractionContext {
            llm: Arc::clone(&self.llm),
            retry: self.retry.clone(),
            chunker: use_chunking.then(|| Chunker::new(self.chunker_config.clone())),
            call_timeout: self.call_timeout,
        }
    }

    /// Tables, metrics and time series extracted concurrently, then
    /// validated. Never fails; an empty document yields an empty result
    /// without touching the backend.
    pub async fn extract(&self, text: &str, brand: Option<&str>, use_chunking: bool) -> ExtractionResult {
        if text.trim().is_empty() {
            info!("Empty document, skipping extraction");
            return ExtractionResult::default();
        }

        let ctx = self.context(use_chunking);
        info!(
            backend = self.backend(),
            chars = text.len(),
            chunked = use_chunking,
            "Starting extraction"
        );

        let (tables, metrics, series) = tokio::join!(
            agents::extract_tables(&ctx, text, brand),
            agents::extract_metrics(&ctx, text, brand),
            agents::extract_time_series(&ctx, text, brand),
        );

        validation::validate(RawExtraction { tables, metrics, series }, ValidationProfile::Standard)
    }

    pub async fn summarize(&self, text: &str, brand: Option<&str>) -> String {
        insights::summarize(&self.context(false), text, brand).await
    }

    pub async fn insights(
        &self,
        keywords: &[String],
        metrics: &[Metric],
        summary: &str,
        brand: Option<&str>,
    ) -> StrategicInsights {
        insights::generate_insights(&self.context(false), keywords, metrics, summary, brand).await
    }
}

/// Rule-based extraction with the sensitive validation profile. Makes no
/// network calls.
pub fn extract_local(text: &str) -> ExtractionResult {
    if text.trim().is_empty() {
        return ExtractionResult::default();
    }
    validation::validate(fallback::extract(text), ValidationProfile::Sensitive)
}
