//! The three extraction agents. Each one prompts the model once per text
//! segment (the whole document, or each chunk), reads the reply through
//! `parse`, and falls back to the rule-based extractor when the backend
//! cannot be reached.

use ingest::Chunker;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::fallback;
use crate::llm::{LlmClient, LlmError};
use crate::parse;
use crate::prompt::{self, Scope};
use crate::retry::RetryPolicy;
use crate::schema::{RawMetric, RawTable, RawTimeSeries};

/// Everything an agent needs for one request. Built per request and passed
/// by reference; nothing here is global.
pub struct ExtractionContext {
    pub llm: Arc<dyn LlmClient>,
    pub retry: RetryPolicy,
    /// `Some` when the document is to be processed chunk by chunk.
    pub chunker: Option<Chunker>,
    pub call_timeout: Duration,
}

impl ExtractionContext {
    fn segments(&self, text: &str) -> Vec<(String, Scope)> {
        match &self.chunker {
            Some(chunker) => chunker
                .chunk_text(text)
                .into_iter()
                .map(|c| {
                    debug!(chunk = c.index, tokens = c.estimated_tokens(), "Chunk prepared");
                    let scope = Scope::for_chunk(c.index, &c.context);
                    (c.text, scope)
                })
                .collect(),
            None => vec![(text.to_string(), Scope::Document)],
        }
    }

    /// One model call with per-attempt timeout and bounded retries.
    pub async fn call(&self, operation: &str, prompt: &str) -> Result<String, LlmError> {
        let llm = &self.llm;
        let limit = self.call_timeout;

        self.retry
            .retry_if(
                operation,
                || async move {
                    match timeout(limit, llm.generate(prompt)).await {
                        Ok(reply) => reply,
                        Err(_) => Err(LlmError::Timeout),
                    }
                },
                LlmError::is_retryable,
            )
            .await
    }
}

/// How one agent prompts, reads, filters, deduplicates and falls back.
struct Agent<T> {
    name: &'static str,
    build_prompt: fn(&str, Option<&str>, Scope) -> String,
    from_value: fn(&Value) -> Vec<T>,
    fallback: fn(&str) -> Vec<T>,
    keep: fn(&T) -> bool,
    key: fn(&T) -> String,
}

async fn run_agent<T>(agent: &Agent<T>, ctx: &ExtractionContext, text: &str, brand: Option<&str>) -> Vec<T> {
    let mut found = Vec::new();

    for (segment, scope) in ctx.segments(text) {
        let prompt = (agent.build_prompt)(&segment, brand, scope);

        let items = match ctx.call(agent.name, &prompt).await {
            Ok(reply) => match parse::parse_llm_json(&reply) {
                Ok(value) => (agent.from_value)(&value),
                Err(e) => {
                    warn!(agent = agent.name, error = %e, reply_len = reply.len(), "Unparseable model reply, skipping segment");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(agent = agent.name, error = %e, "Model unavailable, using rule-based extraction");
                (agent.fallback)(&segment)
            }
        };

        debug!(agent = agent.name, ?scope, items = items.len(), "Segment extracted");
        found.extend(items);
    }

    let before = found.len();
    let mut seen = HashSet::new();
    found.retain(|item| (agent.keep)(item) && seen.insert((agent.key)(item)));

    info!(agent = agent.name, kept = found.len(), discarded = before - found.len(), "Agent finished");
    found
}

const TABLES: Agent<RawTable> = Agent {
    name: "table_agent",
    build_prompt: prompt::build_table_prompt,
    from_value: parse::tables_from_value,
    fallback: fallback::tables,
    keep: |t| t.headers.len() >= 2 && t.rows.len() >= 2,
    key: |t| format!("{}|{}", t.title.trim().to_lowercase(), t.headers.join("|").to_lowercase()),
};

const METRICS: Agent<RawMetric> = Agent {
    name: "metric_agent",
    build_prompt: prompt::build_metric_prompt,
    from_value: parse::metrics_from_value,
    fallback: fallback::metrics,
    keep: |m| !m.name.trim().is_empty() && !m.value.trim().is_empty(),
    key: |m| m.name.trim().to_lowercase(),
};

const TIME_SERIES: Agent<RawTimeSeries> = Agent {
    name: "time_series_agent",
    build_prompt: prompt::build_time_series_prompt,
    from_value: parse::time_series_from_value,
    fallback: fallback::time_series,
    keep: |s| s.data_points.len() >= 2,
    key: |s| s.title.trim().to_lowercase(),
};

pub async fn extract_tables(ctx: &ExtractionContext, text: &str, brand: Option<&str>) -> Vec<RawTable> {
    run_agent(&TABLES, ctx, text, brand).await
}

pub async fn extract_metrics(ctx: &ExtractionContext, text: &str, brand: Option<&str>) -> Vec<RawMetric> {
    run_agent(&METRICS, ctx, text, brand).await
}

pub async fn extract_time_series(
    ctx: &ExtractionContext,
    text: &str,
    brand: Option<&str>,
) -> Vec<RawTimeSeries> {
    run_agent(&TIME_SERIES, ctx, text, brand).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use crate::prompt::{METRIC_TASK, TABLE_TASK};
    use ingest::ChunkerConfig;

    fn context(client: ScriptedLlmClient) -> ExtractionContext {
        ExtractionContext {
            llm: Arc::new(client),
            retry: RetryPolicy::immediate(3),
            chunker: None,
            call_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn prose_reply_yields_no_tables() {
        let ctx = context(ScriptedLlmClient::new("There are no tables in this document."));
        let tables = extract_tables(&ctx, "Region | Revenue\nEU | 50\nUS | 50", None).await;
        assert!(tables.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_uses_fallback_after_retries() {
        let client = Arc::new(ScriptedLlmClient::failing(LlmError::Timeout));
        let ctx = ExtractionContext {
            llm: client.clone(),
            retry: RetryPolicy::immediate(3),
            chunker: None,
            call_timeout: Duration::from_secs(5),
        };

        let tables = extract_tables(&ctx, "Region | Revenue\nEU | 50\nUS | 50", None).await;
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].title, "Revenue by Region");
        assert_eq!(client.calls(), 4);
    }

    #[tokio::test]
    async fn not_configured_is_not_retried() {
        let client = Arc::new(ScriptedLlmClient::failing(LlmError::NotConfigured("no key".into())));
        let ctx = ExtractionContext {
            llm: client.clone(),
            retry: RetryPolicy::immediate(3),
            chunker: None,
            call_timeout: Duration::from_secs(5),
        };

        let metrics = extract_metrics(&ctx, "Revenue grew 12%", None).await;
        assert_eq!(metrics[0].name, "Growth Rate");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn replies_are_filtered_and_deduplicated() {
        let reply = r#"```json
{"keyMetrics": [
  {"name": "ARR", "value": "4.5", "unit": "USD million"},
  {"name": "arr", "value": "4.6"},
  {"name": "", "value": "1"},
  {"name": "Churn", "value": ""}
]}
```"#;
        let ctx = context(ScriptedLlmClient::new("{}").on(METRIC_TASK, reply));
        let metrics = extract_metrics(&ctx, "ARR reached $4.5 million.", Some("Acme")).await;

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].value, "4.5");
    }

    #[tokio::test]
    async fn chunked_mode_prompts_once_per_chunk() {
        let client = Arc::new(ScriptedLlmClient::new(r#"{"tables": []}"#));
        let ctx = ExtractionContext {
            llm: client.clone(),
            retry: RetryPolicy::immediate(0),
            chunker: Some(Chunker::new(ChunkerConfig {
                chunk_size: 200,
                overlap: 20,
                min_chunk_len: 10,
            })),
            call_timeout: Duration::from_secs(5),
        };

        let text = "Our revenue grew strongly this year across regions. ".repeat(20);
        extract_tables(&ctx, &text, None).await;

        let prompts = client.prompts();
        assert!(prompts.len() > 1);
        assert!(prompts.iter().all(|p| p.starts_with(TABLE_TASK)));
        assert!(prompts[0].contains("part 1 of"));
    }
}
