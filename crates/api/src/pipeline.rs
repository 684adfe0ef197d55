//! One analysis request from documents to deck data.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use charts::{BrandStyle, ChartBuilder, ChartSet, PlaceholderKpiSource};
use extract::{ExtractionResult, Extractor, LlmClient, StrategicInsights};
use extract::insights::{self, MAX_KEYWORDS};
use ingest::{Document, combine_documents};

use crate::config::{AppConfig, ChartsConfig};
use crate::metrics::{StageTimings, TimedOperation};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub request_id: String,
    pub brand: Option<String>,
    pub extraction: ExtractionResult,
    pub charts: ChartSet,
    pub keywords: Vec<String>,
    pub summary: String,
    /// `insights`, `competitiveAdvantages` and `successIndicators`.
    #[serde(flatten)]
    pub insights: StrategicInsights,
    pub processed_locally: bool,
    pub chunked: bool,
    pub documents: usize,
    pub generated_at: DateTime<Utc>,
    #[serde(skip)]
    pub timings: StageTimings,
}

/// Immutable per-process settings plus the backend handle. Everything
/// request-specific is built inside `analyze`.
pub struct Pipeline {
    extractor: Extractor,
    charts: ChartsConfig,
    chunking_default: bool,
}

impl Pipeline {
    pub fn new(llm: Arc<dyn LlmClient>, config: &AppConfig) -> Self {
        let extractor = Extractor::new(llm)
            .with_retry(config.retry_policy())
            .with_chunker_config(config.chunker_config())
            .with_call_timeout(config.request_timeout());

        Self {
            extractor,
            charts: config.charts.clone(),
            chunking_default: config.chunking.enabled,
        }
    }

    pub fn backend(&self) -> &str {
        self.extractor.backend()
    }

    pub fn chunking_default(&self) -> bool {
        self.chunking_default
    }

    fn chart_builder(&self, brand: Option<&str>) -> ChartBuilder {
        let builder = ChartBuilder::new(BrandStyle::for_brand(brand)).with_max_kpi_cards(self.charts.max_kpi_cards);
        if self.charts.fill_kpi_placeholders {
            builder.with_kpi_source(Box::new(PlaceholderKpiSource))
        } else {
            builder
        }
    }

    /// Extraction and summary run concurrently over the combined text;
    /// charts, keywords and insights follow. Never fails.
    pub async fn analyze(&self, documents: &[Document], brand: Option<&str>, use_chunking: Option<bool>) -> AnalysisReport {
        let request_id = Uuid::new_v4().to_string();
        let chunked = use_chunking.unwrap_or(self.chunking_default);
        let text = combine_documents(documents);

        info!(
            request_id = %request_id,
            documents = documents.len(),
            chars = text.len(),
            chunked,
            brand = brand.unwrap_or(""),
            "Analysis started"
        );

        let mut timings = StageTimings::default();
        let (extraction, summary) = tokio::join!(
            async {
                let timer = TimedOperation::start();
                let extraction = self.extractor.extract(&text, brand, chunked).await;
                (extraction, timer.elapsed())
            },
            async {
                let timer = TimedOperation::start();
                let summary = self.extractor.summarize(&text, brand).await;
                (summary, timer.elapsed())
            },
        );
        let (extraction, extract_time) = extraction;
        let (summary, summary_time) = summary;
        timings.extract = extract_time;
        timings.summary = summary_time;

        let timer = TimedOperation::start();
        let charts = self.chart_builder(brand).build_set(&extraction, self.charts.top_n);
        timings.charts = timer.elapsed();

        let keywords = insights::keywords(&text, MAX_KEYWORDS);
        let timer = TimedOperation::start();
        let insights = self
            .extractor
            .insights(&keywords, &extraction.key_metrics, &summary, brand)
            .await;
        timings.insights = timer.elapsed();

        info!(
            request_id = %request_id,
            charts = charts.total_charts,
            extract_ms = timings.extract.as_millis() as u64,
            "Analysis finished"
        );

        AnalysisReport {
            request_id,
            brand: brand.map(str::to_string),
            keywords,
            extraction,
            charts,
            summary,
            insights,
            processed_locally: false,
            chunked,
            documents: documents.len(),
            generated_at: Utc::now(),
            timings,
        }
    }

    /// The local variant: rule-based extraction with the sensitive profile,
    /// an extractive summary and rule-based insights. No model calls.
    pub fn analyze_sensitive(&self, text: &str, brand: Option<&str>) -> AnalysisReport {
        let request_id = Uuid::new_v4().to_string();
        info!(request_id = %request_id, chars = text.len(), "Sensitive analysis started");

        let mut timings = StageTimings::default();
        let timer = TimedOperation::start();
        let extraction = extract::extract_local(text);
        timings.extract = timer.elapsed();

        let timer = TimedOperation::start();
        let summary = insights::extractive_summary(text);
        timings.summary = timer.elapsed();

        let timer = TimedOperation::start();
        let charts = self.chart_builder(brand).build_set(&extraction, self.charts.top_n);
        timings.charts = timer.elapsed();

        let keywords = insights::keywords(text, MAX_KEYWORDS);
        let timer = TimedOperation::start();
        let insights = if extraction.is_empty() && keywords.is_empty() && summary.is_empty() {
            StrategicInsights::default()
        } else {
            insights::fallback_insights(&keywords, &extraction.key_metrics, &summary)
        };
        timings.insights = timer.elapsed();

        AnalysisReport {
            request_id,
            brand: brand.map(str::to_string),
            keywords,
            extraction,
            charts,
            summary,
            insights,
            processed_locally: true,
            chunked: false,
            documents: usize::from(!text.trim().is_empty()),
            generated_at: Utc::now(),
            timings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charts::{ChartData, ChartType};
    use extract::ScriptedLlmClient;
    use extract::LlmError;
    use extract::prompt::{INSIGHTS_TASK, METRIC_TASK, TABLE_TASK, TIME_SERIES_TASK};

    const SCENARIO: &str = "Region | Revenue\nEU | 50\nUS | 50\nRevenue grew 12%";

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.retry.max_retries = 0;
        config.retry.backoff_step_ms = 0;
        config
    }

    fn scenario_client() -> ScriptedLlmClient {
        ScriptedLlmClient::new("{}")
            .on(
                TABLE_TASK,
                r#"{"tables": [{"title": "Revenue by Region", "headers": ["Region", "Revenue"], "rows": [["EU", "50"], ["US", "50"]]}]}"#,
            )
            .on(
                METRIC_TASK,
                r#"{"keyMetrics": [{"name": "Growth Rate", "value": "12", "unit": "%", "trend": "up", "category": "Performance"}]}"#,
            )
            .on(TIME_SERIES_TASK, r#"{"timeSeriesData": []}"#)
    }

    #[tokio::test]
    async fn region_revenue_document_becomes_pie_and_kpi() {
        let pipeline = Pipeline::new(Arc::new(scenario_client()), &config());
        let docs = vec![Document::new("q3.txt", SCENARIO)];

        let report = pipeline.analyze(&docs, Some("Acme"), None).await;

        assert_eq!(report.charts.total_charts, 2);
        assert!(!report.charts.has_more);
        let top = &report.charts.top_charts;
        assert_eq!(top[0].chart_type, ChartType::Pie);
        assert_eq!(top[0].importance, 64);
        assert_eq!(top[1].chart_type, ChartType::Metrics);
        assert!(matches!(&top[1].data, ChartData::Cards { cards } if cards[0].value == "12"));
        assert!(report.keywords.contains(&"revenue".to_string()));
        assert!(!report.processed_locally);
        assert!(!report.chunked);
        // "{}" from the backend is not usable, so rules supply the insights
        assert!(report.insights.insights[0].starts_with("Document analysis indicates"));
        assert_eq!(report.insights.success_indicators.len(), report.keywords.len().min(3));
    }

    #[tokio::test]
    async fn model_insights_reach_the_report() {
        let client = scenario_client().on(
            INSIGHTS_TASK,
            r#"{"insights": ["Even EU and US revenue suggests room to grow in a third region."],
                "competitiveAdvantages": ["Balanced Regions"], "successIndicators": ["Growth Rate 12%"]}"#,
        );
        let pipeline = Pipeline::new(Arc::new(client), &config());

        let report = pipeline.analyze(&[Document::new("q3.txt", SCENARIO)], None, None).await;

        assert_eq!(report.insights.competitive_advantages, vec!["Balanced Regions"]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["successIndicators"], serde_json::json!(["Growth Rate 12%"]));
        assert!(json["insights"][0].as_str().is_some_and(|i| i.starts_with("Even EU")));
    }

    #[tokio::test]
    async fn zero_documents_give_empty_report_without_calls() {
        let client = Arc::new(ScriptedLlmClient::new("{}"));
        let pipeline = Pipeline::new(client.clone(), &config());

        let report = pipeline.analyze(&[], None, None).await;

        assert!(report.extraction.is_empty());
        assert_eq!(report.charts, ChartSet::default());
        assert!(report.summary.is_empty());
        assert!(report.keywords.is_empty());
        assert!(report.insights.is_empty());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn unreachable_backend_still_produces_charts() {
        let client = ScriptedLlmClient::failing(LlmError::NotConfigured("missing api key".into()));
        let pipeline = Pipeline::new(Arc::new(client), &config());
        let docs = vec![Document::new("q3.txt", SCENARIO)];

        let report = pipeline.analyze(&docs, None, Some(false)).await;

        assert_eq!(report.extraction.tables.len(), 1);
        assert_eq!(report.charts.top_charts[0].chart_type, ChartType::Pie);
        assert!(!report.insights.insights.is_empty());
        assert!(!report.insights.competitive_advantages.is_empty());
    }

    #[tokio::test]
    async fn request_can_turn_chunking_on() {
        let client = Arc::new(ScriptedLlmClient::new("{}"));
        let mut config = config();
        config.chunking.chunk_size = 200;
        config.chunking.overlap = 20;
        config.chunking.min_chunk_len = 10;
        let pipeline = Pipeline::new(client.clone(), &config);

        let text = "Our revenue grew strongly this year across regions. ".repeat(20);
        let report = pipeline.analyze(&[Document::new("long.txt", text)], None, Some(true)).await;

        assert!(report.chunked);
        let table_prompts = client.prompts().iter().filter(|p| p.starts_with(TABLE_TASK)).count();
        assert!(table_prompts > 1);
    }

    #[test]
    fn sensitive_analysis_is_local() {
        let pipeline = Pipeline::new(Arc::new(ScriptedLlmClient::failing(LlmError::Timeout)), &config());
        let report = pipeline.analyze_sensitive(SCENARIO, Some("Acme"));

        assert!(report.processed_locally);
        assert_eq!(report.extraction.tables.len(), 1);
        assert_eq!(report.charts.top_charts[0].chart_type, ChartType::Pie);

        assert!(!report.insights.insights.is_empty());
        assert!(report.insights.competitive_advantages[0].ends_with(" Excellence"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["processedLocally"], true);
        assert!(json["competitiveAdvantages"].is_array());
        assert!(json.get("timings").is_none());
    }

    #[test]
    fn placeholders_follow_config() {
        let mut config = config();
        config.charts.fill_kpi_placeholders = true;
        let pipeline = Pipeline::new(Arc::new(ScriptedLlmClient::new("{}")), &config);

        let report = pipeline.analyze_sensitive("Revenue grew 12% this year.", None);
        let kpi = report.charts.top_charts.iter().find(|c| c.chart_type == ChartType::Metrics);
        assert_eq!(kpi.map(|c| c.metadata.data_points), Some(4));
    }
}
