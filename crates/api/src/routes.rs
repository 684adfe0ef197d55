use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use extract::LlmClient;
use ingest::{Document, FileReader};

use crate::cache::{CacheStats, CachedLlmClient, ResponseCache};
use crate::config::AppConfig;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::pipeline::{AnalysisReport, Pipeline};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub metrics: Arc<Metrics>,
    pub cache: Option<Arc<ResponseCache>>,
}

impl AppState {
    /// Wraps `llm` in the response cache when caching is enabled.
    pub fn new(config: &AppConfig, llm: Arc<dyn LlmClient>) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(ResponseCache::new(config.cache.max_entries)));

        let llm: Arc<dyn LlmClient> = match &cache {
            Some(cache) => Arc::new(CachedLlmClient::new(llm, Arc::clone(cache))),
            None => llm,
        };

        Self {
            pipeline: Arc::new(Pipeline::new(llm, config)),
            metrics: Arc::new(Metrics::new()),
            cache,
        }
    }

    fn finish(&self, report: &AnalysisReport) {
        self.metrics.record_request(true);
        self.metrics
            .record_analysis(&report.timings, report.documents, report.charts.total_charts);
    }

    fn fail(&self, status: StatusCode) -> StatusCode {
        self.metrics.record_request(false);
        status
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/analyze", post(analyze))
        .route("/analyze/path", post(analyze_path))
        .route("/process-sensitive-document", post(process_sensitive))
        .route("/metrics", get(get_metrics))
        .route("/cache/stats", get(cache_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    provider: String,
    chunking: bool,
    cache_entries: Option<usize>,
    timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct DocumentInput {
    name: String,
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    #[serde(default)]
    documents: Vec<DocumentInput>,
    brand: Option<String>,
    use_chunking: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzePathRequest {
    path: String,
    brand: Option<String>,
    use_chunking: Option<bool>,
}

#[derive(Deserialize)]
struct SensitiveRequest {
    text: String,
    brand: Option<String>,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        provider: state.pipeline.backend().to_string(),
        chunking: state.pipeline.chunking_default(),
        cache_entries: state.cache.as_ref().map(|c| c.len()),
        timestamp: Utc::now(),
    })
}

async fn analyze(State(state): State<AppState>, Json(req): Json<AnalyzeRequest>) -> Json<AnalysisReport> {
    let documents: Vec<Document> = req
        .documents
        .into_iter()
        .map(|d| Document::new(d.name, d.text))
        .collect();

    let report = state
        .pipeline
        .analyze(&documents, req.brand.as_deref(), req.use_chunking)
        .await;
    state.finish(&report);
    Json(report)
}

async fn analyze_path(
    State(state): State<AppState>,
    Json(req): Json<AnalyzePathRequest>,
) -> Result<Json<AnalysisReport>, StatusCode> {
    let path = PathBuf::from(&req.path);

    if !path.exists() {
        warn!(path = %req.path, "Path not found");
        return Err(state.fail(StatusCode::NOT_FOUND));
    }
    if path.is_file() && !FileReader::is_supported(&path) {
        warn!(path = %req.path, "Unsupported file type");
        return Err(state.fail(StatusCode::BAD_REQUEST));
    }

    let documents = ingest::load_path(&path).await.map_err(|e| {
        error!(path = %req.path, error = %e, "Failed to load documents");
        state.fail(StatusCode::INTERNAL_SERVER_ERROR)
    })?;
    info!(path = %req.path, documents = documents.len(), "Documents loaded");

    let report = state
        .pipeline
        .analyze(&documents, req.brand.as_deref(), req.use_chunking)
        .await;
    state.finish(&report);
    Ok(Json(report))
}

async fn process_sensitive(
    State(state): State<AppState>,
    Json(req): Json<SensitiveRequest>,
) -> Json<AnalysisReport> {
    state.metrics.record_sensitive();
    let report = state.pipeline.analyze_sensitive(&req.text, req.brand.as_deref());
    state.finish(&report);
    Json(report)
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

async fn cache_stats(State(state): State<AppState>) -> Result<Json<CacheStats>, StatusCode> {
    state
        .cache
        .as_ref()
        .map(|c| Json(c.stats()))
        .ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use extract::ScriptedLlmClient;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_state(client: ScriptedLlmClient, cache: bool) -> AppState {
        let mut config = AppConfig::default();
        config.retry.max_retries = 0;
        config.cache.enabled = cache;
        AppState::new(&config, Arc::new(client))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_backend() {
        let app = create_router(test_state(ScriptedLlmClient::new("{}"), true));
        let response = app.oneshot(get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["provider"], "scripted");
        assert_eq!(body["chunking"], false);
        assert_eq!(body["cacheEntries"], 0);
    }

    #[tokio::test]
    async fn analyze_with_no_documents_returns_empty_deck() {
        let app = create_router(test_state(ScriptedLlmClient::new("{}"), false));
        let response = app.oneshot(post_json("/analyze", json!({"documents": []}))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["charts"]["totalCharts"], 0);
        assert_eq!(body["charts"]["hasMore"], false);
        assert_eq!(body["extraction"]["tables"], json!([]));
        assert_eq!(body["insights"], json!([]));
        assert!(body["requestId"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn analyze_falls_back_when_backend_fails() {
        let client = ScriptedLlmClient::failing(extract::LlmError::NotConfigured("no key".into()));
        let app = create_router(test_state(client, false));
        let body = json!({
            "documents": [{"name": "q3.txt", "text": "Region | Revenue\nEU | 50\nUS | 50\nRevenue grew 12%"}],
            "brand": "Acme"
        });
        let response = app.oneshot(post_json("/analyze", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["charts"]["topCharts"][0]["type"], "pie");
        assert_eq!(body["brand"], "Acme");
        assert!(body["insights"].as_array().is_some_and(|i| !i.is_empty()));
        assert!(body["competitiveAdvantages"].as_array().is_some_and(|a| !a.is_empty()));
        assert!(body["successIndicators"].is_array());
    }

    #[tokio::test]
    async fn analyze_path_status_codes() {
        let dir = tempfile::tempdir().unwrap();
        let unsupported = dir.path().join("deck.pdf");
        std::fs::write(&unsupported, "binary").unwrap();
        let notes = dir.path().join("notes.md");
        std::fs::write(&notes, "Revenue grew 12% across every region this year.").unwrap();

        let state = test_state(ScriptedLlmClient::new("{}"), false);

        let missing = create_router(state.clone())
            .oneshot(post_json("/analyze/path", json!({"path": dir.path().join("nope.txt")})))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let bad = create_router(state.clone())
            .oneshot(post_json("/analyze/path", json!({"path": unsupported})))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let ok = create_router(state.clone())
            .oneshot(post_json("/analyze/path", json!({"path": dir.path()})))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(json_body(ok).await["documents"], 1);

        let snap = state.metrics.snapshot();
        assert_eq!(snap.failed_requests, 2);
        assert_eq!(snap.successful_requests, 1);
    }

    #[tokio::test]
    async fn sensitive_documents_stay_local() {
        let client = Arc::new(ScriptedLlmClient::new("{}"));
        let mut config = AppConfig::default();
        config.cache.enabled = false;
        let state = AppState::new(&config, client.clone());

        let response = create_router(state.clone())
            .oneshot(post_json(
                "/process-sensitive-document",
                json!({"text": "Region | Revenue\nEU | 50\nUS | 50"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["processedLocally"], true);
        assert_eq!(body["charts"]["totalCharts"], 1);
        assert_eq!(client.calls(), 0);
        assert_eq!(state.metrics.snapshot().sensitive_requests, 1);
    }

    #[tokio::test]
    async fn cache_stats_only_when_enabled() {
        let disabled = create_router(test_state(ScriptedLlmClient::new("{}"), false))
            .oneshot(get("/cache/stats"))
            .await
            .unwrap();
        assert_eq!(disabled.status(), StatusCode::NOT_FOUND);

        let enabled = create_router(test_state(ScriptedLlmClient::new("{}"), true))
            .oneshot(get("/cache/stats"))
            .await
            .unwrap();
        assert_eq!(enabled.status(), StatusCode::OK);
        assert_eq!(json_body(enabled).await["maxEntries"], 10000);
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_snapshot() {
        let response = create_router(test_state(ScriptedLlmClient::new("{}"), false))
            .oneshot(get("/metrics"))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["total_requests"], 0);
    }
}
