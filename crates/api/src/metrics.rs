use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,
    sensitive_requests: AtomicUsize,

    // Timing (in microseconds)
    total_extract_time_us: AtomicU64,
    total_chart_time_us: AtomicU64,
    total_summary_time_us: AtomicU64,
    total_insights_time_us: AtomicU64,

    // Counts
    total_documents_processed: AtomicUsize,
    total_charts_built: AtomicUsize,
    analyses: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_sensitive(&self) {
        self.sensitive_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_analysis(&self, timings: &StageTimings, documents: usize, charts: usize) {
        self.analyses.fetch_add(1, Ordering::Relaxed);
        self.total_extract_time_us.fetch_add(micros(timings.extract), Ordering::Relaxed);
        self.total_chart_time_us.fetch_add(micros(timings.charts), Ordering::Relaxed);
        self.total_summary_time_us.fetch_add(micros(timings.summary), Ordering::Relaxed);
        self.total_insights_time_us.fetch_add(micros(timings.insights), Ordering::Relaxed);
        self.total_documents_processed.fetch_add(documents, Ordering::Relaxed);
        self.total_charts_built.fetch_add(charts, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let analyses = self.analyses.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            sensitive_requests: self.sensitive_requests.load(Ordering::Relaxed),
            avg_extract_time_ms: avg_time_ms(&self.total_extract_time_us, analyses),
            avg_chart_time_ms: avg_time_ms(&self.total_chart_time_us, analyses),
            avg_summary_time_ms: avg_time_ms(&self.total_summary_time_us, analyses),
            avg_insights_time_ms: avg_time_ms(&self.total_insights_time_us, analyses),
            total_documents_processed: self.total_documents_processed.load(Ordering::Relaxed),
            total_charts_built: self.total_charts_built.load(Ordering::Relaxed),
        }
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

fn avg_time_ms(total_us: &AtomicU64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    total_us.load(Ordering::Relaxed) as f64 / count as f64 / 1000.0
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub sensitive_requests: usize,
    pub avg_extract_time_ms: f64,
    pub avg_chart_time_ms: f64,
    pub avg_summary_time_ms: f64,
    pub avg_insights_time_ms: f64,
    pub total_documents_processed: usize,
    pub total_charts_built: usize,
}

/// Wall-clock time spent in each pipeline stage of one analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimings {
    pub extract: Duration,
    pub charts: Duration,
    pub summary: Duration,
    pub insights: Duration,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
