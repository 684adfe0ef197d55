use tracing::info;

use crate::schema::{
    DataPoint, ExtractionResult, Metric, RawExtraction, RawMetric, RawTable, RawTimeSeries,
    Table, TableMetadata, TimeSeries, Trend,
};

/// Values a model writes when it has nothing to report.
const SENTINELS: &[&str] = &["n/a", "tbd", "null"];

const MIN_SERIES_POINTS: usize = 3;
const MIN_SENSITIVE_SERIES_POINTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationProfile {
    /// Series must be complete with at least three points.
    Standard,
    /// Rule-based input: incomplete points are dropped, two must remain.
    Sensitive,
}

pub fn validate(raw: RawExtraction, profile: ValidationProfile) -> ExtractionResult {
    let (raw_tables, raw_metrics, raw_series) = (raw.tables.len(), raw.metrics.len(), raw.series.len());

    let result = ExtractionResult {
        tables: raw.tables.into_iter().filter_map(validate_table).collect(),
        key_metrics: raw.metrics.into_iter().filter_map(validate_metric).collect(),
        time_series_data: raw
            .series
            .into_iter()
            .filter_map(|s| validate_series(s, profile))
            .collect(),
    };

    info!(
        ?profile,
        tables = result.tables.len(),
        tables_dropped = raw_tables - result.tables.len(),
        metrics = result.key_metrics.len(),
        metrics_dropped = raw_metrics - result.key_metrics.len(),
        series = result.time_series_data.len(),
        series_dropped = raw_series - result.time_series_data.len(),
        "Validation complete"
    );

    result
}

fn trimmed(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn validate_table(raw: RawTable) -> Option<Table> {
    let title = raw.title.trim().to_string();
    let headers: Vec<String> = raw.headers.iter().map(|h| h.trim().to_string()).collect();

    if title.is_empty() || headers.len() < 2 || raw.rows.len() < 2 {
        return None;
    }
    if raw.rows.iter().any(|row| row.len() != headers.len()) {
        return None;
    }

    let rows: Vec<Vec<String>> = raw
        .rows
        .into_iter()
        .map(|row| row.into_iter().map(|c| c.trim().to_string()).collect())
        .collect();

    Some(Table {
        title,
        headers,
        rows,
        metadata: TableMetadata {
            source: trimmed(raw.metadata.source),
            period: trimmed(raw.metadata.period),
            unit: trimmed(raw.metadata.unit),
        },
    })
}

pub fn is_sentinel(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || SENTINELS.iter().any(|s| v.eq_ignore_ascii_case(s))
}

pub fn validate_metric(raw: RawMetric) -> Option<Metric> {
    let name = raw.name.trim().to_string();
    if name.is_empty() || is_sentinel(&raw.value) {
        return None;
    }

    let category = match raw.category.trim() {
        "" => "General".to_string(),
        c => c.to_string(),
    };

    Some(Metric {
        name,
        value: raw.value.trim().to_string(),
        unit: raw.unit.trim().to_string(),
        trend: raw.trend.as_deref().and_then(Trend::coerce),
        context: trimmed(raw.context),
        category,
    })
}

pub fn validate_series(raw: RawTimeSeries, profile: ValidationProfile) -> Option<TimeSeries> {
    let title = raw.title.trim().to_string();
    if title.is_empty() {
        return None;
    }

    let total = raw.data_points.len();
    let points: Vec<DataPoint> = raw
        .data_points
        .into_iter()
        .filter_map(|p| {
            let period = trimmed(p.period)?;
            let value = trimmed(p.value)?;
            Some(DataPoint { period, value })
        })
        .collect();

    let keep = match profile {
        ValidationProfile::Standard => points.len() == total && points.len() >= MIN_SERIES_POINTS,
        ValidationProfile::Sensitive => points.len() >= MIN_SENSITIVE_SERIES_POINTS,
    };
    if !keep {
        return None;
    }

    Some(TimeSeries {
        title,
        data_points: points,
        unit: raw.unit.trim().to_string(),
        category: raw.category.trim().to_string(),
    })
}
