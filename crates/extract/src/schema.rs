use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub metadata: TableMetadata,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter_map(move |row| row.get(index).map(String::as_str))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    /// Map the many ways a model spells a direction onto the three we keep.
    pub fn coerce(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "up" | "increase" | "increasing" | "increased" | "growth" | "growing" | "positive"
            | "rising" | "upward" => Some(Trend::Up),
            "down" | "decrease" | "decreasing" | "decreased" | "decline" | "declining"
            | "negative" | "falling" | "downward" => Some(Trend::Down),
            "stable" | "flat" | "steady" | "unchanged" | "neutral" => Some(Trend::Stable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub unit: String,
    /// Always present on the wire; `null` when unknown.
    #[serde(default)]
    pub trend: Option<Trend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub period: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub title: String,
    pub data_points: Vec<DataPoint>,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub category: String,
}

/// Validated output of one request's extraction stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub tables: Vec<Table>,
    pub key_metrics: Vec<Metric>,
    pub time_series_data: Vec<TimeSeries>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.key_metrics.is_empty() && self.time_series_data.is_empty()
    }
}

/// Narrative reading of an analysis: a few strategic observations plus
/// short strength and success-signal labels for the deck's closing slides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicInsights {
    pub insights: Vec<String>,
    pub competitive_advantages: Vec<String>,
    pub success_indicators: Vec<String>,
}

impl StrategicInsights {
    pub fn is_empty(&self) -> bool {
        self.insights.is_empty() && self.competitive_advantages.is_empty() && self.success_indicators.is_empty()
    }
}

// Raw records: whatever the model (or the rule-based fallback) produced,
// coerced to strings but not yet checked. Only the validation agent turns
// these into the types above.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub metadata: TableMetadata,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetric {
    pub name: String,
    pub value: String,
    pub unit: String,
    pub trend: Option<String>,
    pub context: Option<String>,
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataPoint {
    pub period: Option<String>,
    pub value: Option<String>,
}

impl RawDataPoint {
    pub fn new(period: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            period: Some(period.into()),
            value: Some(value.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTimeSeries {
    pub title: String,
    pub data_points: Vec<RawDataPoint>,
    pub unit: String,
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawExtraction {
    pub tables: Vec<RawTable>,
    pub metrics: Vec<RawMetric>,
    pub series: Vec<RawTimeSeries>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_coercion() {
        assert_eq!(Trend::coerce(" Increasing "), Some(Trend::Up));
        assert_eq!(Trend::coerce("DECLINE"), Some(Trend::Down));
        assert_eq!(Trend::coerce("flat"), Some(Trend::Stable));
        assert_eq!(Trend::coerce("sideways-ish"), None);
        assert_eq!(Trend::coerce(""), None);
    }

    #[test]
    fn extraction_result_uses_wire_names() {
        let json = serde_json::to_value(ExtractionResult::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"tables": [], "keyMetrics": [], "timeSeriesData": []})
        );
    }

    #[test]
    fn missing_trend_serializes_as_null() {
        let metric = Metric {
            name: "Growth Rate".into(),
            value: "12".into(),
            unit: "%".into(),
            trend: None,
            context: None,
            category: "Performance".into(),
        };
        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(json.get("trend"), Some(&serde_json::Value::Null));
        assert!(json.get("context").is_none());
        assert_eq!(json["value"], "12");
    }
}
