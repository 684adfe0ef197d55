use extract::Trend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Pie,
    /// KPI cards, not a plotted chart
    Metrics,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartSource {
    Table,
    TimeSeries,
    Metrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    pub background_color: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiCard {
    pub name: String,
    pub value: String,
    pub unit: String,
    #[serde(default)]
    pub trend: Option<Trend>,
    pub category: String,
    /// Filler entry, not taken from the document.
    #[serde(default)]
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartData {
    Plot {
        labels: Vec<String>,
        datasets: Vec<Dataset>,
    },
    /// A table with nothing to plot, shown as-is.
    Tabular {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Cards {
        cards: Vec<KpiCard>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub responsive: bool,
    pub show_legend: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub palette: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub source: ChartSource,
    pub category: String,
    /// Rows, points or cards behind the chart.
    pub data_points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub title: String,
    pub data: ChartData,
    pub options: ChartOptions,
    pub importance: u32,
    pub metadata: ChartMetadata,
}

/// Ranked charts as returned to clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSet {
    pub top_charts: Vec<ChartConfig>,
    pub additional_charts: Vec<ChartConfig>,
    pub total_charts: usize,
    pub has_more: bool,
    pub charts_by_category: BTreeMap<String, Vec<ChartConfig>>,
}
