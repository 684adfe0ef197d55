pub mod kpi;
pub mod numeric;
pub mod rank;
pub mod scoring;
pub mod selection;
pub mod style;
pub mod types;

pub use kpi::{AdditionalKpiSource, PlaceholderKpiSource};
pub use rank::{DEFAULT_TOP_N, rank};
pub use style::BrandStyle;
pub use types::{ChartConfig, ChartData, ChartMetadata, ChartOptions, ChartSet, ChartSource, ChartType, Dataset, KpiCard};

use extract::{ExtractionResult, Metric, Table, TimeSeries};
use tracing::{debug, info};

use numeric::{parse_all, parse_number};

/// Maps a validated extraction onto chart configs. Deterministic; inputs
/// that cannot be charted are skipped.
pub struct ChartBuilder {
    style: BrandStyle,
    max_kpi_cards: usize,
    kpi_source: Option<Box<dyn AdditionalKpiSource>>,
}

impl ChartBuilder {
    pub fn new(style: BrandStyle) -> Self {
        Self {
            style,
            max_kpi_cards: kpi::DEFAULT_MAX_CARDS,
            kpi_source: None,
        }
    }

    pub fn with_max_kpi_cards(mut self, max_kpi_cards: usize) -> Self {
        self.max_kpi_cards = max_kpi_cards;
        self
    }

    pub fn with_kpi_source(mut self, source: Box<dyn AdditionalKpiSource>) -> Self {
        self.kpi_source = Some(source);
        self
    }

    pub fn build(&self, extraction: &ExtractionResult) -> Vec<ChartConfig> {
        let mut charts = Vec::new();

        for (i, table) in extraction.tables.iter().enumerate() {
            match self.table_chart(i, table) {
                Some(chart) => charts.push(chart),
                None => debug!(title = %table.title, "Table skipped"),
            }
        }

        for (i, series) in extraction.time_series_data.iter().enumerate() {
            match self.series_chart(i, series) {
                Some(chart) => charts.push(chart),
                None => debug!(title = %series.title, "Series has no numeric values, skipped"),
            }
        }

        if let Some(chart) = self.metrics_chart(&extraction.key_metrics) {
            charts.push(chart);
        }

        info!(
            tables = extraction.tables.len(),
            series = extraction.time_series_data.len(),
            metrics = extraction.key_metrics.len(),
            charts = charts.len(),
            "Charts built"
        );
        charts
    }

    /// Build and rank in one step.
    pub fn build_set(&self, extraction: &ExtractionResult, top_n: usize) -> ChartSet {
        rank(self.build(extraction), top_n)
    }

    fn options(&self, show_legend: bool, unit: Option<String>) -> ChartOptions {
        ChartOptions {
            responsive: true,
            show_legend,
            brand: self.style.name.clone(),
            palette: self.style.palette.clone(),
            unit: unit.filter(|u| !u.is_empty()),
        }
    }

    fn table_chart(&self, index: usize, table: &Table) -> Option<ChartConfig> {
        if table.column_count() < 2 || table.rows.is_empty() {
            return None;
        }

        let chart_type = selection::table_chart_type(table);
        let numeric = selection::numeric_columns(table);
        let labels: Vec<String> = table.column(0).map(str::to_string).collect();

        let data = match chart_type {
            ChartType::Pie => {
                let values = parse_all(table.column(1))?;
                ChartData::Plot {
                    datasets: vec![Dataset {
                        label: table.headers[1].clone(),
                        background_color: self.style.colors(values.len()),
                        data: values,
                    }],
                    labels,
                }
            }
            _ if numeric.is_empty() => ChartData::Tabular {
                headers: table.headers.clone(),
                rows: table.rows.clone(),
            },
            _ => ChartData::Plot {
                datasets: numeric
                    .iter()
                    .enumerate()
                    .filter_map(|(n, &col)| {
                        Some(Dataset {
                            label: table.headers[col].clone(),
                            data: parse_all(table.column(col))?,
                            background_color: vec![self.style.color(n)],
                        })
                    })
                    .collect(),
                labels,
            },
        };

        Some(ChartConfig {
            id: format!("table-{index}"),
            chart_type,
            title: table.title.clone(),
            importance: scoring::table_importance(
                &table.title,
                table.rows.len(),
                table.column_count(),
                chart_type,
            ),
            options: self.options(chart_type == ChartType::Pie || numeric.len() > 1, table.metadata.unit.clone()),
            metadata: ChartMetadata {
                source: ChartSource::Table,
                category: scoring::table_category(&table.title).to_string(),
                data_points: table.rows.len(),
                period: table.metadata.period.clone(),
            },
            data,
        })
    }

    /// Time series are always bars. Points whose value is not a number are
    /// left out; a series with none left is skipped.
    fn series_chart(&self, index: usize, series: &TimeSeries) -> Option<ChartConfig> {
        let (labels, values): (Vec<String>, Vec<f64>) = series
            .data_points
            .iter()
            .filter_map(|p| Some((p.period.clone(), parse_number(&p.value)?)))
            .unzip();

        if values.is_empty() {
            return None;
        }

        let points = values.len();
        Some(ChartConfig {
            id: format!("series-{index}"),
            chart_type: ChartType::Bar,
            title: series.title.clone(),
            data: ChartData::Plot {
                labels,
                datasets: vec![Dataset {
                    label: series.title.clone(),
                    data: values,
                    background_color: vec![self.style.color(0)],
                }],
            },
            options: self.options(false, Some(series.unit.clone())),
            importance: scoring::series_importance(&series.title, points),
            metadata: ChartMetadata {
                source: ChartSource::TimeSeries,
                category: scoring::TRENDS_CATEGORY.to_string(),
                data_points: points,
                period: None,
            },
        })
    }

    fn metrics_chart(&self, metrics: &[Metric]) -> Option<ChartConfig> {
        let cards = kpi::build_cards(metrics, self.max_kpi_cards, self.kpi_source.as_deref());
        if cards.is_empty() {
            return None;
        }

        let count = cards.len();
        Some(ChartConfig {
            id: "metrics".to_string(),
            chart_type: ChartType::Metrics,
            title: "Key Metrics".to_string(),
            data: ChartData::Cards { cards },
            options: self.options(false, None),
            importance: scoring::metrics_importance(count),
            metadata: ChartMetadata {
                source: ChartSource::Metrics,
                category: scoring::KPI_CATEGORY.to_string(),
                data_points: count,
                period: None,
            },
        })
    }
}

impl Default for ChartBuilder {
    fn default() -> Self {
        Self::new(BrandStyle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{DataPoint, TableMetadata, Trend};

    fn table(title: &str, headers: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            metadata: TableMetadata::default(),
        }
    }

    fn growth_metric() -> Metric {
        Metric {
            name: "Growth Rate".into(),
            value: "12".into(),
            unit: "%".into(),
            trend: Some(Trend::Up),
            context: None,
            category: "Performance".into(),
        }
    }

    #[test]
    fn scenario_yields_pie_and_kpi_card() {
        let extraction = ExtractionResult {
            tables: vec![table("Revenue by Region", &["Region", "Revenue"], &[&["EU", "50"], &["US", "50"]])],
            key_metrics: vec![growth_metric()],
            time_series_data: vec![],
        };

        let charts = ChartBuilder::new(BrandStyle::for_brand(Some("Acme"))).build(&extraction);
        assert_eq!(charts.len(), 2);

        let pie = &charts[0];
        assert_eq!(pie.chart_type, ChartType::Pie);
        assert_eq!(pie.importance, 64);
        assert_eq!(pie.metadata.category, "financial");
        assert_eq!(pie.options.brand.as_deref(), Some("Acme"));

        let kpi = &charts[1];
        assert_eq!(kpi.chart_type, ChartType::Metrics);
        match &kpi.data {
            ChartData::Cards { cards } => {
                assert_eq!(cards.len(), 1);
                assert_eq!(cards[0].value, "12");
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[test]
    fn multi_column_tables_get_one_dataset_per_numeric_column() {
        let extraction = ExtractionResult {
            tables: vec![table(
                "Sales by Quarter",
                &["Quarter", "Online", "Retail", "Notes"],
                &[&["Q1", "10", "$5", "slow"], &["Q2", "12", "$7", "better"]],
            )],
            ..Default::default()
        };
        let charts = ChartBuilder::default().build(&extraction);

        assert_eq!(charts[0].chart_type, ChartType::Bar);
        match &charts[0].data {
            ChartData::Plot { labels, datasets } => {
                assert_eq!(labels, &vec!["Q1".to_string(), "Q2".to_string()]);
                assert_eq!(datasets.len(), 2);
                assert_eq!(datasets[1].data, vec![5.0, 7.0]);
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[test]
    fn text_tables_are_tabular_bars() {
        let extraction = ExtractionResult {
            tables: vec![table("Competitors", &["Vendor", "Strength"], &[&["A", "price"], &["B", "reach"]])],
            ..Default::default()
        };
        let charts = ChartBuilder::default().build(&extraction);
        assert_eq!(charts[0].chart_type, ChartType::Bar);
        assert!(matches!(charts[0].data, ChartData::Tabular { .. }));
    }

    #[test]
    fn series_are_bars_and_non_numeric_series_are_skipped() {
        let point = |p: &str, v: &str| DataPoint { period: p.into(), value: v.into() };
        let extraction = ExtractionResult {
            time_series_data: vec![
                TimeSeries {
                    title: "Quarterly Revenue".into(),
                    data_points: vec![point("Q1", "10"), point("Q2", "n/a"), point("Q3", "15")],
                    unit: "USD".into(),
                    category: "Financial".into(),
                },
                TimeSeries {
                    title: "Sentiment".into(),
                    data_points: vec![point("Q1", "good"), point("Q2", "better"), point("Q3", "best")],
                    unit: String::new(),
                    category: String::new(),
                },
            ],
            ..Default::default()
        };
        let charts = ChartBuilder::default().build(&extraction);

        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].chart_type, ChartType::Bar);
        assert_eq!(charts[0].metadata.data_points, 2);
        assert_eq!(charts[0].metadata.category, "trends");
        assert_eq!(charts[0].importance, 40 + 10 + 25);
    }

    #[test]
    fn placeholders_only_when_enabled() {
        let extraction = ExtractionResult {
            key_metrics: vec![growth_metric()],
            ..Default::default()
        };
        let filled = ChartBuilder::default()
            .with_kpi_source(Box::new(PlaceholderKpiSource))
            .build(&extraction);
        assert_eq!(filled[0].metadata.data_points, 4);

        let json = serde_json::to_value(&filled[0]).unwrap();
        assert_eq!(json["data"]["cards"][3]["trend"], serde_json::Value::Null);
        assert_eq!(json["data"]["cards"][3]["placeholder"], true);
    }

    #[test]
    fn empty_extraction_yields_empty_set() {
        let set = ChartBuilder::default().build_set(&ExtractionResult::default(), DEFAULT_TOP_N);
        assert_eq!(set, ChartSet::default());

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["totalCharts"], 0);
        assert_eq!(json["hasMore"], false);
        assert_eq!(json["topCharts"], serde_json::json!([]));
    }

    #[test]
    fn chart_config_serializes_type_field() {
        let extraction = ExtractionResult {
            key_metrics: vec![growth_metric()],
            ..Default::default()
        };
        let charts = ChartBuilder::default().build(&extraction);
        let json = serde_json::to_value(&charts[0]).unwrap();
        assert_eq!(json["type"], "metrics");
        assert_eq!(json["data"]["cards"][0]["trend"], "up");
    }
}
