use std::collections::BTreeMap;

use crate::types::{ChartConfig, ChartSet};

pub const DEFAULT_TOP_N: usize = 5;

/// Order charts by importance, highest first, and split off the top `top_n`.
/// The sort is stable: charts with equal importance keep their input order.
pub fn rank(mut charts: Vec<ChartConfig>, top_n: usize) -> ChartSet {
    charts.sort_by(|a, b| b.importance.cmp(&a.importance));

    let mut charts_by_category: BTreeMap<String, Vec<ChartConfig>> = BTreeMap::new();
    for chart in &charts {
        charts_by_category
            .entry(chart.metadata.category.clone())
            .or_default()
            .push(chart.clone());
    }

    let total_charts = charts.len();
    let additional_charts = charts.split_off(top_n.min(total_charts));

    ChartSet {
        has_more: !additional_charts.is_empty(),
        top_charts: charts,
        additional_charts,
        total_charts,
        charts_by_category,
    }
}
