//! Which chart a table becomes.

use extract::Table;

use crate::numeric::{is_percentage, parse_all};
use crate::types::ChartType;

pub const MAX_PIE_SLICES: usize = 8;
const PIE_SUM_RANGE: std::ops::RangeInclusive<f64> = 95.0..=105.0;
const DISTRIBUTION_WORDS: &[&str] = &["distribution", "share", "segment", "region", "category", "breakdown"];

/// Column indices (after the label column) in which every cell is numeric.
pub fn numeric_columns(table: &Table) -> Vec<usize> {
    (1..table.column_count())
        .filter(|&i| parse_all(table.column(i)).is_some())
        .collect()
}

fn mentions_distribution(table: &Table) -> bool {
    std::iter::once(table.title.as_str())
        .chain(table.headers.iter().map(String::as_str))
        .any(|text| {
            let lowered = text.to_lowercase();
            DISTRIBUTION_WORDS.iter().any(|w| lowered.contains(w))
        })
}

/// A two-column table with a numeric value column and few rows is a pie
/// when its values look like parts of a whole: they sum to about 100, they
/// are all percentages, or the table talks about shares or segments.
pub fn is_pie_candidate(table: &Table) -> bool {
    if table.column_count() != 2 || table.rows.len() > MAX_PIE_SLICES {
        return false;
    }
    let Some(values) = parse_all(table.column(1)) else {
        return false;
    };

    let sums_to_whole = PIE_SUM_RANGE.contains(&values.iter().sum::<f64>());
    let all_percentages = table.column(1).all(is_percentage)
        && values.iter().all(|v| (0.0..=100.0).contains(v));

    sums_to_whole || all_percentages || mentions_distribution(table)
}

/// Pie for part-of-whole tables, bar for everything else, including
/// tables with no numeric column (shown as a plain table).
pub fn table_chart_type(table: &Table) -> ChartType {
    if is_pie_candidate(table) {
        ChartType::Pie
    } else {
        ChartType::Bar
    }
}
