//! Importance scores and category labels. Scores only order charts for
//! display; they carry no other meaning.

use crate::types::ChartType;

pub const MAX_IMPORTANCE: u32 = 100;

const FINANCIAL_WORDS: &[&str] = &[
    "revenue", "profit", "income", "sales", "earnings", "margin", "cost", "ebitda", "cash",
    "financial", "budget", "expense", "arr",
];
const COMPETITIVE_WORDS: &[&str] = &["market share", "competitor", "competitive", "competition", "share", "market"];
const PERFORMANCE_WORDS: &[&str] = &[
    "growth", "performance", "kpi", "increase", "improvement", "efficiency", "conversion", "retention",
];

fn matches(title: &str, words: &[&str]) -> bool {
    let lowered = title.to_lowercase();
    words.iter().any(|w| {
        lowered
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token == *w)
            || (w.contains(' ') && lowered.contains(w))
    })
}

pub fn is_financial(title: &str) -> bool {
    matches(title, FINANCIAL_WORDS)
}

pub fn is_competitive(title: &str) -> bool {
    matches(title, COMPETITIVE_WORDS)
}

pub fn is_performance(title: &str) -> bool {
    matches(title, PERFORMANCE_WORDS)
}

pub fn table_importance(title: &str, rows: usize, columns: usize, chart_type: ChartType) -> u32 {
    let mut score = 0;
    if is_financial(title) {
        score += 40;
    }
    if is_competitive(title) {
        score += 35;
    }
    if is_performance(title) {
        score += 30;
    }
    score += (rows.saturating_mul(columns)).min(20) as u32;
    score += match chart_type {
        ChartType::Pie => 20,
        ChartType::Bar => 15,
        ChartType::Metrics | ChartType::Line => 0,
    };
    score.min(MAX_IMPORTANCE)
}

pub fn series_importance(title: &str, points: usize) -> u32 {
    let mut score = 40 + (points.saturating_mul(5)).min(30) as u32;
    if is_financial(title) {
        score += 25;
    }
    score.min(MAX_IMPORTANCE)
}

pub fn metrics_importance(cards: usize) -> u32 {
    (50 + (cards.saturating_mul(5)).min(50) as u32).min(MAX_IMPORTANCE)
}

/// Category of a table chart, from its title.
pub fn table_category(title: &str) -> &'static str {
    if is_financial(title) {
        "financial"
    } else if is_competitive(title) {
        "market"
    } else if is_performance(title) {
        "performance"
    } else {
        "general"
    }
}

pub const TRENDS_CATEGORY: &str = "trends";
pub const KPI_CATEGORY: &str = "kpi";
