//! Rule-based extraction used whenever the model cannot be reached, and as
//! the only extractor on the sensitive path. Output is raw records, checked
//! by validation like anything the model returns.

use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::schema::{RawDataPoint, RawExtraction, RawMetric, RawTable, RawTimeSeries};

pub const MAX_METRICS: usize = 8;
const MIN_BLOCK_LINES: usize = 3;
const MIN_SERIES_POINTS: usize = 3;
const MAX_TITLE_LEN: usize = 80;

static SEPARATOR_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:?-{2,}:?$").expect("static regex"));

static CURRENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(annual revenue|total revenue|net revenue|revenue|net profit|profit|earnings|net income|income|market value|valuation|investment|funding|cost savings|expenses|costs)\s*(?:of|was|were|reached|:|-)?\s*([€$£¥])\s?(\d[\d,]*(?:\.\d+)?)\s*(billion|million|thousand|bn|m|b|k)?\b",
    )
    .expect("static regex")
});

static GROWTH_SENTENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(revenue|sales|profit|income|earnings|customers|users|margin)s?\s+(grew|increased|rose|climbed|jumped|declined|decreased|fell|dropped)\s+(?:by\s+)?(\d+(?:\.\d+)?)\s*%",
    )
    .expect("static regex")
});

static PERCENTAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(profit margin|operating margin|gross margin|net margin|market share|retention rate|retention|satisfaction|efficiency|productivity|growth|increase|improvement)\s*(?:of|was|is|at|:|-)?\s*(\d+(?:\.\d+)?)\s*%",
    )
    .expect("static regex")
});

static COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,3}(?:,\d{3})+|\d+)\s+(?:new\s+|active\s+)?(customers|clients|users|employees|staff|locations|offices|stores)\b",
    )
    .expect("static regex")
});

static SERIES_POINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*[-*•]?\s*(?P<period>(?:FY\s?)?'?\d{2,4}\s*Q[1-4]|Q[1-4](?:\s*(?:FY\s?)?'?\d{2,4})?|H[12](?:\s*(?:FY\s?)?\d{4})?|FY\s?'?\d{2,4}|(?:19|20)\d{2}|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?(?:\s+'?\d{2,4})?)\s*[:\-–]\s*(?P<symbol>[€$£¥])?\s?(?P<value>-?\d[\d,]*(?:\.\d+)?)\s*(?P<suffix>%|billion|million|thousand|bn)?",
    )
    .expect("static regex")
});

const FINANCIAL_WORDS: &[&str] = &["revenue", "sales", "profit", "income", "cost", "earnings", "margin"];

/// Run every rule over `text`.
pub fn extract(text: &str) -> RawExtraction {
    RawExtraction {
        tables: tables(text),
        metrics: metrics(text),
        series: time_series(text),
    }
}

fn split_cells(line: &str) -> Option<Vec<String>> {
    let delimiter = if line.contains('|') {
        '|'
    } else if line.contains('\t') {
        '\t'
    } else {
        return None;
    };

    let mut cells: Vec<&str> = line.trim().split(delimiter).map(str::trim).collect();
    // Markdown rows carry a leading and trailing pipe
    if cells.first().is_some_and(|c| c.is_empty()) {
        cells.remove(0);
    }
    if cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }

    (cells.len() >= 2).then(|| cells.into_iter().map(str::to_string).collect())
}

fn is_separator_row(cells: &[String]) -> bool {
    cells.iter().all(|c| SEPARATOR_CELL.is_match(c))
}

/// Pipe- or tab-delimited blocks of at least three lines with a constant
/// cell count. The first line is the header.
pub fn tables(text: &str) -> Vec<RawTable> {
    let mut found = Vec::new();
    let mut block: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        match split_cells(line) {
            Some(cells) if is_separator_row(&cells) => {}
            Some(cells) if block.is_empty() || block[0].len() == cells.len() => block.push(cells),
            Some(cells) => {
                flush_block(&mut block, &mut found);
                block.push(cells);
            }
            None => flush_block(&mut block, &mut found),
        }
    }
    flush_block(&mut block, &mut found);

    found
}

fn flush_block(block: &mut Vec<Vec<String>>, found: &mut Vec<RawTable>) {
    if block.len() >= MIN_BLOCK_LINES {
        let mut lines = std::mem::take(block).into_iter();
        if let Some(headers) = lines.next() {
            let title = format!("{} by {}", headers[1], headers[0]);
            found.push(RawTable {
                title,
                headers,
                rows: lines.collect(),
                metadata: Default::default(),
            });
        }
    }
    block.clear();
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn currency_code(symbol: &str) -> &'static str {
    match symbol {
        "€" => "EUR",
        "£" => "GBP",
        "¥" => "JPY",
        _ => "USD",
    }
}

fn scale_word(suffix: &str) -> Option<&'static str> {
    match suffix.to_ascii_lowercase().as_str() {
        "billion" | "bn" | "b" => Some("billion"),
        "million" | "m" => Some("million"),
        "thousand" | "k" => Some("thousand"),
        _ => None,
    }
}

fn unit_for(symbol: Option<&str>, suffix: Option<&str>) -> String {
    let code = symbol.map(currency_code);
    let scale = suffix.and_then(scale_word);
    match (code, scale) {
        (Some(code), Some(scale)) => format!("{code} {scale}"),
        (Some(code), None) => code.to_string(),
        (None, Some(scale)) => scale.to_string(),
        (None, None) => String::new(),
    }
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map(|m| m.as_str()).unwrap_or("")
}

fn is_falling(verb: &str) -> bool {
    matches!(
        verb.to_ascii_lowercase().as_str(),
        "declined" | "decreased" | "fell" | "dropped"
    )
}

/// Currency amounts, growth sentences, percentages and head counts,
/// deduplicated by name.
pub fn metrics(text: &str) -> Vec<RawMetric> {
    let mut found = Vec::new();

    for caps in CURRENCY.captures_iter(text) {
        let suffix = caps.get(4).map(|m| m.as_str());
        found.push(RawMetric {
            name: title_case(group(&caps, 1)),
            value: group(&caps, 3).replace(',', ""),
            unit: unit_for(Some(group(&caps, 2)), suffix),
            trend: None,
            context: Some(group(&caps, 0).trim().to_string()),
            category: "Financial".to_string(),
        });
    }

    for caps in GROWTH_SENTENCE.captures_iter(text) {
        let subject = group(&caps, 1).to_ascii_lowercase();
        let name = match subject.as_str() {
            "revenue" | "sales" => "Growth Rate".to_string(),
            other => format!("{} Growth", title_case(other)),
        };
        let trend = if is_falling(group(&caps, 2)) { "down" } else { "up" };
        found.push(RawMetric {
            name,
            value: group(&caps, 3).to_string(),
            unit: "%".to_string(),
            trend: Some(trend.to_string()),
            context: Some(group(&caps, 0).trim().to_string()),
            category: "Performance".to_string(),
        });
    }

    for caps in PERCENTAGE.captures_iter(text) {
        let label = group(&caps, 1).to_ascii_lowercase();
        let category = if label.contains("margin") {
            "Financial"
        } else if label.contains("share") {
            "Market"
        } else {
            "Performance"
        };
        found.push(RawMetric {
            name: title_case(&label),
            value: group(&caps, 2).to_string(),
            unit: "%".to_string(),
            trend: None,
            context: Some(group(&caps, 0).trim().to_string()),
            category: category.to_string(),
        });
    }

    for caps in COUNT.captures_iter(text) {
        found.push(RawMetric {
            name: format!("Total {}", title_case(group(&caps, 2))),
            value: group(&caps, 1).replace(',', ""),
            unit: "count".to_string(),
            trend: None,
            context: Some(group(&caps, 0).trim().to_string()),
            category: "Operational".to_string(),
        });
    }

    let mut seen = HashSet::new();
    found.retain(|m| seen.insert(m.name.to_lowercase()));
    found.truncate(MAX_METRICS);
    found
}

fn series_title(previous: Option<&str>) -> String {
    previous
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && line.len() <= MAX_TITLE_LEN
                && !line.contains('|')
                && !SERIES_POINT.is_match(line)
        })
        .map(|line| line.trim_end_matches(':').trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Performance Over Time".to_string())
}

/// Runs of at least three consecutive "period: value" lines. Each run is
/// titled by the short line just above it, when there is one.
pub fn time_series(text: &str) -> Vec<RawTimeSeries> {
    let lines: Vec<&str> = text.lines().collect();
    let mut found = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let start = i;
        let mut points = Vec::new();
        let mut unit = None;

        while let Some(caps) = lines.get(i).and_then(|l| SERIES_POINT.captures(l)) {
            let symbol = caps.name("symbol").map(|m| m.as_str());
            let suffix = caps.name("suffix").map(|m| m.as_str());
            if unit.is_none() {
                unit = Some(if suffix == Some("%") {
                    "%".to_string()
                } else {
                    unit_for(symbol, suffix)
                });
            }
            points.push(RawDataPoint::new(
                caps["period"].trim(),
                caps["value"].replace(',', ""),
            ));
            i += 1;
        }

        if points.len() >= MIN_SERIES_POINTS {
            let title = series_title(start.checked_sub(1).and_then(|p| lines.get(p)).copied());
            let lowered = title.to_lowercase();
            let category = if FINANCIAL_WORDS.iter().any(|w| lowered.contains(w)) {
                "Financial"
            } else {
                "Performance"
            };
            found.push(RawTimeSeries {
                title,
                data_points: points,
                unit: unit.unwrap_or_default(),
                category: category.to_string(),
            });
        }

        if i == start {
            i += 1;
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = "Region | Revenue\nEU | 50\nUS | 50\nRevenue grew 12%";

    #[test]
    fn pipe_block_becomes_titled_table() {
        let tables = tables(SCENARIO);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].title, "Revenue by Region");
        assert_eq!(tables[0].headers, vec!["Region", "Revenue"]);
        assert_eq!(tables[0].rows, vec![vec!["EU", "50"], vec!["US", "50"]]);
    }

    #[test]
    fn markdown_tables_skip_separator_rows() {
        let text = "| Segment | Share |\n|---|:---:|\n| SMB | 40 |\n| Enterprise | 60 |\n";
        let tables = tables(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].headers, vec!["Segment", "Share"]);
        assert_eq!(tables[0].rows.len(), 2);
    }

    #[test]
    fn short_blocks_are_not_tables() {
        assert!(tables("a | b\n1 | 2\n\nplain prose").is_empty());
    }

    #[test]
    fn growth_sentence_is_the_only_metric_in_scenario() {
        let metrics = metrics(SCENARIO);
        assert_eq!(metrics.len(), 1);
        let m = &metrics[0];
        assert_eq!(m.name, "Growth Rate");
        assert_eq!(m.value, "12");
        assert_eq!(m.unit, "%");
        assert_eq!(m.trend.as_deref(), Some("up"));
        assert_eq!(m.category, "Performance");
    }

    #[test]
    fn currency_and_counts() {
        let text = "Total revenue of $4.5 million this year. We now serve 1,200 customers \
                    with 85 employees. Market share: 23%.";
        let metrics = metrics(text);

        let revenue = metrics.iter().find(|m| m.name == "Total Revenue").unwrap();
        assert_eq!(revenue.value, "4.5");
        assert_eq!(revenue.unit, "USD million");

        let customers = metrics.iter().find(|m| m.name == "Total Customers").unwrap();
        assert_eq!(customers.value, "1200");

        let share = metrics.iter().find(|m| m.name == "Market Share").unwrap();
        assert_eq!(share.value, "23");
        assert_eq!(share.category, "Market");
    }

    #[test]
    fn metrics_are_deduplicated_and_capped() {
        let text = "Revenue grew 5%. Sales grew 7%. ".repeat(3)
            + "10 customers, 20 clients, 30 users, 40 employees, 50 staff, 60 locations, \
               70 offices, 80 stores. Growth of 9%. Efficiency: 4%.";
        let metrics = metrics(&text);
        assert_eq!(metrics.len(), MAX_METRICS);
        assert_eq!(metrics.iter().filter(|m| m.name == "Growth Rate").count(), 1);
        assert_eq!(metrics[0].value, "5");
    }

    #[test]
    fn falling_verbs_trend_down() {
        let metrics = metrics("Profit declined by 3.5% in Q2.");
        assert_eq!(metrics[0].name, "Profit Growth");
        assert_eq!(metrics[0].trend.as_deref(), Some("down"));
    }

    #[test]
    fn period_runs_become_series() {
        let text = "Quarterly Revenue:\nQ1 2024: $10\nQ2 2024: $12\nQ3 2024: $15\n\nNotes follow.";
        let series = time_series(text);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].title, "Quarterly Revenue");
        assert_eq!(series[0].unit, "USD");
        assert_eq!(series[0].category, "Financial");
        assert_eq!(series[0].data_points[2], RawDataPoint::new("Q3 2024", "15"));
    }

    #[test]
    fn untitled_runs_get_default_title() {
        let text = "2021: 100\n2022: 120\n2023: 150";
        let series = time_series(text);
        assert_eq!(series[0].title, "Performance Over Time");
        assert_eq!(series[0].category, "Performance");
    }

    #[test]
    fn two_points_or_pipes_are_not_series() {
        assert!(time_series("Q1: 10\nQ2: 12\nsomething else").is_empty());
        assert!(time_series("Q1 | 10\nQ2 | 12\nQ3 | 14").is_empty());
    }

    proptest::proptest! {
        #[test]
        fn rule_tables_are_rectangular(text in "[a-zA-Z0-9 |:\t\n%$.-]{0,400}") {
            for table in tables(&text) {
                proptest::prop_assert!(table.rows.len() >= 2);
                for row in &table.rows {
                    proptest::prop_assert_eq!(row.len(), table.headers.len());
                }
            }
            proptest::prop_assert!(metrics(&text).len() <= MAX_METRICS);
            for series in time_series(&text) {
                proptest::prop_assert!(series.data_points.len() >= MIN_SERIES_POINTS);
            }
        }
    }
}
