//! Prompt templates for the extraction agents. Each template opens with a
//! `TASK:` heading that names the agent; the heading is the only part of a
//! prompt that differs in kind between agents.

use ingest::{ChunkContext, DocumentType};

use crate::schema::Metric;

pub const TABLE_TASK: &str = "TASK: TABLE EXTRACTION";
pub const METRIC_TASK: &str = "TASK: METRIC EXTRACTION";
pub const TIME_SERIES_TASK: &str = "TASK: TIME SERIES EXTRACTION";
pub const SUMMARY_TASK: &str = "TASK: EXECUTIVE SUMMARY";
pub const INSIGHTS_TASK: &str = "TASK: STRATEGIC INSIGHTS";

/// Where in the document a prompt's text comes from.
#[derive(Debug, Clone, Copy)]
pub enum Scope {
    Document,
    Chunk {
        index: usize,
        total: usize,
        doc_type: DocumentType,
        has_financial_data: bool,
    },
}

impl Scope {
    pub fn for_chunk(index: usize, context: &ChunkContext) -> Self {
        Scope::Chunk {
            index,
            total: context.total_chunks,
            doc_type: context.doc_type,
            has_financial_data: context.has_financial_data,
        }
    }

    fn hint(self) -> String {
        match self {
            Scope::Document => "The text below is the complete document.".to_string(),
            Scope::Chunk {
                index,
                total,
                doc_type,
                has_financial_data,
            } => {
                let mut hint = format!(
                    "The text below is part {} of {} of a longer {} document. Extract only what appears in this part.",
                    index + 1,
                    total,
                    doc_type.label()
                );
                if has_financial_data {
                    hint.push_str(" This part contains financial figures.");
                }
                hint
            }
        }
    }
}

fn brand_line(brand: Option<&str>) -> String {
    match brand {
        Some(b) if !b.trim().is_empty() => format!(
            "The data will be presented in a sales deck for {}. Prefer data that supports that story.",
            b.trim()
        ),
        _ => "The data will be presented in a sales deck.".to_string(),
    }
}

pub fn build_table_prompt(text: &str, brand: Option<&str>, scope: Scope) -> String {
    format!(
        r#"{TABLE_TASK}
{}
{}

INSTRUCTIONS:
1. Find every table or tabular block of business data (financials, market share, regional splits, comparisons)
2. Keep every cell exactly as written; do not compute or invent values
3. Every row must have the same number of cells as the header row
4. Skip tables with fewer than 2 columns or fewer than 2 data rows
5. Output ONLY valid JSON, nothing else

SCHEMA:
{{
  "tables": [
    {{"title": "Revenue by Region", "headers": ["Region", "Revenue"], "rows": [["EU", "50"], ["US", "50"]],
      "metadata": {{"source": "optional", "period": "optional", "unit": "optional"}}}}
  ]
}}

If there are no tables, output {{"tables": []}}.

TEXT:
{}

JSON OUTPUT:"#,
        scope.hint(),
        brand_line(brand),
        text
    )
}

pub fn build_metric_prompt(text: &str, brand: Option<&str>, scope: Scope) -> String {
    format!(
        r#"{METRIC_TASK}
{}
{}

INSTRUCTIONS:
1. Find headline business metrics: revenue, profit, margins, growth rates, market share, customer and employee counts
2. "value" holds the number only; put currency, "%" or scale words in "unit"
3. "trend" is one of "up", "down", "stable", or omitted when the text does not say
4. "category" is one of "Financial", "Performance", "Market", "Operational"
5. Never output placeholder values such as "N/A" or "TBD"
6. Output ONLY valid JSON, nothing else

SCHEMA:
{{
  "keyMetrics": [
    {{"name": "Growth Rate", "value": "12", "unit": "%", "trend": "up", "context": "Revenue grew 12%", "category": "Performance"}}
  ]
}}

If there are no metrics, output {{"keyMetrics": []}}.

TEXT:
{}

JSON OUTPUT:"#,
        scope.hint(),
        brand_line(brand),
        text
    )
}

pub fn build_time_series_prompt(text: &str, brand: Option<&str>, scope: Scope) -> String {
    format!(
        r#"{TIME_SERIES_TASK}
{}
{}

INSTRUCTIONS:
1. Find values reported over consecutive periods (quarters, months, fiscal years)
2. One series per measured quantity, periods in the order they appear
3. Include a series only when it has at least 3 periods, each with a value
4. Output ONLY valid JSON, nothing else

SCHEMA:
{{
  "timeSeriesData": [
    {{"title": "Quarterly Revenue", "dataPoints": [{{"period": "Q1 2024", "value": "10"}}, {{"period": "Q2 2024", "value": "12"}}, {{"period": "Q3 2024", "value": "15"}}],
      "unit": "USD million", "category": "Financial"}}
  ]
}}

If there are no time series, output {{"timeSeriesData": []}}.

TEXT:
{}

JSON OUTPUT:"#,
        scope.hint(),
        brand_line(brand),
        text
    )
}

pub fn build_summary_prompt(text: &str, brand: Option<&str>) -> String {
    format!(
        r#"{SUMMARY_TASK}
{}

Write an executive summary of the document below in 3 to 5 complete sentences.
Lead with the most important results and numbers. Plain prose only, no lists, no JSON.

TEXT:
{}

SUMMARY:"#,
        brand_line(brand),
        text
    )
}

/// Works from what the analysis already found rather than the raw text.
pub fn build_insights_prompt(keywords: &[String], metrics: &[Metric], summary: &str, brand: Option<&str>) -> String {
    let focus = if keywords.is_empty() {
        "business operations".to_string()
    } else {
        keywords.iter().take(5).cloned().collect::<Vec<_>>().join(", ")
    };
    let metric_lines = if metrics.is_empty() {
        "- none extracted".to_string()
    } else {
        metrics
            .iter()
            .take(4)
            .map(|m| format!("- {}: {} {}", m.name, m.value, m.unit).trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    };
    let summary: String = summary.chars().take(300).collect();

    format!(
        r#"{INSIGHTS_TASK}
{}

ANALYSIS DATA:
Key focus areas: {}
Business metrics:
{}
Summary: {}

INSTRUCTIONS:
1. Give 2 or 3 strategic insights that connect the metrics to business performance and name an opportunity or risk
2. Give up to 3 short competitive advantages and up to 3 success indicators, a few words each
3. Use only what the data above supports
4. Output ONLY valid JSON, nothing else

SCHEMA:
{{
  "insights": ["Revenue growth of 12% suggests ..."],
  "competitiveAdvantages": ["Regional Reach"],
  "successIndicators": ["Revenue Growth"]
}}

JSON OUTPUT:"#,
        brand_line(brand),
        focus,
        metric_lines,
        summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_carry_task_marker_brand_and_text() {
        let prompt = build_metric_prompt("Revenue grew 12%", Some("Acme"), Scope::Document);
        assert!(prompt.starts_with(METRIC_TASK));
        assert!(prompt.contains("sales deck for Acme"));
        assert!(prompt.contains("Revenue grew 12%"));
        assert!(!prompt.contains(TABLE_TASK));
    }

    #[test]
    fn chunk_scope_is_one_based() {
        let scope = Scope::Chunk {
            index: 0,
            total: 3,
            doc_type: DocumentType::FinancialReport,
            has_financial_data: true,
        };
        let prompt = build_table_prompt("x", None, scope);
        assert!(prompt.contains("part 1 of 3 of a longer financial report document"));
        assert!(prompt.contains("contains financial figures"));
        assert!(prompt.contains("presented in a sales deck."));
    }

    #[test]
    fn insights_prompt_lists_findings() {
        let metric = Metric {
            name: "Growth Rate".into(),
            value: "12".into(),
            unit: "%".into(),
            trend: None,
            context: None,
            category: "Performance".into(),
        };
        let prompt = build_insights_prompt(&["revenue".into(), "retention".into()], &[metric], "Acme grew.", Some("Acme"));
        assert!(prompt.starts_with(INSIGHTS_TASK));
        assert!(prompt.contains("Key focus areas: revenue, retention"));
        assert!(prompt.contains("- Growth Rate: 12 %"));

        let empty = build_insights_prompt(&[], &[], "", None);
        assert!(empty.contains("business operations"));
        assert!(empty.contains("- none extracted"));
    }
}
