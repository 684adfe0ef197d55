//! Lightweight, keyword-driven classification of documents and chunks.
//!
//! None of this is meant to be precise; it gives the extraction prompts a
//! hint about what kind of business document they are looking at.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::chunk::DocumentType;

/// Number of characters inspected when classifying a whole document.
pub const PROFILE_SAMPLE_CHARS: usize = 2000;

static FINANCIAL_DATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[$€£¥]\s?\d|\b\d[\d,.]*\s?(million|billion|thousand|mn|bn)\b|\b(revenue|profit|ebitda|net income|earnings|cash flow)\b",
    )
    .expect("static regex")
});

static METRIC_DATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\d+(\.\d+)?\s?%|\b\d[\d,.]*\s?(customers|users|employees|clients|units|stores)\b|\b(kpi|growth rate|margin|retention|conversion)\b",
    )
    .expect("static regex")
});

const DOCUMENT_TYPE_KEYWORDS: &[(DocumentType, &[&str])] = &[
    (
        DocumentType::FinancialReport,
        &[
            "revenue",
            "profit",
            "ebitda",
            "balance sheet",
            "income statement",
            "fiscal",
            "earnings",
            "cash flow",
        ],
    ),
    (
        DocumentType::MarketAnalysis,
        &[
            "market share",
            "competitor",
            "market size",
            "industry",
            "competitive landscape",
            "segment",
        ],
    ),
    (
        DocumentType::BusinessPlan,
        &["business plan", "strategy", "roadmap", "objectives", "go-to-market", "milestone"],
    ),
    (
        DocumentType::Presentation,
        &["slide", "agenda", "presentation", "deck"],
    ),
];

const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("financial", &["revenue", "profit", "margin", "earnings", "cost", "ebitda"]),
    ("market", &["market", "share", "competitor", "competitors", "industry"]),
    ("customer", &["customer", "customers", "client", "clients", "retention", "satisfaction"]),
    ("operations", &["operations", "operational", "efficiency", "productivity", "supply"]),
    ("product", &["product", "products", "launch", "feature", "platform"]),
    ("growth", &["growth", "expansion", "grew", "increase", "increased"]),
    ("strategy", &["strategy", "strategic", "initiative", "roadmap", "plan"]),
    ("technology", &["technology", "digital", "ai", "software", "cloud"]),
];

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentProfile {
    pub doc_type: DocumentType,
    pub topics: Vec<String>,
}

/// Classify a document from its first [`PROFILE_SAMPLE_CHARS`] characters.
pub fn classify_document(text: &str) -> DocumentProfile {
    let sample_end = text
        .char_indices()
        .nth(PROFILE_SAMPLE_CHARS)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let lower = text[..sample_end].to_lowercase();

    let mut doc_type = DocumentType::General;
    let mut best_hits = 0;
    for (candidate, keywords) in DOCUMENT_TYPE_KEYWORDS {
        let hits = keywords.iter().filter(|k| lower.contains(*k)).count();
        if hits > best_hits {
            best_hits = hits;
            doc_type = *candidate;
        }
    }

    let words: HashSet<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
        .collect();

    let topics = TOPIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| words.contains(k)))
        .map(|(topic, _)| topic.to_string())
        .collect();

    DocumentProfile { doc_type, topics }
}

pub fn has_financial_data(text: &str) -> bool {
    FINANCIAL_DATA.is_match(text)
}

pub fn has_metrics(text: &str) -> bool {
    METRIC_DATA.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn financial_report_is_detected() {
        let text = "Q3 earnings: revenue rose to $4.2 million while EBITDA and cash flow improved.";
        let profile = classify_document(text);

        assert_eq!(profile.doc_type, DocumentType::FinancialReport);
        assert!(profile.topics.contains(&"financial".to_string()));
    }

    #[test]
    fn plain_prose_is_general() {
        let profile = classify_document("The weather was pleasant and the team went hiking.");
        assert_eq!(profile.doc_type, DocumentType::General);
        assert!(profile.topics.is_empty());
    }

    #[test]
    fn only_the_opening_sample_is_classified() {
        let mut text = "lorem ipsum ".repeat(400);
        text.push_str("market share competitor industry");
        let profile = classify_document(&text);
        assert_eq!(profile.doc_type, DocumentType::General);
    }

    #[test]
    fn flags_detect_money_and_percentages() {
        assert!(has_financial_data("Sales hit €12.5 million"));
        assert!(!has_financial_data("We hired a new designer"));
        assert!(has_metrics("Churn fell to 3.5%"));
        assert!(has_metrics("We now serve 1,200 customers"));
        assert!(!has_metrics("Nothing numeric here"));
    }
}
