//! Keywords, the executive summary and strategic insights that accompany
//! a deck.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::agents::ExtractionContext;
use crate::parse;
use crate::prompt;
use crate::schema::{Metric, StrategicInsights};

pub const MAX_KEYWORDS: usize = 10;
pub const MAX_INSIGHTS: usize = 3;
const MIN_INSIGHT_CHARS: usize = 20;
const MIN_INSIGHTS_TOTAL_CHARS: usize = 30;
const MIN_SUMMARY_CHARS_FOR_DIRECTION: usize = 100;
const MIN_LLM_SUMMARY_CHARS: usize = 150;
const SUMMARY_TARGET_WORDS: usize = 250;
const MIN_SUMMARY_SENTENCE_CHARS: usize = 30;
const SUMMARY_INPUT_CHARS: usize = 6_000;
const FREQUENT_WORDS: usize = 5;

const STOP_WORDS: &[&str] = &[
    "the", "and", "but", "for", "with", "this", "that", "these", "those", "they", "them",
    "their", "there", "then", "than", "from", "into", "over", "under", "about", "through",
    "have", "has", "had", "does", "did", "will", "would", "could", "should", "were", "been",
    "also", "which", "while", "where", "when", "what", "each", "more", "most", "such", "other",
    "document", "business", "analysis", "data",
];

static BUSINESS_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(revenue|profit|growth|market share|market|customer|sales|strategy|innovation|performance|efficiency|competitive advantage|competitive|leadership|expansion|digital|technology|platform|solution|investment|partnership|acquisition|retention|conversion|optimization|transformation|sustainability|quality|engagement|brand|satisfaction|scalability|compliance|security|margin|forecast|roi|kpi)\b",
    )
    .expect("static regex")
});

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-•*])\s*").expect("static regex"));

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[[:alpha:]]{4,}\b").expect("static regex"));

/// Business vocabulary in order of first appearance, topped up with the
/// most frequent content words. At most `max` entries, all lowercase.
pub fn keywords(text: &str, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut found: Vec<String> = BUSINESS_TERMS
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|k| seen.insert(k.clone()))
        .collect();

    let mut freq: HashMap<String, usize> = HashMap::new();
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    for (pos, m) in WORD.find_iter(text).enumerate() {
        let word = m.as_str().to_lowercase();
        if STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        first_seen.entry(word.clone()).or_insert(pos);
        *freq.entry(word).or_default() += 1;
    }

    let mut frequent: Vec<(String, usize)> = freq.into_iter().filter(|(_, n)| *n > 1).collect();
    frequent.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| first_seen[&a.0].cmp(&first_seen[&b.0])));

    found.extend(
        frequent
            .into_iter()
            .take(FREQUENT_WORDS)
            .map(|(word, _)| word)
            .filter(|w| seen.insert(w.clone())),
    );
    found.truncate(max);
    found
}

fn ends_with_sentence_punctuation(s: &str) -> bool {
    s.trim_end().ends_with(['.', '!', '?'])
}

/// Leading sentences of the document, up to roughly 250 words. Sentences
/// of 30 characters or fewer are skipped as headings and fragments.
pub fn extractive_summary(text: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let mut words = 0;

    for sentence in text.unicode_sentences() {
        let sentence = sentence.trim();
        if sentence.chars().count() <= MIN_SUMMARY_SENTENCE_CHARS || sentence.contains('|') {
            continue;
        }
        parts.push(sentence);
        words += sentence.split_whitespace().count();
        if words >= SUMMARY_TARGET_WORDS {
            break;
        }
    }

    let mut summary = parts
        .iter()
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(" ");
    if !summary.is_empty() && !ends_with_sentence_punctuation(&summary) {
        summary.push('.');
    }
    summary
}

/// A model summary is used only when it is substantial and ends cleanly.
pub fn accept_model_summary(summary: &str) -> bool {
    let s = summary.trim();
    s.chars().count() > MIN_LLM_SUMMARY_CHARS && ends_with_sentence_punctuation(s)
}

fn leading(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Ask the model for a summary; fall back to the extractive one on any
/// failure or an unusable reply. Never fails.
pub async fn summarize(ctx: &ExtractionContext, text: &str, brand: Option<&str>) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let prompt = prompt::build_summary_prompt(leading(text, SUMMARY_INPUT_CHARS), brand);
    match ctx.call("summary", &prompt).await {
        Ok(reply) if accept_model_summary(&reply) => {
            debug!(chars = reply.len(), "Using model summary");
            reply.trim().to_string()
        }
        Ok(reply) => {
            debug!(chars = reply.len(), "Model summary rejected, using extractive summary");
            extractive_summary(text)
        }
        Err(e) => {
            warn!(error = %e, "Summary unavailable, using extractive summary");
            extractive_summary(text)
        }
    }
}

fn title_case(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trimmed, list markers removed, deduplicated, at most `MAX_INSIGHTS`.
fn clean_list(items: Vec<String>, min_chars: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| LIST_MARKER.replace(item.trim(), "").trim().to_string())
        .filter(|item| item.chars().count() > min_chars)
        .filter(|item| !item.to_lowercase().starts_with("insight"))
        .filter(|item| seen.insert(item.to_lowercase()))
        .take(MAX_INSIGHTS)
        .collect()
}

fn is_financial(metric: &Metric) -> bool {
    let text = format!("{} {} {}", metric.name, metric.value, metric.unit).to_lowercase();
    text.contains("revenue")
        || text.contains("sales")
        || text.contains('$')
        || metric.category.eq_ignore_ascii_case("financial")
}

/// Insights assembled from what the analysis found, without the model.
pub fn fallback_insights(keywords: &[String], metrics: &[Metric], summary: &str) -> StrategicInsights {
    let mut insights = Vec::new();

    if let Some(focus) = keywords.first() {
        insights.push(format!(
            "Document analysis indicates a primary focus on {focus} and related strategic initiatives."
        ));
    }

    if !metrics.is_empty() {
        let n = metrics.len();
        if metrics.iter().any(is_financial) {
            insights.push(format!(
                "Financial performance is tracked through {n} quantitative metric(s), pointing to a data-driven management approach."
            ));
        } else {
            insights.push(format!("Operational tracking covers {n} key performance indicator(s)."));
        }
    }

    if summary.chars().count() > MIN_SUMMARY_CHARS_FOR_DIRECTION {
        let lower = summary.to_lowercase();
        if ["growth", "increase", "expansion"].iter().any(|w| lower.contains(w)) {
            insights.push("Business trajectory shows a growth-oriented strategic direction.".to_string());
        } else if ["efficiency", "optimization", "improvement"].iter().any(|w| lower.contains(w)) {
            insights.push("Operational focus emphasizes efficiency and process optimization.".to_string());
        }
    }

    if insights.is_empty() {
        insights.push("The document contains structured analytical content suitable for strategic review.".to_string());
    }

    let competitive_advantages = if keywords.is_empty() {
        vec!["Data-Driven Analysis".to_string(), "Strategic Processing".to_string()]
    } else {
        keywords.iter().take(MAX_INSIGHTS).map(|k| format!("{} Excellence", title_case(k))).collect()
    };

    let success_indicators = if keywords.is_empty() {
        vec!["Business Analysis".to_string(), "Data Processing".to_string()]
    } else {
        keywords.iter().take(MAX_INSIGHTS).map(|k| title_case(k)).collect()
    };

    StrategicInsights {
        insights,
        competitive_advantages,
        success_indicators,
    }
}

/// Model insights when the reply is usable, topped up or replaced by
/// `fallback_insights` otherwise. An analysis with nothing in it gets no
/// insights and no model call.
pub async fn generate_insights(
    ctx: &ExtractionContext,
    keywords: &[String],
    metrics: &[Metric],
    summary: &str,
    brand: Option<&str>,
) -> StrategicInsights {
    if keywords.is_empty() && metrics.is_empty() && summary.trim().is_empty() {
        return StrategicInsights::default();
    }

    let fallback = || fallback_insights(keywords, metrics, summary);
    let prompt = prompt::build_insights_prompt(keywords, metrics, summary, brand);

    let reply = match ctx.call("insights", &prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "Insights unavailable, using rule-based insights");
            return fallback();
        }
    };

    let raw = match parse::parse_llm_json(&reply) {
        Ok(value) => parse::insights_from_value(&value),
        Err(e) => {
            debug!(error = %e, "Unparseable insights reply, using rule-based insights");
            return fallback();
        }
    };

    let insights = clean_list(raw.insights, MIN_INSIGHT_CHARS);
    let total: usize = insights.iter().map(|i| i.chars().count()).sum();
    if total < MIN_INSIGHTS_TOTAL_CHARS {
        debug!(insights = insights.len(), "Model insights too thin, using rule-based insights");
        return fallback();
    }

    let defaults = fallback();
    let pick = |list: Vec<String>, default: Vec<String>| {
        let cleaned = clean_list(list, 0);
        if cleaned.is_empty() { default } else { cleaned }
    };

    StrategicInsights {
        insights,
        competitive_advantages: pick(raw.competitive_advantages, defaults.competitive_advantages),
        success_indicators: pick(raw.success_indicators, defaults.success_indicators),
    }
}
