use regex::Regex;
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

use crate::chunk::{Chunk, ChunkContext};
use crate::classify::{self, DocumentProfile};

static NUMBERED_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+(\.\d+)*\.?\s+[A-Z]").expect("static regex")
});

const BUSINESS_TERMS: &[&str] = &[
    "revenue",
    "profit",
    "growth",
    "market",
    "customer",
    "sales",
    "margin",
    "earnings",
    "strategy",
    "competitor",
    "investment",
];

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    pub min_chunk_len: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10_000,
            overlap: 800,
            min_chunk_len: 100,
        }
    }
}

/// Where a cut may land, tried in order. The fraction is how far into the
/// window a candidate must sit before it is accepted.
#[derive(Debug, Clone, Copy)]
enum Boundary {
    SectionHeader,
    Paragraph,
    BusinessSentence,
    Sentence,
    Word,
}

impl Boundary {
    const PRIORITY: [Boundary; 5] = [
        Boundary::SectionHeader,
        Boundary::Paragraph,
        Boundary::BusinessSentence,
        Boundary::Sentence,
        Boundary::Word,
    ];

    fn min_fraction(self) -> f64 {
        match self {
            Boundary::SectionHeader => 0.3,
            Boundary::Paragraph => 0.5,
            Boundary::BusinessSentence => 0.6,
            Boundary::Sentence => 0.7,
            Boundary::Word => 0.8,
        }
    }

    /// Last candidate cut position (relative to the window), if any.
    fn last_candidate(self, window: &str) -> Option<usize> {
        match self {
            Boundary::SectionHeader => last_header_start(window),
            Boundary::Paragraph => window.rfind("\n\n").map(|idx| idx + 2),
            Boundary::BusinessSentence => last_sentence_end(window, true),
            Boundary::Sentence => last_sentence_end(window, false),
            Boundary::Word => window
                .char_indices()
                .rev()
                .find(|(_, c)| c.is_whitespace())
                .map(|(idx, c)| idx + c.len_utf8()),
        }
    }
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    pub fn chunk_text(&self, text: &str) -> Vec<Chunk> {
        let profile = classify::classify_document(text);
        let spans = self.split_spans(text);
        let total = spans.len();

        spans
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| {
                let body = text[start..end].trim();
                let context = Self::context_for(&profile, body, index, total);
                Chunk::new(body.to_string(), index, (start, end), context)
            })
            .collect()
    }

    /// Byte spans of the emitted chunks, in document order.
    pub fn split_spans(&self, text: &str) -> Vec<(usize, usize)> {
        let len = text.len();
        if len <= self.config.chunk_size {
            return vec![(0, len)];
        }

        let chunk_size = self.config.chunk_size.max(1);
        let mut spans = Vec::new();
        let mut start = 0;
        // End of the previous span; every cut must land past it
        let mut prev_end = 0;

        while start < len {
            let mut window_end = floor_char_boundary(text, (start + chunk_size).min(len));
            if window_end <= prev_end.max(start) {
                window_end = ceil_char_boundary(text, prev_end.max(start) + 1);
            }

            let end = if window_end >= len {
                len
            } else {
                self.find_cut(text, start, window_end, prev_end)
            };
            prev_end = end;

            if text[start..end].trim().len() >= self.config.min_chunk_len {
                spans.push((start, end));
            }

            if end >= len {
                break;
            }

            // Step back by the overlap, but always move forward
            let next = end.saturating_sub(self.config.overlap);
            start = if next > start {
                ceil_char_boundary(text, next)
            } else {
                end
            };
        }

        if spans.is_empty() {
            spans.push((0, len));
        }

        spans
    }

    fn find_cut(&self, text: &str, start: usize, window_end: usize, prev_end: usize) -> usize {
        let window = &text[start..window_end];
        let window_len = window.len();
        let past_prev = (prev_end + 1).saturating_sub(start);

        for boundary in Boundary::PRIORITY {
            let min_pos = ((window_len as f64 * boundary.min_fraction()) as usize).max(past_prev);
            if let Some(pos) = boundary.last_candidate(window) {
                if pos > 0 && pos >= min_pos && pos <= window_len {
                    return start + pos;
                }
            }
        }

        window_end
    }

    fn context_for(
        profile: &DocumentProfile,
        body: &str,
        index: usize,
        total: usize,
    ) -> ChunkContext {
        ChunkContext {
            doc_type: profile.doc_type,
            topics: profile.topics.clone(),
            has_financial_data: classify::has_financial_data(body),
            has_metrics: classify::has_metrics(body),
            is_first_chunk: index == 0,
            is_last_chunk: index + 1 == total,
            total_chunks: total,
        }
    }
}

fn is_section_header(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() || line.len() > 80 {
        return false;
    }
    if line.starts_with('#') {
        return true;
    }

    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() >= 4 && letters.iter().all(|c| c.is_uppercase()) && !line.ends_with('.') {
        return true;
    }

    if NUMBERED_HEADING.is_match(line) && !line.ends_with('.') {
        return true;
    }

    line.ends_with(':') && line.split_whitespace().count() <= 6
}

fn last_header_start(window: &str) -> Option<usize> {
    window
        .match_indices('\n')
        .map(|(idx, _)| idx + 1)
        .filter(|&line_start| {
            let line = window[line_start..].lines().next().unwrap_or("");
            is_section_header(line)
        })
        .last()
}

fn last_sentence_end(window: &str, business_only: bool) -> Option<usize> {
    window
        .split_sentence_bound_indices()
        .map(|(idx, sentence)| (idx + sentence.len(), sentence))
        // the final segment runs into the window edge and is not a real end
        .filter(|(end, _)| *end < window.len())
        .filter(|(_, sentence)| {
            sentence.trim_end().ends_with(['.', '!', '?'])
                && (!business_only || {
                    let lower = sentence.to_lowercase();
                    BUSINESS_TERMS.iter().any(|term| lower.contains(term))
                })
        })
        .map(|(end, _)| end)
        .last()
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
