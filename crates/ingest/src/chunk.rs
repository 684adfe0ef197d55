use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Coarse classification of a whole document, taken from its opening text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    FinancialReport,
    MarketAnalysis,
    BusinessPlan,
    Presentation,
    General,
}

impl DocumentType {
    pub fn label(self) -> &'static str {
        match self {
            DocumentType::FinancialReport => "financial report",
            DocumentType::MarketAnalysis => "market analysis",
            DocumentType::BusinessPlan => "business plan",
            DocumentType::Presentation => "presentation",
            DocumentType::General => "business",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkContext {
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub topics: Vec<String>,
    pub has_financial_data: bool,
    pub has_metrics: bool,
    pub is_first_chunk: bool,
    pub is_last_chunk: bool,
    pub total_chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub index: usize,
    pub start: usize, // byte offsets into the source text
    pub end: usize,
    pub context: ChunkContext,
}

impl Chunk {
    pub fn new(text: String, index: usize, offset: (usize, usize), context: ChunkContext) -> Self {
        // Generate stable chunk_id from content
        let chunk_id = Self::generate_chunk_id(&text, offset);

        Self {
            chunk_id,
            text,
            index,
            start: offset.0,
            end: offset.1,
            context,
        }
    }

    fn generate_chunk_id(text: &str, offset: (usize, usize)) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(offset.0.to_string().as_bytes());
        hasher.update(offset.1.to_string().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16]) // Use first 16 bytes (32 hex chars)
    }

    /// Estimate token count (rough: 1.3 tokens per word)
    pub fn estimated_tokens(&self) -> usize {
        let word_count = self.text.split_whitespace().count();
        (word_count as f64 * 1.3) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ChunkContext {
        ChunkContext {
            doc_type: DocumentType::General,
            topics: vec![],
            has_financial_data: false,
            has_metrics: false,
            is_first_chunk: true,
            is_last_chunk: true,
            total_chunks: 1,
        }
    }

    #[test]
    fn chunk_id_is_stable_and_offset_sensitive() {
        let a = Chunk::new("same text".into(), 0, (0, 9), context());
        let b = Chunk::new("same text".into(), 0, (0, 9), context());
        let c = Chunk::new("same text".into(), 1, (10, 19), context());

        assert_eq!(a.chunk_id, b.chunk_id);
        assert_ne!(a.chunk_id, c.chunk_id);
        assert_eq!(a.chunk_id.len(), 32);
    }

    #[test]
    fn context_serializes_camel_case() {
        let json = serde_json::to_value(context()).unwrap();
        assert_eq!(json["type"], "general");
        assert_eq!(json["hasFinancialData"], false);
        assert_eq!(json["totalChunks"], 1);
    }
}
