pub mod chunk;
pub mod chunker;
pub mod classify;
pub mod reader;

pub use chunk::{Chunk, ChunkContext, DocumentType};
pub use chunker::{Chunker, ChunkerConfig};
pub use classify::{DocumentProfile, classify_document};
pub use reader::FileReader;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Plain text of one uploaded document, as handed over by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub doc_id: String,
    pub name: String,
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            doc_id: generate_doc_id(&name),
            name,
            text: text.into(),
        }
    }
}

/// Generate a stable document ID from a name or path
pub fn generate_doc_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Concatenate the text of every document, separated by blank lines.
/// Documents with no text are skipped.
pub fn combine_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Load a single file or every supported file in a directory.
pub async fn load_path(path: &Path) -> Result<Vec<Document>> {
    if path.is_dir() {
        let files = FileReader::read_directory(path).await?;
        Ok(files
            .into_iter()
            .map(|(name, text)| Document::new(name, text))
            .collect())
    } else {
        let text = FileReader::read_file(path).await?;
        Ok(vec![Document::new(path.to_string_lossy(), text)])
    }
}
