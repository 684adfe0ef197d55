use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Extensions the reader accepts. Anything richer (PDF, DOCX) is converted
/// to text upstream before it reaches the pipeline.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "csv"];

pub struct FileReader;

impl FileReader {
    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    pub async fn read_file(path: &Path) -> Result<String> {
        if !Self::is_supported(path) {
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            anyhow::bail!("Unsupported file format: {}", extension);
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read file: {:?}", path))?;
        debug!(path = %path.display(), bytes = content.len(), "read document");
        Ok(content)
    }

    /// Read every supported file directly inside `dir`, sorted by path so
    /// repeated runs see documents in the same order.
    pub async fn read_directory(dir: &Path) -> Result<Vec<(String, String)>> {
        let mut files = Vec::new();

        let mut entries = fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to list directory: {:?}", dir))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if path.is_file() && Self::is_supported(&path) {
                let content = Self::read_file(&path).await?;
                let path_str = path.to_string_lossy().to_string();
                files.push((path_str, content));
            }
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_supported_files_and_skips_others() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "# Plan\nRevenue grew 12%").unwrap();
        std::fs::write(dir.path().join("a.txt"), "Region | Revenue").unwrap();
        std::fs::write(dir.path().join("deck.pdf"), "%PDF-1.7").unwrap();

        let files = FileReader::read_directory(dir.path()).await.unwrap();

        assert_eq!(files.len(), 2);
        assert!(files[0].0.ends_with("a.txt"));
        assert_eq!(files[1].1, "# Plan\nRevenue grew 12%");
    }

    #[tokio::test]
    async fn rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, "%PDF").unwrap();

        let err = FileReader::read_file(&path).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported file format"));
    }
}
