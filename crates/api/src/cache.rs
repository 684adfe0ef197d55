use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use extract::{LlmClient, LlmError};

/// Model replies keyed by the sha256 of the prompt.
pub struct ResponseCache {
    responses: DashMap<String, String>,
    max_entries: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            responses: DashMap::new(),
            max_entries: max_entries.max(1),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, prompt: &str) -> Option<String> {
        let hit = self.responses.get(&hash_prompt(prompt)).map(|r| r.value().clone());
        match hit {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        hit
    }

    pub fn insert(&self, prompt: &str, response: String) {
        if self.responses.len() >= self.max_entries {
            // Simple eviction: drop a quarter of the entries when full
            let to_remove: Vec<_> = self
                .responses
                .iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            debug!(evicted = to_remove.len(), "Response cache full");
            for key in to_remove {
                self.responses.remove(&key);
            }
        }
        self.responses.insert(hash_prompt(prompt), response);
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.responses.len(),
            max_entries: self.max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

fn hash_prompt(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub hits: usize,
    pub misses: usize,
}

/// Serves repeated prompts from the cache. Only successful replies are
/// stored, so a failing backend is asked again next time.
pub struct CachedLlmClient {
    inner: Arc<dyn LlmClient>,
    cache: Arc<ResponseCache>,
}

impl CachedLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, cache: Arc<ResponseCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl LlmClient for CachedLlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        if let Some(reply) = self.cache.get(prompt) {
            return Ok(reply);
        }
        let reply = self.inner.generate(prompt).await?;
        self.cache.insert(prompt, reply.clone());
        Ok(reply)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
