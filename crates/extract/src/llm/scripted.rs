use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{LlmClient, LlmError};

/// Canned backend for tests and offline runs. Replies are chosen by the
/// first rule whose marker occurs in the prompt, so concurrent agents each
/// get their own answer regardless of call order.
pub struct ScriptedLlmClient {
    rules: Vec<(String, Result<String, LlmError>)>,
    default_reply: Result<String, LlmError>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedLlmClient {
    /// Every prompt gets `reply`.
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default_reply: Ok(reply.into()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every prompt fails with `error`.
    pub fn failing(error: LlmError) -> Self {
        let mut client = Self::new("");
        client.default_reply = Err(error);
        client
    }

    pub fn on(mut self, marker: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((marker.into(), Ok(reply.into())));
        self
    }

    pub fn on_error(mut self, marker: impl Into<String>, error: LlmError) -> Self {
        self.rules.push((marker.into(), Err(error)));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        self.rules
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default_reply.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
