//! Shared test doubles for integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use anyhow::{Result, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tl_cache::registry::{Registry, RegistryConfig};
use tl_cache::translation::BatchTranslator;

/// How the stub answers a batch.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Look each text up in the dictionary, falling back to `[<target>] <text>`.
    Dictionary(HashMap<String, String>),
    /// Fail the whole call.
    Fail(String),
    /// Answer with one translation too few.
    Truncate,
}

/// Scriptable provider that records every batch it receives.
pub struct StubTranslator {
    reply: Reply,
    delay: Option<Duration>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl StubTranslator {
    pub fn new() -> Self {
        Self::with_reply(Reply::Dictionary(HashMap::new()))
    }

    pub fn dictionary(pairs: &[(&str, &str)]) -> Self {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self::with_reply(Reply::Dictionary(map))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_reply(Reply::Fail(message.to_string()))
    }

    pub fn truncating() -> Self {
        Self::with_reply(Reply::Truncate)
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Makes every call take at least `delay`.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Batches received so far, in arrival order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl BatchTranslator for StubTranslator {
    async fn translate_batch(
        &self,
        _source: &str,
        target: &str,
        texts: &[String],
    ) -> Result<Vec<String>> {
        self.calls.lock().push(texts.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            Reply::Dictionary(map) => Ok(texts
                .iter()
                .map(|text| {
                    map.get(text)
                        .cloned()
                        .unwrap_or_else(|| format!("[{target}] {text}"))
                })
                .collect()),
            Reply::Fail(message) => bail!("{message}"),
            Reply::Truncate => Ok(texts.iter().skip(1).cloned().collect()),
        }
    }
}

/// Registry with the given batch threshold, defaulting to `dir` for caches.
pub fn registry(dir: &std::path::Path, max_batch_chars: usize) -> Registry {
    Registry::new(RegistryConfig {
        default_target: "fr".to_string(),
        default_cache_dir: Some(dir.to_path_buf()),
        max_batch_chars,
        ..RegistryConfig::default()
    })
    .unwrap()
}

pub fn provider(stub: &Arc<StubTranslator>) -> Arc<dyn BatchTranslator> {
    Arc::clone(stub) as Arc<dyn BatchTranslator>
}
