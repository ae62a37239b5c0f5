//! Key-value configuration store access.
//!
//! Values are opaque strings owned by the orchestrator; some of them are
//! JSON-encoded records (agent definitions, default LLM settings).

use crate::transport::OrchestratorHttp;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Read one value; a missing key is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Enumerate stored keys.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Store backed by the orchestrator's HTTP key-value endpoints.
#[derive(Debug, Clone)]
pub struct HttpConfigStore {
    transport: OrchestratorHttp,
}

impl HttpConfigStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            transport: OrchestratorHttp::new(base_url)?,
        })
    }
}

#[async_trait]
impl ConfigStore for HttpConfigStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.transport.kv_get(key).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.transport.kv_keys().await
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.lock().unwrap().insert(key.into(), value.into());
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().unwrap().keys().cloned().collect())
    }
}
