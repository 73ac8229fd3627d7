// In-memory collaborator implementations for examples and testing
//
// These keep all data in memory, making them perfect for:
// - Unit and integration tests
// - Standalone examples that don't need a filesystem
// - Quick prototyping

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::llm::{LanguageModelClient, LlmRequest, LlmResponse};
use crate::persistence::{AuditRecord, AuditSink, DocumentStore};

// ============================================================================
// ScriptedLanguageModel - replays canned responses
// ============================================================================

/// Language model double that replays a scripted sequence of responses
/// and records every request it receives.
#[derive(Default)]
pub struct ScriptedLanguageModel {
    responses: RwLock<VecDeque<LlmResponse>>,
    requests: RwLock<Vec<LlmRequest>>,
}

impl ScriptedLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script assistant text responses, returned in order
    pub fn with_responses<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let responses = texts
            .into_iter()
            .map(|t| LlmResponse::assistant(t.into()))
            .collect();
        Self {
            responses: RwLock::new(responses),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Queue one more response
    pub async fn push_response(&self, response: LlmResponse) {
        self.responses.write().await.push_back(response);
    }

    /// Requests seen so far, in call order
    pub async fn requests(&self) -> Vec<LlmRequest> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl LanguageModelClient for ScriptedLanguageModel {
    async fn call(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
        self.requests.write().await.push(request);
        self.responses
            .write()
            .await
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("scripted language model ran out of responses"))
    }
}

/// Language model double that always fails; for exercising error paths
#[derive(Debug, Default, Clone)]
pub struct FailingLanguageModel;

#[async_trait]
impl LanguageModelClient for FailingLanguageModel {
    async fn call(&self, _request: LlmRequest) -> anyhow::Result<LlmResponse> {
        Err(anyhow::anyhow!("provider unavailable"))
    }
}

// ============================================================================
// MemoryAuditSink - collects audit records
// ============================================================================

/// Audit sink that collects records in memory
#[derive(Default)]
pub struct MemoryAuditSink {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, record: AuditRecord) -> anyhow::Result<()> {
        self.records.write().await.push(record);
        Ok(())
    }
}

/// Audit sink that always fails; audit failures must never surface to
/// callers, so tests use this to prove they are swallowed
#[derive(Debug, Default, Clone)]
pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn append(&self, _record: AuditRecord) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("audit backend down"))
    }
}

// ============================================================================
// MemoryDocumentStore - flat JSON databases and text files in memory
// ============================================================================

#[derive(Default)]
struct DocumentState {
    databases: HashMap<String, serde_json::Value>,
    texts: HashMap<String, String>,
}

/// Document store backed by in-memory maps
#[derive(Default, Clone)]
pub struct MemoryDocumentStore {
    state: Arc<RwLock<DocumentState>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text file contents, empty if never written
    pub async fn text(&self, path: &str) -> String {
        self.state
            .read()
            .await
            .texts
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    /// Entries of a collection inside a JSON database
    pub async fn collection(&self, path: &str, collection: &str) -> Vec<serde_json::Value> {
        self.state
            .read()
            .await
            .databases
            .get(path)
            .and_then(|db| db.get(collection))
            .and_then(|c| c.as_array().cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn load(&self, path: &str) -> anyhow::Result<serde_json::Value> {
        Ok(self
            .state
            .read()
            .await
            .databases
            .get(path)
            .cloned()
            .unwrap_or_else(|| serde_json::json!({})))
    }

    async fn save(&self, path: &str, value: serde_json::Value) -> anyhow::Result<()> {
        self.state
            .write()
            .await
            .databases
            .insert(path.to_string(), value);
        Ok(())
    }

    async fn add_entry(
        &self,
        path: &str,
        collection: &str,
        entry: serde_json::Value,
    ) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        let db = state
            .databases
            .entry(path.to_string())
            .or_insert_with(|| serde_json::json!({}));
        let collections = db
            .as_object_mut()
            .ok_or_else(|| anyhow::anyhow!("database at '{path}' is not a JSON object"))?;
        let entries = collections
            .entry(collection.to_string())
            .or_insert_with(|| serde_json::json!([]));
        entries
            .as_array_mut()
            .ok_or_else(|| anyhow::anyhow!("collection '{collection}' is not an array"))?
            .push(entry);
        Ok(())
    }

    async fn append_text(&self, path: &str, text: &str) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        let existing = state.texts.entry(path.to_string()).or_default();
        // Prepend, newest first, matching the notes/stories file layout
        let mut updated = text.to_string();
        updated.push_str(existing);
        *existing = updated;
        Ok(())
    }
}
