// Persistence collaborator boundaries
//
// Flat-file JSON databases and markdown files are managed outside the
// core; workflow bodies reach them through DocumentStore. AuditSink
// receives one structured record per task at terminal state, fire and
// forget.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::envelope::ResponseStatus;
use crate::notification::Notification;

/// Structured audit record persisted when a task terminates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub task_id: Uuid,
    pub capability_id: String,
    pub status: ResponseStatus,
    pub timestamp: DateTime<Utc>,
    pub log: Vec<Notification>,
}

/// Fire-and-forget audit log.
///
/// Failures here must never fail task execution; the scheduler only
/// reports them to the diagnostic sink.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: AuditRecord) -> anyhow::Result<()>;
}

/// Flat JSON database / text file collaborator.
///
/// Paths are opaque keys from the core's point of view (the production
/// implementation maps them to per-tenant files on disk).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a JSON database by path
    async fn load(&self, path: &str) -> anyhow::Result<serde_json::Value>;

    /// Save (overwrite) a JSON database
    async fn save(&self, path: &str, value: serde_json::Value) -> anyhow::Result<()>;

    /// Append an entry to a named collection inside a JSON database
    async fn add_entry(
        &self,
        path: &str,
        collection: &str,
        entry: serde_json::Value,
    ) -> anyhow::Result<()>;

    /// Prepend a text block to a flat file (markdown notes, stories, ...)
    async fn append_text(&self, path: &str, text: &str) -> anyhow::Result<()>;
}
