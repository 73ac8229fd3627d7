// Task scheduler / suspend-resume engine
//
// The core state machine: CREATED -> RUNNING -> {SUSPENDED <-> RUNNING}
// -> TERMINATED. A capability body runs in its own tokio task; the
// scheduler drives it by awaiting the next envelope it emits. Pending
// envelopes leave the computation parked in the task table; terminal
// envelopes tear the task down (close sentinel, channel removal, table
// removal, one audit record).
//
// Exception policy: nothing a body raises ever escapes to the caller.
// Body errors become `error` envelopes via the context; a panicked body
// is detected as a dropped envelope channel and converted the same way.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use windlass_core::persistence::AuditRecord;
use windlass_core::{
    AuditSink, CapabilityParams, CapabilityRegistry, DocumentStore, EngineError,
    LanguageModelClient, ResultEnvelope, WorkflowContext,
};

use crate::progress::{ProgressChannels, ProgressStream};

/// External collaborators injected into every workflow context
#[derive(Clone)]
pub struct Collaborators {
    pub llm: Arc<dyn LanguageModelClient>,
    pub documents: Arc<dyn DocumentStore>,
    pub audit: Arc<dyn AuditSink>,
}

/// One suspended (or still-starting) computation.
///
/// Exclusively owned by the task table; moved out while driving so a
/// concurrent resume of the same task misses and gets
/// `UnknownOrExpiredTask` instead of racing.
struct TaskEntry {
    capability_id: String,
    created_at: DateTime<Utc>,
    resume_tx: mpsc::UnboundedSender<serde_json::Value>,
    envelope_rx: mpsc::UnboundedReceiver<ResultEnvelope>,
    body: JoinHandle<()>,
}

/// In-memory scheduler for resumable capability tasks
pub struct TaskScheduler {
    registry: Arc<RwLock<CapabilityRegistry>>,
    channels: Arc<ProgressChannels>,
    collaborators: Collaborators,
    tasks: Mutex<HashMap<Uuid, TaskEntry>>,
}

impl TaskScheduler {
    pub fn new(registry: CapabilityRegistry, collaborators: Collaborators) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            channels: Arc::new(ProgressChannels::new()),
            collaborators,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// The capability registry, shared for lookup and hot reload
    pub fn registry(&self) -> &Arc<RwLock<CapabilityRegistry>> {
        &self.registry
    }

    /// Progress channel map (for transports wiring up streaming)
    pub fn channels(&self) -> &Arc<ProgressChannels> {
        &self.channels
    }

    /// Claim the progress stream for a running task
    pub fn subscribe(&self, task_id: Uuid) -> Option<ProgressStream> {
        self.channels.subscribe(task_id)
    }

    /// Whether a task is currently suspended in the table
    pub fn has_task(&self, task_id: Uuid) -> bool {
        self.tasks.lock().expect("task table poisoned").contains_key(&task_id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().expect("task table poisoned").len()
    }

    /// Start a capability as a new task.
    ///
    /// Resolves and validates before any task state exists; those
    /// failures return typed errors without entering the suspend/resume
    /// machinery. Then runs the body up to its first interaction boundary
    /// or completion and returns the envelope it produced.
    pub async fn start(
        &self,
        capability_id: &str,
        mut params: CapabilityParams,
    ) -> Result<ResultEnvelope, EngineError> {
        let descriptor = self
            .registry
            .read()
            .expect("registry poisoned")
            .lookup(capability_id)
            .cloned()
            .ok_or_else(|| EngineError::CapabilityNotFound(capability_id.to_string()))?;

        if descriptor.requires_input && params.input_text().is_empty() {
            return Err(EngineError::MissingRequiredInput(descriptor.id));
        }

        if params.model.is_none() {
            params.model = descriptor.default_model.clone();
        }

        let task_id = Uuid::now_v7();
        info!(%task_id, capability = %descriptor.id, "starting task");

        let progress_tx = self.channels.open(task_id);
        let (envelope_tx, envelope_rx) = mpsc::unbounded_channel();
        let (resume_tx, resume_rx) = mpsc::unbounded_channel();

        let ctx = WorkflowContext::new(
            task_id,
            descriptor.id.clone(),
            progress_tx,
            envelope_tx.clone(),
            resume_rx,
            self.collaborators.llm.clone(),
            self.collaborators.documents.clone(),
        );

        // The context (and with it the envelope sender) moves entirely into
        // the body task: if the body panics, every sender drops and drive()
        // observes the closed channel instead of waiting forever.
        let handler = descriptor.handler.clone();
        let body = tokio::spawn(async move {
            let envelope = match handler.run(ctx.clone(), params).await {
                Ok(envelope) => envelope,
                Err(err) => {
                    warn!(%task_id, error = %err.chain_string(), "capability body failed");
                    ctx.error(&err)
                }
            };
            // Scheduler side may be gone on shutdown; nothing to do then
            let _ = envelope_tx.send(envelope);
        });

        let entry = TaskEntry {
            capability_id: descriptor.id,
            created_at: Utc::now(),
            resume_tx,
            envelope_rx,
            body,
        };

        Ok(self.drive(task_id, entry).await)
    }

    /// Resume a suspended task with user input.
    ///
    /// Delivers the input at the exact suspension point and drives to the
    /// next boundary or termination. Unknown, already-terminated, and
    /// currently-running task ids all answer `UnknownOrExpiredTask`.
    pub async fn resume(
        &self,
        task_id: Uuid,
        resume_input: serde_json::Value,
    ) -> Result<ResultEnvelope, EngineError> {
        let entry = self
            .tasks
            .lock()
            .expect("task table poisoned")
            .remove(&task_id)
            .ok_or(EngineError::UnknownOrExpiredTask(task_id))?;

        debug!(%task_id, capability = %entry.capability_id, "resuming task");
        // A send failure means the body already died; drive() will see the
        // terminal envelope (or its absence) and tear down accordingly.
        let _ = entry.resume_tx.send(resume_input);

        Ok(self.drive(task_id, entry).await)
    }

    /// Explicitly discard a suspended task without resuming it
    pub async fn abandon(&self, task_id: Uuid) -> Result<(), EngineError> {
        let entry = self
            .tasks
            .lock()
            .expect("task table poisoned")
            .remove(&task_id)
            .ok_or(EngineError::UnknownOrExpiredTask(task_id))?;

        info!(%task_id, capability = %entry.capability_id, age_secs = (Utc::now() - entry.created_at).num_seconds(), "abandoning task");
        entry.body.abort();
        self.channels.close(task_id);
        Ok(())
    }

    /// Await the next envelope from the body: pending re-stores the
    /// computation, terminal tears down. A dropped envelope channel
    /// without a terminal envelope means the body panicked.
    async fn drive(&self, task_id: Uuid, mut entry: TaskEntry) -> ResultEnvelope {
        match entry.envelope_rx.recv().await {
            Some(envelope) if envelope.is_pending() => {
                debug!(%task_id, "task suspended, awaiting input");
                self.tasks
                    .lock()
                    .expect("task table poisoned")
                    .insert(task_id, entry);
                envelope
            }
            Some(envelope) => {
                self.teardown(task_id, &entry.capability_id, &envelope).await;
                envelope
            }
            None => {
                let envelope =
                    ResultEnvelope::failed(task_id, "workflow terminated unexpectedly");
                self.teardown(task_id, &entry.capability_id, &envelope).await;
                envelope
            }
        }
    }

    /// Terminal cleanup, reached exactly once per task: close sentinel on
    /// the progress channel, drop the channel entry, persist one audit
    /// record. Audit failures are swallowed and only traced.
    async fn teardown(&self, task_id: Uuid, capability_id: &str, envelope: &ResultEnvelope) {
        self.channels.close(task_id);
        info!(%task_id, capability = %capability_id, status = ?envelope.status, "task terminated");

        let record = AuditRecord {
            task_id,
            capability_id: capability_id.to_string(),
            status: envelope.status,
            timestamp: Utc::now(),
            log: envelope.log.clone(),
        };
        if let Err(err) = self.collaborators.audit.append(record).await {
            warn!(%task_id, error = %err, "failed to persist audit record");
        }
    }
}
