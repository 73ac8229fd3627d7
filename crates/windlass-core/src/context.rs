// Per-invocation workflow execution context
//
// Created by the scheduler for every task. Accumulates notifications,
// builds result envelopes, and owns the suspension primitive: a body
// calls `request_input` to emit a pending envelope and park until the
// scheduler delivers resume input.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::envelope::{
    EnvelopeMessage, FormElement, ResponseAction, ResponseStatus, ResultEnvelope,
};
use crate::error::WorkflowError;
use crate::llm::{LanguageModelClient, LlmRequest, LlmResponse};
use crate::notification::Notification;
use crate::persistence::DocumentStore;

struct ContextInner {
    task_id: Uuid,
    capability_id: String,
    /// Ordered buffer of notifications since the last envelope emission
    log: Mutex<Vec<Notification>>,
    /// Real-time delivery to the task's progress channel; `None` is the
    /// close sentinel pushed by the scheduler, never by the context
    progress: mpsc::UnboundedSender<Option<Notification>>,
    /// Pending envelopes travel to the scheduler through here
    envelopes: mpsc::UnboundedSender<ResultEnvelope>,
    /// Resume input arrives here, one value per interaction boundary
    resume: tokio::sync::Mutex<mpsc::UnboundedReceiver<serde_json::Value>>,
    llm: Arc<dyn LanguageModelClient>,
    documents: Arc<dyn DocumentStore>,
}

/// Cloneable handle to one task's execution state.
///
/// The body and the engine wrapper share the same context; cloning is
/// cheap (Arc internals).
#[derive(Clone)]
pub struct WorkflowContext {
    inner: Arc<ContextInner>,
}

impl WorkflowContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_id: Uuid,
        capability_id: impl Into<String>,
        progress: mpsc::UnboundedSender<Option<Notification>>,
        envelopes: mpsc::UnboundedSender<ResultEnvelope>,
        resume: mpsc::UnboundedReceiver<serde_json::Value>,
        llm: Arc<dyn LanguageModelClient>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                task_id,
                capability_id: capability_id.into(),
                log: Mutex::new(Vec::new()),
                progress,
                envelopes,
                resume: tokio::sync::Mutex::new(resume),
                llm,
                documents,
            }),
        }
    }

    pub fn task_id(&self) -> Uuid {
        self.inner.task_id
    }

    pub fn capability_id(&self) -> &str {
        &self.inner.capability_id
    }

    /// Language model collaborator; prefer `call_model` for typed errors
    pub fn llm(&self) -> &Arc<dyn LanguageModelClient> {
        &self.inner.llm
    }

    /// Flat-file persistence collaborator
    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.documents
    }

    /// Record a progress notification.
    ///
    /// Appends to the internal buffer and pushes to the progress channel
    /// in the same call, so channel order always matches call order.
    /// Pushing to a closed or missing channel is a no-op.
    pub fn log(&self, title: impl Into<String>, body: impl Into<String>) {
        let notification = Notification::new(self.inner.task_id, title, body);
        self.inner
            .log
            .lock()
            .expect("log buffer poisoned")
            .push(notification.clone());
        let _ = self.inner.progress.send(Some(notification));
    }

    /// Return and clear the notification buffer
    pub fn drain_log(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.inner.log.lock().expect("log buffer poisoned"))
    }

    /// Call the language model, wrapping failures as workflow errors
    pub async fn call_model(&self, request: LlmRequest) -> Result<LlmResponse, WorkflowError> {
        self.inner.llm.call(request).await.map_err(WorkflowError::llm)
    }

    /// Extract trimmed text content from a provider response.
    ///
    /// The standard guard before further processing: absent or empty
    /// content is a `MalformedProviderResponse`.
    pub fn require_output(&self, response: &LlmResponse) -> Result<String, WorkflowError> {
        match response.message.content.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(WorkflowError::MalformedProviderResponse),
        }
    }

    // =========================================================================
    // Envelope builders
    // =========================================================================

    fn envelope(
        &self,
        status: ResponseStatus,
        action: ResponseAction,
        data: Option<serde_json::Value>,
        error: Option<String>,
        message: EnvelopeMessage,
    ) -> ResultEnvelope {
        ResultEnvelope {
            status,
            action,
            data,
            error,
            message,
            task_id: Some(self.inner.task_id),
            timestamp: Utc::now(),
            log: self.drain_log(),
        }
    }

    /// Terminal success envelope
    pub fn success(&self, data: serde_json::Value) -> ResultEnvelope {
        self.success_with_message(data, "Workflow completed successfully", "")
    }

    pub fn success_with_message(
        &self,
        data: serde_json::Value,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> ResultEnvelope {
        self.envelope(
            ResponseStatus::Success,
            ResponseAction::WorkflowFinished,
            Some(data),
            None,
            EnvelopeMessage::new(title, body),
        )
    }

    /// Terminal envelope for a completed task with a caveat (e.g. the user
    /// declined a save step); still carries the produced data
    pub fn warning(&self, data: serde_json::Value, body: impl Into<String>) -> ResultEnvelope {
        self.envelope(
            ResponseStatus::Warning,
            ResponseAction::WorkflowFinished,
            Some(data),
            None,
            EnvelopeMessage::new("Workflow completed with warnings", body),
        )
    }

    /// Terminal failure envelope; carries the full cause chain as the
    /// diagnostic error string
    pub fn error(&self, err: &WorkflowError) -> ResultEnvelope {
        let chain = err.chain_string();
        self.envelope(
            ResponseStatus::Error,
            ResponseAction::WorkflowFailed,
            None,
            Some(chain.clone()),
            EnvelopeMessage::new("Workflow failed", chain),
        )
    }

    /// Pending envelope requesting user interaction
    pub fn interaction_request(
        &self,
        title: impl Into<String>,
        body: impl Into<String>,
        form_elements: Vec<FormElement>,
    ) -> ResultEnvelope {
        let mut message = EnvelopeMessage::new(title, body);
        message.form_elements = Some(form_elements);
        self.envelope(
            ResponseStatus::Pending,
            ResponseAction::InteractionRequest,
            None,
            None,
            message,
        )
    }

    // =========================================================================
    // Suspension primitive
    // =========================================================================

    /// Suspend at an interaction boundary.
    ///
    /// Emits a pending envelope to the scheduler (which returns it to the
    /// caller of start/resume) and parks until the matching `resume` call
    /// delivers input. Returns `Interrupted` if the engine dropped the
    /// task while suspended.
    pub async fn request_input(
        &self,
        title: impl Into<String>,
        body: impl Into<String>,
        form_elements: Vec<FormElement>,
    ) -> Result<serde_json::Value, WorkflowError> {
        let envelope = self.interaction_request(title, body, form_elements);
        debug!(task_id = %self.inner.task_id, capability = %self.inner.capability_id, "suspending at interaction boundary");
        self.inner
            .envelopes
            .send(envelope)
            .map_err(|_| WorkflowError::Interrupted)?;
        self.inner
            .resume
            .lock()
            .await
            .recv()
            .await
            .ok_or(WorkflowError::Interrupted)
    }
}
