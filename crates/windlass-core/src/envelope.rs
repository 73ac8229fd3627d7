// Result envelope protocol
//
// Every response returned from start/resume - and mirrored into the
// progress stream - has this normalized shape: status, action, optional
// payload or error, a human-readable message, task id, timestamp, and the
// notifications accumulated since the last emission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::notification::Notification;

/// Overall outcome carried by an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
    Warning,
    Pending,
}

/// What the envelope represents in the task lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseAction {
    WorkflowFinished,
    WorkflowFailed,
    InteractionRequest,
    StatusMessage,
}

/// Declarative input element attached to interaction requests.
///
/// Describes what the client should render to collect the resume input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormElement {
    Text {
        name: String,
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
        #[serde(default)]
        required: bool,
    },
    Textarea {
        name: String,
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
        #[serde(default)]
        required: bool,
    },
    Select {
        name: String,
        label: String,
        options: Vec<String>,
        #[serde(default)]
        required: bool,
    },
}

impl FormElement {
    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        FormElement::Text {
            name: name.into(),
            label: label.into(),
            placeholder: None,
            required: false,
        }
    }

    pub fn select(
        name: impl Into<String>,
        label: impl Into<String>,
        options: Vec<String>,
    ) -> Self {
        FormElement::Select {
            name: name.into(),
            label: label.into(),
            options,
            required: true,
        }
    }
}

/// Human-readable message part of an envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeMessage {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_elements: Option<Vec<FormElement>>,
}

impl EnvelopeMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            form_elements: None,
        }
    }
}

/// Normalized response shape for every start/resume result.
///
/// Invariants: `data` is populated on success, `error` on failure; pending
/// envelopes always carry `form_elements` describing the expected input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub status: ResponseStatus,
    pub action: ResponseAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: EnvelopeMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<Notification>,
}

impl ResultEnvelope {
    /// Terminal envelopes end the task (normal completion or failure)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.action,
            ResponseAction::WorkflowFinished | ResponseAction::WorkflowFailed
        )
    }

    /// Pending envelopes suspend the task, awaiting resume input
    pub fn is_pending(&self) -> bool {
        self.action == ResponseAction::InteractionRequest
    }

    /// Failure envelope for a task that died without producing a terminal
    /// envelope (body panic). Built outside any context since the context
    /// is gone with the body.
    pub fn failed(task_id: Uuid, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            status: ResponseStatus::Error,
            action: ResponseAction::WorkflowFailed,
            data: None,
            error: Some(error.clone()),
            message: EnvelopeMessage::new("Workflow failed", error),
            task_id: Some(task_id),
            timestamp: Utc::now(),
            log: Vec::new(),
        }
    }

    /// Wire envelope for a pre-flight engine error, for transports that
    /// answer with an error body alongside the status code.
    pub fn from_engine_error(err: &EngineError) -> Self {
        let text = err.to_string();
        Self {
            status: ResponseStatus::Error,
            action: ResponseAction::WorkflowFailed,
            data: None,
            error: Some(text.clone()),
            message: EnvelopeMessage::new("Error", text),
            task_id: None,
            timestamp: Utc::now(),
            log: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_action_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(ResponseStatus::Pending).unwrap(),
            serde_json::json!("pending")
        );
        assert_eq!(
            serde_json::to_value(ResponseAction::InteractionRequest).unwrap(),
            serde_json::json!("interaction_request")
        );
    }

    #[test]
    fn empty_fields_are_omitted() {
        let envelope = ResultEnvelope::failed(Uuid::now_v7(), "boom");
        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value.get("data").is_none());
        assert!(value.get("log").is_none());
        assert_eq!(value["error"], serde_json::json!("boom"));
        assert_eq!(value["action"], serde_json::json!("workflow_failed"));
    }

    #[test]
    fn form_elements_tag_by_type() {
        let element = FormElement::select(
            "save-confirm",
            "Do you want to save it?",
            vec!["Yes".into(), "No".into()],
        );
        let value = serde_json::to_value(&element).unwrap();
        assert_eq!(value["type"], serde_json::json!("select"));
        assert_eq!(value["options"][0], serde_json::json!("Yes"));
        assert_eq!(value["required"], serde_json::json!(true));
    }

    #[test]
    fn engine_error_envelope_is_terminal() {
        let envelope =
            ResultEnvelope::from_engine_error(&EngineError::CapabilityNotFound("x".into()));
        assert!(envelope.is_terminal());
        assert_eq!(envelope.status, ResponseStatus::Error);
        assert!(envelope.task_id.is_none());
    }
}
