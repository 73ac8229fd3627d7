// Capability descriptors and the handler trait
//
// A capability is a named, invokable operation with declared metadata.
// Descriptors are built explicitly (by built-in registration code or by
// manifest discovery) instead of being attached to functions at runtime.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::WorkflowContext;
use crate::envelope::ResultEnvelope;
use crate::error::WorkflowError;

/// Parameters passed to a capability invocation.
///
/// `input` and `model` are the declared well-known parameters; anything
/// else the transport forwards lands in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CapabilityParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: impl Into<String>) -> Self {
        Self {
            input: Some(input.into()),
            ..Self::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Trimmed input text, empty if none was provided
    pub fn input_text(&self) -> &str {
        self.input.as_deref().map(str::trim).unwrap_or("")
    }
}

/// A capability body.
///
/// Runs to completion or suspends cooperatively at interaction boundaries
/// via `ctx.request_input`. Errors returned here are converted to `error`
/// envelopes at the scheduler boundary, never propagated to the caller.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    async fn run(
        &self,
        ctx: WorkflowContext,
        params: CapabilityParams,
    ) -> Result<ResultEnvelope, WorkflowError>;
}

/// A registered capability: unique id, display metadata, and its handler
#[derive(Clone)]
pub struct CapabilityDescriptor {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub default_model: Option<String>,
    pub requires_input: bool,
    /// Which discovery root registered this entry; hot reload replaces
    /// entries per source without disturbing the rest
    pub source: String,
    pub handler: Arc<dyn CapabilityHandler>,
}

impl CapabilityDescriptor {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        source: impl Into<String>,
        handler: Arc<dyn CapabilityHandler>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category: None,
            default_model: None,
            requires_input: false,
            source: source.into(),
            handler,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn requires_input(mut self, requires_input: bool) -> Self {
        self.requires_input = requires_input;
        self
    }
}

impl fmt::Debug for CapabilityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityDescriptor")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("category", &self.category)
            .field("source", &self.source)
            .field("requires_input", &self.requires_input)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_deserialize_extra_fields() {
        let params: CapabilityParams = serde_json::from_value(serde_json::json!({
            "input": "  hello  ",
            "model": "gpt-4o",
            "temperature": 0.2
        }))
        .unwrap();

        assert_eq!(params.input_text(), "hello");
        assert_eq!(params.model.as_deref(), Some("gpt-4o"));
        assert_eq!(
            params.extra.get("temperature"),
            Some(&serde_json::json!(0.2))
        );
    }

    #[test]
    fn input_text_defaults_to_empty() {
        assert_eq!(CapabilityParams::new().input_text(), "");
    }
}
