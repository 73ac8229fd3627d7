// Language model boundary
//
// Provider adapters (OpenAI, Anthropic, ...) live outside this workspace;
// the core only fixes the call shape. Failures are opaque errors that the
// workflow context wraps into error envelopes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in a model conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A model call request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
        }
    }

    /// Single-user-message request, the common case for prompt capabilities
    pub fn prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(model, vec![ChatMessage::user(prompt)])
    }
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Metadata about a completed call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmResponseInfo {
    pub model: Option<String>,
    #[serde(default)]
    pub usage: LlmUsage,
}

/// The assistant message of a response.
///
/// `content` is optional on the wire; `WorkflowContext::require_output` is
/// the standard guard that turns an absent content into a typed error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponseMessage {
    pub role: ChatRole,
    pub content: Option<String>,
}

/// Response from a language model call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub message: LlmResponseMessage,
    #[serde(default)]
    pub info: LlmResponseInfo,
}

impl LlmResponse {
    /// Build a plain assistant text response (used by test doubles)
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            message: LlmResponseMessage {
                role: ChatRole::Assistant,
                content: Some(content.into()),
            },
            info: LlmResponseInfo::default(),
        }
    }
}

/// Boundary trait for language model providers
#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    async fn call(&self, request: LlmRequest) -> anyhow::Result<LlmResponse>;
}
