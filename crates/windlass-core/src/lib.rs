// Protocol and boundary types for the windlass orchestration core
//
// This crate is execution-agnostic: it defines the normalized result
// envelope protocol, the capability registry, the per-invocation workflow
// context, and the collaborator traits (LLM client, audit sink, document
// store) that the engine wires together.
//
// Key design decisions:
// - Collaborators are traits so the engine can run against in-memory
//   implementations in tests and real adapters in production
// - Capability bodies are async handlers that may suspend any number of
//   times through WorkflowContext::request_input
// - Envelope builders drain the context's notification buffer, so each
//   emission carries only the log entries new since the previous one

pub mod capability;
pub mod context;
pub mod envelope;
pub mod error;
pub mod llm;
pub mod memory;
pub mod notification;
pub mod persistence;
pub mod registry;

pub use capability::{CapabilityDescriptor, CapabilityHandler, CapabilityParams};
pub use context::WorkflowContext;
pub use envelope::{EnvelopeMessage, FormElement, ResponseAction, ResponseStatus, ResultEnvelope};
pub use error::{EngineError, WorkflowError};
pub use llm::{ChatMessage, ChatRole, LanguageModelClient, LlmRequest, LlmResponse};
pub use notification::Notification;
pub use persistence::{AuditRecord, AuditSink, DocumentStore};
pub use registry::CapabilityRegistry;
