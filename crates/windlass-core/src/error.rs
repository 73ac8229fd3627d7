// Error types for the orchestration core

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for engine-level operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised before a workflow body ever runs, or when addressing a
/// task that no longer exists.
///
/// These are returned as typed errors so the transport layer can map them
/// to 400-class responses; they never enter the suspend/resume machinery.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested capability is not in the registry
    #[error("capability not found: {0}")]
    CapabilityNotFound(String),

    /// The capability declares a required input that was not provided
    #[error("capability '{0}' requires an input")]
    MissingRequiredInput(String),

    /// The task id is unknown, already terminated, or from a previous process
    #[error("unknown or expired task: {0}")]
    UnknownOrExpiredTask(Uuid),

    /// Strict-mode registration hit an existing capability id
    #[error("capability already registered: {0}")]
    DuplicateCapability(String),

    /// A capability manifest could not be read or parsed
    #[error("capability discovery failed: {0}")]
    Discovery(String),
}

/// Errors raised inside a running workflow body.
///
/// The scheduler converts these into `error` result envelopes at its
/// boundary; they never leak to the transport layer. Wrapped causes are
/// kept as source chains rather than re-stringified at each level.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Provider response had no usable message content
    #[error("provider response did not contain message content")]
    MalformedProviderResponse,

    /// Language model call failed
    #[error("language model call failed")]
    Llm(#[source] anyhow::Error),

    /// Persistence collaborator failed
    #[error("storage operation failed")]
    Storage(#[source] anyhow::Error),

    /// The engine went away while the body was suspended
    #[error("workflow interrupted before completion")]
    Interrupted,

    /// Catch-all for anything else a capability body raises
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkflowError {
    /// Wrap a language model failure
    pub fn llm(err: impl Into<anyhow::Error>) -> Self {
        WorkflowError::Llm(err.into())
    }

    /// Wrap a persistence failure
    pub fn storage(err: impl Into<anyhow::Error>) -> Self {
        WorkflowError::Storage(err.into())
    }

    /// Render the error with its full cause chain, colon-separated.
    ///
    /// Used for the diagnostic `error` field of failure envelopes; no
    /// stack traces cross the boundary, only this string.
    pub fn chain_string(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str(": ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_string_includes_causes() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "db missing");
        let err = WorkflowError::storage(anyhow::Error::new(io).context("saving note"));
        let chain = err.chain_string();
        assert!(chain.starts_with("storage operation failed"));
        assert!(chain.contains("saving note"));
        assert!(chain.contains("db missing"));
    }

    #[test]
    fn anyhow_converts_to_other() {
        fn fails() -> std::result::Result<(), WorkflowError> {
            Err(anyhow::anyhow!("boom"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(WorkflowError::Other(_))));
    }
}
