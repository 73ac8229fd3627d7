// Capability registry
//
// Maps a unique capability id to its descriptor. Built at startup by a
// discovery pass; entries from a given source can be atomically replaced
// for hot reload without disturbing built-ins.

use std::collections::HashMap;

use tracing::debug;

use crate::capability::CapabilityDescriptor;
use crate::error::EngineError;

/// Registry of invokable capabilities, keyed by id
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, CapabilityDescriptor>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Last write wins: re-registering an id
    /// silently replaces the previous entry.
    pub fn register(&mut self, descriptor: CapabilityDescriptor) {
        debug!(id = %descriptor.id, source = %descriptor.source, "registering capability");
        self.capabilities.insert(descriptor.id.clone(), descriptor);
    }

    /// Strict-mode registration: fails if the id already exists
    pub fn register_strict(&mut self, descriptor: CapabilityDescriptor) -> Result<(), EngineError> {
        if self.capabilities.contains_key(&descriptor.id) {
            return Err(EngineError::DuplicateCapability(descriptor.id));
        }
        self.register(descriptor);
        Ok(())
    }

    pub fn lookup(&self, id: &str) -> Option<&CapabilityDescriptor> {
        self.capabilities.get(id)
    }

    pub fn has(&self, id: &str) -> bool {
        self.capabilities.contains_key(id)
    }

    /// List descriptors, optionally filtered by category, ordered by id
    /// for stable output
    pub fn list(&self, category: Option<&str>) -> Vec<&CapabilityDescriptor> {
        let mut entries: Vec<_> = self
            .capabilities
            .values()
            .filter(|d| category.map_or(true, |c| d.category.as_deref() == Some(c)))
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    /// Remove every descriptor registered from the given source; returns
    /// how many were removed. Supports hot reload of one source without
    /// clobbering entries from others.
    pub fn unregister_by_source(&mut self, source: &str) -> usize {
        let before = self.capabilities.len();
        self.capabilities.retain(|_, d| d.source != source);
        let removed = before - self.capabilities.len();
        if removed > 0 {
            debug!(source, removed, "unregistered capabilities by source");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.capabilities.keys().collect();
        ids.sort();
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityHandler, CapabilityParams};
    use crate::context::WorkflowContext;
    use crate::envelope::ResultEnvelope;
    use crate::error::WorkflowError;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoopHandler;

    #[async_trait]
    impl CapabilityHandler for NoopHandler {
        async fn run(
            &self,
            ctx: WorkflowContext,
            _params: CapabilityParams,
        ) -> Result<ResultEnvelope, WorkflowError> {
            Ok(ctx.success(serde_json::Value::Null))
        }
    }

    fn descriptor(id: &str, source: &str) -> CapabilityDescriptor {
        CapabilityDescriptor::new(id, id, source, Arc::new(NoopHandler))
    }

    #[test]
    fn register_then_lookup_returns_descriptor() {
        let mut registry = CapabilityRegistry::new();
        registry.register(descriptor("echo", "builtin").description("echoes input"));

        let found = registry.lookup("echo").unwrap();
        assert_eq!(found.id, "echo");
        assert_eq!(found.description, "echoes input");
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn last_write_wins_by_default() {
        let mut registry = CapabilityRegistry::new();
        registry.register(descriptor("echo", "builtin").title_check("first"));
        registry.register(descriptor("echo", "builtin").title_check("second"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("echo").unwrap().title, "second");
    }

    #[test]
    fn strict_mode_rejects_duplicates() {
        let mut registry = CapabilityRegistry::new();
        registry.register_strict(descriptor("echo", "builtin")).unwrap();
        let err = registry
            .register_strict(descriptor("echo", "builtin"))
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateCapability(id) if id == "echo"));
    }

    #[test]
    fn unregister_by_source_keeps_other_sources() {
        let mut registry = CapabilityRegistry::new();
        registry.register(descriptor("echo", "builtin"));
        registry.register(descriptor("custom_a", "user"));
        registry.register(descriptor("custom_b", "user"));

        assert_eq!(registry.unregister_by_source("user"), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.has("echo"));
        assert_eq!(registry.unregister_by_source("user"), 0);
    }

    #[test]
    fn list_filters_by_category() {
        let mut registry = CapabilityRegistry::new();
        registry.register(descriptor("b_test", "builtin").category("Test"));
        registry.register(descriptor("a_test", "builtin").category("Test"));
        registry.register(descriptor("notes", "builtin").category("Notes"));

        let test_only = registry.list(Some("Test"));
        assert_eq!(test_only.len(), 2);
        // Ordered by id
        assert_eq!(test_only[0].id, "a_test");

        assert_eq!(registry.list(None).len(), 3);
    }

    // Small helper so tests can distinguish overwritten entries
    trait TitleCheck {
        fn title_check(self, title: &str) -> Self;
    }

    impl TitleCheck for CapabilityDescriptor {
        fn title_check(mut self, title: &str) -> Self {
            self.title = title.to_string();
            self
        }
    }
}
