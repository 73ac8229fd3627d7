// Built-in capabilities
//
// Registered under the "builtin" source tag so manifest reloads never
// touch them. Each capability is in its own file.

mod echo;
mod quick_note;
mod story;
mod summarize;

pub use echo::EchoCapability;
pub use quick_note::TakeQuickNoteCapability;
pub use story::WriteStoryCapability;
pub use summarize::SummarizeTextCapability;

use windlass_core::CapabilityRegistry;

/// Source tag for built-in registrations
pub const BUILTIN_SOURCE: &str = "builtin";

/// Register all built-in capabilities
pub fn register_builtins(registry: &mut CapabilityRegistry) {
    registry.register(echo::descriptor());
    registry.register(summarize::descriptor());
    registry.register(story::descriptor());
    registry.register(quick_note::descriptor());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_register_under_builtin_source() {
        let mut registry = CapabilityRegistry::new();
        register_builtins(&mut registry);

        for id in ["echo", "summarize_text", "write_story", "take_quick_note"] {
            let descriptor = registry.lookup(id).unwrap_or_else(|| panic!("missing {id}"));
            assert_eq!(descriptor.source, BUILTIN_SOURCE);
        }
        assert_eq!(registry.unregister_by_source(BUILTIN_SOURCE), 4);
    }
}
