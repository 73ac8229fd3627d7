// Capability discovery from declarative manifests
//
// User-supplied capabilities are TOML manifests under per-tenant root
// directories, each defining prompt-template capabilities that render
// `{input}` into a prompt and call the language model. Reloading a root
// first removes that root's registry entries, so built-ins and other
// roots are never disturbed. Loading arbitrary compiled code at runtime
// is deliberately not supported.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use windlass_core::{
    CapabilityDescriptor, CapabilityHandler, CapabilityParams, EngineError, LlmRequest,
    ResultEnvelope, WorkflowContext, WorkflowError,
};

/// One discovery root: a directory of manifests and the source tag its
/// capabilities are registered under
#[derive(Debug, Clone)]
pub struct CapabilityRoot {
    pub source: String,
    pub path: PathBuf,
}

impl CapabilityRoot {
    pub fn new(source: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
        }
    }
}

/// Discovery configuration, wired at startup (no ambient globals)
#[derive(Debug, Clone, Default)]
pub struct DiscoveryConfig {
    pub roots: Vec<CapabilityRoot>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    capability: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    model: Option<String>,
    prompt: String,
    #[serde(default = "default_requires_input")]
    requires_input: bool,
}

fn default_requires_input() -> bool {
    true
}

/// Handler for manifest-defined capabilities: render the prompt template
/// and return the model's output
struct PromptCapability {
    prompt: String,
}

#[async_trait]
impl CapabilityHandler for PromptCapability {
    async fn run(
        &self,
        ctx: WorkflowContext,
        params: CapabilityParams,
    ) -> Result<ResultEnvelope, WorkflowError> {
        let model = params
            .model
            .clone()
            .ok_or_else(|| WorkflowError::Other(anyhow::anyhow!("no model configured")))?;
        let prompt = self.prompt.replace("{input}", params.input_text());

        ctx.log("Calling model", format!("model: {model}"));
        let response = ctx.call_model(LlmRequest::prompt(model, prompt)).await?;
        let output = ctx.require_output(&response)?;

        Ok(ctx.success(serde_json::Value::String(output)))
    }
}

/// Run discovery over every configured root. Idempotent: each root is
/// cleared (by source tag) before re-scanning. Returns how many
/// capabilities were registered.
pub fn discover(
    registry: &mut windlass_core::CapabilityRegistry,
    config: &DiscoveryConfig,
) -> Result<usize, EngineError> {
    let mut registered = 0;
    for root in &config.roots {
        registered += reload_root(registry, root)?;
    }
    Ok(registered)
}

/// Reload one root: drop its previous entries, then re-scan its
/// manifests. Entries from other sources (built-ins included) stay put.
pub fn reload_root(
    registry: &mut windlass_core::CapabilityRegistry,
    root: &CapabilityRoot,
) -> Result<usize, EngineError> {
    registry.unregister_by_source(&root.source);

    if !root.path.is_dir() {
        debug!(source = %root.source, path = %root.path.display(), "discovery root missing, skipping");
        return Ok(0);
    }

    let mut registered = 0;
    let mut paths: Vec<PathBuf> = std::fs::read_dir(&root.path)
        .map_err(|e| discovery_error(&root.path, &e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    // Deterministic registration order so duplicate ids resolve stably
    paths.sort();

    for path in paths {
        let raw = std::fs::read_to_string(&path).map_err(|e| discovery_error(&path, &e))?;
        let manifest: Manifest =
            toml::from_str(&raw).map_err(|e| discovery_error(&path, &e))?;

        for entry in manifest.capability {
            let mut descriptor = CapabilityDescriptor::new(
                entry.id,
                entry.title,
                root.source.clone(),
                Arc::new(PromptCapability {
                    prompt: entry.prompt,
                }),
            )
            .description(entry.description)
            .requires_input(entry.requires_input);
            if let Some(category) = entry.category {
                descriptor = descriptor.category(category);
            }
            if let Some(model) = entry.model {
                descriptor = descriptor.default_model(model);
            }
            registry.register(descriptor);
            registered += 1;
        }
    }

    info!(source = %root.source, path = %root.path.display(), registered, "capability root loaded");
    Ok(registered)
}

fn discovery_error(path: &Path, err: &dyn std::fmt::Display) -> EngineError {
    EngineError::Discovery(format!("{}: {}", path.display(), err))
}
