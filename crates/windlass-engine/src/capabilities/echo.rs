// Echo: returns its input unchanged. Reference capability with zero
// suspension points, also handy for transport smoke tests.

use std::sync::Arc;

use async_trait::async_trait;

use windlass_core::{
    CapabilityDescriptor, CapabilityHandler, CapabilityParams, ResultEnvelope, WorkflowContext,
    WorkflowError,
};

use super::BUILTIN_SOURCE;

pub struct EchoCapability;

#[async_trait]
impl CapabilityHandler for EchoCapability {
    async fn run(
        &self,
        ctx: WorkflowContext,
        params: CapabilityParams,
    ) -> Result<ResultEnvelope, WorkflowError> {
        Ok(ctx.success(serde_json::Value::String(params.input_text().to_string())))
    }
}

pub fn descriptor() -> CapabilityDescriptor {
    CapabilityDescriptor::new("echo", "Echo", BUILTIN_SOURCE, Arc::new(EchoCapability))
        .description("Returns the provided input unchanged.")
        .category("Test")
        .requires_input(true)
}
