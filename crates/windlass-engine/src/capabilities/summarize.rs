// Summarize text: single model call, summary saved to the summaries file

use std::sync::Arc;

use async_trait::async_trait;

use windlass_core::{
    CapabilityDescriptor, CapabilityHandler, CapabilityParams, LlmRequest, ResultEnvelope,
    WorkflowContext, WorkflowError,
};

use super::BUILTIN_SOURCE;

const SUMMARIES_FILE: &str = "files/summaries.md";

pub struct SummarizeTextCapability;

#[async_trait]
impl CapabilityHandler for SummarizeTextCapability {
    async fn run(
        &self,
        ctx: WorkflowContext,
        params: CapabilityParams,
    ) -> Result<ResultEnvelope, WorkflowError> {
        let model = params
            .model
            .clone()
            .unwrap_or_else(|| "gpt-4o".to_string());
        let prompt = format!(
            "Summarize the following text into a few concise sentences. \
             Keep the key facts, drop filler.\n\nText:\n{}",
            params.input_text()
        );

        ctx.log("Summarizing", format!("model: {model}"));
        let response = ctx.call_model(LlmRequest::prompt(model, prompt)).await?;
        let summary = ctx.require_output(&response)?;

        ctx.documents()
            .append_text(SUMMARIES_FILE, &format!("{summary}\n\n-----\n"))
            .await
            .map_err(WorkflowError::storage)?;
        ctx.log("Summary saved", format!("Saved to {SUMMARIES_FILE}"));

        Ok(ctx.success_with_message(
            serde_json::Value::String(summary),
            "Workflow completed successfully",
            format!("Summary saved to {SUMMARIES_FILE}"),
        ))
    }
}

pub fn descriptor() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "summarize_text",
        "Text Summarization",
        BUILTIN_SOURCE,
        Arc::new(SummarizeTextCapability),
    )
    .description("Summarizes the provided text and saves the summary.")
    .category("Writing")
    .default_model("gpt-4o")
    .requires_input(true)
}
