// Write story: generates a short story, then asks for confirmation
// before each save step. Two interaction boundaries in sequence; each
// requires exactly one resume before the next is reachable. Declining a
// save completes the task with a warning envelope.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use windlass_core::{
    CapabilityDescriptor, CapabilityHandler, CapabilityParams, FormElement, LlmRequest,
    ResultEnvelope, WorkflowContext, WorkflowError,
};

use super::BUILTIN_SOURCE;

const STORIES_FILE: &str = "files/stories.md";
const STORIES_DB: &str = "files/databases/stories.json";

pub struct WriteStoryCapability;

fn confirm_form() -> Vec<FormElement> {
    vec![FormElement::select(
        "save-confirm",
        "Do you want to save it?",
        vec!["Yes".into(), "No".into()],
    )]
}

fn confirmed(input: &serde_json::Value) -> bool {
    input.get("save-confirm").and_then(|v| v.as_str()) == Some("Yes")
}

#[async_trait]
impl CapabilityHandler for WriteStoryCapability {
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
            "Write a short feel-good story based on this idea:\n{}",
            params.input_text()
        );

        let response = ctx.call_model(LlmRequest::prompt(model, prompt)).await?;
        let story = ctx.require_output(&response)?;
        ctx.log("Story generated", &story);

        let save_file = ctx
            .request_input(
                "Confirmation required",
                "Do you want to save the result to file?",
                confirm_form(),
            )
            .await?;
        if !confirmed(&save_file) {
            return Ok(ctx.warning(json!(story), "Note: result not saved to file."));
        }

        ctx.documents()
            .append_text(STORIES_FILE, &format!("{story}\n\n-----\n"))
            .await
            .map_err(WorkflowError::storage)?;
        ctx.log("Story saved", format!("Saved to {STORIES_FILE}"));

        let save_db = ctx
            .request_input(
                "Confirmation required",
                "Do you want to save the result to the story database?",
                confirm_form(),
            )
            .await?;
        if !confirmed(&save_db) {
            return Ok(ctx.warning(json!(story), "Note: result not saved to the story database."));
        }

        ctx.documents()
            .add_entry(
                STORIES_DB,
                "entries",
                json!({
                    "input": params.input_text(),
                    "content": story,
                }),
            )
            .await
            .map_err(WorkflowError::storage)?;
        ctx.log("Story archived", format!("Entry added to {STORIES_DB}"));

        Ok(ctx.success(json!(story)))
    }
}

pub fn descriptor() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "write_story",
        "Write Story",
        BUILTIN_SOURCE,
        Arc::new(WriteStoryCapability),
    )
    .description("Generates a short feel-good story and saves it on confirmation.")
    .category("Writing")
    .default_model("gpt-4o")
    .requires_input(true)
}
