// Take quick note: persists a note to the notes database and the notes
// file. No model call, no suspension points.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use windlass_core::{
    CapabilityDescriptor, CapabilityHandler, CapabilityParams, ResultEnvelope, WorkflowContext,
    WorkflowError,
};

use super::BUILTIN_SOURCE;

const NOTES_FILE: &str = "files/quick_notes.md";
const NOTES_DB: &str = "files/databases/quick_notes.json";

pub struct TakeQuickNoteCapability;

#[async_trait]
impl CapabilityHandler for TakeQuickNoteCapability {
    async fn run(
        &self,
        ctx: WorkflowContext,
        params: CapabilityParams,
    ) -> Result<ResultEnvelope, WorkflowError> {
        let note = params.input_text().to_string();

        ctx.documents()
            .add_entry(NOTES_DB, "notes", json!({ "content": note }))
            .await
            .map_err(WorkflowError::storage)?;
        ctx.log("Note saved", format!("Entry added to {NOTES_DB}"));

        ctx.documents()
            .append_text(NOTES_FILE, &format!("{note}\n-----\n"))
            .await
            .map_err(WorkflowError::storage)?;
        ctx.log("Note saved", format!("Prepended to {NOTES_FILE}"));

        Ok(ctx.success(json!(note)))
    }
}

pub fn descriptor() -> CapabilityDescriptor {
    CapabilityDescriptor::new(
        "take_quick_note",
        "Take Quick Note",
        BUILTIN_SOURCE,
        Arc::new(TakeQuickNoteCapability),
    )
    .description("Saves a quick note to the notes database and notes file.")
    .category("Notes")
    .requires_input(true)
}
