// End-to-end lifecycle tests for the suspend/resume engine

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use windlass_core::memory::{
    FailingAuditSink, FailingLanguageModel, MemoryAuditSink, MemoryDocumentStore,
    ScriptedLanguageModel,
};
use windlass_core::{
    CapabilityDescriptor, CapabilityHandler, CapabilityParams, CapabilityRegistry, EngineError,
    ResponseAction, ResponseStatus, ResultEnvelope, WorkflowContext, WorkflowError,
};
use windlass_engine::capabilities::register_builtins;
use windlass_engine::{Collaborators, TaskScheduler};

// ============================================================================
// Test capabilities
// ============================================================================

/// One interaction boundary: logs step1, suspends, logs step2, returns
/// the resume input as data
struct ConfirmCapability;

#[async_trait]
impl CapabilityHandler for ConfirmCapability {
    async fn run(
        &self,
        ctx: WorkflowContext,
        _params: CapabilityParams,
    ) -> Result<ResultEnvelope, WorkflowError> {
        ctx.log("step1", "");
        let input = ctx.request_input("Confirm", "Continue?", vec![]).await?;
        ctx.log("step2", "");
        Ok(ctx.success(input))
    }
}

/// N sequential interaction boundaries; returns the collected inputs
struct MultiStepCapability {
    boundaries: usize,
}

#[async_trait]
impl CapabilityHandler for MultiStepCapability {
    async fn run(
        &self,
        ctx: WorkflowContext,
        _params: CapabilityParams,
    ) -> Result<ResultEnvelope, WorkflowError> {
        let mut inputs = Vec::new();
        for step in 0..self.boundaries {
            ctx.log(format!("before-{step}"), "");
            let input = ctx
                .request_input(format!("Step {step}"), "", vec![])
                .await?;
            inputs.push(input);
        }
        Ok(ctx.success(json!(inputs)))
    }
}

/// Fails immediately with a workflow error
struct FailingCapability;

#[async_trait]
impl CapabilityHandler for FailingCapability {
    async fn run(
        &self,
        ctx: WorkflowContext,
        _params: CapabilityParams,
    ) -> Result<ResultEnvelope, WorkflowError> {
        ctx.log("about to fail", "");
        Err(WorkflowError::Other(anyhow::anyhow!("simulated failure")))
    }
}

/// Fails after its first suspension point
struct FailAfterResumeCapability;

#[async_trait]
impl CapabilityHandler for FailAfterResumeCapability {
    async fn run(
        &self,
        ctx: WorkflowContext,
        _params: CapabilityParams,
    ) -> Result<ResultEnvelope, WorkflowError> {
        ctx.request_input("Confirm", "", vec![]).await?;
        Err(WorkflowError::Other(anyhow::anyhow!("late failure")))
    }
}

/// Panics mid-body; must still surface as an error envelope
struct PanickingCapability;

#[async_trait]
impl CapabilityHandler for PanickingCapability {
    async fn run(
        &self,
        _ctx: WorkflowContext,
        _params: CapabilityParams,
    ) -> Result<ResultEnvelope, WorkflowError> {
        panic!("capability body panicked");
    }
}

/// Calls the language model and echoes its output
struct ModelBackedCapability;

#[async_trait]
impl CapabilityHandler for ModelBackedCapability {
    async fn run(
        &self,
        ctx: WorkflowContext,
        params: CapabilityParams,
    ) -> Result<ResultEnvelope, WorkflowError> {
        let model = params.model.clone().unwrap_or_else(|| "gpt-4o".into());
        let response = ctx
            .call_model(windlass_core::LlmRequest::prompt(model, params.input_text()))
            .await?;
        let text = ctx.require_output(&response)?;
        Ok(ctx.success(json!(text)))
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    scheduler: TaskScheduler,
    audit: Arc<MemoryAuditSink>,
    documents: Arc<MemoryDocumentStore>,
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn test_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    register_builtins(&mut registry);
    registry.register(CapabilityDescriptor::new(
        "confirm",
        "Confirm",
        "test",
        Arc::new(ConfirmCapability),
    ));
    registry.register(CapabilityDescriptor::new(
        "two_step",
        "Two Step",
        "test",
        Arc::new(MultiStepCapability { boundaries: 2 }),
    ));
    registry.register(CapabilityDescriptor::new(
        "failing",
        "Failing",
        "test",
        Arc::new(FailingCapability),
    ));
    registry.register(CapabilityDescriptor::new(
        "fail_after_resume",
        "Fail After Resume",
        "test",
        Arc::new(FailAfterResumeCapability),
    ));
    registry.register(CapabilityDescriptor::new(
        "panicking",
        "Panicking",
        "test",
        Arc::new(PanickingCapability),
    ));
    registry.register(
        CapabilityDescriptor::new(
            "model_backed",
            "Model Backed",
            "test",
            Arc::new(ModelBackedCapability),
        )
        .default_model("gpt-4o"),
    );
    registry
}

fn harness_with_model(llm: Arc<dyn windlass_core::LanguageModelClient>) -> Harness {
    init_tracing();
    let audit = Arc::new(MemoryAuditSink::new());
    let documents = Arc::new(MemoryDocumentStore::new());
    let scheduler = TaskScheduler::new(
        test_registry(),
        Collaborators {
            llm,
            documents: documents.clone(),
            audit: audit.clone(),
        },
    );
    Harness {
        scheduler,
        audit,
        documents,
    }
}

fn harness() -> Harness {
    harness_with_model(Arc::new(ScriptedLanguageModel::new()))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn echo_completes_without_suspension() {
    let h = harness();
    let envelope = h
        .scheduler
        .start("echo", CapabilityParams::with_input("hi"))
        .await
        .unwrap();

    assert_eq!(envelope.status, ResponseStatus::Success);
    assert_eq!(envelope.action, ResponseAction::WorkflowFinished);
    assert_eq!(envelope.data, Some(json!("hi")));

    // No residue: task table and channel map are empty
    assert_eq!(h.scheduler.task_count(), 0);
    assert!(h.scheduler.channels().is_empty());
}

#[tokio::test]
async fn unknown_capability_is_typed_error_and_leaves_no_state() {
    let h = harness();
    let err = h
        .scheduler
        .start("nonexistent_capability", CapabilityParams::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::CapabilityNotFound(ref id) if id == "nonexistent_capability"));
    assert_eq!(h.scheduler.task_count(), 0);
    assert!(h.scheduler.channels().is_empty());
    assert!(h.audit.records().await.is_empty());
}

#[tokio::test]
async fn missing_required_input_is_rejected_before_start() {
    let h = harness();
    let err = h
        .scheduler
        .start("echo", CapabilityParams::with_input("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::MissingRequiredInput(ref id) if id == "echo"));

    let err = h.scheduler.start("echo", CapabilityParams::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::MissingRequiredInput(_)));
    assert_eq!(h.scheduler.task_count(), 0);
}

#[tokio::test]
async fn confirm_suspends_then_resumes_with_input() {
    let h = harness();

    let pending = h
        .scheduler
        .start("confirm", CapabilityParams::new())
        .await
        .unwrap();
    assert_eq!(pending.status, ResponseStatus::Pending);
    assert_eq!(pending.action, ResponseAction::InteractionRequest);
    assert!(pending.message.form_elements.is_some());

    // Log of the pending envelope holds exactly the pre-suspension entries
    assert_eq!(pending.log.len(), 1);
    assert_eq!(pending.log[0].title(), "step1");

    let task_id = pending.task_id.unwrap();
    assert!(h.scheduler.has_task(task_id));

    let done = h.scheduler.resume(task_id, json!("yes")).await.unwrap();
    assert_eq!(done.status, ResponseStatus::Success);
    assert_eq!(done.data, Some(json!("yes")));
    assert_eq!(done.log.len(), 1);
    assert_eq!(done.log[0].title(), "step2");

    // Terminated: task gone, channel closed
    assert!(!h.scheduler.has_task(task_id));
    assert!(!h.scheduler.channels().contains(task_id));
}

#[tokio::test]
async fn n_boundaries_require_exactly_n_resumes() {
    let h = harness();

    let pending = h
        .scheduler
        .start("two_step", CapabilityParams::new())
        .await
        .unwrap();
    let task_id = pending.task_id.unwrap();
    assert!(pending.is_pending());

    let second = h.scheduler.resume(task_id, json!("first")).await.unwrap();
    assert!(second.is_pending());

    let done = h.scheduler.resume(task_id, json!("second")).await.unwrap();
    assert_eq!(done.status, ResponseStatus::Success);
    assert_eq!(done.data, Some(json!(["first", "second"])));

    // Resume N+1 fails and mutates nothing
    let err = h.scheduler.resume(task_id, json!("extra")).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownOrExpiredTask(id) if id == task_id));
    assert_eq!(h.scheduler.task_count(), 0);
}

#[tokio::test]
async fn resume_of_unknown_task_never_mutates_state() {
    let h = harness();
    let pending = h
        .scheduler
        .start("confirm", CapabilityParams::new())
        .await
        .unwrap();
    let live_task = pending.task_id.unwrap();

    let err = h
        .scheduler
        .resume(uuid::Uuid::now_v7(), json!("bogus"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownOrExpiredTask(_)));

    // The live suspended task is untouched
    assert!(h.scheduler.has_task(live_task));
    assert_eq!(h.scheduler.task_count(), 1);
}

#[tokio::test]
async fn body_error_becomes_error_envelope_and_tears_down() {
    let h = harness();
    let envelope = h
        .scheduler
        .start("failing", CapabilityParams::new())
        .await
        .unwrap();

    assert_eq!(envelope.status, ResponseStatus::Error);
    assert_eq!(envelope.action, ResponseAction::WorkflowFailed);
    let error = envelope.error.as_deref().unwrap();
    assert!(error.contains("simulated failure"));
    // Buffered log entries still ride along on the failure envelope
    assert_eq!(envelope.log.len(), 1);

    assert_eq!(h.scheduler.task_count(), 0);
    assert!(h.scheduler.channels().is_empty());
}

#[tokio::test]
async fn error_after_resume_tears_down_and_blocks_further_resumes() {
    let h = harness();
    let pending = h
        .scheduler
        .start("fail_after_resume", CapabilityParams::new())
        .await
        .unwrap();
    let task_id = pending.task_id.unwrap();

    let failed = h.scheduler.resume(task_id, json!("go")).await.unwrap();
    assert_eq!(failed.status, ResponseStatus::Error);

    // Erroring always tears down; the task cannot stay suspended
    let err = h.scheduler.resume(task_id, json!("again")).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownOrExpiredTask(_)));
}

#[tokio::test]
async fn panicking_body_surfaces_as_error_envelope() {
    let h = harness();
    let envelope = h
        .scheduler
        .start("panicking", CapabilityParams::new())
        .await
        .unwrap();

    assert_eq!(envelope.status, ResponseStatus::Error);
    assert_eq!(envelope.action, ResponseAction::WorkflowFailed);
    assert_eq!(h.scheduler.task_count(), 0);
    assert!(h.scheduler.channels().is_empty());
}

#[tokio::test]
async fn provider_failure_is_wrapped_not_propagated() {
    let h = harness_with_model(Arc::new(FailingLanguageModel));
    let envelope = h
        .scheduler
        .start("model_backed", CapabilityParams::with_input("hello"))
        .await
        .unwrap();

    assert_eq!(envelope.status, ResponseStatus::Error);
    let error = envelope.error.unwrap();
    assert!(error.contains("language model call failed"));
    assert!(error.contains("provider unavailable"));
}

#[tokio::test]
async fn progress_subscriber_receives_notifications_then_close() {
    let h = harness();
    let pending = h
        .scheduler
        .start("confirm", CapabilityParams::new())
        .await
        .unwrap();
    let task_id = pending.task_id.unwrap();

    let mut stream = h.scheduler.subscribe(task_id).unwrap();
    assert_eq!(stream.recv().await.unwrap().title(), "step1");

    let done = h.scheduler.resume(task_id, json!("ok")).await.unwrap();
    assert!(done.is_terminal());

    // step2 was pushed before teardown; then the sentinel ends the stream
    assert_eq!(stream.recv().await.unwrap().title(), "step2");
    assert!(stream.recv().await.is_none());
}

#[tokio::test]
async fn audit_record_written_once_at_terminal_state() {
    let h = harness();

    let pending = h
        .scheduler
        .start("confirm", CapabilityParams::new())
        .await
        .unwrap();
    let task_id = pending.task_id.unwrap();
    // Suspension is not terminal: nothing persisted yet
    assert!(h.audit.records().await.is_empty());

    h.scheduler.resume(task_id, json!("yes")).await.unwrap();
    let records = h.audit.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].task_id, task_id);
    assert_eq!(records[0].capability_id, "confirm");
    assert_eq!(records[0].status, ResponseStatus::Success);
}

#[tokio::test]
async fn audit_failures_are_swallowed() {
    let audit: Arc<FailingAuditSink> = Arc::new(FailingAuditSink);
    let scheduler = TaskScheduler::new(
        test_registry(),
        Collaborators {
            llm: Arc::new(ScriptedLanguageModel::new()),
            documents: Arc::new(MemoryDocumentStore::new()),
            audit,
        },
    );

    let envelope = scheduler
        .start("echo", CapabilityParams::with_input("hi"))
        .await
        .unwrap();
    assert_eq!(envelope.status, ResponseStatus::Success);
}

#[tokio::test]
async fn abandon_discards_suspended_task() {
    let h = harness();
    let pending = h
        .scheduler
        .start("confirm", CapabilityParams::new())
        .await
        .unwrap();
    let task_id = pending.task_id.unwrap();

    h.scheduler.abandon(task_id).await.unwrap();
    assert!(!h.scheduler.has_task(task_id));
    assert!(!h.scheduler.channels().contains(task_id));

    let err = h.scheduler.resume(task_id, json!("late")).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownOrExpiredTask(_)));

    let err = h.scheduler.abandon(task_id).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownOrExpiredTask(_)));
}

#[tokio::test]
async fn default_model_applies_when_params_omit_it() {
    let llm = Arc::new(ScriptedLanguageModel::with_responses(["model output"]));
    let h = harness_with_model(llm.clone());

    let envelope = h
        .scheduler
        .start("model_backed", CapabilityParams::with_input("prompt text"))
        .await
        .unwrap();
    assert_eq!(envelope.data, Some(json!("model output")));

    let requests = llm.requests().await;
    assert_eq!(requests.len(), 1);
    // Descriptor's default model filled in by the scheduler
    assert_eq!(requests[0].model, "gpt-4o");
}

#[tokio::test]
async fn write_story_full_interactive_run() {
    let llm = Arc::new(ScriptedLanguageModel::with_responses([
        "Once upon a time, everything worked out.",
    ]));
    let h = harness_with_model(llm);

    let pending = h
        .scheduler
        .start("write_story", CapabilityParams::with_input("a lucky day"))
        .await
        .unwrap();
    let task_id = pending.task_id.unwrap();
    assert!(pending.is_pending());
    assert_eq!(pending.log.len(), 1);
    assert_eq!(pending.log[0].title(), "Story generated");

    // Confirm file save; second boundary appears
    let second = h
        .scheduler
        .resume(task_id, json!({"save-confirm": "Yes"}))
        .await
        .unwrap();
    assert!(second.is_pending());

    // Decline the database save: warning, but story data still returned
    let done = h
        .scheduler
        .resume(task_id, json!({"save-confirm": "No"}))
        .await
        .unwrap();
    assert_eq!(done.status, ResponseStatus::Warning);
    assert_eq!(
        done.data,
        Some(json!("Once upon a time, everything worked out."))
    );

    // File was written, database was not
    assert!(h
        .documents
        .text("files/stories.md")
        .await
        .contains("Once upon a time"));
    assert!(h
        .documents
        .collection("files/databases/stories.json", "entries")
        .await
        .is_empty());
}

#[tokio::test]
async fn take_quick_note_persists_to_db_and_file() {
    let h = harness();
    let envelope = h
        .scheduler
        .start("take_quick_note", CapabilityParams::with_input("  remember this  "))
        .await
        .unwrap();

    assert_eq!(envelope.status, ResponseStatus::Success);
    assert_eq!(envelope.data, Some(json!("remember this")));
    assert_eq!(envelope.log.len(), 2);

    let notes = h
        .documents
        .collection("files/databases/quick_notes.json", "notes")
        .await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["content"], json!("remember this"));
    assert!(h
        .documents
        .text("files/quick_notes.md")
        .await
        .starts_with("remember this"));
}
