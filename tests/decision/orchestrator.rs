use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use clarity::{
    decision::{
        DecisionErrorKind, DecisionOrchestrator, DecisionPath, DecisionStage,
        DecisionTelemetryEvent, FALLBACK_CONFIDENCE, FallbackGenerator, UNSTRUCTURED_CONFIDENCE,
    },
    model::{
        ModelInvocation, ModelPort, ModelReply,
        error::{ModelError, retryable, unavailable},
    },
    schema::{DecisionInput, DecisionOutput},
};
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

enum Behavior {
    Reply(ModelReply),
    Fail(ModelError),
    Panic,
    Stall(Duration),
}

struct ScriptedModel {
    behavior: Behavior,
    seen_tokens: Mutex<Vec<CancellationToken>>,
}

impl ScriptedModel {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            seen_tokens: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen_tokens
            .lock()
            .expect("lock should not be poisoned")
            .len()
    }

    fn last_token(&self) -> CancellationToken {
        self.seen_tokens
            .lock()
            .expect("lock should not be poisoned")
            .last()
            .cloned()
            .expect("model should have been invoked")
    }
}

#[async_trait]
impl ModelPort for ScriptedModel {
    async fn invoke(&self, invocation: ModelInvocation) -> Result<ModelReply, ModelError> {
        self.seen_tokens
            .lock()
            .expect("lock should not be poisoned")
            .push(invocation.cancel.clone());

        match &self.behavior {
            Behavior::Reply(reply) => Ok(reply.clone()),
            Behavior::Fail(err) => Err(err.clone()),
            Behavior::Panic => panic!("adapter exploded"),
            Behavior::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(ModelReply::Text("too late".to_string()))
            }
        }
    }
}

fn input() -> DecisionInput {
    DecisionInput::new("learning", "Rust or Go for backend work")
        .expect("valid input")
        .with_constraints(vec!["10 hours per week".to_string()])
        .with_preference("focus", json!("backend"))
}

fn structured_output() -> DecisionOutput {
    DecisionOutput::new(
        "Learn Rust",
        vec![
            "Memory safety without a garbage collector".to_string(),
            "Growing backend ecosystem".to_string(),
            "Transferable systems knowledge".to_string(),
        ],
        0.82,
        Some("Learn Go first for faster onboarding".to_string()),
    )
    .expect("valid output")
}

fn orchestrator(model: Arc<ScriptedModel>, timeout: Duration) -> DecisionOrchestrator {
    DecisionOrchestrator::new(model, timeout)
}

fn fallback() -> DecisionOutput {
    FallbackGenerator.generate(&input())
}

#[tokio::test]
async fn given_structured_reply_when_deciding_then_output_is_returned_unchanged() {
    let expected = structured_output();
    let model = ScriptedModel::new(Behavior::Reply(ModelReply::Structured(expected.clone())));

    let report = orchestrator(model, Duration::from_secs(1))
        .decide("req-structured", input())
        .await;

    assert_eq!(report.output, expected);
    assert_eq!(report.path, DecisionPath::Model);
}

#[tokio::test]
async fn given_mapping_without_confidence_when_deciding_then_fallback_is_returned() {
    let mut mapping = Map::new();
    mapping.insert("recommendation".to_string(), json!("Learn Rust"));
    mapping.insert("reasoning".to_string(), json!(["a", "b", "c"]));
    let model = ScriptedModel::new(Behavior::Reply(ModelReply::Mapping(mapping)));

    let report = orchestrator(model, Duration::from_secs(1))
        .decide("req-mapping", input())
        .await;

    assert_eq!(report.output, fallback());
    assert_eq!(report.output.confidence_score(), FALLBACK_CONFIDENCE);
    assert_eq!(
        report.path,
        DecisionPath::Fallback {
            reason: DecisionErrorKind::Validation
        }
    );
}

#[tokio::test]
async fn given_text_reply_when_deciding_then_low_confidence_output_wraps_text() {
    let model = ScriptedModel::new(Behavior::Reply(ModelReply::Text("Do X".to_string())));

    let report = orchestrator(model, Duration::from_secs(1))
        .decide("req-text", input())
        .await;

    assert_eq!(report.output.recommendation(), "Do X");
    assert_eq!(report.output.confidence_score(), UNSTRUCTURED_CONFIDENCE);
    assert_eq!(report.output.reasoning().len(), 3);
    assert_eq!(report.path, DecisionPath::UnstructuredModel);
}

#[tokio::test]
async fn given_model_errors_when_deciding_then_each_kind_falls_back() {
    let cases = [
        (
            retryable("rate limited").with_provider_http_status(429),
            DecisionErrorKind::ModelRetryable,
        ),
        (
            unavailable("connection refused"),
            DecisionErrorKind::ModelUnavailable,
        ),
    ];

    for (error, expected_reason) in cases {
        let model = ScriptedModel::new(Behavior::Fail(error));
        let report = orchestrator(model, Duration::from_secs(1))
            .decide("req-error", input())
            .await;

        assert_eq!(report.output, fallback());
        assert_eq!(
            report.path,
            DecisionPath::Fallback {
                reason: expected_reason
            }
        );
    }
}

#[tokio::test]
async fn given_retryable_error_when_deciding_then_model_is_called_exactly_once() {
    let model = ScriptedModel::new(Behavior::Fail(
        retryable("overloaded").with_provider_http_status(503),
    ));

    let report = orchestrator(Arc::clone(&model), Duration::from_secs(1))
        .decide("req-once", input())
        .await;

    assert_eq!(model.calls(), 1);
    assert_eq!(report.output, fallback());
    assert_eq!(
        report.path,
        DecisionPath::Fallback {
            reason: DecisionErrorKind::ModelRetryable
        }
    );
}

#[tokio::test]
async fn given_panicking_adapter_when_deciding_then_fallback_is_returned() {
    let model = ScriptedModel::new(Behavior::Panic);

    let report = orchestrator(model, Duration::from_secs(1))
        .decide("req-panic", input())
        .await;

    assert_eq!(report.output, fallback());
    assert_eq!(
        report.path,
        DecisionPath::Fallback {
            reason: DecisionErrorKind::Unexpected
        }
    );
}

#[tokio::test]
async fn given_slow_adapter_when_deciding_then_fallback_arrives_within_budget_and_call_is_cancelled()
{
    let model = ScriptedModel::new(Behavior::Stall(Duration::from_secs(30)));
    let orchestrator = orchestrator(Arc::clone(&model), Duration::from_millis(50));

    let started_at = Instant::now();
    let output = orchestrator.submit_decision(input()).await;
    let elapsed = started_at.elapsed();

    assert_eq!(output, fallback());
    assert!(
        elapsed < Duration::from_secs(1),
        "fallback took {elapsed:?}"
    );
    assert!(model.last_token().is_cancelled());
}

#[tokio::test]
async fn given_adapter_ignoring_cancellation_when_it_finishes_late_then_no_stage_follows_completion()
{
    let events: Arc<Mutex<Vec<DecisionTelemetryEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let model = ScriptedModel::new(Behavior::Stall(Duration::from_millis(100)));
    let orchestrator = orchestrator(model, Duration::from_millis(20)).with_telemetry_hook(
        Arc::new(move |event: &DecisionTelemetryEvent| {
            sink.lock()
                .expect("lock should not be poisoned")
                .push(event.clone());
        }),
    );

    orchestrator.decide("req-late", input()).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let events = events.lock().expect("lock should not be poisoned");
    assert!(
        !events.iter().any(|event| matches!(
            event,
            DecisionTelemetryEvent::StageEntered {
                stage: DecisionStage::Normalizing,
                ..
            }
        )),
        "late task reported a stage: {events:?}"
    );
    assert!(matches!(
        events.last(),
        Some(DecisionTelemetryEvent::DecisionCompleted { .. })
    ));
}

#[tokio::test]
async fn given_any_reply_when_submitting_then_confidence_stays_in_unit_range() {
    let replies = vec![
        Behavior::Reply(ModelReply::Structured(structured_output())),
        Behavior::Reply(ModelReply::Text("Pick the cheaper plan".to_string())),
        Behavior::Reply(ModelReply::Text("   ".to_string())),
        Behavior::Reply(ModelReply::Mapping(Map::new())),
        Behavior::Fail(unavailable("down")),
    ];

    for behavior in replies {
        let output = orchestrator(ScriptedModel::new(behavior), Duration::from_secs(1))
            .submit_decision(input())
            .await;
        let confidence = output.confidence_score();
        assert!((0.0..=1.0).contains(&confidence), "confidence {confidence}");
    }
}

#[tokio::test]
async fn given_telemetry_hook_when_falling_back_then_stages_are_reported_in_order() {
    let events: Arc<Mutex<Vec<DecisionTelemetryEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let model = ScriptedModel::new(Behavior::Fail(unavailable("down")));
    let orchestrator = orchestrator(model, Duration::from_secs(1)).with_telemetry_hook(Arc::new(
        move |event: &DecisionTelemetryEvent| {
            sink.lock()
                .expect("lock should not be poisoned")
                .push(event.clone());
        },
    ));

    orchestrator.decide("req-telemetry", input()).await;

    let events = events.lock().expect("lock should not be poisoned");
    let stages = events
        .iter()
        .filter_map(|event| match event {
            DecisionTelemetryEvent::StageEntered { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(
        stages,
        [
            DecisionStage::Invoking,
            DecisionStage::FallingBack,
            DecisionStage::Succeeded
        ]
    );
    assert!(events.iter().any(|event| matches!(
        event,
        DecisionTelemetryEvent::FallbackUsed {
            reason: DecisionErrorKind::ModelUnavailable,
            ..
        }
    )));
    assert!(matches!(
        events.last(),
        Some(DecisionTelemetryEvent::DecisionCompleted { request_id, .. }) if request_id == "req-telemetry"
    ));
}

#[tokio::test]
async fn fallback_json_is_byte_identical_across_inputs() {
    let other = DecisionInput::new("purchase", "lease or buy").expect("valid input");
    let a = serde_json::to_string(&FallbackGenerator.generate(&input())).expect("serializes");
    let b = serde_json::to_string(&FallbackGenerator.generate(&other)).expect("serializes");
    assert_eq!(a, b);

    let value: Value = serde_json::from_str(&a).expect("valid json");
    assert_eq!(value["confidence_score"], json!(0.45));
}
