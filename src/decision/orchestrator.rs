use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    decision::{
        error::{self, DecisionError, DecisionErrorKind},
        fallback::FallbackGenerator,
        normalizer::OutputNormalizer,
        telemetry::{self, DecisionStage, DecisionTelemetryEvent, DecisionTelemetryHook},
    },
    model::{ModelInvocation, ModelPort, ModelReply},
    schema::{DecisionInput, DecisionOutput},
};

/// How a decision output was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum DecisionPath {
    Model,
    UnstructuredModel,
    Fallback { reason: DecisionErrorKind },
}

impl DecisionPath {
    pub fn is_fallback(self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

#[derive(Debug, Clone)]
pub struct DecisionReport {
    pub request_id: String,
    pub output: DecisionOutput,
    pub path: DecisionPath,
    pub elapsed: Duration,
}

/// Single entry point for turning a validated input into a recommendation.
///
/// Every call returns a valid `DecisionOutput`. Model failures, invalid
/// replies, panics and the wall-clock budget all resolve to the fallback.
#[derive(Clone)]
pub struct DecisionOrchestrator {
    model: Arc<dyn ModelPort>,
    normalizer: OutputNormalizer,
    fallback: FallbackGenerator,
    timeout: Duration,
    telemetry_hook: Option<DecisionTelemetryHook>,
}

impl DecisionOrchestrator {
    pub fn new(model: Arc<dyn ModelPort>, timeout: Duration) -> Self {
        Self {
            model,
            normalizer: OutputNormalizer,
            fallback: FallbackGenerator,
            timeout,
            telemetry_hook: None,
        }
    }

    pub fn with_telemetry_hook(mut self, hook: DecisionTelemetryHook) -> Self {
        self.telemetry_hook = Some(hook);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn submit_decision(&self, input: DecisionInput) -> DecisionOutput {
        let request_id = Uuid::now_v7().to_string();
        self.decide(request_id, input).await.output
    }

    pub async fn decide(&self, request_id: impl Into<String>, input: DecisionInput) -> DecisionReport {
        let request_id = request_id.into();
        let started_at = Instant::now();

        let (output, path) = match self.run_model_path(&request_id, &input).await {
            Ok(produced) => produced,
            Err(err) => {
                self.emit(DecisionTelemetryEvent::StageEntered {
                    request_id: request_id.clone(),
                    stage: DecisionStage::FallingBack,
                });
                self.emit(DecisionTelemetryEvent::FallbackUsed {
                    request_id: request_id.clone(),
                    reason: err.kind,
                    detail: err.message.clone(),
                });
                (
                    self.fallback.generate(&input),
                    DecisionPath::Fallback { reason: err.kind },
                )
            }
        };

        let elapsed = started_at.elapsed();
        self.emit(DecisionTelemetryEvent::StageEntered {
            request_id: request_id.clone(),
            stage: DecisionStage::Succeeded,
        });
        self.emit(DecisionTelemetryEvent::DecisionCompleted {
            request_id: request_id.clone(),
            confidence_score: output.confidence_score(),
            elapsed_ms: elapsed.as_millis() as u64,
        });

        DecisionReport {
            request_id,
            output,
            path,
            elapsed,
        }
    }

    async fn run_model_path(
        &self,
        request_id: &str,
        input: &DecisionInput,
    ) -> Result<(DecisionOutput, DecisionPath), DecisionError> {
        self.emit(DecisionTelemetryEvent::StageEntered {
            request_id: request_id.to_string(),
            stage: DecisionStage::Invoking,
        });

        let cancel = CancellationToken::new();
        let invocation = ModelInvocation {
            request_id: request_id.to_string(),
            input: input.clone(),
            cancel: cancel.clone(),
        };
        let model = Arc::clone(&self.model);
        let normalizer = self.normalizer;
        let hook = self.telemetry_hook.clone();
        let task_request_id = request_id.to_string();
        let task_cancel = cancel.clone();

        let mut task = tokio::spawn(async move {
            let reply = model.invoke(invocation).await?;
            // A detached task stays silent once the caller has moved on.
            if !task_cancel.is_cancelled() {
                telemetry::emit(
                    hook.as_ref(),
                    DecisionTelemetryEvent::StageEntered {
                        request_id: task_request_id,
                        stage: DecisionStage::Normalizing,
                    },
                );
            }
            let path = match reply {
                ModelReply::Text(_) => DecisionPath::UnstructuredModel,
                ModelReply::Structured(_) | ModelReply::Mapping(_) => DecisionPath::Model,
            };
            let output = normalizer.normalize(reply)?;
            Ok::<_, DecisionError>((output, path))
        });

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(error::unexpected(format!(
                "decision task failed: {join_err}"
            ))),
            Err(_) => {
                // The in-flight task is detached; the token tells it to stop.
                cancel.cancel();
                Err(error::timeout(format!(
                    "model path exceeded {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }

    fn emit(&self, event: DecisionTelemetryEvent) {
        telemetry::emit(self.telemetry_hook.as_ref(), event);
    }
}
