use std::sync::Arc;

use crate::decision::error::DecisionErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionStage {
    Invoking,
    Normalizing,
    FallingBack,
    Succeeded,
}

impl DecisionStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invoking => "invoking",
            Self::Normalizing => "normalizing",
            Self::FallingBack => "falling_back",
            Self::Succeeded => "succeeded",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionTelemetryEvent {
    StageEntered {
        request_id: String,
        stage: DecisionStage,
    },
    FallbackUsed {
        request_id: String,
        reason: DecisionErrorKind,
        detail: String,
    },
    DecisionCompleted {
        request_id: String,
        confidence_score: f64,
        elapsed_ms: u64,
    },
}

pub type DecisionTelemetryHook = Arc<dyn Fn(&DecisionTelemetryEvent) + Send + Sync>;

pub(crate) fn emit(hook: Option<&DecisionTelemetryHook>, event: DecisionTelemetryEvent) {
    match &event {
        DecisionTelemetryEvent::StageEntered { request_id, stage } => {
            tracing::debug!(
                target: "decision",
                request_id = %request_id,
                stage = stage.as_str(),
                "decision_stage_entered"
            );
        }
        DecisionTelemetryEvent::FallbackUsed {
            request_id,
            reason,
            detail,
        } => {
            if *reason == DecisionErrorKind::Unexpected {
                tracing::error!(
                    target: "decision",
                    request_id = %request_id,
                    reason = reason.as_str(),
                    detail = %detail,
                    "decision_fallback_used"
                );
            } else {
                tracing::warn!(
                    target: "decision",
                    request_id = %request_id,
                    reason = reason.as_str(),
                    detail = %detail,
                    "decision_fallback_used"
                );
            }
        }
        DecisionTelemetryEvent::DecisionCompleted {
            request_id,
            confidence_score,
            elapsed_ms,
        } => {
            tracing::info!(
                target: "decision",
                request_id = %request_id,
                confidence_score = *confidence_score,
                elapsed_ms = *elapsed_ms,
                "decision_completed"
            );
        }
    }

    if let Some(hook) = hook {
        hook(&event);
    }
}
