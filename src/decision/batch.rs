use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::{
    decision::{error::DecisionError, orchestrator::DecisionOrchestrator},
    schema::{DecisionRequest, DecisionResponse, SchemaError},
};

/// Handles one decoded batch item.
#[async_trait]
pub trait DecisionHandler: Send + Sync {
    async fn handle(&self, request: DecisionRequest) -> Result<DecisionResponse, DecisionError>;
}

#[async_trait]
impl DecisionHandler for DecisionOrchestrator {
    async fn handle(&self, request: DecisionRequest) -> Result<DecisionResponse, DecisionError> {
        let decision_output = self.submit_decision(request.decision_input).await;
        Ok(DecisionResponse { decision_output })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchItemResult {
    Success {
        data: DecisionResponse,
    },
    Error {
        error: String,
        decision_type: Option<String>,
    },
}

impl BatchItemResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

/// Runs every item through `handler`, one at a time and in order.
///
/// Items are decoded individually so one malformed entry only fails itself.
pub async fn run_batch<H>(handler: &H, items: Vec<Value>) -> BatchReport
where
    H: DecisionHandler + ?Sized,
{
    let total = items.len();
    let mut results = Vec::with_capacity(total);

    for (index, item) in items.into_iter().enumerate() {
        let decision_type = peek_decision_type(&item);
        let result = match decode_request(item) {
            Ok(request) => match handler.handle(request).await {
                Ok(data) => BatchItemResult::Success { data },
                Err(err) => {
                    tracing::warn!(
                        target: "decision",
                        index = index,
                        kind = err.kind.as_str(),
                        error = %err,
                        "batch_item_failed"
                    );
                    BatchItemResult::Error {
                        error: err.to_string(),
                        decision_type,
                    }
                }
            },
            Err(err) => {
                tracing::warn!(
                    target: "decision",
                    index = index,
                    error = %err,
                    "batch_item_rejected"
                );
                BatchItemResult::Error {
                    error: err.to_string(),
                    decision_type,
                }
            }
        };
        results.push(result);
    }

    let successful = results.iter().filter(|r| r.is_success()).count();
    tracing::info!(
        target: "decision",
        total = total,
        successful = successful,
        "batch_completed"
    );

    BatchReport {
        total,
        successful,
        failed: total - successful,
        results,
    }
}

fn decode_request(item: Value) -> Result<DecisionRequest, SchemaError> {
    serde_json::from_value(item).map_err(|err| SchemaError::malformed("decision request", err))
}

fn peek_decision_type(item: &Value) -> Option<String> {
    item.get("decision_input")?
        .get("decision_type")?
        .as_str()
        .map(str::to_string)
}
