use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::{
    model::error::ModelError,
    schema::{DecisionInput, DecisionOutput},
};

pub mod credentials;
pub mod error;
pub mod http_common;
pub mod openai_compatible;
pub mod prompts;

/// One outbound model call for one decision request.
#[derive(Debug, Clone)]
pub struct ModelInvocation {
    pub request_id: String,
    pub input: DecisionInput,
    /// Fired by the caller when it stops waiting; adapters should abandon the call.
    pub cancel: CancellationToken,
}

/// What the model handed back, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Structured(DecisionOutput),
    Mapping(Map<String, Value>),
    Text(String),
}

impl ModelReply {
    /// Classifies raw assistant content. Fenced JSON is unwrapped first; a JSON
    /// object that already satisfies the output schema is `Structured`, any
    /// other object is `Mapping`, everything else is `Text` without fences.
    pub fn from_content(content: &str) -> Self {
        let trimmed = content.trim();
        let candidate = http_common::strip_code_fence(trimmed)
            .unwrap_or_else(|| trimmed.to_string());

        if let Ok(output) = serde_json::from_str::<DecisionOutput>(&candidate) {
            return Self::Structured(output);
        }
        match serde_json::from_str::<Value>(&candidate) {
            Ok(Value::Object(mapping)) => Self::Mapping(mapping),
            _ => Self::Text(candidate.trim().to_string()),
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Self::Structured(_) => "structured",
            Self::Mapping(_) => "mapping",
            Self::Text(_) => "text",
        }
    }
}

#[async_trait]
pub trait ModelPort: Send + Sync {
    /// Performs exactly one call to the model service. No retries.
    async fn invoke(&self, invocation: ModelInvocation) -> Result<ModelReply, ModelError>;
}
