use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    model::error::{ModelError, ModelErrorKind},
    schema::SchemaError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionErrorKind {
    Validation,
    ModelRetryable,
    ModelUnavailable,
    Timeout,
    Unexpected,
}

impl DecisionErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::ModelRetryable => "model_retryable",
            Self::ModelUnavailable => "model_unavailable",
            Self::Timeout => "timeout",
            Self::Unexpected => "unexpected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionError {
    pub kind: DecisionErrorKind,
    pub message: String,
}

impl DecisionError {
    pub fn new(kind: DecisionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for DecisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DecisionError {}

impl From<SchemaError> for DecisionError {
    fn from(err: SchemaError) -> Self {
        validation(err.to_string())
    }
}

impl From<ModelError> for DecisionError {
    fn from(err: ModelError) -> Self {
        let kind = match err.kind {
            ModelErrorKind::Retryable => DecisionErrorKind::ModelRetryable,
            ModelErrorKind::Unavailable => DecisionErrorKind::ModelUnavailable,
        };
        Self::new(kind, err.to_string())
    }
}

pub fn validation(message: impl Into<String>) -> DecisionError {
    DecisionError::new(DecisionErrorKind::Validation, message)
}

pub fn timeout(message: impl Into<String>) -> DecisionError {
    DecisionError::new(DecisionErrorKind::Timeout, message)
}

pub fn unexpected(message: impl Into<String>) -> DecisionError {
    DecisionError::new(DecisionErrorKind::Unexpected, message)
}
