use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelErrorKind {
    /// The service signalled a transient condition (rate limit, overload, timeout).
    Retryable,
    /// Any other failure: transport, malformed response, service error, cancellation.
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelError {
    pub kind: ModelErrorKind,
    pub message: String,
    pub provider_http_status: Option<u16>,
}

impl ModelError {
    pub fn new(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider_http_status: None,
        }
    }

    pub fn with_provider_http_status(mut self, status: u16) -> Self {
        self.provider_http_status = Some(status);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == ModelErrorKind::Retryable
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.provider_http_status {
            Some(status) => write!(f, "{} (status={})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ModelError {}

pub fn retryable(message: impl Into<String>) -> ModelError {
    ModelError::new(ModelErrorKind::Retryable, message)
}

pub fn unavailable(message: impl Into<String>) -> ModelError {
    ModelError::new(ModelErrorKind::Unavailable, message)
}
