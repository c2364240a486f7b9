use std::{env, fmt, time::Duration};

use crate::config::ModelConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("{var} not found in environment")]
    Missing { var: String },
    #[error("{var} is set but empty")]
    Empty { var: String },
}

/// Everything the model adapter needs to reach the service. Built once at
/// startup and injected; the credential never leaves this struct.
#[derive(Clone)]
pub struct ModelServiceSettings {
    pub model: String,
    pub base_url: String,
    pub max_output_tokens: u64,
    pub request_timeout: Duration,
    api_key: String,
}

impl ModelServiceSettings {
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let defaults = ModelConfig::default();
        Self {
            model: model.into(),
            base_url: base_url.into(),
            max_output_tokens: defaults.max_output_tokens,
            request_timeout: Duration::from_millis(defaults.request_timeout_ms),
            api_key: api_key.into(),
        }
    }

    pub fn from_env(config: &ModelConfig) -> Result<Self, CredentialError> {
        Self::from_lookup(config, |var| env::var(var).ok())
    }

    pub fn from_lookup(
        config: &ModelConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CredentialError> {
        let api_key = require(&config.api_key_env, &lookup)?;
        let base_url = require(&config.base_url_env, &lookup)?;

        Ok(Self {
            model: config.model.clone(),
            base_url,
            max_output_tokens: config.max_output_tokens,
            request_timeout: Duration::from_millis(config.request_timeout_ms.max(1)),
            api_key,
        })
    }

    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

impl fmt::Debug for ModelServiceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelServiceSettings")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("request_timeout", &self.request_timeout)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

fn require(var: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<String, CredentialError> {
    let value = lookup(var).ok_or_else(|| CredentialError::Missing {
        var: var.to_string(),
    })?;
    if value.trim().is_empty() {
        return Err(CredentialError::Empty {
            var: var.to_string(),
        });
    }
    Ok(value.trim().to_string())
}
