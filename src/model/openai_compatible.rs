use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{Value, json};

use crate::{
    model::{
        ModelInvocation, ModelPort, ModelReply,
        credentials::ModelServiceSettings,
        error::{ModelError, unavailable},
        http_common,
        prompts::{
            DECISION_OUTPUT_SCHEMA_NAME, build_decision_user_prompt, decision_output_json_schema,
            decision_system_prompt,
        },
    },
    schema::DecisionInput,
};

/// Model adapter for any service speaking the OpenAI chat-completions dialect.
#[derive(Clone)]
pub struct OpenAiCompatibleModel {
    client: Client,
    settings: ModelServiceSettings,
}

impl OpenAiCompatibleModel {
    pub fn new(settings: ModelServiceSettings) -> Result<Self, ModelError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| unavailable(format!("failed to build http client: {}", err)))?;
        Ok(Self { client, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn build_body(&self, input: &DecisionInput) -> Value {
        json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": decision_system_prompt() },
                { "role": "user", "content": build_decision_user_prompt(input) }
            ],
            "stream": false,
            "max_tokens": self.settings.max_output_tokens,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": DECISION_OUTPUT_SCHEMA_NAME,
                    "schema": decision_output_json_schema(),
                    "strict": true
                }
            }
        })
    }

    async fn call(&self, request_id: &str, input: &DecisionInput) -> Result<ModelReply, ModelError> {
        let response = self
            .client
            .post(self.endpoint())
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, self.settings.auth_header())
            .header("x-request-id", request_id)
            .json(&self.build_body(input))
            .send()
            .await
            .map_err(|err| unavailable(format!("model request failed: {}", err)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(http_common::map_http_error(status, &body));
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|err| unavailable(format!("model response body decode failed: {}", err)))?;
        let content = http_common::extract_message_content(&payload)?;
        Ok(ModelReply::from_content(&content))
    }
}

#[async_trait]
impl ModelPort for OpenAiCompatibleModel {
    async fn invoke(&self, invocation: ModelInvocation) -> Result<ModelReply, ModelError> {
        let ModelInvocation {
            request_id,
            input,
            cancel,
        } = invocation;
        let started_at = Instant::now();
        tracing::debug!(
            target: "model",
            request_id = %request_id,
            model = %self.settings.model,
            decision_type = %input.decision_type(),
            "model_call_started"
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(unavailable("model call cancelled by caller")),
            result = self.call(&request_id, &input) => result,
        };

        match &result {
            Ok(reply) => tracing::debug!(
                target: "model",
                request_id = %request_id,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                shape = reply.shape(),
                "model_call_completed"
            ),
            Err(err) => tracing::debug!(
                target: "model",
                request_id = %request_id,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error_kind = ?err.kind,
                retryable = err.is_retryable(),
                error = %err,
                "model_call_failed"
            ),
        }

        result
    }
}
