use std::time::Duration;

use clarity::{
    model::{
        ModelInvocation, ModelPort, ModelReply, credentials::ModelServiceSettings,
        error::ModelErrorKind, openai_compatible::OpenAiCompatibleModel,
    },
    schema::DecisionInput,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, header_exists, method, path},
};

fn adapter(server: &MockServer) -> OpenAiCompatibleModel {
    OpenAiCompatibleModel::new(ModelServiceSettings::new(
        "gpt-4o-mini",
        format!("{}/v1", server.uri()),
        "sk-test",
    ))
    .expect("client should build")
}

fn invocation() -> (ModelInvocation, CancellationToken) {
    let cancel = CancellationToken::new();
    let input = DecisionInput::new("career", "stay or move abroad").expect("valid input");
    (
        ModelInvocation {
            request_id: "req-model".to_string(),
            input,
            cancel: cancel.clone(),
        },
        cancel,
    )
}

fn completion(content: Value) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn given_valid_json_content_when_invoked_then_structured_reply_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header_exists("x-request-id"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "stream": false,
            "response_format": { "type": "json_schema" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!(
            r#"{"recommendation":"Stay","reasoning":["a","b","c"],"confidence_score":0.7,"alternative_option":"Move next year"}"#
        ))))
        .expect(1)
        .mount(&server)
        .await;

    let (invocation, _cancel) = invocation();
    let model = adapter(&server);
    assert_eq!(model.model(), "gpt-4o-mini");
    let reply = model
        .invoke(invocation)
        .await
        .expect("call should succeed");

    let ModelReply::Structured(output) = reply else {
        panic!("expected structured reply");
    };
    assert_eq!(output.recommendation(), "Stay");
    assert_eq!(output.alternative_option(), Some("Move next year"));
}

#[tokio::test]
async fn given_fenced_partial_json_when_invoked_then_mapping_reply_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!(
            "```json\n{\"recommendation\":\"Stay\",\"reasoning\":[\"a\",\"b\",\"c\"]}\n```"
        ))))
        .mount(&server)
        .await;

    let (invocation, _cancel) = invocation();
    let reply = adapter(&server)
        .invoke(invocation)
        .await
        .expect("call should succeed");

    let ModelReply::Mapping(mapping) = reply else {
        panic!("expected mapping reply");
    };
    assert_eq!(mapping["recommendation"], json!("Stay"));
    assert!(!mapping.contains_key("confidence_score"));
}

#[tokio::test]
async fn given_prose_content_when_invoked_then_text_reply_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion(json!("  Stay where you are. "))),
        )
        .mount(&server)
        .await;

    let (invocation, _cancel) = invocation();
    let reply = adapter(&server)
        .invoke(invocation)
        .await
        .expect("call should succeed");

    assert_eq!(reply, ModelReply::Text("Stay where you are.".to_string()));
}

#[tokio::test]
async fn given_transient_statuses_when_invoked_then_errors_are_retryable() {
    for status in [429_u16, 500, 503] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_string("slow down"))
            .expect(1)
            .mount(&server)
            .await;

        let (invocation, _cancel) = invocation();
        let err = adapter(&server)
            .invoke(invocation)
            .await
            .expect_err("status should fail");

        assert_eq!(err.kind, ModelErrorKind::Retryable, "status {status}");
        assert!(err.is_retryable());
        assert_eq!(
            server
                .received_requests()
                .await
                .map(|requests| requests.len()),
            Some(1),
            "status {status} must not be retried"
        );
        assert_eq!(err.provider_http_status, Some(status));
        assert!(err.message.contains("slow down"));
    }
}

#[tokio::test]
async fn given_client_error_status_when_invoked_then_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let (invocation, _cancel) = invocation();
    let err = adapter(&server)
        .invoke(invocation)
        .await
        .expect_err("400 should fail");

    assert_eq!(err.kind, ModelErrorKind::Unavailable);
    assert!(!err.is_retryable());
    assert_eq!(err.provider_http_status, Some(400));
}

#[tokio::test]
async fn given_undecodable_body_when_invoked_then_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let (invocation, _cancel) = invocation();
    let err = adapter(&server)
        .invoke(invocation)
        .await
        .expect_err("html body should fail");

    assert_eq!(err.kind, ModelErrorKind::Unavailable);
    assert!(err.message.contains("decode"));
}

#[tokio::test]
async fn given_missing_choices_when_invoked_then_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let (invocation, _cancel) = invocation();
    let err = adapter(&server)
        .invoke(invocation)
        .await
        .expect_err("empty choices should fail");

    assert_eq!(err.kind, ModelErrorKind::Unavailable);
}

#[tokio::test]
async fn given_cancelled_token_when_call_is_in_flight_then_invoke_returns_promptly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(json!("late")))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let (invocation, cancel) = invocation();
    let model = adapter(&server);
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(2), model.invoke(invocation))
        .await
        .expect("cancellation should end the call")
        .expect_err("cancelled call should fail");
    canceller.await.expect("canceller should finish");

    assert_eq!(err.kind, ModelErrorKind::Unavailable);
    assert!(err.message.contains("cancelled"));
}

#[tokio::test]
async fn given_unreachable_service_when_invoked_then_error_is_unavailable() {
    let model = OpenAiCompatibleModel::new(ModelServiceSettings::new(
        "gpt-4o-mini",
        "http://127.0.0.1:9",
        "sk-test",
    ))
    .expect("client should build");

    let (invocation, _cancel) = invocation();
    let err = model
        .invoke(invocation)
        .await
        .expect_err("connection should fail");

    assert_eq!(err.kind, ModelErrorKind::Unavailable);
    assert_eq!(err.provider_http_status, None);
}
