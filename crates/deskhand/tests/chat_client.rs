//! Chat completions client against a mock server.

mod common;

use common::{text_completion, tool_call_completion};
use deskhand::api::ApiError;
use deskhand::{ChatClient, ChatRequest, Message, ToolDef};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> ChatRequest {
    ChatRequest {
        model: "gpt-test".into(),
        messages: vec![Message::system("be brief"), Message::user("hi")],
        max_completion_tokens: Some(256),
        temperature: None,
        tools: Some(vec![ToolDef::new(
            "Zendesk_WhoAmI",
            "Current agent",
            json!({ "type": "object", "properties": {} }),
        )]),
    }
}

#[tokio::test]
async fn sends_bearer_token_and_parses_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-test",
            "max_completion_tokens": 256,
            "tools": [{ "type": "function", "function": { "name": "Zendesk_WhoAmI" } }]
        })))
        .respond_with(text_completion("Hello!"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::with_base_url("sk-test", format!("{}/", server.uri())).unwrap();
    let completion = client.chat(&request()).await.unwrap();

    assert_eq!(completion.content.as_deref(), Some("Hello!"));
    assert!(completion.tool_calls.is_empty());
    assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn parses_tool_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(tool_call_completion(&[(
            "call_9",
            "Zendesk_GetTicketComments",
            json!({ "ticket_id": 9 }),
        )]))
        .mount(&server)
        .await;

    let client = ChatClient::with_base_url("sk-test", server.uri()).unwrap();
    let completion = client.chat(&request()).await.unwrap();

    assert_eq!(completion.usage.as_ref().and_then(|u| u.total_tokens), Some(15));
    let message = completion.into_message();
    assert_eq!(message.calls().len(), 1);
    assert_eq!(message.calls()[0].function.name, "Zendesk_GetTicketComments");
    assert_eq!(message.calls()[0].function.arguments, r#"{"ticket_id":9}"#);
}

#[tokio::test]
async fn http_errors_carry_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let client = ChatClient::with_base_url("sk-test", server.uri()).unwrap();
    let err = client.chat(&request()).await.unwrap_err();

    assert_eq!(err.status(), Some(429));
    assert!(err.is_transient());
    assert!(err.to_string().contains("slow down"));
}

#[tokio::test]
async fn error_in_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "message": "model not found" }
        })))
        .mount(&server)
        .await;

    let client = ChatClient::with_base_url("sk-test", server.uri()).unwrap();
    let err = client.chat(&request()).await.unwrap_err();

    assert!(matches!(err, ApiError::Api { service: "chat", ref message } if message == "model not found"));
}
