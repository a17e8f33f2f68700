//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use deskhand::agent::{AgentError, AgentInput, AgentRuntime, ChunkStream, RunConfig, StreamChunk};
use deskhand::arcade::{
    AuthError, AuthorizationGate, AuthorizationResponse, AuthorizationStatus, GateFuture,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use wiremock::{Request, Respond, ResponseTemplate};

// ── Authorization gate ─────────────────────────────────────────────

/// Gate that answers from a script. Succeeds once the script runs out.
#[derive(Default)]
pub struct FakeGate {
    failures: Mutex<VecDeque<bool>>,
    pub waited: Mutex<Vec<String>>,
}

impl FakeGate {
    /// `outcomes[i]` is whether the i-th wait succeeds.
    pub fn scripted(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self {
            failures: Mutex::new(outcomes.into_iter().collect()),
            waited: Mutex::new(Vec::new()),
        }
    }

    pub fn waited(&self) -> Vec<String> {
        self.waited.lock().unwrap().clone()
    }
}

impl AuthorizationGate for FakeGate {
    fn wait_for_completion<'a>(&'a self, authorization_id: &'a str) -> GateFuture<'a> {
        Box::pin(async move {
            self.waited.lock().unwrap().push(authorization_id.to_string());
            let succeed = self.failures.lock().unwrap().pop_front().unwrap_or(true);
            if succeed {
                Ok(AuthorizationResponse {
                    id: Some(authorization_id.to_string()),
                    status: AuthorizationStatus::Completed,
                    url: None,
                    scopes: vec![],
                    provider_id: None,
                    user_id: None,
                })
            } else {
                Err(AuthError::Failed {
                    id: authorization_id.to_string(),
                })
            }
        })
    }
}

// ── Runtime ────────────────────────────────────────────────────────

/// Runtime that replays one scripted pass per `stream` call and records
/// every input it was given.
#[derive(Default)]
pub struct ScriptedRuntime {
    passes: Mutex<VecDeque<Vec<Result<StreamChunk, AgentError>>>>,
    pub inputs: Mutex<Vec<AgentInput>>,
}

impl ScriptedRuntime {
    pub fn new(passes: Vec<Vec<Result<StreamChunk, AgentError>>>) -> Self {
        Self {
            passes: Mutex::new(passes.into()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn inputs(&self) -> Vec<AgentInput> {
        self.inputs.lock().unwrap().clone()
    }
}

impl AgentRuntime for ScriptedRuntime {
    fn stream(&self, input: AgentInput, _config: &RunConfig) -> ChunkStream<'_> {
        self.inputs.lock().unwrap().push(input);
        let pass = self.passes.lock().unwrap().pop_front().unwrap_or_default();
        Box::pin(futures::stream::iter(pass))
    }
}

// ── Interrupt payloads ─────────────────────────────────────────────

pub fn auth_payload(tool: &str, id: &str) -> Value {
    json!({
        "authorization_required": true,
        "hitl_required": false,
        "tool_name": tool,
        "authorization_response": { "id": id, "url": format!("https://auth.example/{id}") }
    })
}

pub fn approval_payload(tool: &str, input: Value) -> Value {
    json!({
        "authorization_required": false,
        "hitl_required": true,
        "tool_name": tool,
        "input": input
    })
}

// ── HTTP ───────────────────────────────────────────────────────────

/// Responds with each template in turn, repeating the last one.
pub struct Sequence(Mutex<VecDeque<ResponseTemplate>>);

impl Sequence {
    pub fn new(templates: Vec<ResponseTemplate>) -> Self {
        Self(Mutex::new(templates.into()))
    }
}

impl Respond for Sequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let mut queue = self.0.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap_or_else(|| ResponseTemplate::new(500))
        }
    }
}

/// A chat completion whose assistant message carries tool calls.
pub fn tool_call_completion(calls: &[(&str, &str, Value)]) -> ResponseTemplate {
    let tool_calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, args)| {
            json!({
                "id": id,
                "type": "function",
                "function": { "name": name, "arguments": args.to_string() }
            })
        })
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{
            "message": { "role": "assistant", "content": null, "tool_calls": tool_calls },
            "finish_reason": "tool_calls"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    }))
}

/// A chat completion with a final text answer.
pub fn text_completion(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }]
    }))
}
