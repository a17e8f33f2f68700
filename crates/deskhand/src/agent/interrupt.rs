//! Interrupts, decisions and the inputs/outputs of an agent run.
//!
//! When the runtime cannot proceed without outside consent it ends the
//! stream with a batch of [`Interrupt`]s. Each one is resolved into a
//! [`Decision`], and the decisions go back in as [`AgentInput::Resume`].
//! The runtime matches decisions to interrupts by position, so order is
//! preserved end to end.

use crate::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Name used for interrupts whose payload carries no `tool_name`.
const UNKNOWN_TOOL: &str = "<unknown tool>";

/// A suspension signal emitted by the runtime mid-turn.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Interrupt {
    /// Runtime-assigned identifier (the tool call id for [`ReactAgent`](super::runtime::ReactAgent)).
    pub id: String,
    /// Kind-specific payload. See [`classify`].
    pub value: Value,
}

impl Interrupt {
    pub fn new(id: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }

    pub fn kind(&self) -> InterruptKind {
        classify(&self.value)
    }
}

/// The pending authorization an authorization interrupt points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationPrompt {
    /// Opaque token passed to the authorization gate.
    pub id: String,
    /// Where the user completes the flow.
    pub url: Option<String>,
}

/// What an interrupt asks for.
#[derive(Clone, Debug, PartialEq)]
pub enum InterruptKind {
    /// A tool needs an OAuth grant completed out of band.
    Authorization {
        tool_name: String,
        authorization: AuthorizationPrompt,
    },
    /// The operator must approve a proposed tool call.
    HumanApproval { tool_name: String, input: Value },
    /// Neither shape matched. Resolved as a denial.
    Unrecognized { reason: String },
}

/// Classify an interrupt payload.
///
/// `authorization_required` wins over `hitl_required`. Discriminants are
/// truthy when they are `true`, a non-zero number, a non-empty string, an
/// array or an object.
pub fn classify(value: &Value) -> InterruptKind {
    if truthy(value.get("authorization_required")) {
        let tool_name = tool_name(value);
        let response = value.get("authorization_response");
        let Some(id) = response.and_then(|r| r.get("id")).and_then(Value::as_str) else {
            return InterruptKind::Unrecognized {
                reason: format!("authorization interrupt for {tool_name} has no authorization id"),
            };
        };
        let url = response
            .and_then(|r| r.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string);
        return InterruptKind::Authorization {
            tool_name,
            authorization: AuthorizationPrompt {
                id: id.to_string(),
                url,
            },
        };
    }

    if truthy(value.get("hitl_required")) {
        return InterruptKind::HumanApproval {
            tool_name: tool_name(value),
            input: value.get("input").cloned().unwrap_or(Value::Null),
        };
    }

    InterruptKind::Unrecognized {
        reason: "neither authorization_required nor hitl_required is set".to_string(),
    }
}

fn tool_name(value: &Value) -> String {
    value
        .get("tool_name")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_TOOL)
        .to_string()
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

// ── Decisions ──────────────────────────────────────────────────────

/// Whether an interrupt is approved. Serializes as `{"authorized": bool}`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub authorized: bool,
}

impl Decision {
    pub const fn approve() -> Self {
        Self { authorized: true }
    }

    pub const fn deny() -> Self {
        Self { authorized: false }
    }
}

/// The resumption value: a bare decision when exactly one interrupt was
/// pending, an ordered list otherwise.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum Resume {
    Single(Decision),
    Many(Vec<Decision>),
}

impl Resume {
    pub fn from_decisions(mut decisions: Vec<Decision>) -> Self {
        if decisions.len() == 1
            && let Some(only) = decisions.pop()
        {
            return Resume::Single(only);
        }
        Resume::Many(decisions)
    }

    /// Flatten back into decisions, in order.
    pub fn into_decisions(self) -> Vec<Decision> {
        match self {
            Resume::Single(decision) => vec![decision],
            Resume::Many(decisions) => decisions,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Resume::Single(_) => 1,
            Resume::Many(decisions) => decisions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Run input and output ───────────────────────────────────────────

/// Input to one runtime invocation: `{"messages": [...]}` or `{"resume": ...}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AgentInput {
    Messages(Vec<Message>),
    Resume(Resume),
}

impl AgentInput {
    /// The initial input of a turn.
    pub fn user(text: impl Into<String>) -> Self {
        AgentInput::Messages(vec![Message::user(text)])
    }
}

/// Messages produced by one node of the agent graph.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NodeUpdate {
    pub node: String,
    pub messages: Vec<Message>,
}

/// One item of the runtime's output stream.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StreamChunk {
    Interrupts(Vec<Interrupt>),
    Updates(Vec<NodeUpdate>),
}

// ── Thread identity ────────────────────────────────────────────────

/// Key grouping all turns of one conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new("1")
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Per-invocation configuration passed to the runtime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunConfig {
    pub thread_id: ThreadId,
}

impl RunConfig {
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: ThreadId::new(thread_id),
        }
    }
}
