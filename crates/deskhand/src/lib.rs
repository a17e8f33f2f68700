//! Tool-using chat agent runtime with human approval gates.
//!
//! `deskhand` runs a ReAct-style agent on top of an OpenAI-compatible chat
//! completions API, with tools resolved from [Arcade](https://arcade.dev).
//! Some tool calls cannot proceed on their own: the tool may need an OAuth
//! grant that the end user completes in a browser, or the operator may have
//! asked to approve the call before it runs. In both cases the runtime
//! *suspends* the turn and emits [`Interrupt`](agent::interrupt::Interrupt)s.
//! The [`SessionLoop`](agent::session::SessionLoop) resolves every interrupt
//! into a [`Decision`](agent::interrupt::Decision) and resumes the runtime
//! until the turn completes.
//!
//! # Getting started
//!
//! ```ignore
//! use deskhand::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let arcade = Arc::new(ArcadeClient::new(std::env::var("ARCADE_API_KEY")?)?);
//!     let selection = ToolSelection::new("user@example.com").with_toolkit("Zendesk");
//!     let tools = get_tools(&arcade, &selection).await?;
//!
//!     let chat = ChatClient::new(std::env::var("OPENAI_API_KEY")?)?;
//!     let config = AgentConfig::new("gpt-4o-mini", "You are a support agent.");
//!     let agent = ReactAgent::new(chat, tools, config, Arc::new(MemorySaver::new()));
//!
//!     let context = AppContext::new(agent, RunConfig::default());
//!     let resolver = InterruptResolver::new(ArcadeAuthGate::new(arcade));
//!     SessionLoop::new(context, resolver, StdConsole::new()).run().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`agent`]: interrupts, resolver, session loop, the
//!   [`ReactAgent`](agent::runtime::ReactAgent) runtime and checkpointers
//! - [`tools`]: the [`Tool`](tools::core::Tool) trait and
//!   [`ToolSet`](tools::core::ToolSet)
//! - [`arcade`]: Arcade client, tool provider and authorization gate
//! - [`api`]: error type and retry

pub mod agent;
pub mod api;
pub mod arcade;
pub mod prelude;
pub mod tools;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

pub use api::ApiError;

/// Base URL of the OpenAI API. Any compatible server can be used instead.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Width of the banner line in [`Message::to_formatted_string`].
const BANNER_WIDTH: usize = 80;

/// Chat completion request body. Unset optional fields are omitted from
/// serialization so the server applies its own defaults.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        })
    }
}

/// One chat message in OpenAI wire format.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name for tool results. Display only; never sent to the API.
    #[serde(skip_serializing, default)]
    pub name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self::assistant(Some(content.into()), Vec::new())
    }

    /// An assistant turn with optional text and zero or more tool calls.
    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            tool_call_id: None,
            name: None,
        }
    }

    pub fn tool_result(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
            name: Some(name.into()),
        }
    }

    /// Tool calls carried by this message (empty for non-assistant messages).
    pub fn calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    /// Render the message for a terminal: a centered banner naming the
    /// message type, the text content, then any tool calls with their
    /// arguments.
    pub fn to_formatted_string(&self) -> String {
        let title = match self.role {
            MessageRole::System => "System Message",
            MessageRole::User => "Human Message",
            MessageRole::Assistant => "Ai Message",
            MessageRole::Tool => "Tool Message",
        };
        let mut out = banner(title);

        if let Some(ref name) = self.name {
            out.push_str(&format!("\nName: {name}"));
        }
        if let Some(ref id) = self.tool_call_id {
            out.push_str(&format!("\nTool Call ID: {id}"));
        }
        if let Some(ref content) = self.content
            && !content.is_empty()
        {
            out.push_str("\n\n");
            out.push_str(content);
        }
        if !self.calls().is_empty() {
            out.push_str("\nTool Calls:");
            for call in self.calls() {
                out.push_str(&format!(
                    "\n  {} ({})\n Call ID: {}\n  Args:",
                    call.function.name, call.id, call.id
                ));
                match serde_json::from_str::<serde_json::Value>(&call.function.arguments) {
                    Ok(serde_json::Value::Object(args)) => {
                        for (key, value) in args {
                            out.push_str(&format!("\n    {key}: {value}"));
                        }
                    }
                    _ => out.push_str(&format!("\n    {}", call.function.arguments)),
                }
            }
        }
        out
    }
}

fn banner(title: &str) -> String {
    let pad = BANNER_WIDTH.saturating_sub(title.len() + 2) / 2;
    let left = "=".repeat(pad);
    let right = if title.len() % 2 == 0 {
        left.clone()
    } else {
        format!("{left}=")
    };
    format!("{left} {title} {right}")
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

/// A function the model may call.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub function: FunctionDef,
}

impl ToolDef {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: ToolType::Function,
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CallType {
    #[serde(rename = "function")]
    Function,
}

/// One function call requested by the model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: CallType,
    pub function: FunctionCallData,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: CallType::Function,
            function: FunctionCallData {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FunctionCallData {
    pub name: String,
    pub arguments: String,
}

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// First choice of a chat response.
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

impl ChatCompletion {
    /// Convert the completion into the assistant message it represents.
    pub fn into_message(self) -> Message {
        Message::assistant(self.content, self.tool_calls)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Async HTTP client for an OpenAI-compatible chat completions API.
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ChatClient {
    /// Create a client for the OpenAI API.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(api_key, DEFAULT_OPENAI_BASE_URL)
    }

    /// Create a client for any OpenAI-compatible server.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("deskhand/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// POST `body` to `/chat/completions`.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, ApiError> {
        debug!(
            "Chat request to {} with {} message(s) and {} tool(s)",
            body.model,
            body.messages.len(),
            body.tools.as_ref().map_or(0, Vec::len),
        );
        trace!("Chat request body: {}", serde_json::to_string(body).unwrap_or_default());

        let started = Instant::now();

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        debug!("Chat response {status} after {:?}", started.elapsed());

        if !status.is_success() {
            return Err(ApiError::Http {
                service: "chat",
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: RawChatResponse = serde_json::from_str(&text)?;

        if let Some(err) = parsed.error {
            return Err(ApiError::Api {
                service: "chat",
                message: err.message,
            });
        }

        if let Some(total) = parsed.usage.as_ref().and_then(|u| u.total_tokens) {
            debug!("Chat used {total} tokens");
        }

        let Some(choice) = parsed.choices.and_then(|c| c.into_iter().next()) else {
            warn!("Chat response had no choices");
            return Ok(ChatCompletion {
                content: None,
                tool_calls: vec![],
                usage: parsed.usage,
                finish_reason: None,
            });
        };

        let tool_calls = choice.message.tool_calls.unwrap_or_default();
        debug!("Model replied with {} tool call(s)", tool_calls.len());

        Ok(ChatCompletion {
            content: choice.message.content,
            tool_calls,
            usage: parsed.usage,
            finish_reason: choice.finish_reason,
        })
    }
}
