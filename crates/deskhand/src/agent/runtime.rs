//! The agent runtime: a ReAct loop that can suspend on interrupts.
//!
//! Each [`AgentRuntime::stream`] call advances one thread until it either
//! produces a final answer or needs outside consent. A run alternates two
//! nodes:
//!
//! 1. **model**: send the system prompt, the thread's messages and the tool
//!    definitions to the chat API, append the assistant message.
//! 2. **tools**: for every tool call in order, check authorization, then
//!    operator approval, then execute.
//!
//! If any call of the round is blocked, the round is saved as pending and
//! the stream ends with one [`StreamChunk::Interrupts`] chunk. The next
//! call with [`AgentInput::Resume`] applies the decisions positionally and
//! continues where the round stopped.

use super::checkpoint::{
    CallStatus, CheckpointError, Checkpointer, PendingCall, PendingRound, ThreadState,
};
use super::config::AgentConfig;
use super::interrupt::{
    AgentInput, Decision, Interrupt, NodeUpdate, Resume, RunConfig, StreamChunk, ThreadId,
};
use crate::api::{ApiError, retry_api_call};
use crate::tools::{AuthCheck, ToolSet};
use crate::{ChatClient, ChatRequest, Message};
use futures::Stream;
use serde_json::{Value, json};
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Node name of model updates.
pub const MODEL_NODE: &str = "model";
/// Node name of tool result updates.
pub const TOOLS_NODE: &str = "tools";

/// Lazy, finite stream of chunks produced by one runtime invocation.
pub type ChunkStream<'a> = Pin<Box<dyn Stream<Item = Result<StreamChunk, AgentError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error("resume carried {got} decision(s) but {expected} interrupt(s) are pending")]
    ResumeMismatch { expected: usize, got: usize },
    #[error("nothing to resume on thread {0}")]
    NoPendingRound(ThreadId),
    #[error("stopped after {0} model steps without a final answer")]
    RoundLimit(u32),
}

/// Something that runs agent turns and reports progress as a chunk stream.
pub trait AgentRuntime: Send + Sync {
    fn stream(&self, input: AgentInput, config: &RunConfig) -> ChunkStream<'_>;
}

impl<R: AgentRuntime + ?Sized> AgentRuntime for Arc<R> {
    fn stream(&self, input: AgentInput, config: &RunConfig) -> ChunkStream<'_> {
        (**self).stream(input, config)
    }
}

// ── ReactAgent ─────────────────────────────────────────────────────

/// ReAct agent over an OpenAI-compatible chat API.
pub struct ReactAgent {
    chat: ChatClient,
    tools: ToolSet,
    config: AgentConfig,
    checkpointer: Arc<dyn Checkpointer>,
}

impl std::fmt::Debug for ReactAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactAgent")
            .field("model", &self.config.model)
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

impl ReactAgent {
    pub fn new(
        chat: ChatClient,
        tools: ToolSet,
        config: AgentConfig,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Self {
        Self {
            chat,
            tools,
            config,
            checkpointer,
        }
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Current saved state of a thread.
    pub fn thread_state(&self, thread_id: &ThreadId) -> Result<Option<ThreadState>, AgentError> {
        Ok(self.checkpointer.get(thread_id)?)
    }
}

impl AgentRuntime for ReactAgent {
    fn stream(&self, input: AgentInput, config: &RunConfig) -> ChunkStream<'_> {
        let run = Run {
            agent: self,
            thread: config.thread_id.clone(),
            state: ThreadState::default(),
            step: Step::Start(input),
            rounds: 0,
        };
        Box::pin(futures::stream::unfold(run, |mut run| async move {
            let item = run.advance().await?;
            Some((item, run))
        }))
    }
}

enum Step {
    Start(AgentInput),
    CallModel,
    RunTools,
    Done,
}

/// State of one invocation.
struct Run<'a> {
    agent: &'a ReactAgent,
    thread: ThreadId,
    state: ThreadState,
    step: Step,
    rounds: u32,
}

impl Run<'_> {
    /// Run steps until one produces a chunk. `None` once finished; an error
    /// ends the stream.
    async fn advance(&mut self) -> Option<Result<StreamChunk, AgentError>> {
        loop {
            let result = match std::mem::replace(&mut self.step, Step::Done) {
                Step::Done => return None,
                Step::Start(input) => self.start(input).map(|()| None),
                Step::CallModel => self.call_model().await.map(Some),
                Step::RunTools => self.run_tools().await,
            };
            match result {
                Ok(Some(chunk)) => return Some(Ok(chunk)),
                Ok(None) => continue,
                Err(e) => {
                    self.step = Step::Done;
                    return Some(Err(e));
                }
            }
        }
    }

    fn save(&mut self) -> Result<(), AgentError> {
        self.state.touch();
        self.agent.checkpointer.put(&self.thread, &self.state)?;
        Ok(())
    }

    fn start(&mut self, input: AgentInput) -> Result<(), AgentError> {
        self.state = self.agent.checkpointer.get(&self.thread)?.unwrap_or_default();

        match input {
            AgentInput::Messages(messages) => {
                if let Some(round) = self.state.pending.take() {
                    warn!(
                        "Thread {}: new input while {} tool call(s) were suspended; cancelling them",
                        self.thread,
                        round.awaiting().len()
                    );
                    self.state.messages.extend(cancel_round(round));
                }
                info!("Thread {}: new turn", self.thread);
                self.state.messages.extend(messages);
                self.step = Step::CallModel;
            }
            AgentInput::Resume(resume) => {
                let Some(round) = self.state.pending.as_mut() else {
                    return Err(AgentError::NoPendingRound(self.thread.clone()));
                };
                apply_decisions(round, resume)?;
                info!("Thread {}: resuming suspended round", self.thread);
                self.step = Step::RunTools;
            }
        }
        self.save()
    }

    async fn call_model(&mut self) -> Result<StreamChunk, AgentError> {
        self.rounds += 1;
        if self.rounds > self.agent.config.max_rounds {
            return Err(AgentError::RoundLimit(self.agent.config.max_rounds));
        }
        debug!("Thread {}: model step {}", self.thread, self.rounds);

        let config = &self.agent.config;
        let mut messages = Vec::with_capacity(self.state.messages.len() + 1);
        messages.push(Message::system(config.system_prompt.clone()));
        messages.extend(self.state.messages.iter().cloned());
        let tools = self.agent.tools.definitions();
        let request = ChatRequest {
            model: config.model.clone(),
            messages,
            max_completion_tokens: Some(config.max_tokens),
            temperature: config.temperature,
            tools: if tools.is_empty() { None } else { Some(tools) },
        };

        let chat = &self.agent.chat;
        let completion = retry_api_call(&config.retry, || chat.chat(&request)).await?;
        let message = completion.into_message();

        if message.calls().is_empty() {
            self.step = Step::Done;
        } else {
            self.state.pending = Some(PendingRound {
                calls: message
                    .calls()
                    .iter()
                    .map(|call| PendingCall {
                        call: call.clone(),
                        status: CallStatus::Queued,
                    })
                    .collect(),
            });
            self.step = Step::RunTools;
        }
        self.state.messages.push(message.clone());
        self.save()?;

        Ok(StreamChunk::Updates(vec![NodeUpdate {
            node: MODEL_NODE.to_string(),
            messages: vec![message],
        }]))
    }

    async fn run_tools(&mut self) -> Result<Option<StreamChunk>, AgentError> {
        let Some(mut round) = self.state.pending.take() else {
            self.step = Step::CallModel;
            return Ok(None);
        };

        for pending in &mut round.calls {
            advance_call(&self.agent.tools, pending).await;
        }

        let awaiting = round.awaiting();
        if !awaiting.is_empty() {
            let interrupts: Vec<Interrupt> = awaiting
                .iter()
                .filter_map(|&i| round.calls.get(i))
                .filter_map(interrupt_for)
                .collect();
            info!(
                "Thread {}: suspending on {} interrupt(s)",
                self.thread,
                interrupts.len()
            );
            self.state.pending = Some(round);
            self.step = Step::Done;
            self.save()?;
            return Ok(Some(StreamChunk::Interrupts(interrupts)));
        }

        let results = tool_messages(round);
        self.state.messages.extend(results.iter().cloned());
        self.step = Step::CallModel;
        self.save()?;
        Ok(Some(StreamChunk::Updates(vec![NodeUpdate {
            node: TOOLS_NODE.to_string(),
            messages: results,
        }])))
    }
}

/// Move one call forward as far as it can go without outside input.
async fn advance_call(tools: &ToolSet, pending: &mut PendingCall) {
    let name = pending.call.function.name.clone();
    let next = match pending.status {
        CallStatus::Queued => {
            let Some(tool) = tools.get(&name) else {
                warn!("Model called unknown tool {name}");
                pending.status = CallStatus::Done {
                    result: format!("Error: unknown tool '{name}'"),
                };
                return;
            };
            match tool.check_authorization().await {
                Ok(AuthCheck::Granted) if tool.requires_approval() => CallStatus::AwaitingApproval,
                Ok(AuthCheck::Granted) => CallStatus::Done {
                    result: tools.execute(&name, &pending.call.function.arguments).await,
                },
                Ok(AuthCheck::Required(authorization)) => {
                    CallStatus::AwaitingAuthorization { authorization }
                }
                Err(e) => {
                    warn!("Authorization check for {name} failed: {e}");
                    CallStatus::Done {
                        result: format!("Error: could not check authorization for {name}: {e}"),
                    }
                }
            }
        }
        CallStatus::Approved => CallStatus::Done {
            result: tools.execute(&name, &pending.call.function.arguments).await,
        },
        _ => return,
    };
    pending.status = next;
}

/// Match decisions to the awaiting calls, in call order.
fn apply_decisions(round: &mut PendingRound, resume: Resume) -> Result<(), AgentError> {
    let awaiting = round.awaiting();
    let decisions = resume.into_decisions();
    if decisions.len() != awaiting.len() {
        return Err(AgentError::ResumeMismatch {
            expected: awaiting.len(),
            got: decisions.len(),
        });
    }

    for (index, decision) in awaiting.into_iter().zip(decisions) {
        let Some(pending) = round.calls.get_mut(index) else {
            continue;
        };
        pending.status = decide(pending, decision);
    }
    Ok(())
}

fn decide(pending: &PendingCall, Decision { authorized }: Decision) -> CallStatus {
    let name = &pending.call.function.name;
    match (&pending.status, authorized) {
        // Re-check after a grant; the tool may also need approval.
        (CallStatus::AwaitingAuthorization { .. }, true) => CallStatus::Queued,
        (CallStatus::AwaitingAuthorization { .. }, false) => CallStatus::Done {
            result: format!("Error: authorization for {name} was not granted."),
        },
        (CallStatus::AwaitingApproval, true) => CallStatus::Approved,
        (CallStatus::AwaitingApproval, false) => CallStatus::Done {
            result: format!("The operator declined the call to {name}."),
        },
        (status, _) => status.clone(),
    }
}

/// Interrupt payload for a blocked call.
fn interrupt_for(pending: &PendingCall) -> Option<Interrupt> {
    let name = &pending.call.function.name;
    let value = match &pending.status {
        CallStatus::AwaitingAuthorization { authorization } => json!({
            "authorization_required": true,
            "hitl_required": false,
            "tool_name": name,
            "authorization_response": {
                "id": authorization.id,
                "url": authorization.url,
                "status": authorization.status,
            },
        }),
        CallStatus::AwaitingApproval => json!({
            "authorization_required": false,
            "hitl_required": true,
            "tool_name": name,
            "input": serde_json::from_str::<Value>(&pending.call.function.arguments)
                .unwrap_or_else(|_| Value::String(pending.call.function.arguments.clone())),
        }),
        _ => return None,
    };
    Some(Interrupt::new(pending.call.id.clone(), value))
}

/// Tool result messages for a finished round, in call order.
fn tool_messages(round: PendingRound) -> Vec<Message> {
    round
        .calls
        .into_iter()
        .map(|pending| {
            let result = match pending.status {
                CallStatus::Done { result } => result,
                _ => "Error: tool call did not complete.".to_string(),
            };
            Message::tool_result(pending.call.id, pending.call.function.name, result)
        })
        .collect()
}

/// Close a suspended round that the user abandoned by sending a new message.
fn cancel_round(mut round: PendingRound) -> Vec<Message> {
    for pending in &mut round.calls {
        if !matches!(pending.status, CallStatus::Done { .. }) {
            pending.status = CallStatus::Done {
                result: "Error: cancelled because the user sent a new message.".to_string(),
            };
        }
    }
    tool_messages(round)
}
