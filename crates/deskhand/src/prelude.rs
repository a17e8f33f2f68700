//! Convenience re-exports for common `deskhand` types.
//!
//! ```ignore
//! use deskhand::prelude::*;
//! ```
//!
//! Covers what a chat binary needs: the chat and Arcade clients, the
//! runtime and its config, checkpointers, the resolver and session loop,
//! and the tool trait. Interrupt internals (payload classification,
//! pending-round state) are left to their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{ChatClient, ChatRequest, Message, ToolDef};

// ── Agent runtime ───────────────────────────────────────────────────
pub use crate::agent::{
    AgentConfig, AgentError, AgentInput, AgentRuntime, AppContext, Checkpointer, Console,
    Decision, FileSaver, Interrupt, InterruptResolver, MemorySaver, ReactAgent, Resume, RunConfig,
    ScriptedConsole, SessionLoop, StdConsole, StreamChunk, ThreadId, TurnReport,
};

// ── Arcade ──────────────────────────────────────────────────────────
pub use crate::arcade::{
    ArcadeAuthGate, ArcadeClient, AuthError, AuthorizationGate, ToolSelection, get_tools,
};

// ── Tools ───────────────────────────────────────────────────────────
pub use crate::api::{ApiError, RetryConfig};
pub use crate::tools::{AuthCheck, Tool, ToolFuture, ToolSet};
