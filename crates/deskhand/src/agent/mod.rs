//! Agent turns with interrupts: data model, runtime, resolver and session.
//!
//! - [`interrupt`]: [`Interrupt`], [`Decision`], [`Resume`] and the
//!   [`classify`] function that tells interrupt kinds apart.
//! - [`runtime`]: the [`AgentRuntime`] trait and [`ReactAgent`]. Start here
//!   when building an agent.
//! - [`resolver`]: [`InterruptResolver`], one decision per interrupt.
//! - [`session`]: [`SessionLoop`], the suspend/resume cycle around each turn.
//! - [`console`]: the operator's terminal as a substitutable [`Console`].
//! - [`checkpoint`]: per-thread state in memory or on disk.

pub mod checkpoint;
pub mod config;
pub mod console;
pub mod interrupt;
pub mod resolver;
pub mod runtime;
pub mod session;

// Re-export commonly used items at the module level.
pub use checkpoint::{CheckpointError, Checkpointer, FileSaver, MemorySaver, ThreadState};
pub use config::AgentConfig;
pub use console::{Console, ScriptedConsole, StdConsole};
pub use interrupt::{
    AgentInput, AuthorizationPrompt, Decision, Interrupt, InterruptKind, NodeUpdate, Resume,
    RunConfig, StreamChunk, ThreadId, classify,
};
pub use resolver::InterruptResolver;
pub use runtime::{AgentError, AgentRuntime, ChunkStream, ReactAgent};
pub use session::{AppContext, SessionLoop, TurnReport};
