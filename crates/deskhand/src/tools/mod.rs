//! Tool system: the [`Tool`](core::Tool) trait and [`ToolSet`](core::ToolSet)
//! registry used by the agent runtime.

pub mod core;

pub use self::core::{AuthCheck, AuthFuture, Tool, ToolFuture, ToolSet};
