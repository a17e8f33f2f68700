//! Zendesk support agent built on deskhand.
//!
//! Loads the Zendesk toolkit from Arcade, asks the operator before any
//! call that changes a ticket, and chats in the terminal.
//!
//! ```ignore
//! use deskhand_zendesk::{ZendeskConfig, support_system_prompt};
//!
//! let config = ZendeskConfig::from_env()?;
//! let selection = config.tool_selection();
//! let agent_config = config.agent_config();
//! ```

pub mod config;
pub mod prompt;

pub use config::{ConfigError, DEFAULT_APPROVAL_TOOLS, DEFAULT_TOOLKIT, ZendeskConfig};
pub use prompt::support_system_prompt;
