//! Environment configuration for the Zendesk agent.
//!
//! [`ZendeskConfig`] reads the required credentials from the environment
//! (after `.env` has been loaded) and converts them into deskhand types via
//! [`tool_selection`](ZendeskConfig::tool_selection),
//! [`agent_config`](ZendeskConfig::agent_config) and
//! [`run_config`](ZendeskConfig::run_config).

use deskhand::agent::{AgentConfig, RunConfig};
use deskhand::arcade::{DEFAULT_TOOL_LIMIT, ToolSelection};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::prompt::support_system_prompt;

/// Toolkit loaded when none is given.
pub const DEFAULT_TOOLKIT: &str = "Zendesk";

/// Tools that change tickets and therefore need the operator's approval.
pub const DEFAULT_APPROVAL_TOOLS: [&str; 2] =
    ["Zendesk_AddTicketComment", "Zendesk_MarkTicketSolved"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing {0}. Add it to your .env file.")]
    Missing(&'static str),
}

/// Settings of one Zendesk chat session.
#[derive(Debug, Clone)]
pub struct ZendeskConfig {
    /// End user the Zendesk tools act for (`ARCADE_USER_ID`).
    pub arcade_user_id: String,
    /// Chat model (`OPENAI_MODEL`).
    pub openai_model: String,
    pub arcade_api_key: String,
    pub openai_api_key: String,
    pub arcade_base_url: Option<String>,
    pub openai_base_url: Option<String>,
    /// Conversation key. Default: `"1"`.
    pub thread_id: String,
    /// Default: `["Zendesk"]`.
    pub toolkits: Vec<String>,
    pub tools: Vec<String>,
    /// Default: `100`.
    pub tool_limit: usize,
    /// Default: [`DEFAULT_APPROVAL_TOOLS`].
    pub approval_tools: Vec<String>,
    /// Persist conversations here instead of in memory.
    pub session_dir: Option<PathBuf>,
    /// Give up waiting for a browser authorization after this long.
    pub auth_timeout: Option<Duration>,
}

impl ZendeskConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            arcade_user_id: require("ARCADE_USER_ID")?,
            openai_model: require("OPENAI_MODEL")?,
            arcade_api_key: require("ARCADE_API_KEY")?,
            openai_api_key: require("OPENAI_API_KEY")?,
            arcade_base_url: get("ARCADE_BASE_URL"),
            openai_base_url: get("OPENAI_BASE_URL"),
            thread_id: "1".to_string(),
            toolkits: vec![DEFAULT_TOOLKIT.to_string()],
            tools: Vec::new(),
            tool_limit: DEFAULT_TOOL_LIMIT,
            approval_tools: DEFAULT_APPROVAL_TOOLS.iter().map(|t| t.to_string()).collect(),
            session_dir: None,
            auth_timeout: None,
        })
    }

    /// Which Arcade tools to load.
    pub fn tool_selection(&self) -> ToolSelection {
        let mut selection = ToolSelection::new(self.arcade_user_id.clone()).with_limit(self.tool_limit);
        for toolkit in &self.toolkits {
            selection = selection.with_toolkit(toolkit.clone());
        }
        for tool in &self.tools {
            selection = selection.with_tool(tool.clone());
        }
        for tool in &self.approval_tools {
            selection = selection.with_approval_tool(tool.clone());
        }
        selection
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig::new(self.openai_model.clone(), support_system_prompt())
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig::for_thread(self.thread_id.clone())
    }
}
