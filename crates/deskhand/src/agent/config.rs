//! Configuration for [`ReactAgent`](super::runtime::ReactAgent).

use crate::api::RetryConfig;

/// Settings of a [`ReactAgent`](super::runtime::ReactAgent).
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model identifier (e.g. `"gpt-4o-mini"`).
    pub model: String,
    /// System prompt sent ahead of every conversation.
    pub system_prompt: String,
    /// Maximum model steps in one invocation before giving up.
    pub max_rounds: u32,
    /// Maximum tokens per model response.
    pub max_tokens: u32,
    /// Sampling temperature. `None` leaves it to the server.
    pub temperature: Option<f32>,
    /// Backoff for chat requests.
    pub retry: RetryConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            system_prompt: String::new(),
            max_rounds: 25,
            max_tokens: 4096,
            temperature: None,
            retry: RetryConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Defaults for everything but the model and prompt.
    ///
    /// ```ignore
    /// let config = AgentConfig::new("gpt-4o-mini", "You help support agents.")
    ///     .with_max_rounds(10);
    /// ```
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the number of retries for transient API failures.
    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}
