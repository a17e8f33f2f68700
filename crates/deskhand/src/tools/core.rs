//! Callable tools and the registry the runtime dispatches through.
//!
//! A [`Tool`] describes itself to the model with a [`ToolDef`], runs from a
//! raw JSON argument string, and exposes the two checks the runtime makes
//! before running it: end-user authorization and operator approval.
//! [`ToolSet`] owns the tools and wraps every execution with argument
//! validation, a timeout and output truncation.

use crate::ToolDef;
use crate::api::ApiError;
use crate::arcade::AuthorizationResponse;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Tool output beyond this many bytes is cut off.
pub const DEFAULT_MAX_RESULT_BYTES: usize = 30_000;

/// Future of a tool's output.
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = String> + Send + 'a>>;

/// Future of an authorization check.
pub type AuthFuture<'a> = Pin<Box<dyn Future<Output = Result<AuthCheck, ApiError>> + Send + 'a>>;

/// Outcome of a tool's authorization check.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthCheck {
    /// The user already holds the grant the tool needs (or it needs none).
    Granted,
    /// The user must complete the authorization flow first.
    Required(AuthorizationResponse),
}

/// Something the model can call.
///
/// # Example
///
/// ```ignore
/// struct WhoAmI;
///
/// impl Tool for WhoAmI {
///     fn definition(&self) -> ToolDef {
///         ToolDef::new("who_am_i", "Describe the current user", json!({"type": "object"}))
///     }
///
///     fn execute(&self, _arguments: &str) -> ToolFuture<'_> {
///         Box::pin(async { "support-agent@example.com".to_string() })
///     }
/// }
/// ```
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDef;

    /// Run with the model's JSON arguments. Failures are reported in the
    /// returned text as `Error: ...`; the model sees it either way.
    fn execute(&self, arguments: &str) -> ToolFuture<'_>;

    fn name(&self) -> String {
        self.definition().function.name
    }

    /// Whether the operator must approve each call before it runs.
    fn requires_approval(&self) -> bool {
        false
    }

    /// Check whether the end user has authorized this tool.
    fn check_authorization(&self) -> AuthFuture<'_> {
        Box::pin(async { Ok(AuthCheck::Granted) })
    }
}

/// Tools keyed by name.
///
/// ```ignore
/// let set = ToolSet::new()
///     .with_default_timeout(Some(Duration::from_secs(30)))
///     .with(WhoAmI);
/// let output = set.execute("who_am_i", "{}").await;
/// ```
pub struct ToolSet {
    tools: HashMap<String, Box<dyn Tool>>,
    max_result_bytes: usize,
    validate_args: bool,
    default_timeout: Option<Duration>,
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.names())
            .field("max_result_bytes", &self.max_result_bytes)
            .finish()
    }
}

impl ToolSet {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
            validate_args: false,
            default_timeout: None,
        }
    }

    pub fn with_max_result_bytes(mut self, max: usize) -> Self {
        self.max_result_bytes = max;
        self
    }

    /// Check arguments against each tool's parameter schema before running it.
    pub fn with_arg_validation(mut self, enabled: bool) -> Self {
        self.validate_args = enabled;
        self
    }

    /// Time limit for one execution. `None` means no limit.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Add a tool, replacing one of the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_boxed(Box::new(tool));
    }

    pub fn register_boxed(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Definitions to send with a chat request, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDef> {
        let mut defs: Vec<ToolDef> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run the named tool. Unknown names, bad arguments and timeouts come
    /// back as `Error: ...` text for the model to act on.
    pub async fn execute(&self, name: &str, arguments: &str) -> String {
        let Some(tool) = self.tools.get(name) else {
            return format!("Error: unknown tool '{name}'");
        };

        if self.validate_args
            && let Some(error) = validate_tool_arguments(tool.as_ref(), arguments)
        {
            return error;
        }

        log_tool_call(name, arguments);
        let start = std::time::Instant::now();

        let result = if let Some(limit) = self.default_timeout {
            match tokio::time::timeout(limit, tool.execute(arguments)).await {
                Ok(r) => r,
                Err(_) => {
                    warn!("{name} did not finish within {limit:?}");
                    format!("Error: {name} did not finish within {} seconds.", limit.as_secs())
                }
            }
        } else {
            tool.execute(arguments).await
        };

        debug!("{name} returned {} bytes in {:?}", result.len(), start.elapsed());
        trace!("{name} output: {result}");

        truncate_result(result, self.max_result_bytes)
    }
}

impl Default for ToolSet {
    fn default() -> Self {
        Self::new()
    }
}

/// The error text for arguments that are not JSON or do not fit the tool's
/// parameter schema, or `None` when they are fine.
pub fn validate_tool_arguments(tool: &dyn Tool, arguments: &str) -> Option<String> {
    let value: serde_json::Value = match serde_json::from_str(arguments) {
        Ok(v) => v,
        Err(e) => {
            return Some(format!(
                "Error: arguments for {} are not valid JSON ({e}). Send a JSON object.",
                tool.name()
            ));
        }
    };

    let definition = tool.definition();
    let schema = &definition.function.parameters;

    // An invalid schema is the provider's problem, not the model's.
    let Ok(validator) = jsonschema::validator_for(schema) else {
        return None;
    };

    let problems: Vec<String> = validator
        .iter_errors(&value)
        .map(|e| format!("- {}: {e}", e.instance_path()))
        .collect();
    if problems.is_empty() {
        return None;
    }
    Some(format!(
        "Error: invalid arguments for {}:\n{}",
        definition.function.name,
        problems.join("\n")
    ))
}

pub fn log_tool_call(name: &str, arguments: &str) {
    let mut preview: String = arguments.chars().take(120).collect();
    if preview.len() < arguments.len() {
        preview.push_str("...");
    }
    info!("Calling {name} with {preview}");
}

/// Cut `s` to at most `max` bytes on a char boundary and say so.
pub fn truncate_result(mut s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let total = s.len();
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    format!("{s}...\n[truncated: {total} bytes total]")
}
