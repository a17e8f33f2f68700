//! Resolve a selection of Arcade tools into an executable [`ToolSet`].

use super::schema::{to_function_name, to_qualified_name, to_tool_def};
use super::{ArcadeClient, AuthorizationStatus, ExecuteToolResponse, ToolDefinition};
use crate::ToolDef;
use crate::api::{ApiError, RetryConfig, retry_api_call};
use crate::tools::{AuthCheck, AuthFuture, Tool, ToolFuture, ToolSet};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default cap on the number of tools handed to the model.
pub const DEFAULT_TOOL_LIMIT: usize = 100;

/// Largest page requested from `GET /v1/tools`.
const PAGE_SIZE: usize = 100;

/// Which tools to load and on whose behalf.
#[derive(Debug, Clone)]
pub struct ToolSelection {
    /// Toolkits whose tools are all loaded, in order.
    pub toolkits: Vec<String>,
    /// Individual tools, as `Toolkit.Tool` or `Toolkit_Tool`.
    pub tools: Vec<String>,
    /// End user the tools act for and authorize as.
    pub user_id: String,
    /// Maximum number of tools in the resulting set.
    pub limit: usize,
    /// Tools that need operator approval before every call.
    pub approval_tools: Vec<String>,
    pub retry: RetryConfig,
}

impl ToolSelection {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            toolkits: Vec::new(),
            tools: Vec::new(),
            user_id: user_id.into(),
            limit: DEFAULT_TOOL_LIMIT,
            approval_tools: Vec::new(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_toolkit(mut self, toolkit: impl Into<String>) -> Self {
        self.toolkits.push(toolkit.into());
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.push(tool.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_approval_tool(mut self, tool: impl Into<String>) -> Self {
        self.approval_tools.push(tool.into());
        self
    }

    fn needs_approval(&self, def: &ToolDefinition) -> bool {
        let function_name = to_function_name(&def.qualified_name());
        self.approval_tools
            .iter()
            .any(|t| to_function_name(t) == function_name)
    }
}

/// Load the selected tools from Arcade.
///
/// Toolkit tools come first (each toolkit paged until exhausted), then the
/// explicitly named tools. A tool already loaded is neither fetched again
/// nor counted twice against `selection.limit`.
pub async fn get_tools(
    client: &Arc<ArcadeClient>,
    selection: &ToolSelection,
) -> Result<ToolSet, ApiError> {
    let mut definitions: Vec<ToolDefinition> = Vec::new();
    let mut seen = HashSet::new();

    for toolkit in &selection.toolkits {
        let mut offset = 0usize;
        while definitions.len() < selection.limit {
            let page_size = (selection.limit - definitions.len()).min(PAGE_SIZE);
            let page = retry_api_call(&selection.retry, || {
                client.list_tools(Some(toolkit.as_str()), page_size as u32, offset as u32)
            })
            .await?;
            let fetched = page.items.len();
            debug!("Toolkit {toolkit}: {fetched} tools at offset {offset}");
            for def in page.items {
                if definitions.len() < selection.limit && seen.insert(def.qualified_name()) {
                    definitions.push(def);
                }
            }
            offset += fetched;

            let exhausted = match page.total_count {
                Some(total) => offset >= total as usize,
                None => fetched < page_size,
            };
            if fetched == 0 || exhausted {
                break;
            }
        }
    }

    for name in &selection.tools {
        if definitions.len() >= selection.limit {
            break;
        }
        let qualified = to_qualified_name(name);
        if seen.contains(&qualified) {
            continue;
        }
        let def = retry_api_call(&selection.retry, || client.get_tool(&qualified)).await?;
        if seen.insert(def.qualified_name()) {
            definitions.push(def);
        }
    }

    let mut set = ToolSet::new()
        .with_arg_validation(true)
        .with_default_timeout(Some(Duration::from_secs(120)));

    for def in definitions {
        let requires_approval = selection.needs_approval(&def);
        set.register(ArcadeTool::new(
            Arc::clone(client),
            def,
            selection.user_id.clone(),
            requires_approval,
        ));
    }

    for wanted in &selection.approval_tools {
        if !set.contains(&to_function_name(wanted)) {
            warn!("Approval requested for {wanted}, which is not in the loaded tool set");
        }
    }

    info!("Loaded {} Arcade tools: {}", set.len(), set.names().join(", "));
    Ok(set)
}

// ── ArcadeTool ─────────────────────────────────────────────────────

/// An Arcade-hosted tool executed on behalf of one user.
pub struct ArcadeTool {
    client: Arc<ArcadeClient>,
    definition: ToolDefinition,
    tool_def: ToolDef,
    qualified_name: String,
    user_id: String,
    requires_approval: bool,
}

impl ArcadeTool {
    pub fn new(
        client: Arc<ArcadeClient>,
        definition: ToolDefinition,
        user_id: String,
        requires_approval: bool,
    ) -> Self {
        Self {
            tool_def: to_tool_def(&definition),
            qualified_name: definition.qualified_name(),
            client,
            definition,
            user_id,
            requires_approval,
        }
    }

    /// The Arcade catalog entry this tool was built from.
    pub fn arcade_definition(&self) -> &ToolDefinition {
        &self.definition
    }
}

impl Tool for ArcadeTool {
    fn definition(&self) -> ToolDef {
        self.tool_def.clone()
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let input = if arguments.trim().is_empty() {
            Ok(serde_json::json!({}))
        } else {
            serde_json::from_str::<serde_json::Value>(arguments)
        };
        Box::pin(async move {
            let input = match input {
                Ok(v) => v,
                Err(e) => return format!("Error: invalid JSON arguments: {e}"),
            };
            match self
                .client
                .execute_tool(&self.qualified_name, &input, &self.user_id)
                .await
            {
                Ok(resp) => render_output(resp),
                Err(e) => format!("Error: {e}"),
            }
        })
    }

    fn requires_approval(&self) -> bool {
        self.requires_approval
    }

    fn check_authorization(&self) -> AuthFuture<'_> {
        Box::pin(async move {
            if !self.definition.requires_authorization() {
                return Ok(AuthCheck::Granted);
            }
            let resp = self
                .client
                .authorize_tool(&self.qualified_name, &self.user_id)
                .await?;
            debug!("Authorization for {}: {:?}", self.qualified_name, resp.status);
            Ok(match resp.status {
                AuthorizationStatus::Completed => AuthCheck::Granted,
                _ => AuthCheck::Required(resp),
            })
        })
    }
}

/// Turn an execution response into the string handed back to the model.
fn render_output(resp: ExecuteToolResponse) -> String {
    let Some(output) = resp.output else {
        return if resp.success == Some(false) {
            "Error: tool execution failed".to_string()
        } else {
            String::new()
        };
    };
    if let Some(error) = output.error {
        return format!("Error: {}", error.message);
    }
    if let Some(auth) = output.authorization
        && !auth.is_completed()
    {
        return match auth.url {
            Some(url) => format!("Error: authorization required, visit {url}"),
            None => "Error: authorization required".to_string(),
        };
    }
    match output.value {
        Some(serde_json::Value::String(s)) => s,
        Some(value) => value.to_string(),
        None => String::new(),
    }
}
