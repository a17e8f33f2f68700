//! Arcade tool platform: HTTP client, tool provider and authorization gate.
//!
//! [Arcade](https://arcade.dev) hosts tools (Zendesk, GitHub, Gmail, ...)
//! and brokers the OAuth grants they need. The agent only ever sees a
//! [`ToolSet`](crate::tools::ToolSet): [`get_tools`] turns the Arcade
//! catalog into [`ArcadeTool`]s, and [`ArcadeAuthGate`] blocks until the end
//! user finishes an authorization flow in their browser.

pub mod gate;
pub mod provider;
pub mod schema;

pub use gate::{ArcadeAuthGate, AuthError, AuthorizationGate, GateFuture};
pub use provider::{ArcadeTool, DEFAULT_TOOL_LIMIT, ToolSelection, get_tools};

use crate::api::ApiError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Base URL of the hosted Arcade engine.
pub const DEFAULT_ARCADE_BASE_URL: &str = "https://api.arcade.dev";

/// Longest long-poll the auth status endpoint accepts, in seconds.
pub const MAX_STATUS_WAIT_SECS: u32 = 59;

// ── Tool catalog types ─────────────────────────────────────────────

/// One page of `GET /v1/tools`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ToolPage {
    #[serde(default)]
    pub items: Vec<ToolDefinition>,
    #[serde(default)]
    pub total_count: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// A tool as described by the Arcade catalog.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub fully_qualified_name: Option<String>,
    #[serde(default)]
    pub qualified_name: Option<String>,
    #[serde(default)]
    pub description: String,
    pub toolkit: ToolkitDefinition,
    #[serde(default)]
    pub input: ToolInput,
    #[serde(default)]
    pub requirements: Option<ToolRequirements>,
}

impl ToolDefinition {
    /// `Toolkit.Tool`, the name Arcade's execute and authorize endpoints use.
    pub fn qualified_name(&self) -> String {
        self.qualified_name
            .clone()
            .unwrap_or_else(|| format!("{}.{}", self.toolkit.name, self.name))
    }

    /// Whether the tool declares an OAuth requirement.
    pub fn requires_authorization(&self) -> bool {
        self.requirements
            .as_ref()
            .is_some_and(|r| r.authorization.is_some())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ToolkitDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ToolInput {
    #[serde(default)]
    pub parameters: Vec<InputParameter>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct InputParameter {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
    pub value_schema: ValueSchema,
    #[serde(default = "default_true")]
    pub inferrable: bool,
}

fn default_true() -> bool {
    true
}

/// Arcade's value type: `string`, `integer`, `number`, `boolean`, `json`
/// or `array` (with `inner_val_type`).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ValueSchema {
    pub val_type: String,
    #[serde(default)]
    pub inner_val_type: Option<String>,
    #[serde(default, rename = "enum")]
    pub enum_values: Option<Vec<String>>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ToolRequirements {
    #[serde(default)]
    pub authorization: Option<AuthorizationRequirement>,
    #[serde(default)]
    pub met: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct AuthorizationRequirement {
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub provider_type: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub oauth2: Option<serde_json::Value>,
}

// ── Authorization types ────────────────────────────────────────────

/// State of an authorization flow.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    NotStarted,
    Pending,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Response of `POST /v1/tools/authorize` and `GET /v1/auth/status`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AuthorizationResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub status: AuthorizationStatus,
    /// Where the user completes the flow. Absent once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl AuthorizationResponse {
    pub fn is_completed(&self) -> bool {
        self.status == AuthorizationStatus::Completed
    }
}

// ── Execution types ────────────────────────────────────────────────

#[derive(Deserialize, Debug, Clone)]
pub struct ExecuteToolResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Option<ToolOutput>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ToolOutput {
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<ToolOutputError>,
    /// Set when the call was rejected for lack of a grant.
    #[serde(default)]
    pub authorization: Option<AuthorizationResponse>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ToolOutputError {
    pub message: String,
    #[serde(default)]
    pub developer_message: Option<String>,
    #[serde(default)]
    pub can_retry: bool,
}

#[derive(Serialize)]
struct AuthorizeRequest<'a> {
    tool_name: &'a str,
    user_id: &'a str,
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    tool_name: &'a str,
    input: &'a serde_json::Value,
    user_id: &'a str,
}

/// Async HTTP client for the Arcade engine API.
pub struct ArcadeClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for ArcadeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArcadeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ArcadeClient {
    /// Create a client for the hosted Arcade engine.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(api_key, DEFAULT_ARCADE_BASE_URL)
    }

    /// Create a client for a self-hosted engine.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        // Must outlast the longest auth status long-poll.
        let client = reqwest::Client::builder()
            .user_agent(concat!("deskhand/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(u64::from(MAX_STATUS_WAIT_SECS) + 30))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /v1/tools`: one page of the catalog, optionally filtered by toolkit.
    pub async fn list_tools(
        &self,
        toolkit: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<ToolPage, ApiError> {
        let mut query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        if let Some(toolkit) = toolkit {
            query.push(("toolkit", toolkit.to_string()));
        }
        let request = self.client.get(self.url("/v1/tools")).query(&query);
        self.send(request).await
    }

    /// `GET /v1/tools/{name}`.
    pub async fn get_tool(&self, name: &str) -> Result<ToolDefinition, ApiError> {
        let request = self.client.get(self.url(&format!("/v1/tools/{name}")));
        self.send(request).await
    }

    /// `POST /v1/tools/authorize`: start (or look up) the grant a tool needs.
    pub async fn authorize_tool(
        &self,
        tool_name: &str,
        user_id: &str,
    ) -> Result<AuthorizationResponse, ApiError> {
        let request = self
            .client
            .post(self.url("/v1/tools/authorize"))
            .json(&AuthorizeRequest { tool_name, user_id });
        self.send(request).await
    }

    /// `GET /v1/auth/status`. With `wait_secs` the server holds the request
    /// until the flow changes state or the wait elapses.
    pub async fn auth_status(
        &self,
        authorization_id: &str,
        wait_secs: Option<u32>,
    ) -> Result<AuthorizationResponse, ApiError> {
        let mut query = vec![("id", authorization_id.to_string())];
        if let Some(wait) = wait_secs {
            query.push(("wait", wait.min(MAX_STATUS_WAIT_SECS).to_string()));
        }
        let request = self.client.get(self.url("/v1/auth/status")).query(&query);
        self.send(request).await
    }

    /// `POST /v1/tools/execute`.
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        input: &serde_json::Value,
        user_id: &str,
    ) -> Result<ExecuteToolResponse, ApiError> {
        let request = self.client.post(self.url("/v1/tools/execute")).json(&ExecuteRequest {
            tool_name,
            input,
            user_id,
        });
        self.send(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let start = Instant::now();
        let resp = request.bearer_auth(&self.api_key).send().await?;
        let status = resp.status();
        let url = resp.url().path().to_string();
        let text = resp.text().await?;

        debug!(
            "Arcade {url}: HTTP {status} in {:.1}s ({} bytes)",
            start.elapsed().as_secs_f64(),
            text.len()
        );
        trace!("Arcade response body: {text}");

        if !status.is_success() {
            return Err(ApiError::Http {
                service: "arcade",
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_catalog_entry() {
        let def: ToolDefinition = serde_json::from_value(json!({
            "name": "ListTickets",
            "fully_qualified_name": "Zendesk.ListTickets@0.1.0",
            "qualified_name": "Zendesk.ListTickets",
            "description": "List tickets",
            "toolkit": { "name": "Zendesk", "version": "0.1.0" },
            "input": { "parameters": [{
                "name": "status",
                "required": false,
                "value_schema": { "val_type": "string", "enum": ["new", "open"] }
            }]},
            "requirements": { "authorization": { "provider_id": "zendesk" }, "met": false }
        }))
        .unwrap();

        assert_eq!(def.qualified_name(), "Zendesk.ListTickets");
        assert!(def.requires_authorization());
        let param = &def.input.parameters[0];
        assert!(param.inferrable);
        assert_eq!(
            param.value_schema.enum_values.as_deref(),
            Some(&["new".to_string(), "open".to_string()][..])
        );
    }

    #[test]
    fn qualified_name_falls_back_to_toolkit_and_name() {
        let def: ToolDefinition = serde_json::from_value(json!({
            "name": "WhoAmI",
            "toolkit": { "name": "Zendesk" }
        }))
        .unwrap();
        assert_eq!(def.qualified_name(), "Zendesk.WhoAmI");
        assert!(!def.requires_authorization());
    }

    #[test]
    fn unknown_status_does_not_fail_parsing() {
        let resp: AuthorizationResponse =
            serde_json::from_value(json!({ "id": "a1", "status": "expired" })).unwrap();
        assert_eq!(resp.status, AuthorizationStatus::Unknown);
        assert!(!resp.is_completed());
    }

    #[test]
    fn debug_hides_api_key() {
        let client = ArcadeClient::new("arc_secret").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("arc_secret"));
        assert!(debug.contains("api.arcade.dev"));
    }
}
