//! Blocking wait for an out-of-band authorization flow.

use super::{ArcadeClient, AuthorizationResponse, AuthorizationStatus, MAX_STATUS_WAIT_SECS};
use crate::api::{ApiError, RetryConfig, retry_api_call};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Boxed future returned by [`AuthorizationGate::wait_for_completion`].
pub type GateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<AuthorizationResponse, AuthError>> + Send + 'a>>;

/// Why waiting for an authorization ended without a grant.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("authorization {id} failed")]
    Failed { id: String },
    #[error("timed out after {secs}s waiting for authorization {id}")]
    TimedOut { id: String, secs: u64 },
}

/// Something that can block until the user completes an authorization.
pub trait AuthorizationGate: Send + Sync {
    /// Resolve once the authorization identified by `authorization_id` has
    /// completed, or fail if it failed, timed out or could not be polled.
    fn wait_for_completion<'a>(&'a self, authorization_id: &'a str) -> GateFuture<'a>;
}

impl<G: AuthorizationGate + ?Sized> AuthorizationGate for Arc<G> {
    fn wait_for_completion<'a>(&'a self, authorization_id: &'a str) -> GateFuture<'a> {
        (**self).wait_for_completion(authorization_id)
    }
}

/// Long-polls Arcade's auth status endpoint.
#[derive(Debug)]
pub struct ArcadeAuthGate {
    client: Arc<ArcadeClient>,
    wait_secs: u32,
    timeout: Option<Duration>,
    retry: RetryConfig,
}

impl ArcadeAuthGate {
    /// Poll with the longest wait the server allows and no overall deadline.
    pub fn new(client: Arc<ArcadeClient>) -> Self {
        Self {
            client,
            wait_secs: MAX_STATUS_WAIT_SECS,
            timeout: None,
            retry: RetryConfig::default(),
        }
    }

    /// Give up after `timeout` in total. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Server-side wait per poll, capped at [`MAX_STATUS_WAIT_SECS`].
    pub fn with_wait_secs(mut self, wait_secs: u32) -> Self {
        self.wait_secs = wait_secs.min(MAX_STATUS_WAIT_SECS);
        self
    }

    async fn poll_until_done(&self, id: &str) -> Result<AuthorizationResponse, AuthError> {
        let mut polls = 0u32;
        loop {
            polls += 1;
            let resp = retry_api_call(&self.retry, || {
                self.client.auth_status(id, Some(self.wait_secs))
            })
            .await?;
            debug!("Authorization {id} poll {polls}: {:?}", resp.status);
            match resp.status {
                AuthorizationStatus::Completed => {
                    info!("Authorization {id} completed after {polls} poll(s)");
                    return Ok(resp);
                }
                AuthorizationStatus::Failed => {
                    return Err(AuthError::Failed { id: id.to_string() });
                }
                AuthorizationStatus::NotStarted
                | AuthorizationStatus::Pending
                | AuthorizationStatus::Unknown => {}
            }
        }
    }
}

impl AuthorizationGate for ArcadeAuthGate {
    fn wait_for_completion<'a>(&'a self, authorization_id: &'a str) -> GateFuture<'a> {
        Box::pin(async move {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, self.poll_until_done(authorization_id))
                    .await
                    .map_err(|_| AuthError::TimedOut {
                        id: authorization_id.to_string(),
                        secs: limit.as_secs(),
                    })?,
                None => self.poll_until_done(authorization_id).await,
            }
        })
    }
}
