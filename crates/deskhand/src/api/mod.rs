//! API plumbing shared by the chat and Arcade clients.
//!
//! - [`error`]: [`ApiError`], the single error type for HTTP-backed calls,
//!   with transient/permanent classification.
//! - [`retry`]: configurable exponential backoff and the
//!   [`retry_api_call`](retry::retry_api_call) driver.

pub mod error;
pub mod retry;

pub use error::ApiError;
pub use retry::{RetryConfig, retry_api_call};
