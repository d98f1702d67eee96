//! Request dispatcher interface.
//!
//! A dispatcher sends one [`LoginRequest`] and classifies the answer. It never
//! retries: the gate calls it at most once per attempt.

use crate::types::{FailureReason, LoginRequest};
use async_trait::async_trait;
use thiserror::Error;

/// Sends the attested login request.
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    /// Endpoint the login request is sent to.
    fn endpoint(&self) -> &str;

    /// Header name the token is attached under.
    fn header_name(&self) -> &str;

    /// Send `request` and return the shape name on acceptance.
    async fn send(&self, request: LoginRequest) -> Result<String, DispatchError>;
}

/// Why a dispatch did not produce a shape name.
///
/// The variants exist for logging. Callers only ever see
/// [`FailureReason::AuthFailure`] through [`DispatchError::reason`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server rejected request: HTTP {status}")]
    Rejected { status: u16 },

    #[error("Server returned an empty body")]
    EmptyBody,

    #[error("Response body is not text: {0}")]
    InvalidBody(String),
}

impl DispatchError {
    /// Non-200 statuses are all presumed to be attestation rejections,
    /// including ones that are really server errors.
    pub fn reason(&self) -> FailureReason {
        FailureReason::AuthFailure
    }
}
