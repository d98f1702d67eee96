//! Core types used across the attested request flow.

use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// Status text shown before any login attempt has been made.
pub const DEFAULT_STATUS_TEXT: &str = "Press Login to access your account";

/// Header carrying the attestation token on the login request.
pub const DEFAULT_TOKEN_HEADER: &str = "ApproovToken";

/// Opaque, short-lived attestation token.
///
/// The raw value is never printed by `Debug` and never serialized; both
/// emit [`AttestationToken::fingerprint`] instead. Only [`as_str`](Self::as_str)
/// exposes it, for putting it on the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct AttestationToken(String);

impl AttestationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value, as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First 8 bytes of SHA-256(token), hex-encoded.
    pub fn fingerprint(&self) -> String {
        let hash = Sha256::digest(self.0.as_bytes());
        hex::encode(&hash[..8])
    }
}

impl fmt::Debug for AttestationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AttestationToken")
            .field(&self.fingerprint())
            .finish()
    }
}

impl Serialize for AttestationToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.fingerprint())
    }
}

impl From<&str> for AttestationToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for AttestationToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Result of a single token fetch. Produced exactly once per fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationResult {
    Success(AttestationToken),
    Failure,
}

impl AttestationResult {
    pub fn success(token: impl Into<AttestationToken>) -> Self {
        AttestationResult::Success(token.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttestationResult::Success(_))
    }
}

/// Why an attempt failed.
///
/// Closed on purpose: every server-side rejection, whatever its status code,
/// is an `AuthFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The attestation capability is unavailable.
    InitFailure,
    /// Token fetch failed or the server rejected the request.
    AuthFailure,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::InitFailure => write!(f, "Initialisation failure"),
            FailureReason::AuthFailure => write!(f, "Authorisation failure"),
        }
    }
}

/// Generation number of an attempt. Strictly increasing per gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttemptId(pub u64);

impl AttemptId {
    /// No attempt has started yet.
    pub const NONE: AttemptId = AttemptId(0);

    pub fn next(self) -> AttemptId {
        AttemptId(self.0.wrapping_add(1))
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The outbound login request for one attempt.
///
/// Built fresh for every attempt and consumed by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    /// Endpoint the request goes to
    pub url: String,
    /// Header carrying the token
    pub header_name: String,
    /// Token for this attempt only
    pub token: AttestationToken,
}

impl LoginRequest {
    pub fn new(
        url: impl Into<String>,
        header_name: impl Into<String>,
        token: AttestationToken,
    ) -> Self {
        Self {
            url: url.into(),
            header_name: header_name.into(),
            token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(FailureReason::InitFailure.to_string(), "Initialisation failure");
        assert_eq!(FailureReason::AuthFailure.to_string(), "Authorisation failure");
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AttestationToken::new("super-secret-token");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains(&token.fingerprint()));
    }

    #[test]
    fn test_token_serializes_as_fingerprint() {
        let result = AttestationResult::success("super-secret-token");
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("super-secret-token"));
        assert!(json.contains(&AttestationToken::new("super-secret-token").fingerprint()));
    }

    #[test]
    fn test_token_fingerprint_stable() {
        let a = AttestationToken::new("abc");
        let b = AttestationToken::new("abc");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 16);
        assert_ne!(a.fingerprint(), AttestationToken::new("abd").fingerprint());
    }

    #[test]
    fn test_attempt_id_ordering() {
        let first = AttemptId::NONE.next();
        assert_eq!(first, AttemptId(1));
        assert!(first.next() > first);
        assert_eq!(first.to_string(), "#1");
    }
}
