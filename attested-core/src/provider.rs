//! Token provider interface.
//!
//! The attestation SDK itself lives outside this crate. Anything that can
//! answer "is attestation available?" and "give me a fresh token" can drive
//! an [`AttestationGate`](crate::gate::AttestationGate).

use crate::types::{AttestationResult, AttestationToken};
use async_trait::async_trait;

/// Capability that produces attestation tokens.
///
/// Implementations are injected into the gate; there is no global instance.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Provider name used in logs (e.g., "approov").
    fn name(&self) -> &str;

    /// Whether the capability initialised and can be asked for tokens.
    ///
    /// Must be cheap: the gate calls it synchronously on every start.
    fn is_available(&self) -> bool;

    /// Fetch a fresh token.
    ///
    /// Resolves exactly once per call. How long this takes is up to the
    /// provider; the gate imposes no timeout.
    async fn fetch_token(&self) -> AttestationResult;
}

/// Provider that hands out a fixed result.
///
/// Useful for wiring tests and demos where the real SDK is not present.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    available: bool,
    result: AttestationResult,
}

impl StaticTokenProvider {
    /// Always succeeds with `token`.
    pub fn with_token(token: impl Into<AttestationToken>) -> Self {
        Self {
            available: true,
            result: AttestationResult::Success(token.into()),
        }
    }

    /// Available, but every fetch fails.
    pub fn failing() -> Self {
        Self {
            available: true,
            result: AttestationResult::Failure,
        }
    }

    /// Capability never initialised.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            result: AttestationResult::Failure,
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn fetch_token(&self) -> AttestationResult {
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_token() {
        let provider = StaticTokenProvider::with_token("tok-1");
        assert!(provider.is_available());
        assert_eq!(
            provider.fetch_token().await,
            AttestationResult::success("tok-1")
        );
    }

    #[tokio::test]
    async fn test_static_provider_failing() {
        let provider = StaticTokenProvider::failing();
        assert!(provider.is_available());
        assert!(!provider.fetch_token().await.is_success());
    }

    #[test]
    fn test_static_provider_unavailable() {
        let provider: Box<dyn TokenProvider> = Box::new(StaticTokenProvider::unavailable());
        assert!(!provider.is_available());
        assert_eq!(provider.name(), "static");
    }
}
