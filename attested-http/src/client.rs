//! reqwest-backed request dispatcher.

use crate::config::{DispatcherConfig, USER_AGENT_TOKEN_KEY};
use crate::response;
use async_trait::async_trait;
use attested_core::{DispatchError, LoginRequest, RequestDispatcher};
use reqwest::header::{HeaderName, USER_AGENT};
use reqwest::{Client, Url};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid token header name: {0}")]
    InvalidHeader(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Sends the attested login request over HTTP.
///
/// One request per [`send`](RequestDispatcher::send) call and no retries.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
    config: DispatcherConfig,
}

impl HttpDispatcher {
    /// Dispatcher with default configuration.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_config(DispatcherConfig::default())
    }

    /// Dispatcher with custom configuration.
    pub fn with_config(config: DispatcherConfig) -> Result<Self, HttpError> {
        Url::parse(&config.server_url)
            .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", config.server_url, e)))?;
        HeaderName::from_bytes(config.token_header.as_bytes())
            .map_err(|e| HttpError::InvalidHeader(format!("{}: {}", config.token_header, e)))?;

        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    fn user_agent_with_token(&self, request: &LoginRequest) -> String {
        format!(
            "{} {}/{}",
            self.config.user_agent,
            USER_AGENT_TOKEN_KEY,
            request.token.as_str()
        )
    }
}

#[async_trait]
impl RequestDispatcher for HttpDispatcher {
    fn endpoint(&self) -> &str {
        &self.config.server_url
    }

    fn header_name(&self) -> &str {
        &self.config.token_header
    }

    async fn send(&self, request: LoginRequest) -> Result<String, DispatchError> {
        let mut builder = self
            .client
            .request(self.config.method.as_reqwest(), request.url.as_str())
            .header(request.header_name.as_str(), request.token.as_str());

        if self.config.append_token_to_user_agent {
            builder = builder.header(USER_AGENT, self.user_agent_with_token(&request));
        }

        tracing::debug!(
            "{} {} with {} token {}",
            self.config.method,
            request.url,
            request.header_name,
            request.token.fingerprint()
        );

        let response = builder
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        tracing::debug!("Login response: HTTP {} ({} bytes)", status, body.len());

        response::classify(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attested_core::AttestationToken;

    #[test]
    fn test_dispatcher_creation() {
        let dispatcher = HttpDispatcher::new().unwrap();
        assert_eq!(dispatcher.endpoint(), "http://localhost:5000/");
        assert_eq!(dispatcher.header_name(), "ApproovToken");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = HttpDispatcher::with_config(DispatcherConfig::for_server("not a url")).unwrap_err();
        assert!(matches!(err, HttpError::InvalidUrl(_)));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let config = DispatcherConfig {
            token_header: "Bad Header".to_string(),
            ..DispatcherConfig::default()
        };
        let err = HttpDispatcher::with_config(config).unwrap_err();
        assert!(matches!(err, HttpError::InvalidHeader(_)));
    }

    #[test]
    fn test_user_agent_with_token() {
        let config = DispatcherConfig {
            user_agent: "ShapesDemo/1.0".to_string(),
            append_token_to_user_agent: true,
            ..DispatcherConfig::default()
        };
        let dispatcher = HttpDispatcher::with_config(config).unwrap();
        let request = LoginRequest::new(
            dispatcher.endpoint(),
            dispatcher.header_name(),
            AttestationToken::new("abc.def"),
        );
        assert_eq!(
            dispatcher.user_agent_with_token(&request),
            "ShapesDemo/1.0 Approov/abc.def"
        );
    }
}
