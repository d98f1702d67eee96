//! Dispatcher configuration.

use attested_core::DEFAULT_TOKEN_HEADER;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default login endpoint: the shapes demo server on the local machine.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000/";

/// Product token used when the attestation token rides along in `User-Agent`.
pub const USER_AGENT_TOKEN_KEY: &str = "Approov";

/// HTTP method used for the login request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoginMethod {
    #[default]
    Get,
    Post,
}

impl LoginMethod {
    pub(crate) fn as_reqwest(self) -> reqwest::Method {
        match self {
            LoginMethod::Get => reqwest::Method::GET,
            LoginMethod::Post => reqwest::Method::POST,
        }
    }
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginMethod::Get => write!(f, "GET"),
            LoginMethod::Post => write!(f, "POST"),
        }
    }
}

impl FromStr for LoginMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(LoginMethod::Get),
            "POST" => Ok(LoginMethod::Post),
            other => Err(format!("unsupported login method: {}", other)),
        }
    }
}

/// Configuration for [`HttpDispatcher`](crate::HttpDispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Login endpoint
    pub server_url: String,
    /// Header the attestation token is sent under
    pub token_header: String,
    /// GET or POST
    pub method: LoginMethod,
    /// Also append `Approov/<token>` to the User-Agent header
    pub append_token_to_user_agent: bool,
    /// Base User-Agent string
    pub user_agent: String,
    /// Give up on the login request after this many seconds (None = wait forever)
    pub request_timeout_secs: Option<u64>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            token_header: DEFAULT_TOKEN_HEADER.to_string(),
            method: LoginMethod::Get,
            append_token_to_user_agent: false,
            user_agent: concat!("attested-http/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: None,
        }
    }
}

impl DispatcherConfig {
    /// Defaults for `server_url`.
    pub fn for_server(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `ATTESTED_*` environment variables.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `ATTESTED_SERVER_URL` | `server_url` |
    /// | `ATTESTED_TOKEN_HEADER` | `token_header` |
    /// | `ATTESTED_HTTP_METHOD` | `method` |
    /// | `ATTESTED_USER_AGENT_TOKEN` | `append_token_to_user_agent` |
    /// | `ATTESTED_REQUEST_TIMEOUT_SECS` | `request_timeout_secs` |
    pub fn from_env() -> Result<Self, crate::HttpError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, crate::HttpError> {
        let mut config = Self::default();

        if let Some(url) = lookup("ATTESTED_SERVER_URL") {
            config.server_url = url;
        }
        if let Some(header) = lookup("ATTESTED_TOKEN_HEADER") {
            config.token_header = header;
        }
        if let Some(method) = lookup("ATTESTED_HTTP_METHOD") {
            config.method = method.parse().map_err(crate::HttpError::Config)?;
        }
        if let Some(flag) = lookup("ATTESTED_USER_AGENT_TOKEN") {
            config.append_token_to_user_agent = parse_flag(&flag).ok_or_else(|| {
                crate::HttpError::Config(format!("ATTESTED_USER_AGENT_TOKEN: not a boolean: {}", flag))
            })?;
        }
        if let Some(secs) = lookup("ATTESTED_REQUEST_TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().map_err(|e| {
                crate::HttpError::Config(format!("ATTESTED_REQUEST_TIMEOUT_SECS: {}", e))
            })?;
            config.request_timeout_secs = Some(secs);
        }

        Ok(config)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
