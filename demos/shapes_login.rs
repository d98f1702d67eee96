//! Example: attested login against a shapes server
//!
//! Run with:
//!   ATTESTED_TOKEN=<token> ATTESTED_SERVER_URL=http://localhost:5000/ \
//!     cargo run -p attested-http --example shapes_login
//!
//! Leaving ATTESTED_TOKEN unset simulates an attestation SDK that failed to
//! initialise.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use attested_core::{AttemptOutcome, AttestationGate, AttestationResult, TokenProvider};
use attested_http::{DispatcherConfig, HttpDispatcher};
use tracing_subscriber::EnvFilter;

/// Token provider backed by an environment variable.
struct EnvTokenProvider {
    token: Option<String>,
}

impl EnvTokenProvider {
    fn from_env() -> Self {
        Self {
            token: std::env::var("ATTESTED_TOKEN").ok(),
        }
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    fn name(&self) -> &str {
        "env"
    }

    fn is_available(&self) -> bool {
        self.token.is_some()
    }

    async fn fetch_token(&self) -> AttestationResult {
        match &self.token {
            Some(token) if !token.is_empty() => AttestationResult::success(token.as_str()),
            _ => AttestationResult::Failure,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = DispatcherConfig::from_env()?;
    println!("Login endpoint: {} {}", config.method, config.server_url);

    let dispatcher = HttpDispatcher::with_config(config)?;
    let (gate, mut events) =
        AttestationGate::new(Arc::new(EnvTokenProvider::from_env()), Arc::new(dispatcher));

    // Stand-in for the UI thread
    let ui = tokio::spawn(async move {
        while let Some(change) = events.recv().await {
            match change.status_text() {
                Some(text) => println!("[{}] {}", change.attempt, text),
                None => println!("[{}] {}", change.attempt, change.state),
            }
        }
    });

    println!("{}", attested_core::DEFAULT_STATUS_TEXT);
    gate.prefetch();

    match gate.start().wait().await {
        AttemptOutcome::Finished(state) => match state.shape_name() {
            Some(shape) => println!("Logged in, your shape is: {}", shape),
            None => println!("Login failed: {}", state),
        },
        AttemptOutcome::Superseded => println!("Login attempt was superseded"),
    }

    drop(gate);
    ui.await?;

    Ok(())
}
