//! # Attested Core
//!
//! Attestation-gated request flow for client applications: fetch a
//! short-lived integrity token, attach it to a login request, and turn the
//! server's answer into a settled attempt.
//!
//! ## Key Features
//! - **Injected token provider**: the attestation SDK sits behind [`TokenProvider`]
//! - **Generation-tagged attempts**: late results of superseded attempts are dropped
//! - **Closed failure taxonomy**: `InitFailure` or `AuthFailure`, nothing finer
//! - **Single notification channel**: every state change arrives as a [`StateChange`]

pub mod dispatch;
pub mod events;
pub mod gate;
pub mod provider;
pub mod state;
pub mod types;

pub use dispatch::{DispatchError, RequestDispatcher};
pub use events::StateChange;
pub use gate::{AttemptHandle, AttemptOutcome, AttestationGate, EVENT_CAPACITY};
pub use provider::{StaticTokenProvider, TokenProvider};
pub use state::{AttemptEvent, AttemptState, TransitionError};
pub use types::*;
