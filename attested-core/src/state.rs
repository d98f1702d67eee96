//! Attempt state machine.
//!
//! ```text
//!            Start              TokenReceived           Responded
//!   Idle ──────────► AwaitingToken ──────────► AwaitingResponse ──────► Succeeded
//!    │                   │                          │
//!    │ ProviderUnavail.  │ TokenFailed /            │ Rejected
//!    └──────────────────►│ ProviderUnavailable      └─────────────► Failed
//!                        └─────────────────────────────────────────► Failed
//! ```
//!
//! `Reset` is accepted from every state and always lands in `Idle`. Terminal
//! states accept nothing else.

use crate::types::FailureReason;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Where an attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum AttemptState {
    #[default]
    Idle,
    AwaitingToken,
    AwaitingResponse,
    Succeeded { shape_name: String },
    Failed { reason: FailureReason },
}

/// Inputs that drive [`AttemptState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptEvent {
    Start,
    ProviderUnavailable,
    TokenReceived,
    TokenFailed,
    Responded(String),
    /// The server refused the login; carries the reason to settle with.
    Rejected(FailureReason),
    Reset,
}

impl fmt::Display for AttemptEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptEvent::Start => write!(f, "start"),
            AttemptEvent::ProviderUnavailable => write!(f, "provider-unavailable"),
            AttemptEvent::TokenReceived => write!(f, "token-received"),
            AttemptEvent::TokenFailed => write!(f, "token-failed"),
            AttemptEvent::Responded(_) => write!(f, "responded"),
            AttemptEvent::Rejected(_) => write!(f, "rejected"),
            AttemptEvent::Reset => write!(f, "reset"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Illegal transition: {event} while {from}")]
    Illegal { from: AttemptState, event: AttemptEvent },
}

impl AttemptState {
    /// Apply `event`, returning the next state.
    pub fn transition(&self, event: AttemptEvent) -> Result<AttemptState, TransitionError> {
        use AttemptEvent as E;
        use AttemptState as S;

        let next = match (self, event) {
            (_, E::Reset) => S::Idle,
            (S::Idle, E::Start) => S::AwaitingToken,
            (S::Idle | S::AwaitingToken, E::ProviderUnavailable) => S::Failed {
                reason: FailureReason::InitFailure,
            },
            (S::AwaitingToken, E::TokenReceived) => S::AwaitingResponse,
            (S::AwaitingToken, E::TokenFailed) => S::Failed {
                reason: FailureReason::AuthFailure,
            },
            (S::AwaitingResponse, E::Responded(shape_name)) => S::Succeeded { shape_name },
            (S::AwaitingResponse, E::Rejected(reason)) => S::Failed { reason },
            (from, event) => {
                return Err(TransitionError::Illegal {
                    from: from.clone(),
                    event,
                })
            }
        };

        Ok(next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptState::Succeeded { .. } | AttemptState::Failed { .. })
    }

    /// Waiting on the provider or the server.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, AttemptState::AwaitingToken | AttemptState::AwaitingResponse)
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            AttemptState::Failed { reason } => Some(*reason),
            _ => None,
        }
    }

    pub fn shape_name(&self) -> Option<&str> {
        match self {
            AttemptState::Succeeded { shape_name } => Some(shape_name),
            _ => None,
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptState::Idle => write!(f, "idle"),
            AttemptState::AwaitingToken => write!(f, "awaiting-token"),
            AttemptState::AwaitingResponse => write!(f, "awaiting-response"),
            AttemptState::Succeeded { shape_name } => write!(f, "succeeded({})", shape_name),
            AttemptState::Failed { reason } => write!(f, "failed({})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn failed(reason: FailureReason) -> AttemptState {
        AttemptState::Failed { reason }
    }

    #[test]
    fn test_happy_path() {
        let state = AttemptState::Idle
            .transition(AttemptEvent::Start)
            .and_then(|s| s.transition(AttemptEvent::TokenReceived))
            .and_then(|s| s.transition(AttemptEvent::Responded("Triangle".into())))
            .unwrap();

        assert_eq!(state.shape_name(), Some("Triangle"));
        assert!(state.is_terminal());
    }

    #[test]
    fn test_token_failure_is_auth_failure() {
        let state = AttemptState::AwaitingToken
            .transition(AttemptEvent::TokenFailed)
            .unwrap();
        assert_eq!(state, failed(FailureReason::AuthFailure));
    }

    #[test]
    fn test_provider_unavailable_skips_awaiting_token() {
        let state = AttemptState::Idle
            .transition(AttemptEvent::ProviderUnavailable)
            .unwrap();
        assert_eq!(state.failure_reason(), Some(FailureReason::InitFailure));
    }

    #[test]
    fn test_rejected_response() {
        let state = AttemptState::AwaitingResponse
            .transition(AttemptEvent::Rejected(FailureReason::AuthFailure))
            .unwrap();
        assert_eq!(state, failed(FailureReason::AuthFailure));

        // only a pending response can be rejected
        assert!(AttemptState::AwaitingToken
            .transition(AttemptEvent::Rejected(FailureReason::AuthFailure))
            .is_err());
    }

    #[test]
    fn test_terminal_states_only_reset() {
        let done = AttemptState::Succeeded {
            shape_name: "Square".into(),
        };
        let err = done.transition(AttemptEvent::Start).unwrap_err();
        assert!(matches!(err, TransitionError::Illegal { .. }));
        assert_eq!(done.transition(AttemptEvent::Reset).unwrap(), AttemptState::Idle);
    }

    #[test]
    fn test_response_before_token_is_illegal() {
        assert!(AttemptState::AwaitingToken
            .transition(AttemptEvent::Responded("Circle".into()))
            .is_err());
        assert!(AttemptState::Idle.transition(AttemptEvent::TokenReceived).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(AttemptState::AwaitingToken.to_string(), "awaiting-token");
        assert_eq!(
            failed(FailureReason::InitFailure).to_string(),
            "failed(Initialisation failure)"
        );
    }

    fn any_event() -> impl Strategy<Value = AttemptEvent> {
        prop_oneof![
            Just(AttemptEvent::Start),
            Just(AttemptEvent::ProviderUnavailable),
            Just(AttemptEvent::TokenReceived),
            Just(AttemptEvent::TokenFailed),
            "[A-Za-z]{1,12}".prop_map(AttemptEvent::Responded),
            Just(AttemptEvent::Rejected(FailureReason::AuthFailure)),
            Just(AttemptEvent::Reset),
        ]
    }

    proptest! {
        #[test]
        fn prop_terminal_states_leave_only_via_reset(
            events in proptest::collection::vec(any_event(), 0..40)
        ) {
            let mut state = AttemptState::Idle;
            for event in events {
                let was_terminal = state.is_terminal();
                let is_reset = event == AttemptEvent::Reset;
                match state.transition(event) {
                    Ok(next) => {
                        if was_terminal {
                            prop_assert!(is_reset);
                        }
                        if is_reset {
                            prop_assert_eq!(&next, &AttemptState::Idle);
                        }
                        state = next;
                    }
                    Err(_) => prop_assert!(!is_reset),
                }
            }
        }

        #[test]
        fn prop_success_requires_response(
            events in proptest::collection::vec(any_event(), 0..40)
        ) {
            let mut state = AttemptState::Idle;
            for event in events {
                let responded = matches!(event, AttemptEvent::Responded(_));
                if let Ok(next) = state.transition(event) {
                    if matches!(next, AttemptState::Succeeded { .. }) && !state.is_terminal() {
                        prop_assert!(responded);
                        prop_assert_eq!(&state, &AttemptState::AwaitingResponse);
                    }
                    state = next;
                }
            }
        }
    }
}
