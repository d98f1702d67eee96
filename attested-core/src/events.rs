//! State change notifications delivered to the embedding application.

use crate::state::AttemptState;
use crate::types::AttemptId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed change of the gate's state.
///
/// Delivered on the channel returned by
/// [`AttestationGate::new`](crate::gate::AttestationGate::new). The receiver
/// is meant to be drained on whatever context is allowed to touch the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    /// Attempt the change belongs to
    pub attempt: AttemptId,
    /// New state
    pub state: AttemptState,
    /// When the gate applied the change
    pub at: DateTime<Utc>,
}

impl StateChange {
    pub fn new(attempt: AttemptId, state: AttemptState) -> Self {
        Self {
            attempt,
            state,
            at: Utc::now(),
        }
    }

    /// Text a login screen would show for this change, if any.
    pub fn status_text(&self) -> Option<String> {
        match &self.state {
            AttemptState::Idle => Some(crate::types::DEFAULT_STATUS_TEXT.to_string()),
            AttemptState::Failed { reason } => Some(reason.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureReason;

    #[test]
    fn test_status_text() {
        let idle = StateChange::new(AttemptId(1), AttemptState::Idle);
        assert_eq!(
            idle.status_text().as_deref(),
            Some("Press Login to access your account")
        );

        let failed = StateChange::new(
            AttemptId(1),
            AttemptState::Failed {
                reason: FailureReason::AuthFailure,
            },
        );
        assert_eq!(failed.status_text().as_deref(), Some("Authorisation failure"));

        let waiting = StateChange::new(AttemptId(1), AttemptState::AwaitingToken);
        assert!(waiting.status_text().is_none());
    }
}
