//! Attestation gate: one logical login attempt at a time.
//!
//! ## Attempt Flow
//! 1. `start()` checks provider availability and opens a new generation
//! 2. The provider fetches a token on a spawned task
//! 3. `on_token_result()` dispatches the login request if the attempt is still current
//! 4. The dispatcher's answer settles the attempt as succeeded or failed
//!
//! Every async result carries the [`AttemptId`] it was started under. Results
//! whose id no longer matches the current generation are dropped, so a
//! superseded attempt can never touch the state of a newer one.

use crate::dispatch::{DispatchError, RequestDispatcher};
use crate::events::StateChange;
use crate::provider::TokenProvider;
use crate::state::{AttemptEvent, AttemptState};
use crate::types::{AttemptId, AttestationResult, LoginRequest};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

/// State changes buffered for the caller before new ones are dropped.
pub const EVENT_CAPACITY: usize = 64;

/// How an attempt ended, as seen by whoever started it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The attempt reached a terminal state.
    Finished(AttemptState),
    /// A reset or a newer attempt took over before it finished.
    Superseded,
}

/// Generation-tagged promise for one attempt.
#[derive(Debug)]
pub struct AttemptHandle {
    id: AttemptId,
    outcome: oneshot::Receiver<AttemptState>,
}

impl AttemptHandle {
    pub fn id(&self) -> AttemptId {
        self.id
    }

    /// Wait for the attempt to settle.
    pub async fn wait(self) -> AttemptOutcome {
        match self.outcome.await {
            Ok(state) => AttemptOutcome::Finished(state),
            Err(_) => AttemptOutcome::Superseded,
        }
    }
}

struct Attempt {
    id: AttemptId,
    state: AttemptState,
    waiter: Option<oneshot::Sender<AttemptState>>,
}

struct Shared {
    provider: Arc<dyn TokenProvider>,
    dispatcher: Arc<dyn RequestDispatcher>,
    attempt: Mutex<Attempt>,
    runtime: Handle,
    events: mpsc::Sender<StateChange>,
    dropped_events: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Attempt> {
        self.attempt.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `event` to the current attempt. Returns false if the state
    /// machine refused it.
    fn apply(&self, attempt: &mut Attempt, event: AttemptEvent) -> bool {
        let next = match attempt.state.transition(event) {
            Ok(next) => next,
            Err(e) => {
                tracing::warn!("Attempt {}: {}", attempt.id, e);
                return false;
            }
        };

        tracing::debug!("Attempt {}: {} -> {}", attempt.id, attempt.state, next);
        attempt.state = next.clone();

        if next.is_terminal() {
            if let Some(waiter) = attempt.waiter.take() {
                let _ = waiter.send(next.clone());
            }
        }

        match self.events.try_send(StateChange::new(attempt.id, next)) {
            Ok(()) => {}
            Err(TrySendError::Full(change)) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    "State change channel full, dropping {} for attempt {}",
                    change.state,
                    change.attempt
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::trace!("State change receiver dropped");
            }
        }

        true
    }
}

/// Orchestrates attested login attempts.
///
/// Cloning is cheap; every clone drives the same gate.
#[derive(Clone)]
pub struct AttestationGate {
    shared: Arc<Shared>,
}

impl AttestationGate {
    /// Create a gate on the current tokio runtime and the channel its state
    /// changes are delivered on.
    ///
    /// The channel holds [`EVENT_CAPACITY`] changes; the caller is expected to
    /// drain it. Changes that do not fit are dropped and counted in
    /// [`dropped_events`](Self::dropped_events).
    ///
    /// # Panics
    /// Outside a tokio runtime. Use [`with_runtime`](Self::with_runtime) there.
    pub fn new(
        provider: Arc<dyn TokenProvider>,
        dispatcher: Arc<dyn RequestDispatcher>,
    ) -> (Self, mpsc::Receiver<StateChange>) {
        Self::with_runtime(provider, dispatcher, Handle::current())
    }

    /// Create a gate whose async work runs on `runtime`.
    ///
    /// Every gate method may then be called from any thread, including a
    /// provider's own callback thread.
    pub fn with_runtime(
        provider: Arc<dyn TokenProvider>,
        dispatcher: Arc<dyn RequestDispatcher>,
        runtime: Handle,
    ) -> (Self, mpsc::Receiver<StateChange>) {
        let (events, receiver) = mpsc::channel(EVENT_CAPACITY);
        let gate = Self {
            shared: Arc::new(Shared {
                provider,
                dispatcher,
                attempt: Mutex::new(Attempt {
                    id: AttemptId::NONE,
                    state: AttemptState::Idle,
                    waiter: None,
                }),
                runtime,
                events,
                dropped_events: AtomicU64::new(0),
            }),
        };
        (gate, receiver)
    }

    /// Current state.
    pub fn state(&self) -> AttemptState {
        self.shared.lock().state.clone()
    }

    /// Generation of the current attempt.
    pub fn current_attempt(&self) -> AttemptId {
        self.shared.lock().id
    }

    pub fn provider_name(&self) -> &str {
        self.shared.provider.name()
    }

    /// State changes dropped because the channel was full.
    pub fn dropped_events(&self) -> u64 {
        self.shared.dropped_events.load(Ordering::Relaxed)
    }

    /// Start a new attempt.
    ///
    /// Anything still in flight is superseded first. With an unavailable
    /// provider the attempt fails with `InitFailure` before this returns.
    pub fn start(&self) -> AttemptHandle {
        let (waiter, outcome) = oneshot::channel();
        let mut attempt = self.shared.lock();

        if attempt.state.is_in_flight() {
            tracing::debug!("Attempt {} superseded by a new start", attempt.id);
        }

        attempt.id = attempt.id.next();
        attempt.state = AttemptState::Idle;
        attempt.waiter = Some(waiter);
        let id = attempt.id;

        if !self.shared.provider.is_available() {
            tracing::warn!(
                "Attempt {}: token provider '{}' is unavailable",
                id,
                self.shared.provider.name()
            );
            self.shared.apply(&mut attempt, AttemptEvent::ProviderUnavailable);
            return AttemptHandle { id, outcome };
        }

        self.shared.apply(&mut attempt, AttemptEvent::Start);
        drop(attempt);

        tracing::info!("Attempt {}: fetching token from '{}'", id, self.provider_name());

        let gate = self.clone();
        self.shared.runtime.spawn(async move {
            let result = gate.shared.provider.fetch_token().await;
            gate.on_token_result(id, result);
        });

        AttemptHandle { id, outcome }
    }

    /// Feed the token result of attempt `attempt_id` into the gate.
    ///
    /// Results for anything but the current attempt, or arriving when the
    /// current attempt is no longer waiting for a token, are ignored.
    pub fn on_token_result(&self, attempt_id: AttemptId, result: AttestationResult) {
        let mut attempt = self.shared.lock();

        if attempt.id != attempt_id || attempt.state != AttemptState::AwaitingToken {
            tracing::debug!(
                "Discarding token result for attempt {} (current {}, {})",
                attempt_id,
                attempt.id,
                attempt.state
            );
            return;
        }

        let token = match result {
            AttestationResult::Success(token) => token,
            AttestationResult::Failure => {
                tracing::warn!("Attempt {}: token fetch failed", attempt_id);
                self.shared.apply(&mut attempt, AttemptEvent::TokenFailed);
                return;
            }
        };

        if !self.shared.apply(&mut attempt, AttemptEvent::TokenReceived) {
            return;
        }
        drop(attempt);

        if token.is_empty() {
            tracing::warn!("Attempt {}: provider returned an empty token", attempt_id);
        }

        let dispatcher = &self.shared.dispatcher;
        let request = LoginRequest::new(dispatcher.endpoint(), dispatcher.header_name(), token);

        tracing::info!(
            "Attempt {}: sending login request to {} (token {})",
            attempt_id,
            request.url,
            request.token.fingerprint()
        );

        let gate = self.clone();
        self.shared.runtime.spawn(async move {
            let response = gate.shared.dispatcher.send(request).await;
            gate.on_response(attempt_id, response);
        });
    }

    fn on_response(&self, attempt_id: AttemptId, response: Result<String, DispatchError>) {
        let mut attempt = self.shared.lock();

        if attempt.id != attempt_id || attempt.state != AttemptState::AwaitingResponse {
            tracing::debug!(
                "Discarding login response for attempt {} (current {})",
                attempt_id,
                attempt.id
            );
            return;
        }

        match response {
            Ok(shape_name) => {
                tracing::info!("Attempt {}: server returned shape '{}'", attempt_id, shape_name);
                self.shared
                    .apply(&mut attempt, AttemptEvent::Responded(shape_name));
            }
            Err(e) => {
                tracing::warn!("Attempt {}: login rejected: {}", attempt_id, e);
                self.shared
                    .apply(&mut attempt, AttemptEvent::Rejected(e.reason()));
            }
        }
    }

    /// Force the gate back to `Idle`, invalidating whatever is in flight.
    pub fn reset(&self) {
        let mut attempt = self.shared.lock();
        attempt.id = attempt.id.next();
        attempt.waiter = None;

        if attempt.state != AttemptState::Idle {
            self.shared.apply(&mut attempt, AttemptEvent::Reset);
        }
    }

    /// Reset and warm the provider so a token is ready before the user logs in.
    ///
    /// The fetched token is thrown away; only an unavailable provider has a
    /// visible effect (`Failed(InitFailure)`).
    pub fn prefetch(&self) {
        self.reset();

        let provider = Arc::clone(&self.shared.provider);
        if !provider.is_available() {
            let mut attempt = self.shared.lock();
            tracing::warn!("Prefetch: token provider '{}' is unavailable", provider.name());
            self.shared.apply(&mut attempt, AttemptEvent::ProviderUnavailable);
            return;
        }

        self.shared.runtime.spawn(async move {
            let result = provider.fetch_token().await;
            tracing::debug!(
                "Prefetch from '{}' finished (success: {})",
                provider.name(),
                result.is_success()
            );
        });
    }
}

impl fmt::Debug for AttestationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attempt = self.shared.lock();
        f.debug_struct("AttestationGate")
            .field("provider", &self.shared.provider.name())
            .field("endpoint", &self.shared.dispatcher.endpoint())
            .field("attempt", &attempt.id)
            .field("state", &attempt.state)
            .finish()
    }
}
