//! # Subscriptions and Their Lifecycle
//!
//! A subscription is a temporary interest in one event kind. Its lifecycle
//! is an explicit state machine:
//!
//! ```text
//! Idle -> Active -> { Fired | TimedOut | Revoked }
//! ```
//!
//! `Fired`, `TimedOut`, and `Revoked` are terminal; no transition out of a
//! terminal state is valid. A one-shot subscription invokes its handler for
//! at most one matching delivery, then completes the waiter that installed
//! it. Handler failures are carried to the waiter, never swallowed.

use crate::events::{EventKind, GameEvent};
use crate::failure::TestFailure;
use crate::types::ListenerOwner;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

/// Liveness of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Constructed but not yet registered with the bus.
    Idle,
    /// Registered; eligible to receive events.
    Active,
    /// One-shot delivery completed (successfully or with a carried failure).
    Fired,
    /// The bounding timeout elapsed before a matching delivery.
    TimedOut,
    /// Explicitly revoked before firing.
    Revoked,
}

impl SubscriptionState {
    /// Returns true for states that accept no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubscriptionState::Fired | SubscriptionState::TimedOut | SubscriptionState::Revoked
        )
    }
}

/// What a one-shot handler decided about a delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerVerdict {
    /// The event satisfies the handler; the subscription fires.
    Matched,
    /// The event does not satisfy the handler; keep waiting.
    Skipped,
}

/// Handler for persistent subscriptions; runs on every matching delivery
/// until the subscription is revoked.
pub type ListenHandler = Box<dyn Fn(&GameEvent) -> Result<(), TestFailure> + Send + Sync>;

/// Handler for one-shot subscriptions; runs on the delivery path and decides
/// whether the event fires the subscription.
pub type OneShotHandler =
    Box<dyn Fn(&GameEvent) -> Result<HandlerVerdict, TestFailure> + Send + Sync>;

/// Result the bus reports for delivering one event to one subscription.
#[derive(Debug)]
pub(crate) enum DeliveryOutcome {
    /// Subscription was not eligible (terminal or idle); nothing ran.
    Ignored,
    /// Persistent handler ran successfully, or one-shot handler skipped.
    Handled,
    /// One-shot handler matched (or failed); the waiter was completed and the
    /// subscription reached a terminal state.
    Fired,
    /// Persistent handler failed; the failure must be recorded against the
    /// subscription's owner.
    Faulted(TestFailure),
}

enum SubscriptionMode {
    Persistent {
        handler: ListenHandler,
    },
    OneShot {
        handler: OneShotHandler,
        completion: Mutex<Option<oneshot::Sender<Result<GameEvent, TestFailure>>>>,
    },
}

/// A registered interest in one event kind, with an owner and a liveness
/// state machine.
pub struct Subscription {
    id: u64,
    owner: ListenerOwner,
    kind: EventKind,
    state: Mutex<SubscriptionState>,
    mode: SubscriptionMode,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

impl Subscription {
    /// Creates a persistent subscription in the `Idle` state.
    pub(crate) fn persistent(
        id: u64,
        owner: ListenerOwner,
        kind: EventKind,
        handler: ListenHandler,
    ) -> Self {
        Self {
            id,
            owner,
            kind,
            state: Mutex::new(SubscriptionState::Idle),
            mode: SubscriptionMode::Persistent { handler },
        }
    }

    /// Creates a one-shot subscription in the `Idle` state, returning the
    /// receiver its waiter suspends on.
    pub(crate) fn one_shot(
        id: u64,
        owner: ListenerOwner,
        kind: EventKind,
        handler: OneShotHandler,
    ) -> (Self, oneshot::Receiver<Result<GameEvent, TestFailure>>) {
        let (tx, rx) = oneshot::channel();
        let subscription = Self {
            id,
            owner,
            kind,
            state: Mutex::new(SubscriptionState::Idle),
            mode: SubscriptionMode::OneShot {
                handler,
                completion: Mutex::new(Some(tx)),
            },
        };
        (subscription, rx)
    }

    /// Returns the bus-assigned subscription id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the owner this subscription is registered under.
    pub fn owner(&self) -> ListenerOwner {
        self.owner
    }

    /// Returns the event kind this subscription is interested in.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns the current liveness state.
    pub fn state(&self) -> SubscriptionState {
        *self.state.lock().expect("subscription state lock poisoned")
    }

    /// Transitions `Idle -> Active` when the bus registers the subscription.
    pub(crate) fn activate(&self) {
        let mut state = self.state.lock().expect("subscription state lock poisoned");
        if *state == SubscriptionState::Idle {
            *state = SubscriptionState::Active;
        }
    }

    /// Delivers one event. Runs the handler only while `Active`; terminal
    /// subscriptions ignore all deliveries, which is what guarantees a
    /// one-shot never fires twice.
    pub(crate) fn deliver(&self, event: &GameEvent) -> DeliveryOutcome {
        if self.state() != SubscriptionState::Active {
            return DeliveryOutcome::Ignored;
        }
        match &self.mode {
            SubscriptionMode::Persistent { handler } => match handler(event) {
                Ok(()) => DeliveryOutcome::Handled,
                Err(failure) => DeliveryOutcome::Faulted(failure),
            },
            SubscriptionMode::OneShot {
                handler,
                completion,
            } => match handler(event) {
                Ok(HandlerVerdict::Skipped) => DeliveryOutcome::Handled,
                Ok(HandlerVerdict::Matched) => {
                    if self.complete(completion, Ok(event.clone())) {
                        DeliveryOutcome::Fired
                    } else {
                        DeliveryOutcome::Handled
                    }
                }
                Err(failure) => {
                    if self.complete(completion, Err(failure)) {
                        DeliveryOutcome::Fired
                    } else {
                        DeliveryOutcome::Handled
                    }
                }
            },
        }
    }

    /// Transitions `Active -> TimedOut`. Returns false if the subscription
    /// had already reached a terminal state (the firing won the race).
    pub(crate) fn mark_timed_out(&self) -> bool {
        let mut state = self.state.lock().expect("subscription state lock poisoned");
        if *state == SubscriptionState::Active {
            *state = SubscriptionState::TimedOut;
            true
        } else {
            false
        }
    }

    /// Transitions any non-terminal state to `Revoked`. Returns false if the
    /// subscription was already terminal.
    pub(crate) fn revoke(&self) -> bool {
        let mut state = self.state.lock().expect("subscription state lock poisoned");
        if state.is_terminal() {
            false
        } else {
            *state = SubscriptionState::Revoked;
            true
        }
    }

    /// Attempts the `Active -> Fired` transition and completes the waiter.
    ///
    /// The handler runs outside the state lock, so a timeout can reach the
    /// subscription while a matching delivery is still in flight. The loser
    /// of that race must stand down: if another path already reached a
    /// terminal state, this returns false without sending, and the waiter
    /// keeps the outcome it already observed.
    fn complete(
        &self,
        completion: &Mutex<Option<oneshot::Sender<Result<GameEvent, TestFailure>>>>,
        result: Result<GameEvent, TestFailure>,
    ) -> bool {
        {
            let mut state = self.state.lock().expect("subscription state lock poisoned");
            if state.is_terminal() {
                return false;
            }
            *state = SubscriptionState::Fired;
        }
        let sender = completion
            .lock()
            .expect("subscription completion lock poisoned")
            .take();
        match sender {
            Some(tx) => {
                if tx.send(result).is_err() {
                    warn!("🟡 One-shot waiter for {} went away before completion", self.kind);
                }
            }
            None => warn!("🟡 One-shot subscription {} fired with no waiter attached", self.id),
        }
        true
    }
}
