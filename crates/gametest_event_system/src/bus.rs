//! # The Event Bus
//!
//! Central dispatch point between the simulated world (producer) and test
//! subscriptions (consumers). The bus is constructed per test run and passed
//! explicitly into everything that needs it; there is no process-global
//! singleton.
//!
//! Delivery runs handlers synchronously on the emit path, in registration
//! order, so a one-shot handler can capture in-flight state (a fuse duration,
//! an entity reference) before the waiter that installed it resumes.
//!
//! Uses DashMap for lock-free concurrent access to the subscription registry,
//! keyed by the closed [`EventKind`] tag.

use crate::events::{EventKind, EventSink, GameEvent};
use crate::failure::TestFailure;
use crate::subscription::{
    DeliveryOutcome, ListenHandler, OneShotHandler, Subscription, SubscriptionState,
};
use crate::types::ListenerOwner;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Monitoring counters for the bus.
#[derive(Debug, Clone, Default)]
pub struct EventBusStats {
    /// Total subscriptions ever registered
    pub total_subscriptions: u64,
    /// Total events emitted
    pub events_emitted: u64,
    /// Total handler invocations across all deliveries
    pub handlers_invoked: u64,
    /// Handler failures recorded against owners
    pub faults_recorded: u64,
}

/// A suspended wait on a one-shot subscription.
///
/// Produced by [`EventBus::listen_once`] and [`EventBus::listen_with_timeout`];
/// the waiter suspends in [`PendingEvent::resolve`], which guarantees the
/// subscription is in a terminal state on every exit path.
pub struct PendingEvent {
    subscription: Arc<Subscription>,
    receiver: oneshot::Receiver<Result<GameEvent, TestFailure>>,
    timeout: Option<Duration>,
}

impl PendingEvent {
    /// Returns the subscription backing this wait.
    pub fn subscription(&self) -> &Arc<Subscription> {
        &self.subscription
    }

    /// Suspends until the subscription fires, the timeout elapses, or a
    /// handler failure is carried through.
    ///
    /// Exit paths and the state they leave behind:
    /// - matching event delivered: returns it, subscription `Fired`
    /// - handler failed on the delivery path: rethrows here, subscription
    ///   `Fired`
    /// - timeout elapsed first: [`TestFailure::Timeout`], subscription
    ///   `TimedOut`
    /// - bus dropped the sender: [`TestFailure::IllegalState`], subscription
    ///   `Revoked`
    pub async fn resolve(self) -> Result<GameEvent, TestFailure> {
        let Self {
            subscription,
            mut receiver,
            timeout,
        } = self;
        let kind = subscription.kind();

        let received = match timeout {
            None => (&mut receiver).await,
            Some(duration) => {
                let sleep = tokio::time::sleep(duration);
                tokio::pin!(sleep);
                tokio::select! {
                    received = &mut receiver => received,
                    _ = &mut sleep => {
                        if subscription.mark_timed_out() {
                            debug!("⏱️ Wait for {} timed out after {:?}", kind, duration);
                            return Err(TestFailure::Timeout { kind, duration });
                        }
                        // The firing won the race against the timer; its
                        // result is already in the channel.
                        (&mut receiver).await
                    }
                }
            }
        };

        match received {
            Ok(result) => result,
            Err(_) => {
                subscription.revoke();
                Err(TestFailure::IllegalState(format!(
                    "one-shot subscription for {kind} was dropped before completing"
                )))
            }
        }
    }
}

/// The event bus: subscription registry plus dispatch.
///
/// Nested waits on the same kind are *all-fire*: every active subscription
/// for a kind observes each matching event independently, so an outer
/// `wait_for` is never starved by an inner one.
pub struct EventBus {
    subscriptions: DashMap<EventKind, Vec<Arc<Subscription>>>,
    /// First handler failure per owner, surfaced at the owning test's next
    /// suspension boundary.
    faults: DashMap<ListenerOwner, TestFailure>,
    stats: tokio::sync::RwLock<EventBusStats>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .field("pending_faults", &self.faults.len())
            .finish()
    }
}

impl EventBus {
    /// Creates a new bus with no registered subscriptions.
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            faults: DashMap::new(),
            stats: tokio::sync::RwLock::new(EventBusStats::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a persistent subscription: the handler runs on every event
    /// of `kind` until the subscription (or its owner) is revoked.
    pub async fn listen(
        &self,
        owner: ListenerOwner,
        kind: EventKind,
        handler: ListenHandler,
    ) -> Arc<Subscription> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let subscription = Arc::new(Subscription::persistent(id, owner, kind, handler));
        self.register(kind, subscription.clone()).await;
        subscription
    }

    /// Registers a one-shot subscription with no timeout bound. The caller
    /// is responsible for bounding the resulting wait.
    pub async fn listen_once(
        &self,
        owner: ListenerOwner,
        kind: EventKind,
        handler: OneShotHandler,
    ) -> PendingEvent {
        self.listen_one_shot_inner(owner, kind, handler, None).await
    }

    /// Registers a one-shot subscription bounded by a timeout token. If no
    /// matching event arrives within `duration`, resolving the wait fails
    /// with [`TestFailure::Timeout`] and the subscription is revoked.
    pub async fn listen_with_timeout(
        &self,
        owner: ListenerOwner,
        kind: EventKind,
        handler: OneShotHandler,
        duration: Duration,
    ) -> PendingEvent {
        self.listen_one_shot_inner(owner, kind, handler, Some(duration))
            .await
    }

    async fn listen_one_shot_inner(
        &self,
        owner: ListenerOwner,
        kind: EventKind,
        handler: OneShotHandler,
        timeout: Option<Duration>,
    ) -> PendingEvent {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (subscription, receiver) = Subscription::one_shot(id, owner, kind, handler);
        let subscription = Arc::new(subscription);
        self.register(kind, subscription.clone()).await;
        PendingEvent {
            subscription,
            receiver,
            timeout,
        }
    }

    async fn register(&self, kind: EventKind, subscription: Arc<Subscription>) {
        subscription.activate();
        self.subscriptions
            .entry(kind)
            .or_default()
            .push(subscription.clone());

        let mut stats = self.stats.write().await;
        stats.total_subscriptions += 1;
        info!(
            "📝 Registered subscription #{} for {} (owner {})",
            subscription.id(),
            kind,
            subscription.owner()
        );
    }

    /// Revokes every live subscription registered under `owner`. Returns the
    /// number of subscriptions revoked.
    pub fn unregister_listeners(&self, owner: ListenerOwner) -> usize {
        let mut revoked = 0;
        for mut entry in self.subscriptions.iter_mut() {
            entry.value_mut().retain(|subscription| {
                if subscription.owner() == owner {
                    if subscription.revoke() {
                        revoked += 1;
                    }
                    false
                } else {
                    !subscription.state().is_terminal()
                }
            });
        }
        if revoked > 0 {
            info!("🗑️ Revoked {} subscriptions for owner {}", revoked, owner);
        }
        revoked
    }

    /// Delivers an event to every active subscription of its kind, in
    /// registration order. Handlers run synchronously on this path; one-shot
    /// completions resume their waiters, and persistent handler failures are
    /// recorded against their owner.
    pub async fn emit(&self, event: GameEvent) {
        let kind = event.kind();
        let targets: Vec<Arc<Subscription>> = self
            .subscriptions
            .get(&kind)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        let mut invoked = 0u64;
        let mut fired = 0u64;
        let mut faulted = 0u64;
        for subscription in &targets {
            match subscription.deliver(&event) {
                DeliveryOutcome::Ignored => {}
                DeliveryOutcome::Handled => invoked += 1,
                DeliveryOutcome::Fired => {
                    invoked += 1;
                    fired += 1;
                }
                DeliveryOutcome::Faulted(failure) => {
                    invoked += 1;
                    faulted += 1;
                    self.record_fault(subscription.owner(), failure);
                }
            }
        }

        // Drop subscriptions that reached a terminal state, whether during
        // this delivery or earlier (a timed-out wait leaves its entry behind
        // until the next emit sweeps it).
        if !targets.is_empty() {
            if let Some(mut entry) = self.subscriptions.get_mut(&kind) {
                entry
                    .value_mut()
                    .retain(|subscription| !subscription.state().is_terminal());
            }
        }

        let mut stats = self.stats.write().await;
        stats.events_emitted += 1;
        stats.handlers_invoked += invoked;
        stats.faults_recorded += faulted;
        debug!(
            "📡 Emitted {} to {} subscription(s): {} handled, {} fired",
            kind,
            targets.len(),
            invoked,
            fired
        );
    }

    /// Records a handler failure against an owner. The first failure wins;
    /// later ones for the same owner are logged and dropped.
    fn record_fault(&self, owner: ListenerOwner, failure: TestFailure) {
        warn!("🔴 Handler fault for owner {}: {}", owner, failure);
        self.faults.entry(owner).or_insert(failure);
    }

    /// Takes the pending handler failure for an owner, if any. The harness
    /// calls this at every suspension boundary and at case end so listener
    /// failures terminate the test that installed the listener.
    pub fn take_fault(&self, owner: ListenerOwner) -> Option<TestFailure> {
        self.faults.remove(&owner).map(|(_, failure)| failure)
    }

    /// Number of subscriptions registered for `kind`, including terminal
    /// entries the next emit has not yet swept out.
    pub fn registered_subscription_count(&self, kind: EventKind) -> usize {
        self.subscriptions
            .get(&kind)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Number of subscriptions for `kind` still in the `Active` state.
    pub fn active_subscription_count(&self, kind: EventKind) -> usize {
        self.subscriptions
            .get(&kind)
            .map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|subscription| subscription.state() == SubscriptionState::Active)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Returns a snapshot of the bus statistics.
    pub async fn get_stats(&self) -> EventBusStats {
        self.stats.read().await.clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for EventBus {
    async fn deliver(&self, event: GameEvent) {
        self.emit(event).await;
    }
}
