//! # Suspendable Test Script Executor
//!
//! [`TestContext`] is the handle a scripted test body drives: remote actions,
//! accessor reads/writes, and event waits. Each action and each wait is a
//! suspension point; between suspension points the script runs without
//! interleaving from event delivery.
//!
//! The context owns one [`ListenerOwner`] for the whole case. Every
//! subscription the script installs is registered under it, and the runner
//! revokes the owner when the case ends, so no subscription can leak into a
//! later case and observe unrelated events.
//!
//! Failures raised inside handlers, which execute on the world's delivery
//! path rather than on the script's logical turn, are captured by the bus and
//! rethrown here at the next suspension boundary. Nothing is swallowed.

use gametest_event_system::{
    EventBus, EventKind, GameEvent, HandlerVerdict, ListenHandler, ListenerOwner, OneShotHandler,
    TestFailure,
};
use gametest_world::{LookTarget, PlayerHandle, RemoteClient, SimWorld};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Per-case driver handle. Cheap to clone; clones share the case's owner.
#[derive(Clone)]
pub struct TestContext {
    bus: Arc<EventBus>,
    world: Arc<SimWorld>,
    client: RemoteClient,
    owner: ListenerOwner,
    default_wait_timeout: Option<Duration>,
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext").field("owner", &self.owner).finish()
    }
}

impl TestContext {
    /// Creates a context for one test case with a fresh listener owner.
    pub fn new(bus: Arc<EventBus>, world: Arc<SimWorld>) -> Self {
        let client = world.client();
        Self {
            bus,
            world,
            client,
            owner: ListenerOwner::new(),
            default_wait_timeout: None,
        }
    }

    /// Sets the timeout [`TestContext::wait_for`] falls back to when the
    /// caller passes `None`.
    pub fn with_default_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_wait_timeout = timeout;
        self
    }

    /// The event bus this case subscribes on.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The simulated world this case runs against.
    pub fn world(&self) -> &Arc<SimWorld> {
        &self.world
    }

    /// Accessor surface for the simulated player.
    pub fn player(&self) -> PlayerHandle {
        self.world.player()
    }

    /// The listener owner all of this case's subscriptions register under.
    pub fn owner(&self) -> ListenerOwner {
        self.owner
    }

    /// Orients the remote client's view; suspends until acknowledged.
    pub async fn look_at(&self, target: LookTarget) -> Result<(), TestFailure> {
        self.client.look_at(target).await?;
        self.checkpoint()
    }

    /// Right-clicks with the held item; suspends until acknowledged.
    pub async fn right_click(&self) -> Result<(), TestFailure> {
        self.client.right_click().await?;
        self.checkpoint()
    }

    /// Registers a persistent listener under the case's owner. It stays
    /// active until the case ends; failures it raises terminate the case at
    /// the next suspension boundary.
    pub async fn listen(&self, kind: EventKind, handler: ListenHandler) {
        self.bus.listen(self.owner, kind, handler).await;
    }

    /// Registers exactly one subscription for `kind` and suspends until an
    /// event satisfying `predicate` arrives (returns it) or the timeout
    /// elapses first ([`TestFailure::Timeout`]). `None` falls back to the
    /// context's default wait timeout; with neither set the wait is
    /// unbounded.
    ///
    /// The subscription is in a terminal state when this returns, on every
    /// exit path.
    pub async fn wait_for<P>(
        &self,
        kind: EventKind,
        predicate: P,
        timeout: Option<Duration>,
    ) -> Result<GameEvent, TestFailure>
    where
        P: Fn(&GameEvent) -> bool + Send + Sync + 'static,
    {
        self.checkpoint()?;
        let timeout = timeout.or(self.default_wait_timeout);
        let handler: OneShotHandler = Box::new(move |event| {
            if predicate(event) {
                Ok(HandlerVerdict::Matched)
            } else {
                Ok(HandlerVerdict::Skipped)
            }
        });
        let pending = match timeout {
            Some(duration) => {
                self.bus
                    .listen_with_timeout(self.owner, kind, handler, duration)
                    .await
            }
            None => self.bus.listen_once(self.owner, kind, handler).await,
        };
        debug!("⏸️ Suspended waiting for {}", kind);
        let event = pending.resolve().await?;
        self.checkpoint()?;
        Ok(event)
    }

    /// Runs `trigger` with a one-shot subscription for `kind` already
    /// active, then suspends until the subscription fires.
    ///
    /// Installing the subscription *before* the trigger closes the race
    /// between an action and its asynchronous consequence: an event
    /// delivered faster than control returns from the trigger still finds
    /// the handler in place. The handler runs synchronously on the delivery
    /// path with full access to in-flight state; failures it raises are
    /// rethrown here.
    pub async fn listen_one_shot_around<F, H>(
        &self,
        trigger: F,
        kind: EventKind,
        handler: H,
    ) -> Result<GameEvent, TestFailure>
    where
        F: Future<Output = Result<(), TestFailure>>,
        H: Fn(&GameEvent) -> Result<HandlerVerdict, TestFailure> + Send + Sync + 'static,
    {
        self.around(trigger, kind, Box::new(handler), None).await
    }

    /// Like [`TestContext::listen_one_shot_around`], bounded by a timeout
    /// token: if the consequence does not arrive within `duration` the wait
    /// fails with [`TestFailure::Timeout`].
    pub async fn listen_timeout_around<F, H>(
        &self,
        trigger: F,
        kind: EventKind,
        handler: H,
        duration: Duration,
    ) -> Result<GameEvent, TestFailure>
    where
        F: Future<Output = Result<(), TestFailure>>,
        H: Fn(&GameEvent) -> Result<HandlerVerdict, TestFailure> + Send + Sync + 'static,
    {
        self.around(trigger, kind, Box::new(handler), Some(duration))
            .await
    }

    async fn around<F>(
        &self,
        trigger: F,
        kind: EventKind,
        handler: OneShotHandler,
        timeout: Option<Duration>,
    ) -> Result<GameEvent, TestFailure>
    where
        F: Future<Output = Result<(), TestFailure>>,
    {
        self.checkpoint()?;
        let pending = match timeout {
            Some(duration) => {
                self.bus
                    .listen_with_timeout(self.owner, kind, handler, duration)
                    .await
            }
            None => self.bus.listen_once(self.owner, kind, handler).await,
        };
        trigger.await?;
        debug!("⏸️ Trigger issued; suspended on {}", kind);
        let event = pending.resolve().await?;
        self.checkpoint()?;
        Ok(event)
    }

    /// Suspends until every pending inventory write is visible to the
    /// remote side.
    pub async fn wait_for_inventory_propagation(&self) -> Result<(), TestFailure> {
        self.world.await_inventory_propagation().await;
        self.checkpoint()
    }

    /// Surfaces the first failure any of this case's persistent listeners
    /// raised on the delivery path since the last suspension boundary.
    pub fn checkpoint(&self) -> Result<(), TestFailure> {
        match self.bus.take_fault(self.owner) {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}
