//! # Remote Client Proxy
//!
//! [`RemoteClient`] stands in for the game client a test drives: it issues
//! simulated player actions and suspends until the world acknowledges each
//! action as applied.
//!
//! Actions travel over a FIFO channel to the world's command worker, which
//! processes them strictly in issuance order; that channel *is* the ordering
//! guarantee the harness relies on. Each action carries its own one-shot
//! acknowledgment; an acknowledgment that never arrives within the configured
//! bound surfaces as [`TestFailure::ActionAcknowledgment`].

use crate::state::LookTarget;
use gametest_event_system::TestFailure;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// A simulated player action.
#[derive(Debug, Clone, Copy)]
pub enum ClientCommand {
    /// Orient the client's view toward a position or entity.
    LookAt(LookTarget),
    /// Use the held item on whatever the client is looking at.
    RightClick,
}

impl std::fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientCommand::LookAt(_) => write!(f, "look_at"),
            ClientCommand::RightClick => write!(f, "right_click"),
        }
    }
}

/// A command paired with its acknowledgment channel.
pub(crate) struct CommandEnvelope {
    pub command: ClientCommand,
    pub ack: oneshot::Sender<Result<(), TestFailure>>,
}

/// Handle for issuing remote actions. Cheap to clone; all clones feed the
/// same ordered command stream.
#[derive(Clone)]
pub struct RemoteClient {
    sender: mpsc::Sender<CommandEnvelope>,
    ack_timeout: Duration,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("ack_timeout", &self.ack_timeout)
            .finish()
    }
}

impl RemoteClient {
    pub(crate) fn new(sender: mpsc::Sender<CommandEnvelope>, ack_timeout: Duration) -> Self {
        Self {
            sender,
            ack_timeout,
        }
    }

    /// Orients the view toward `target` and suspends until the world
    /// acknowledges the orientation as applied.
    pub async fn look_at(&self, target: LookTarget) -> Result<(), TestFailure> {
        self.issue(ClientCommand::LookAt(target)).await
    }

    /// Uses the held item on the current look target and suspends until the
    /// world acknowledges the click as applied.
    pub async fn right_click(&self) -> Result<(), TestFailure> {
        self.issue(ClientCommand::RightClick).await
    }

    async fn issue(&self, command: ClientCommand) -> Result<(), TestFailure> {
        let label = command.to_string();
        let (ack_tx, ack_rx) = oneshot::channel();
        self.sender
            .send(CommandEnvelope {
                command,
                ack: ack_tx,
            })
            .await
            .map_err(|_| {
                TestFailure::ActionAcknowledgment(format!(
                    "world rejected {label}: command worker is gone"
                ))
            })?;

        debug!("🎮 Issued {} and awaiting acknowledgment", label);
        match tokio::time::timeout(self.ack_timeout, ack_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TestFailure::ActionAcknowledgment(format!(
                "world dropped the acknowledgment for {label}"
            ))),
            Err(_) => Err(TestFailure::ActionAcknowledgment(format!(
                "{label} was not acknowledged within {:?}",
                self.ack_timeout
            ))),
        }
    }
}
