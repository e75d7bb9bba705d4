//! Event system for session and transfer progress.
//!
//! This module defines the client status tags, the progress events emitted while an operation
//! runs, and the dispatcher the session hands to every component. Components emit events; the
//! presentation layer subscribes and renders them as incremental status lines. Emitting never
//! blocks and never fails the operation that emits, so a missing or slow subscriber cannot stall
//! a transfer.

use crate::config::NetworkKind;
use crate::pool::JobId;
use crate::transfer::{OperationKind, TransferStage};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Lifecycle of the bound pool client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status")]
pub enum ClientStatus {
    /// The client is being constructed and has no state yet
    ClientInitializing,
    /// Pool-wide operations (fees, limits) work, account state is not loaded
    AccountlessReady,
    /// Account state is syncing
    AccountInitializing,
    /// Account state is synced and transactions can be built
    FullyReady,
    /// Initialization failed
    Failed { reason: String },
}

/// Events published while a session runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// The bound pool client changed status
    Status(ClientStatus),
    /// An identity was unlocked
    Unlocked { identity: String },
    /// The session was locked and its binding dropped
    Locked,
    /// A network adapter and pool client were bound
    NetworkBound { kind: NetworkKind, network: String },
    /// An operation entered a new stage
    Stage {
        operation: OperationKind,
        stage: TransferStage,
    },
    /// The pool was polled for readiness and was not ready yet
    AwaitingReadiness { elapsed_ms: u64 },
    /// A token allowance increase was sent before a deposit
    ApprovalSubmitted { tx_hash: String },
    /// A permit payload was signed for a deposit
    PermitSigned { owner: String },
    /// A transaction part was accepted by the relayer
    PartSubmitted {
        part: usize,
        total_parts: usize,
        job_id: JobId,
    },
    /// A job resolved to an on-chain transaction
    JobResolved {
        part: usize,
        job_id: JobId,
        tx_hash: String,
    },
    /// A part could not be submitted or its job failed
    JobFailed {
        part: usize,
        job_id: Option<JobId>,
        reason: String,
    },
}

/// Fan-out of session events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventDispatcher {
    /// Create a dispatcher buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Open a new subscription. Only events dispatched after this call are delivered.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish an event to all current subscribers.
    pub fn dispatch(&self, event: SessionEvent) {
        debug!("Session event: {:?}", event);
        // No subscribers is a normal state for headless use
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// A live subscription to session events. Dropping it unsubscribes.
pub struct EventSubscription {
    receiver: broadcast::Receiver<SessionEvent>,
}

impl EventSubscription {
    /// Wait for the next event. Returns `None` once the dispatcher is gone.
    ///
    /// A subscriber that falls behind skips the events it missed rather than erroring.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next already-buffered event without waiting.
    pub fn try_next(&mut self) -> Option<SessionEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                }
                Err(_) => return None,
            }
        }
    }

    /// Drain everything currently buffered.
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let dispatcher = EventDispatcher::default();
        let mut subscription = dispatcher.subscribe();

        dispatcher.dispatch(SessionEvent::Status(ClientStatus::ClientInitializing));
        dispatcher.dispatch(SessionEvent::Status(ClientStatus::FullyReady));

        assert!(matches!(
            subscription.next().await,
            Some(SessionEvent::Status(ClientStatus::ClientInitializing))
        ));
        assert!(matches!(
            subscription.next().await,
            Some(SessionEvent::Status(ClientStatus::FullyReady))
        ));
    }

    #[test]
    fn dispatch_without_subscribers_is_silent() {
        let dispatcher = EventDispatcher::default();
        dispatcher.dispatch(SessionEvent::Locked);
        assert_eq!(dispatcher.subscriber_count(), 0);
    }

    #[test]
    fn lagging_subscriber_skips_ahead() {
        let dispatcher = EventDispatcher::new(2);
        let mut subscription = dispatcher.subscribe();
        for elapsed_ms in 0..5 {
            dispatcher.dispatch(SessionEvent::AwaitingReadiness { elapsed_ms });
        }

        let events = subscription.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1],
            SessionEvent::AwaitingReadiness { elapsed_ms: 4 }
        ));
    }

    #[test]
    fn status_tags_serialize_verbatim() {
        let json = serde_json::to_value(ClientStatus::AccountlessReady).unwrap();
        assert_eq!(json["status"], "AccountlessReady");
    }
}
