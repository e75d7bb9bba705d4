//! Progress tracking for a single orchestrated operation.
//!
//! `TransferProgress` owns the current [`TransferStage`], rejects transitions the state machine
//! does not allow, and publishes every stage change and job milestone on the session's event
//! stream. It also counts submissions and resolutions so a summary can be logged once the
//! operation reaches a terminal stage.

use crate::events::{EventDispatcher, SessionEvent};
use crate::pool::JobId;
use crate::transfer::{OperationKind, TransferStage};
use std::time::Instant;
use tracing::{info, warn};

/// Tracks the stage and job milestones of one operation.
#[derive(Debug)]
pub struct TransferProgress<'a> {
    operation: OperationKind,
    stage: TransferStage,
    events: &'a EventDispatcher,
    started: Instant,
    /// Parts the operation was planned into
    parts_total: usize,
    parts_submitted: usize,
    hashes_resolved: usize,
    failures: usize,
}

/// Snapshot of a [`TransferProgress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferStats {
    pub operation: OperationKind,
    pub stage: TransferStage,
    pub parts_total: usize,
    pub parts_submitted: usize,
    pub hashes_resolved: usize,
    pub failures: usize,
    pub elapsed_ms: u64,
}

impl<'a> TransferProgress<'a> {
    /// Start tracking in `AwaitingReadiness`.
    pub fn new(operation: OperationKind, events: &'a EventDispatcher) -> Self {
        let progress = Self {
            operation,
            stage: TransferStage::AwaitingReadiness,
            events,
            started: Instant::now(),
            parts_total: 0,
            parts_submitted: 0,
            hashes_resolved: 0,
            failures: 0,
        };
        progress.publish_stage();
        progress
    }

    pub fn stage(&self) -> TransferStage {
        self.stage
    }

    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    pub fn events(&self) -> &EventDispatcher {
        self.events
    }

    /// Move to `next`. Returns false and stays put when the transition is not allowed.
    pub fn advance(&mut self, next: TransferStage) -> bool {
        if !self.stage.can_advance_to(next) {
            warn!(
                "{:?}: ignoring stage transition {:?} -> {:?}",
                self.operation, self.stage, next
            );
            return false;
        }
        self.stage = next;
        self.publish_stage();
        true
    }

    /// Move to `Failed` from any non-terminal stage.
    pub fn fail(&mut self, reason: &str) {
        if self.advance(TransferStage::Failed) {
            warn!("{:?} failed: {}", self.operation, reason);
        }
    }

    pub fn set_parts_total(&mut self, parts_total: usize) {
        self.parts_total = parts_total;
    }

    pub fn record_submitted(&mut self, part: usize, job_id: &JobId) {
        self.parts_submitted += 1;
        self.events.dispatch(SessionEvent::PartSubmitted {
            part,
            total_parts: self.parts_total,
            job_id: job_id.clone(),
        });
    }

    pub fn record_resolved(&mut self, part: usize, job_id: &JobId, tx_hash: &str) {
        self.hashes_resolved += 1;
        self.events.dispatch(SessionEvent::JobResolved {
            part,
            job_id: job_id.clone(),
            tx_hash: tx_hash.to_string(),
        });
    }

    pub fn record_failed(&mut self, part: usize, job_id: Option<&JobId>, reason: &str) {
        self.failures += 1;
        self.events.dispatch(SessionEvent::JobFailed {
            part,
            job_id: job_id.cloned(),
            reason: reason.to_string(),
        });
    }

    pub fn stats(&self) -> TransferStats {
        TransferStats {
            operation: self.operation,
            stage: self.stage,
            parts_total: self.parts_total,
            parts_submitted: self.parts_submitted,
            hashes_resolved: self.hashes_resolved,
            failures: self.failures,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }

    /// Log a one-line summary of the operation.
    pub fn log_summary(&self) {
        let stats = self.stats();
        info!(
            "{:?} {:?}: {}/{} parts submitted, {} hashes resolved, {} failures in {} ms",
            stats.operation,
            stats.stage,
            stats.parts_submitted,
            stats.parts_total,
            stats.hashes_resolved,
            stats.failures,
            stats.elapsed_ms
        );
    }

    fn publish_stage(&self) {
        self.events.dispatch(SessionEvent::Stage {
            operation: self.operation,
            stage: self.stage,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishes_each_stage() {
        let events = EventDispatcher::default();
        let mut subscription = events.subscribe();

        let mut progress = TransferProgress::new(OperationKind::Transfer, &events);
        assert!(progress.advance(TransferStage::FeeEstimating));
        assert!(progress.advance(TransferStage::Submitting));

        let stages: Vec<_> = subscription
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::Stage { stage, .. } => Some(stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            stages,
            vec![
                TransferStage::AwaitingReadiness,
                TransferStage::FeeEstimating,
                TransferStage::Submitting
            ]
        );
    }

    #[test]
    fn rejects_skipped_stages() {
        let events = EventDispatcher::default();
        let mut progress = TransferProgress::new(OperationKind::Deposit, &events);
        assert!(!progress.advance(TransferStage::AwaitingHashes));
        assert_eq!(progress.stage(), TransferStage::AwaitingReadiness);

        progress.fail("not ready");
        assert_eq!(progress.stage(), TransferStage::Failed);
        assert!(!progress.advance(TransferStage::Completed));
    }

    #[test]
    fn counts_milestones() {
        let events = EventDispatcher::default();
        let mut progress = TransferProgress::new(OperationKind::Withdraw, &events);
        progress.set_parts_total(2);
        let job = JobId::from("job-1");
        progress.record_submitted(0, &job);
        progress.record_resolved(0, &job, "0xabc");
        progress.record_failed(1, None, "relayer down");

        let stats = progress.stats();
        assert_eq!(stats.parts_total, 2);
        assert_eq!(stats.parts_submitted, 1);
        assert_eq!(stats.hashes_resolved, 1);
        assert_eq!(stats.failures, 1);
    }
}
