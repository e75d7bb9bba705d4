//! Deposit, shielded transfer and withdrawal execution.
//!
//! Every operation runs through the same explicit stage sequence:
//! `AwaitingReadiness -> FeeEstimating -> Submitting -> AwaitingHashes -> Completed | Failed`.
//! Failures before submission are returned as errors; once submission has started the call
//! always returns a [`TransferOutcome`] describing every part, including partial completion.

mod orchestrator;
mod progress;
mod types;

pub use orchestrator::TransferOrchestrator;
pub use progress::{TransferProgress, TransferStats};
pub use types::*;
