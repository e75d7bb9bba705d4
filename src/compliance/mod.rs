//! Compliance reports.
//!
//! A compliance report pairs each history record in a time window with the decrypted state and key
//! material an auditor needs to verify it independently. Reports are built on demand from what the
//! pool client exposes and are never persisted by the session itself.

mod builder;
mod types;

pub use builder::ComplianceReportBuilder;
pub use types::*;
