use crate::network::NetworkError;
use crate::pool::{JobId, PoolError, TxKind};
use crate::utils::serialization::u128_string;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationKind {
	Deposit,
	Transfer,
	Withdraw,
}

/// Stage of one orchestrated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransferStage {
	AwaitingReadiness,
	FeeEstimating,
	Submitting,
	AwaitingHashes,
	Completed,
	Failed,
}

impl TransferStage {
	pub fn is_terminal(&self) -> bool {
		matches!(self, TransferStage::Completed | TransferStage::Failed)
	}

	/// Whether the state machine allows moving from `self` to `next`.
	pub fn can_advance_to(&self, next: TransferStage) -> bool {
		use TransferStage::*;
		match (self, next) {
			(AwaitingReadiness, FeeEstimating)
			| (FeeEstimating, Submitting)
			| (Submitting, AwaitingHashes)
			| (AwaitingHashes, Completed) => true,
			(current, Failed) => !current.is_terminal(),
			_ => false,
		}
	}
}

/// How a deposit is authorized and funded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositMode {
	/// Approve the pool for the token first when the current allowance is short
	Allowance,
	/// Sign a typed permit instead of sending an approval
	Permit,
	/// Fund from the ephemeral address at `index`
	Ephemeral { index: u32 },
}

impl DepositMode {
	/// Pool transaction kind used for fee quotes.
	pub fn tx_kind(&self) -> TxKind {
		match self {
			DepositMode::Allowance => TxKind::Deposit,
			DepositMode::Permit | DepositMode::Ephemeral { .. } => TxKind::BridgeDeposit,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status")]
pub enum JobStatus {
	Resolved { tx_hash: String, tx_url: String },
	Failed { reason: String },
	/// An earlier part failed, so this one was never sent
	NotSubmitted,
}

/// Result of one transaction part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
	pub part: usize,
	#[serde(with = "u128_string")]
	pub amount: u128,
	#[serde(with = "u128_string")]
	pub fee: u128,
	pub job_id: Option<JobId>,
	pub status: JobStatus,
}

impl JobReport {
	pub fn tx_hash(&self) -> Option<&str> {
		match &self.status {
			JobStatus::Resolved { tx_hash, .. } => Some(tx_hash),
			_ => None,
		}
	}
}

/// What happened to every part of an operation, in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
	pub operation: OperationKind,
	pub stage: TransferStage,
	pub jobs: Vec<JobReport>,
	/// Allowance increase sent ahead of a deposit
	pub approval_tx: Option<String>,
	pub failure: Option<String>,
}

impl TransferOutcome {
	pub fn is_complete(&self) -> bool {
		self.stage == TransferStage::Completed
	}

	/// Resolved hashes in submission order.
	pub fn tx_hashes(&self) -> Vec<&str> {
		self.jobs.iter().filter_map(JobReport::tx_hash).collect()
	}
}

#[derive(Debug, Error)]
pub enum TransferError {
	#[error("Pool state not ready to transact after {waited_ms} ms")]
	ReadinessTimeout { waited_ms: u64 },

	#[error("Insufficient funds: {required} required, {available} available")]
	InsufficientFunds { required: u128, available: u128 },

	#[error("Aggregate limit exceeded: {requested} requested, {remaining} remaining")]
	LimitExceeded { requested: u128, remaining: u128 },

	#[error("Amount {amount} is below the minimum of {minimum}")]
	AmountTooSmall { amount: u128, minimum: u128 },

	#[error("Invalid address: {0}")]
	InvalidAddress(String),

	#[error("Unsupported: {0}")]
	Unsupported(String),

	#[error("Nothing to send")]
	EmptyRequest,

	#[error("Pool error: {0}")]
	Pool(#[from] PoolError),

	#[error("Network error: {0}")]
	Network(#[from] NetworkError),

	#[error("Submission of part {part} failed: {source}")]
	Submission {
		part: usize,
		#[source]
		source: Box<dyn std::error::Error + Send + Sync>,
	},
}
