//! Types for the pool client contract

use crate::utils::serialization::{biguint_string, hex_bytes, option_biguint_string, u128_string};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Relayer-assigned handle for one submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for JobId {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

/// Pool transaction type, as used for fee quotes and limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxKind {
	Deposit,
	Transfer,
	Withdraw,
	/// Deposit authorized by a permit signature instead of a prior approval
	BridgeDeposit,
}

/// One destination of a transfer. Amounts are in shielded units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
	pub destination: String,
	#[serde(with = "u128_string")]
	pub amount: u128,
}

impl TransferRequest {
	pub fn new(destination: impl Into<String>, amount: u128) -> Self {
		Self {
			destination: destination.into(),
			amount,
		}
	}
}

/// One pool transaction in a planned sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPart {
	/// Sum of the notes this part consumes.
	#[serde(with = "u128_string")]
	pub input_notes_balance: u128,
	pub input_note_count: usize,
	pub outputs: Vec<TransferRequest>,
	#[serde(with = "u128_string")]
	pub fee: u128,
	/// Aggregate allowance remaining before this part, `u128::MAX` when unlimited.
	#[serde(with = "u128_string")]
	pub account_limit: u128,
}

impl TransactionPart {
	pub fn output_total(&self) -> u128 {
		self.outputs.iter().map(|output| output.amount).sum()
	}
}

/// Fee quote for an operation, possibly spanning several transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
	#[serde(with = "u128_string")]
	pub total: u128,
	#[serde(with = "u128_string")]
	pub per_tx: u128,
	#[serde(with = "u128_string")]
	pub relayer_portion: u128,
	#[serde(with = "u128_string")]
	pub l1_portion: u128,
	pub tx_count: usize,
	pub insufficient_funds: bool,
}

/// Linear relayer fee model for a single pool transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeModel {
	#[serde(with = "u128_string")]
	pub base_per_tx: u128,
	#[serde(with = "u128_string")]
	pub per_input_note: u128,
	#[serde(with = "u128_string")]
	pub per_output: u128,
	#[serde(with = "u128_string")]
	pub l1_per_tx: u128,
}

impl FeeModel {
	/// Fee for one transaction consuming `input_notes` notes and creating `outputs` outputs.
	pub fn part_fee(&self, input_notes: usize, outputs: usize) -> u128 {
		self.base_per_tx
			.saturating_add(self.per_input_note.saturating_mul(input_notes as u128))
			.saturating_add(self.per_output.saturating_mul(outputs as u128))
			.saturating_add(self.l1_per_tx)
	}
}

/// Structural limits the pool enforces on a transaction sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLimits {
	/// Remaining aggregate (e.g. daily) allowance for the operation kind; `None` when unlimited.
	pub aggregate_remaining: Option<u128>,
	pub max_notes_per_tx: usize,
	pub max_outputs_per_tx: usize,
}

impl Default for PoolLimits {
	fn default() -> Self {
		Self {
			aggregate_remaining: None,
			max_notes_per_tx: 3,
			max_outputs_per_tx: 127,
		}
	}
}

/// Shielded balances, in shielded units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
	#[serde(with = "u128_string")]
	pub total: u128,
	/// Balance held in the account itself
	#[serde(with = "u128_string")]
	pub account: u128,
	/// Balance held in unspent notes
	#[serde(with = "u128_string")]
	pub note: u128,
}

/// Merkle tree root at a given index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeState {
	#[serde(with = "biguint_string")]
	pub root: BigUint,
	pub index: u64,
}

/// Transactions observed by the pool for an ephemeral address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralUsage {
	pub in_tx_count: u64,
	pub out_tx_count: u64,
}

impl EphemeralUsage {
	pub fn is_used(&self) -> bool {
		self.in_tx_count > 0 || self.out_tx_count > 0
	}
}

/// Pool-side half of a permit-style deposit: the salt binding the signature to the proven
/// deposit, and the signature deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitDraft {
	#[serde(with = "u128_string")]
	pub amount: u128,
	#[serde(with = "u128_string")]
	pub fee: u128,
	/// Unix seconds
	pub deadline: u64,
	#[serde(with = "hex_bytes")]
	pub salt: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryType {
	Deposit,
	TransferIn,
	TransferOut,
	Withdrawal,
	DirectDeposit,
	AggregateNotes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryState {
	Pending,
	Done,
	RejectedByPool,
	RejectedByRelayer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryAction {
	pub from: String,
	pub to: String,
	#[serde(with = "u128_string")]
	pub amount: u128,
	pub is_loopback: bool,
}

/// One entry of the account's decrypted transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
	/// Unix milliseconds
	pub timestamp_ms: i64,
	#[serde(rename = "type")]
	pub kind: HistoryType,
	pub state: HistoryState,
	pub actions: Vec<HistoryAction>,
	#[serde(with = "u128_string")]
	pub fee: u128,
	pub tx_hash: Option<String>,
	/// Tree index of the transaction's first leaf, once mined
	pub tx_index: Option<u64>,
}

impl HistoryRecord {
	pub fn total_amount(&self) -> u128 {
		self.actions.iter().map(|action| action.amount).sum()
	}
}

/// Decrypted account state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
	#[serde(with = "hex_bytes")]
	pub diversifier: Vec<u8>,
	#[serde(with = "biguint_string")]
	pub transmission_key: BigUint,
	pub index: u64,
	#[serde(with = "u128_string")]
	pub balance: u128,
	#[serde(with = "u128_string")]
	pub energy: u128,
}

/// Decrypted note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteState {
	#[serde(with = "hex_bytes")]
	pub diversifier: Vec<u8>,
	#[serde(with = "biguint_string")]
	pub transmission_key: BigUint,
	#[serde(with = "u128_string")]
	pub balance: u128,
	#[serde(with = "hex_bytes")]
	pub salt: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedAccount {
	pub tree_index: u64,
	pub account: AccountState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedNote {
	pub tree_index: u64,
	pub note: NoteState,
}

/// Encrypted memo chunk for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextChunk {
	pub tree_index: u64,
	#[serde(with = "hex_bytes")]
	pub data: Vec<u8>,
}

/// Symmetric key material for one leaf's memo chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdhKey {
	pub tree_index: u64,
	#[serde(with = "hex_bytes")]
	pub key: Vec<u8>,
}

/// Raw decrypted state of one mined transaction, as exposed for compliance exports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxComplianceDetails {
	#[serde(with = "option_biguint_string", default)]
	pub nullifier: Option<BigUint>,
	#[serde(with = "option_biguint_string", default)]
	pub next_nullifier: Option<BigUint>,
	pub account: Option<IndexedAccount>,
	pub notes: Vec<IndexedNote>,
	pub chunks: Vec<CiphertextChunk>,
	pub ecdh_keys: Vec<EcdhKey>,
	pub input_account: Option<IndexedAccount>,
	pub input_notes: Vec<IndexedNote>,
}

/// Error types reported by pool client implementations
#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolError {
	#[error("Relayer error: {0}")]
	Relayer(String),

	#[error("State sync error: {0}")]
	Sync(String),

	#[error("Proof generation failed: {0}")]
	Proof(String),

	#[error("Job {job_id} failed: {reason}")]
	JobFailed { job_id: JobId, reason: String },

	#[error("Unsupported operation: {0}")]
	Unsupported(String),

	#[error("Pool client error: {0}")]
	Other(String),
}
