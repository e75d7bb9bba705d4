//!
//! Contract for the shielded pool client.
//!
//! Implementations own state sync with the relayer, proof generation and relayed submission.
//! Amounts crossing this trait are always in shielded units; conversion to native base units is
//! done by the network adapter.

use super::types::*;
use crate::events::ClientStatus;
use async_trait::async_trait;

#[async_trait]
pub trait PoolClient: Send + Sync {
	/// Current initialization status of the client.
	async fn status(&self) -> ClientStatus;

	/// Whether local state is synced far enough to build a transaction.
	async fn is_ready_to_transact(&self) -> Result<bool, PoolError>;

	async fn balances(&self) -> Result<Balances, PoolError>;

	/// Total balance including the effect of pending, not yet mined, transactions.
	async fn optimistic_total_balance(&self) -> Result<u128, PoolError>;

	/// Quote the fee for sending `amounts` as an operation of `kind`.
	///
	/// # Arguments
	/// * `amounts` - Requested output amounts.
	/// * `kind` - Operation kind the quote is for.
	/// * `update_state` - Sync local state before quoting.
	async fn estimate_fee(
		&self,
		amounts: &[u128],
		kind: TxKind,
		update_state: bool,
	) -> Result<FeeEstimate, PoolError>;

	/// Largest amount a single transaction of `kind` can move given the current note set.
	async fn max_transfer_per_tx(&self, kind: TxKind) -> Result<u128, PoolError>;

	async fn min_tx_amount(&self) -> Result<u128, PoolError>;

	async fn limits(&self, kind: TxKind) -> Result<PoolLimits, PoolError>;

	/// Balances of the unspent notes, in the order the client would spend them.
	async fn spendable_notes(&self) -> Result<Vec<u128>, PoolError>;

	async fn fee_model(&self, kind: TxKind) -> Result<FeeModel, PoolError>;

	/// Deposit from the bound chain address; the pool must already hold an allowance.
	async fn submit_deposit(&self, amount: u128, fee: u128) -> Result<JobId, PoolError>;

	/// Start a permit-style deposit, returning the salt and deadline to sign over.
	async fn prepare_permit_deposit(
		&self,
		amount: u128,
		fee: u128,
		owner: &str,
	) -> Result<PermitDraft, PoolError>;

	async fn submit_permit_deposit(
		&self,
		draft: &PermitDraft,
		signature: &str,
	) -> Result<JobId, PoolError>;

	/// Deposit funded by the ephemeral address at `index`.
	async fn submit_ephemeral_deposit(
		&self,
		amount: u128,
		fee: u128,
		index: u32,
	) -> Result<JobId, PoolError>;

	async fn submit_transfer(&self, part: &TransactionPart) -> Result<JobId, PoolError>;

	/// Submit one withdrawal part. Its single output carries the native destination address.
	async fn submit_withdraw(&self, part: &TransactionPart) -> Result<JobId, PoolError>;

	/// Wait until the relayer resolves `job` to an on-chain transaction hash.
	async fn await_job_hash(&self, job: &JobId) -> Result<String, PoolError>;

	async fn raw_history(&self, update_state: bool) -> Result<Vec<HistoryRecord>, PoolError>;

	/// Decrypted state for the transaction at `tx_index`, if the client has it.
	async fn compliance_details(
		&self,
		tx_index: u64,
	) -> Result<Option<TxComplianceDetails>, PoolError>;

	/// Merkle root at `at_index`, or at the current tip when `None`.
	async fn tree_state(&self, at_index: Option<u64>) -> Result<TreeState, PoolError>;

	async fn verify_address_checksum(&self, address: &str) -> Result<bool, PoolError>;

	/// In/out transaction counters for a native ephemeral address.
	async fn ephemeral_usage(&self, address: &str) -> Result<EphemeralUsage, PoolError>;

	/// This account's shielded receiving address.
	async fn shielded_address(&self) -> Result<String, PoolError>;
}
