//! Shared test doubles: an in-memory pool client, chain backend and collaborator factory.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use shielded_session::config::{
	KdfParams, NetworkConfig, NetworkKind, ReadinessConfig, SessionConfig, VaultConfig,
};
use shielded_session::events::ClientStatus;
use shielded_session::network::{ChainBackend, NetworkError};
use shielded_session::pool::*;
use shielded_session::session::{CollaboratorFactory, MnemonicSource, SessionManager, SpendingKey};
use shielded_session::vault::MemoryVault;

pub const PHRASE: &str =
	"legal winner thank year wave sausage worth useful legal winner thank yellow";
pub const PASSWORD: &str = "correct horse";
pub const POOL_ADDRESS: &str = "0x1111111111111111111111111111111111111111";
pub const TOKEN_ADDRESS: &str = "0x2222222222222222222222222222222222222222";
pub const HOLDER_ADDRESS: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

pub fn network_config(kind: NetworkKind) -> NetworkConfig {
	NetworkConfig {
		name: match kind {
			NetworkKind::Evm => "sepolia".to_string(),
			NetworkKind::Substrate => "paseo".to_string(),
		},
		network_kind: kind,
		rpc_url: "https://rpc.example".to_string(),
		pool_address: POOL_ADDRESS.to_string(),
		token_address: TOKEN_ADDRESS.to_string(),
		relayer_url: "https://relayer.example".to_string(),
		chain_id: 11155111,
		token_name: "BOB".to_string(),
		token_version: "1".to_string(),
		explorer_url: "https://explorer.example".to_string(),
		// Same precision on both sides keeps amounts comparable in assertions
		native_decimals: Some(9),
		shielded_decimals: 9,
		permit_ttl_secs: 3600,
	}
}

pub fn session_config(kinds: &[NetworkKind]) -> SessionConfig {
	SessionConfig {
		networks: kinds.iter().map(|kind| network_config(*kind)).collect(),
		vault: VaultConfig {
			dir: std::env::temp_dir(),
			kdf: KdfParams {
				memory_kib: 64,
				iterations: 1,
				parallelism: 1,
			},
			min_password_len: 8,
		},
		readiness: ReadinessConfig {
			poll_interval_ms: 5,
			max_wait_ms: 200,
		},
	}
}

/// Pool-side knobs for a scenario.
#[derive(Debug, Clone)]
pub struct PoolState {
	pub status: ClientStatus,
	/// Readiness checks that report not-ready before the pool becomes ready
	pub ready_after_polls: usize,
	pub optimistic_balance: u128,
	pub account_balance: u128,
	pub notes: Vec<u128>,
	pub max_per_tx: u128,
	pub min_amount: u128,
	pub fee_model: FeeModel,
	pub limits: PoolLimits,
	/// Zero-based submission attempt that the relayer rejects
	pub fail_submission_at: Option<usize>,
	/// Jobs whose hash lookup fails
	pub failing_jobs: Vec<String>,
	/// Per-job hash delays, indexed by submission attempt
	pub hash_delays_ms: Vec<u64>,
	pub history: Vec<HistoryRecord>,
	pub details: HashMap<u64, TxComplianceDetails>,
	pub details_errors: Vec<u64>,
	pub tree_state: Option<TreeState>,
	pub used_addresses: HashSet<String>,
}

impl Default for PoolState {
	fn default() -> Self {
		Self {
			status: ClientStatus::FullyReady,
			ready_after_polls: 0,
			optimistic_balance: 10_000,
			account_balance: 10_000,
			notes: Vec::new(),
			max_per_tx: 1_000,
			min_amount: 1,
			fee_model: FeeModel {
				base_per_tx: 1,
				per_input_note: 0,
				per_output: 0,
				l1_per_tx: 0,
			},
			limits: PoolLimits::default(),
			fail_submission_at: None,
			failing_jobs: Vec::new(),
			hash_delays_ms: Vec::new(),
			history: Vec::new(),
			details: HashMap::new(),
			details_errors: Vec::new(),
			tree_state: None,
			used_addresses: HashSet::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
	Deposit { amount: u128, fee: u128 },
	Permit { draft: PermitDraft, signature: String },
	Ephemeral { amount: u128, fee: u128, index: u32 },
	Transfer(TransactionPart),
	Withdraw(TransactionPart),
}

pub struct MockPool {
	pub state: Mutex<PoolState>,
	pub submissions: Mutex<Vec<Submission>>,
	attempts: AtomicUsize,
	polls: AtomicUsize,
}

impl MockPool {
	pub fn new(state: PoolState) -> Self {
		Self {
			state: Mutex::new(state),
			submissions: Mutex::new(Vec::new()),
			attempts: AtomicUsize::new(0),
			polls: AtomicUsize::new(0),
		}
	}

	pub fn submitted(&self) -> Vec<Submission> {
		self.submissions.lock().unwrap().clone()
	}

	pub fn mark_used(&self, address: &str) {
		self.state
			.lock()
			.unwrap()
			.used_addresses
			.insert(address.to_string());
	}

	fn submit(&self, submission: Submission) -> Result<JobId, PoolError> {
		let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
		if self.state.lock().unwrap().fail_submission_at == Some(attempt) {
			return Err(PoolError::Relayer("rejected by relayer".to_string()));
		}
		self.submissions.lock().unwrap().push(submission);
		Ok(JobId(format!("job-{}", attempt)))
	}
}

#[async_trait]
impl PoolClient for MockPool {
	async fn status(&self) -> ClientStatus {
		self.state.lock().unwrap().status.clone()
	}

	async fn is_ready_to_transact(&self) -> Result<bool, PoolError> {
		let polls = self.polls.fetch_add(1, Ordering::SeqCst);
		Ok(polls >= self.state.lock().unwrap().ready_after_polls)
	}

	async fn balances(&self) -> Result<Balances, PoolError> {
		let state = self.state.lock().unwrap();
		let note: u128 = state.notes.iter().sum();
		Ok(Balances {
			total: state.account_balance + note,
			account: state.account_balance,
			note,
		})
	}

	async fn optimistic_total_balance(&self) -> Result<u128, PoolError> {
		Ok(self.state.lock().unwrap().optimistic_balance)
	}

	async fn estimate_fee(
		&self,
		amounts: &[u128],
		_kind: TxKind,
		_update_state: bool,
	) -> Result<FeeEstimate, PoolError> {
		let state = self.state.lock().unwrap();
		let per_tx = state.fee_model.part_fee(0, 1);
		let total: u128 = amounts.iter().sum();
		let tx_count = if state.max_per_tx == 0 {
			0
		} else {
			total.div_ceil(state.max_per_tx).max(1) as usize
		};
		Ok(FeeEstimate {
			total: per_tx * tx_count as u128,
			per_tx,
			relayer_portion: per_tx * tx_count as u128,
			l1_portion: 0,
			tx_count,
			insufficient_funds: false,
		})
	}

	async fn max_transfer_per_tx(&self, _kind: TxKind) -> Result<u128, PoolError> {
		Ok(self.state.lock().unwrap().max_per_tx)
	}

	async fn min_tx_amount(&self) -> Result<u128, PoolError> {
		Ok(self.state.lock().unwrap().min_amount)
	}

	async fn limits(&self, _kind: TxKind) -> Result<PoolLimits, PoolError> {
		Ok(self.state.lock().unwrap().limits)
	}

	async fn spendable_notes(&self) -> Result<Vec<u128>, PoolError> {
		Ok(self.state.lock().unwrap().notes.clone())
	}

	async fn fee_model(&self, _kind: TxKind) -> Result<FeeModel, PoolError> {
		Ok(self.state.lock().unwrap().fee_model)
	}

	async fn submit_deposit(&self, amount: u128, fee: u128) -> Result<JobId, PoolError> {
		self.submit(Submission::Deposit { amount, fee })
	}

	async fn prepare_permit_deposit(
		&self,
		amount: u128,
		fee: u128,
		_owner: &str,
	) -> Result<PermitDraft, PoolError> {
		Ok(PermitDraft {
			amount,
			fee,
			deadline: 1_700_003_600,
			salt: vec![9u8; 32],
		})
	}

	async fn submit_permit_deposit(
		&self,
		draft: &PermitDraft,
		signature: &str,
	) -> Result<JobId, PoolError> {
		self.submit(Submission::Permit {
			draft: draft.clone(),
			signature: signature.to_string(),
		})
	}

	async fn submit_ephemeral_deposit(
		&self,
		amount: u128,
		fee: u128,
		index: u32,
	) -> Result<JobId, PoolError> {
		self.submit(Submission::Ephemeral { amount, fee, index })
	}

	async fn submit_transfer(&self, part: &TransactionPart) -> Result<JobId, PoolError> {
		self.submit(Submission::Transfer(part.clone()))
	}

	async fn submit_withdraw(&self, part: &TransactionPart) -> Result<JobId, PoolError> {
		self.submit(Submission::Withdraw(part.clone()))
	}

	async fn await_job_hash(&self, job: &JobId) -> Result<String, PoolError> {
		let (delay, failing) = {
			let state = self.state.lock().unwrap();
			let attempt: usize = job
				.0
				.trim_start_matches("job-")
				.parse()
				.unwrap_or_default();
			(
				state.hash_delays_ms.get(attempt).copied().unwrap_or(0),
				state.failing_jobs.contains(&job.0),
			)
		};
		tokio::time::sleep(Duration::from_millis(delay)).await;
		if failing {
			return Err(PoolError::JobFailed {
				job_id: job.clone(),
				reason: "reverted".to_string(),
			});
		}
		Ok(format!("0xhash-{}", job))
	}

	async fn raw_history(&self, _update_state: bool) -> Result<Vec<HistoryRecord>, PoolError> {
		Ok(self.state.lock().unwrap().history.clone())
	}

	async fn compliance_details(
		&self,
		tx_index: u64,
	) -> Result<Option<TxComplianceDetails>, PoolError> {
		let state = self.state.lock().unwrap();
		if state.details_errors.contains(&tx_index) {
			return Err(PoolError::Sync(format!("no state for {}", tx_index)));
		}
		Ok(state.details.get(&tx_index).cloned())
	}

	async fn tree_state(&self, _at_index: Option<u64>) -> Result<TreeState, PoolError> {
		self.state
			.lock()
			.unwrap()
			.tree_state
			.clone()
			.ok_or_else(|| PoolError::Sync("tree unavailable".to_string()))
	}

	async fn verify_address_checksum(&self, address: &str) -> Result<bool, PoolError> {
		Ok(!address.starts_with("bad"))
	}

	async fn ephemeral_usage(&self, address: &str) -> Result<EphemeralUsage, PoolError> {
		let used = self.state.lock().unwrap().used_addresses.contains(address);
		Ok(EphemeralUsage {
			in_tx_count: u64::from(used),
			out_tx_count: 0,
		})
	}

	async fn shielded_address(&self) -> Result<String, PoolError> {
		Ok("zk1shieldedreceiver".to_string())
	}
}

/// Chain backend holding balances in memory and recording what it signs and approves.
pub struct MockBackend {
	pub token_balance: Mutex<u128>,
	pub allowance: Mutex<u128>,
	pub approvals: Mutex<Vec<(String, u128)>>,
	pub signed: Mutex<Vec<Value>>,
	pub permit_nonce: u64,
}

impl MockBackend {
	pub fn new(token_balance: u128, allowance: u128) -> Self {
		Self {
			token_balance: Mutex::new(token_balance),
			allowance: Mutex::new(allowance),
			approvals: Mutex::new(Vec::new()),
			signed: Mutex::new(Vec::new()),
			permit_nonce: 7,
		}
	}
}

#[async_trait]
impl ChainBackend for MockBackend {
	fn address(&self) -> String {
		HOLDER_ADDRESS.to_string()
	}

	async fn sign_message(&self, message: &[u8]) -> Result<String, NetworkError> {
		Ok(format!("0xsig-{}", hex::encode(message)))
	}

	async fn sign_structured(&self, payload: &Value) -> Result<String, NetworkError> {
		self.signed.lock().unwrap().push(payload.clone());
		Ok("0xpermitsig".to_string())
	}

	async fn native_balance(&self, _address: &str) -> Result<u128, NetworkError> {
		Ok(1)
	}

	async fn token_balance(&self, _address: &str) -> Result<u128, NetworkError> {
		Ok(*self.token_balance.lock().unwrap())
	}

	async fn token_allowance(&self, _owner: &str, _spender: &str) -> Result<u128, NetworkError> {
		Ok(*self.allowance.lock().unwrap())
	}

	async fn approve(&self, spender: &str, amount: u128) -> Result<String, NetworkError> {
		*self.allowance.lock().unwrap() = amount;
		self.approvals
			.lock()
			.unwrap()
			.push((spender.to_string(), amount));
		Ok("0xapproval".to_string())
	}

	async fn permit_nonce(&self, _owner: &str) -> Result<u64, NetworkError> {
		Ok(self.permit_nonce)
	}

	async fn transaction_count(&self, _address: &str) -> Result<u64, NetworkError> {
		Ok(0)
	}

	fn address_from_secret(&self, secret: &[u8; 32]) -> Result<String, NetworkError> {
		Ok(format!("0x{}", hex::encode(&secret[..20])))
	}
}

pub struct MockFactory {
	pub pool: Arc<MockPool>,
	pub backend: Arc<MockBackend>,
	pub fail_pool: AtomicBool,
}

impl MockFactory {
	pub fn new(pool: Arc<MockPool>, backend: Arc<MockBackend>) -> Self {
		Self {
			pool,
			backend,
			fail_pool: AtomicBool::new(false),
		}
	}
}

#[async_trait]
impl CollaboratorFactory for MockFactory {
	async fn chain_backend(
		&self,
		_config: &NetworkConfig,
		_key: &SpendingKey,
	) -> Result<Arc<dyn ChainBackend>, NetworkError> {
		Ok(self.backend.clone())
	}

	async fn pool_client(
		&self,
		_config: &NetworkConfig,
		_key: &SpendingKey,
	) -> Result<Arc<dyn PoolClient>, PoolError> {
		if self.fail_pool.load(Ordering::SeqCst) {
			return Err(PoolError::Relayer("relayer unreachable".to_string()));
		}
		Ok(self.pool.clone())
	}
}

pub struct Fixture {
	pub session: SessionManager,
	pub pool: Arc<MockPool>,
	pub backend: Arc<MockBackend>,
	pub factory: Arc<MockFactory>,
}

/// A locked session over a memory vault with `kinds` configured.
pub fn fixture(kinds: &[NetworkKind], state: PoolState, backend: MockBackend) -> Fixture {
	let pool = Arc::new(MockPool::new(state));
	let backend = Arc::new(backend);
	let factory = Arc::new(MockFactory::new(pool.clone(), backend.clone()));
	let session = SessionManager::new(
		session_config(kinds),
		Arc::new(MemoryVault::new()),
		factory.clone(),
	)
	.unwrap();
	Fixture {
		session,
		pool,
		backend,
		factory,
	}
}

/// A session with "alice" unlocked and `kind` bound.
pub async fn bound_fixture(kind: NetworkKind, state: PoolState, backend: MockBackend) -> Fixture {
	let mut fixture = fixture(&[kind], state, backend);
	fixture
		.session
		.create("alice", MnemonicSource::Import(PHRASE.to_string()), PASSWORD)
		.await
		.unwrap();
	fixture.session.unlock("alice", PASSWORD).await.unwrap();
	fixture.session.bind_network(kind).await.unwrap();
	fixture
}
