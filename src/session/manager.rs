//! Session manager: the single owner of the unlocked identity and the bound collaborators.
//!
//! The manager is constructed from an explicit [`SessionConfig`], a vault and a collaborator
//! factory. Unlocking decrypts the stored seed phrase; binding a network derives the spending key
//! for that chain kind and asks the factory for a chain backend and a pool client. Every other
//! component (orchestrator, ephemeral addresses, compliance) is reached through the manager and
//! borrows the binding rather than owning anything itself.
//!
//! Failed operations leave the session exactly as it was: a wrong password does not lock an
//! already-unlocked session, and a failed bind keeps the previous binding.

use super::identity::{Identity, MnemonicSource, SpendingKey, parse_mnemonic};
use super::{AuthError, SessionError};
use crate::compliance::{ComplianceReportBuilder, Exporter};
use crate::config::{NetworkConfig, NetworkKind, SessionConfig};
use crate::ephemeral::EphemeralAddressManager;
use crate::events::{ClientStatus, EventDispatcher, EventSubscription, SessionEvent};
use crate::network::{ChainBackend, NetworkAdapter, NetworkError, adapter_for};
use crate::pool::{Balances, HistoryRecord, PoolClient, PoolError};
use crate::transfer::TransferOrchestrator;
use crate::utils::UnitConverter;
use crate::vault::{EncryptedVault, SEED_FIELD, VaultError, open_secret, seal_secret};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use zeroize::Zeroizing;

/// Builds the external collaborators for a network at bind time.
#[async_trait]
pub trait CollaboratorFactory: Send + Sync {
	async fn chain_backend(
		&self,
		config: &NetworkConfig,
		key: &SpendingKey,
	) -> Result<Arc<dyn ChainBackend>, NetworkError>;

	async fn pool_client(
		&self,
		config: &NetworkConfig,
		key: &SpendingKey,
	) -> Result<Arc<dyn PoolClient>, PoolError>;
}

/// Collaborators bound for one network kind.
pub struct Binding {
	network: Arc<dyn NetworkAdapter>,
	pool: Arc<dyn PoolClient>,
	ephemeral: EphemeralAddressManager,
}

impl Binding {
	pub fn kind(&self) -> NetworkKind {
		self.network.kind()
	}

	pub fn network(&self) -> &dyn NetworkAdapter {
		self.network.as_ref()
	}

	pub fn pool(&self) -> &dyn PoolClient {
		self.pool.as_ref()
	}

	pub fn config(&self) -> &NetworkConfig {
		self.network.config()
	}
}

pub struct SessionManager {
	config: SessionConfig,
	vault: Arc<dyn EncryptedVault>,
	factory: Arc<dyn CollaboratorFactory>,
	events: EventDispatcher,
	identity: Option<Identity>,
	binding: Option<Binding>,
}

impl SessionManager {
	/// Create a locked session. Fails if the configuration is invalid.
	pub fn new(
		config: SessionConfig,
		vault: Arc<dyn EncryptedVault>,
		factory: Arc<dyn CollaboratorFactory>,
	) -> Result<Self, SessionError> {
		config.validate()?;
		Ok(Self {
			config,
			vault,
			factory,
			events: EventDispatcher::default(),
			identity: None,
			binding: None,
		})
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	pub fn events(&self) -> &EventDispatcher {
		&self.events
	}

	/// Subscribe to session and transfer progress events.
	pub fn subscribe(&self) -> EventSubscription {
		self.events.subscribe()
	}

	/// Names of all identities in the vault.
	pub async fn identities(&self) -> Result<Vec<String>, SessionError> {
		Ok(self.vault.identities().await?)
	}

	/// Create and persist a new identity. Does not unlock it.
	///
	/// # Arguments
	/// * `name` - Identity name, unique within the vault.
	/// * `source` - Generate a fresh 12-word phrase or import an existing one.
	/// * `password` - Password the seed phrase is sealed under.
	pub async fn create(
		&self,
		name: &str,
		source: MnemonicSource,
		password: &str,
	) -> Result<Identity, SessionError> {
		let min = self.config.vault.min_password_len;
		if password.chars().count() < min {
			return Err(AuthError::WeakPassword { min }.into());
		}
		if self.vault.get(name, SEED_FIELD).await?.is_some() {
			return Err(AuthError::IdentityExists(name.to_string()).into());
		}

		let mnemonic = source.into_mnemonic()?;
		let phrase = Zeroizing::new(mnemonic.to_string());
		let sealed = seal_secret(phrase.as_bytes(), password, &self.config.vault.kdf)?;
		self.vault.set(name, SEED_FIELD, &sealed).await?;

		info!("Created identity {}", name);
		Ok(Identity::new(name, &mnemonic))
	}

	/// Unlock `name`, replacing any previously unlocked identity and dropping its binding.
	pub async fn unlock(&mut self, name: &str, password: &str) -> Result<&Identity, SessionError> {
		let identity = self.open_identity(name, password).await?;

		self.binding = None;
		self.events.dispatch(SessionEvent::Unlocked {
			identity: name.to_string(),
		});
		info!("Unlocked identity {}", name);
		Ok(self.identity.insert(identity))
	}

	/// Drop the identity and any binding.
	pub fn lock(&mut self) {
		let was_unlocked = self.identity.is_some();
		self.binding = None;
		self.identity = None;
		if was_unlocked {
			self.events.dispatch(SessionEvent::Locked);
			info!("Session locked");
		}
	}

	pub fn is_unlocked(&self) -> bool {
		self.identity.is_some()
	}

	pub fn identity(&self) -> Option<&Identity> {
		self.identity.as_ref()
	}

	/// Re-derive the phrase of `name` through the unlock path without changing session state.
	pub async fn export_mnemonic(
		&self,
		name: &str,
		password: &str,
	) -> Result<Zeroizing<String>, SessionError> {
		let identity = self.open_identity(name, password).await?;
		Ok(Zeroizing::new(identity.mnemonic().to_string()))
	}

	/// Decrypt and validate the stored phrase. Any failure to produce a valid phrase is reported
	/// as an incorrect password.
	async fn open_identity(&self, name: &str, password: &str) -> Result<Identity, SessionError> {
		let sealed = self
			.vault
			.get(name, SEED_FIELD)
			.await?
			.ok_or_else(|| AuthError::UnknownIdentity(name.to_string()))?;

		let plaintext = match open_secret(&sealed, password) {
			Ok(plaintext) => plaintext,
			Err(VaultError::Decryption) => return Err(AuthError::IncorrectPassword.into()),
			Err(e) => return Err(e.into()),
		};
		let phrase = std::str::from_utf8(&plaintext).map_err(|_| AuthError::IncorrectPassword)?;
		let mnemonic = parse_mnemonic(phrase).ok_or(AuthError::IncorrectPassword)?;

		Ok(Identity::new(name, &mnemonic))
	}

	/// Bind the adapter and pool client for `kind`.
	///
	/// Publishes `ClientInitializing`, then the pool client's own status. On failure publishes
	/// `Failed` and keeps whatever was bound before.
	pub async fn bind_network(&mut self, kind: NetworkKind) -> Result<&Binding, SessionError> {
		let binding = match self.connect(kind).await {
			Ok(binding) => binding,
			Err(e) => {
				if !matches!(e, SessionError::Locked | SessionError::Config(_)) {
					self.events
						.dispatch(SessionEvent::Status(ClientStatus::Failed {
							reason: e.to_string(),
						}));
				}
				warn!("Failed to bind {} network: {}", kind, e);
				return Err(e);
			}
		};

		self.events.dispatch(SessionEvent::NetworkBound {
			kind,
			network: binding.config().name.clone(),
		});
		info!(
			"Bound {} network {} for {}",
			kind,
			binding.config().name,
			binding.network.address()
		);
		Ok(self.binding.insert(binding))
	}

	async fn connect(&self, kind: NetworkKind) -> Result<Binding, SessionError> {
		let identity = self.identity.as_ref().ok_or(SessionError::Locked)?;
		let config = self.config.network(kind)?;
		let key = identity.spending_key(kind)?;

		self.events
			.dispatch(SessionEvent::Status(ClientStatus::ClientInitializing));

		let backend = self.factory.chain_backend(config, &key).await?;
		let network = adapter_for(config, backend)?;
		let pool = self.factory.pool_client(config, &key).await?;

		let status = pool.status().await;
		self.events.dispatch(SessionEvent::Status(status));

		let ephemeral = EphemeralAddressManager::new(identity.seed(), network.clone(), pool.clone());
		Ok(Binding {
			network,
			pool,
			ephemeral,
		})
	}

	pub fn binding(&self) -> Result<&Binding, SessionError> {
		self.binding.as_ref().ok_or(SessionError::NotBound)
	}

	/// Unit conversions for the bound network.
	pub fn units(&self) -> Result<UnitConverter, SessionError> {
		Ok(self.binding()?.network.units())
	}

	pub async fn balances(&self) -> Result<Balances, SessionError> {
		Ok(self.binding()?.pool.balances().await?)
	}

	pub async fn history(&self) -> Result<Vec<HistoryRecord>, SessionError> {
		Ok(self.binding()?.pool.raw_history(true).await?)
	}

	pub async fn shielded_address(&self) -> Result<String, SessionError> {
		Ok(self.binding()?.pool.shielded_address().await?)
	}

	/// Orchestrator over the bound collaborators.
	pub fn orchestrator(&self) -> Result<TransferOrchestrator<'_>, SessionError> {
		let binding = self.binding()?;
		Ok(TransferOrchestrator::new(
			binding.network.as_ref(),
			binding.pool.as_ref(),
			&self.config.readiness,
			&self.events,
		))
	}

	pub fn ephemeral(&self) -> Result<&EphemeralAddressManager, SessionError> {
		Ok(&self.binding()?.ephemeral)
	}

	/// Compliance report builder attributed to the unlocked identity and bound network.
	pub fn compliance(&self) -> Result<ComplianceReportBuilder<'_>, SessionError> {
		let identity = self.identity.as_ref().ok_or(SessionError::Locked)?;
		let binding = self.binding()?;
		let exporter = Exporter {
			identity: identity.name().to_string(),
			network: binding.config().name.clone(),
			pool_address: binding.config().pool_address.clone(),
		};
		Ok(ComplianceReportBuilder::new(binding.pool.as_ref(), exporter))
	}
}
