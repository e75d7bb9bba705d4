//! Session configuration.
//!
//! Every network, contract and relayer address the session touches comes from an explicit
//! [`SessionConfig`] value handed to the session manager at construction time. Nothing is read
//! from process-wide state after that point.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("Unsupported network: {0}")]
	UnsupportedNetwork(NetworkKind),

	#[error("Missing configuration value: {0}")]
	Missing(String),

	#[error("Invalid configuration: {0}")]
	Invalid(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),
}

/// Family of chain a pool is deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
	Evm,
	Substrate,
}

impl NetworkKind {
	pub fn default_native_decimals(&self) -> u32 {
		match self {
			NetworkKind::Evm => 18,
			NetworkKind::Substrate => 12,
		}
	}
}

impl std::fmt::Display for NetworkKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			NetworkKind::Evm => write!(f, "evm"),
			NetworkKind::Substrate => write!(f, "substrate"),
		}
	}
}

fn default_shielded_decimals() -> u32 {
	9
}

fn default_permit_ttl_secs() -> u64 {
	3600
}

/// Immutable description of one deployed pool and the chain it lives on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
	/// Display name, e.g. `"sepolia"`.
	pub name: String,
	#[serde(rename = "kind")]
	pub network_kind: NetworkKind,
	pub rpc_url: String,
	pub pool_address: String,
	pub token_address: String,
	pub relayer_url: String,
	#[serde(default)]
	pub chain_id: u64,
	/// Token name used in the permit signing domain.
	#[serde(default)]
	pub token_name: String,
	#[serde(default = "default_token_version")]
	pub token_version: String,
	#[serde(default)]
	pub explorer_url: String,
	/// Overrides the per-kind default when set.
	#[serde(default)]
	pub native_decimals: Option<u32>,
	#[serde(default = "default_shielded_decimals")]
	pub shielded_decimals: u32,
	#[serde(default = "default_permit_ttl_secs")]
	pub permit_ttl_secs: u64,
}

fn default_token_version() -> String {
	"1".to_string()
}

impl NetworkConfig {
	pub fn native_decimals(&self) -> u32 {
		self.native_decimals
			.unwrap_or_else(|| self.network_kind.default_native_decimals())
	}

	/// Rejects configurations with blank endpoints or addresses.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let required = [
			("rpc_url", &self.rpc_url),
			("pool_address", &self.pool_address),
			("token_address", &self.token_address),
			("relayer_url", &self.relayer_url),
		];
		for (field, value) in required {
			if value.trim().is_empty() {
				return Err(ConfigError::Missing(format!("{}.{}", self.name, field)));
			}
		}
		if self.shielded_decimals > self.native_decimals() {
			return Err(ConfigError::Invalid(format!(
				"{}: shielded decimals {} exceed native decimals {}",
				self.name,
				self.shielded_decimals,
				self.native_decimals()
			)));
		}
		Ok(())
	}
}

/// Bounded polling used while waiting for the pool client to become ready.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
	pub poll_interval_ms: u64,
	pub max_wait_ms: u64,
}

impl ReadinessConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn max_wait(&self) -> Duration {
		Duration::from_millis(self.max_wait_ms)
	}
}

impl Default for ReadinessConfig {
	fn default() -> Self {
		Self {
			poll_interval_ms: 250,
			max_wait_ms: 30_000,
		}
	}
}

/// Argon2id cost parameters for sealing seeds at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
	/// Memory cost in KiB.
	pub memory_kib: u32,
	pub iterations: u32,
	pub parallelism: u32,
}

impl Default for KdfParams {
	fn default() -> Self {
		Self {
			memory_kib: 65_536,
			iterations: 3,
			parallelism: 1,
		}
	}
}

/// Where and how identities are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
	pub dir: PathBuf,
	#[serde(default)]
	pub kdf: KdfParams,
	pub min_password_len: usize,
}

impl Default for VaultConfig {
	fn default() -> Self {
		Self {
			dir: PathBuf::from(".shielded-session"),
			kdf: KdfParams::default(),
			min_password_len: 6,
		}
	}
}

/// Top-level configuration for a [`crate::session::SessionManager`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
	#[serde(default)]
	pub networks: Vec<NetworkConfig>,
	#[serde(default)]
	pub vault: VaultConfig,
	#[serde(default)]
	pub readiness: ReadinessConfig,
}

impl SessionConfig {
	/// Loads and validates a JSON configuration file.
	pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await?;
		let config: SessionConfig = serde_json::from_str(&content)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		for network in &self.networks {
			network.validate()?;
		}
		if self.readiness.poll_interval_ms == 0 {
			return Err(ConfigError::Invalid(
				"readiness.poll_interval_ms must be positive".to_string(),
			));
		}
		Ok(())
	}

	/// The configuration bound for `kind`, if any.
	pub fn network(&self, kind: NetworkKind) -> Result<&NetworkConfig, ConfigError> {
		self.networks
			.iter()
			.find(|network| network.network_kind == kind)
			.ok_or(ConfigError::UnsupportedNetwork(kind))
	}
}
