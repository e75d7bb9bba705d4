//! Substrate-like chains. Deposits go through allowance approval; permits are not available.

use super::adapter::{ChainBackend, NetworkAdapter};
use super::types::{NetworkError, TypedDataPayload};
use crate::config::{NetworkConfig, NetworkKind};
use crate::utils::UnitConverter;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

pub struct SubstrateNetwork {
	config: NetworkConfig,
	units: UnitConverter,
	backend: Arc<dyn ChainBackend>,
}

impl SubstrateNetwork {
	pub fn new(config: NetworkConfig, units: UnitConverter, backend: Arc<dyn ChainBackend>) -> Self {
		Self {
			config,
			units,
			backend,
		}
	}
}

/// Shape check for SS58 account addresses (base58, 47 or 48 characters).
fn is_ss58_address(address: &str) -> bool {
	(47..=48).contains(&address.len()) && address.bytes().all(|b| BASE58_ALPHABET.contains(&b))
}

#[async_trait]
impl NetworkAdapter for SubstrateNetwork {
	fn kind(&self) -> NetworkKind {
		NetworkKind::Substrate
	}

	fn config(&self) -> &NetworkConfig {
		&self.config
	}

	fn address(&self) -> String {
		self.backend.address()
	}

	async fn sign(&self, message: &[u8]) -> Result<String, NetworkError> {
		self.backend.sign_message(message).await
	}

	async fn sign_typed_data(&self, _payload: &TypedDataPayload) -> Result<String, NetworkError> {
		Err(NetworkError::Unsupported(
			"typed data signing".to_string(),
		))
	}

	async fn native_balance(&self, address: &str) -> Result<u128, NetworkError> {
		self.backend.native_balance(address).await
	}

	async fn token_balance(&self, address: &str) -> Result<u128, NetworkError> {
		self.backend.token_balance(address).await
	}

	async fn allowance(&self, spender: &str) -> Result<u128, NetworkError> {
		self.backend
			.token_allowance(&self.backend.address(), spender)
			.await
	}

	async fn increase_allowance(
		&self,
		spender: &str,
		additional: u128,
	) -> Result<String, NetworkError> {
		let current = self.allowance(spender).await?;
		let target = current.saturating_add(additional);
		let tx_hash = self.backend.approve(spender, target).await?;
		info!("Approved {} base units for {} (extrinsic {})", target, spender, tx_hash);
		Ok(tx_hash)
	}

	async fn permit_nonce(&self, _owner: &str) -> Result<u64, NetworkError> {
		Err(NetworkError::Unsupported("permit nonces".to_string()))
	}

	async fn transaction_count(&self, address: &str) -> Result<u64, NetworkError> {
		self.backend.transaction_count(address).await
	}

	fn units(&self) -> UnitConverter {
		self.units
	}

	fn transaction_url(&self, tx_hash: &str) -> String {
		format!(
			"{}/extrinsic/{}",
			self.config.explorer_url.trim_end_matches('/'),
			tx_hash
		)
	}

	fn address_for_secret(&self, secret: &[u8; 32]) -> Result<String, NetworkError> {
		self.backend.address_from_secret(secret)
	}

	fn is_valid_address(&self, address: &str) -> bool {
		is_ss58_address(address)
	}

	fn supports_permit(&self) -> bool {
		false
	}
}
