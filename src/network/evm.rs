//! EVM-like chains: ERC-20 pool token with permit support.

use super::adapter::{ChainBackend, NetworkAdapter};
use super::types::{NetworkError, TypedDataPayload};
use crate::config::{NetworkConfig, NetworkKind};
use crate::utils::UnitConverter;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

pub struct EvmNetwork {
	config: NetworkConfig,
	units: UnitConverter,
	backend: Arc<dyn ChainBackend>,
}

impl EvmNetwork {
	pub fn new(config: NetworkConfig, units: UnitConverter, backend: Arc<dyn ChainBackend>) -> Self {
		Self {
			config,
			units,
			backend,
		}
	}
}

/// `0x` followed by 40 hex digits.
fn is_evm_address(address: &str) -> bool {
	address
		.strip_prefix("0x")
		.is_some_and(|body| body.len() == 40 && body.bytes().all(|b| b.is_ascii_hexdigit()))
}

#[async_trait]
impl NetworkAdapter for EvmNetwork {
	fn kind(&self) -> NetworkKind {
		NetworkKind::Evm
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

	async fn sign_typed_data(&self, payload: &TypedDataPayload) -> Result<String, NetworkError> {
		debug!(
			"Signing permit for spender {} on chain {}",
			payload.message.spender, payload.domain.chain_id
		);
		self.backend.sign_structured(&payload.to_json()).await
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
		let target = current.checked_add(additional).ok_or_else(|| {
			NetworkError::Rpc(format!(
				"allowance {} + {} overflows",
				current, additional
			))
		})?;
		let tx_hash = self.backend.approve(spender, target).await?;
		info!(
			"Approved {} base units for {} (tx {})",
			target, spender, tx_hash
		);
		Ok(tx_hash)
	}

	async fn permit_nonce(&self, owner: &str) -> Result<u64, NetworkError> {
		self.backend.permit_nonce(owner).await
	}

	async fn transaction_count(&self, address: &str) -> Result<u64, NetworkError> {
		self.backend.transaction_count(address).await
	}

	fn units(&self) -> UnitConverter {
		self.units
	}

	fn transaction_url(&self, tx_hash: &str) -> String {
		format!("{}/tx/{}", self.config.explorer_url.trim_end_matches('/'), tx_hash)
	}

	fn address_for_secret(&self, secret: &[u8; 32]) -> Result<String, NetworkError> {
		self.backend.address_from_secret(secret)
	}

	fn is_valid_address(&self, address: &str) -> bool {
		is_evm_address(address)
	}

	fn supports_permit(&self) -> bool {
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn validates_hex_addresses() {
		assert!(is_evm_address("0x52908400098527886E0F7030069857D2E4169EE7"));
		assert!(!is_evm_address("52908400098527886E0F7030069857D2E4169EE7"));
		assert!(!is_evm_address("0x52908400098527886E0F7030069857D2E4169EE"));
		assert!(!is_evm_address("0xZZ908400098527886E0F7030069857D2E4169EE7"));
	}
}
