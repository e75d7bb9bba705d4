use super::types::{NetworkError, TypedDataPayload};
use crate::config::{NetworkConfig, NetworkKind};
use crate::utils::UnitConverter;
use async_trait::async_trait;

/// Raw chain access for one signing key, supplied by the host application.
///
/// Amounts are native base units. Implementations own RPC transport and key handling.
#[async_trait]
pub trait ChainBackend: Send + Sync {
	/// Address of the signing key.
	fn address(&self) -> String;

	async fn sign_message(&self, message: &[u8]) -> Result<String, NetworkError>;

	/// Sign a structured-data document (EIP-712 JSON on EVM chains).
	async fn sign_structured(&self, payload: &serde_json::Value) -> Result<String, NetworkError>;

	async fn native_balance(&self, address: &str) -> Result<u128, NetworkError>;

	async fn token_balance(&self, address: &str) -> Result<u128, NetworkError>;

	async fn token_allowance(&self, owner: &str, spender: &str) -> Result<u128, NetworkError>;

	/// Set the token allowance of `spender` to `amount`, returning the transaction hash.
	async fn approve(&self, spender: &str, amount: u128) -> Result<String, NetworkError>;

	async fn permit_nonce(&self, owner: &str) -> Result<u64, NetworkError>;

	async fn transaction_count(&self, address: &str) -> Result<u64, NetworkError>;

	/// Address controlled by a raw 32-byte secret key.
	fn address_from_secret(&self, secret: &[u8; 32]) -> Result<String, NetworkError>;
}

/// Capabilities the session needs from the base chain.
#[async_trait]
pub trait NetworkAdapter: Send + Sync {
	fn kind(&self) -> NetworkKind;

	fn config(&self) -> &NetworkConfig;

	/// The bound holder address.
	fn address(&self) -> String;

	async fn sign(&self, message: &[u8]) -> Result<String, NetworkError>;

	async fn sign_typed_data(&self, payload: &TypedDataPayload) -> Result<String, NetworkError>;

	async fn native_balance(&self, address: &str) -> Result<u128, NetworkError>;

	async fn token_balance(&self, address: &str) -> Result<u128, NetworkError>;

	/// Token allowance granted by the holder to `spender`, in native base units.
	async fn allowance(&self, spender: &str) -> Result<u128, NetworkError>;

	/// Raise the holder's allowance for `spender` by `additional` native base units.
	async fn increase_allowance(&self, spender: &str, additional: u128)
	-> Result<String, NetworkError>;

	async fn permit_nonce(&self, owner: &str) -> Result<u64, NetworkError>;

	async fn transaction_count(&self, address: &str) -> Result<u64, NetworkError>;

	fn units(&self) -> UnitConverter;

	/// Shielded units to native base units.
	fn to_base_unit(&self, shielded: u128) -> Result<u128, NetworkError> {
		Ok(self.units().shielded_to_native(shielded)?)
	}

	/// Native base units to shielded units, rounding down.
	fn from_base_unit(&self, native: u128) -> u128 {
		self.units().native_to_shielded(native)
	}

	fn transaction_url(&self, tx_hash: &str) -> String;

	fn address_for_secret(&self, secret: &[u8; 32]) -> Result<String, NetworkError>;

	fn is_valid_address(&self, address: &str) -> bool;

	fn supports_permit(&self) -> bool;
}
