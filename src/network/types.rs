use crate::config::NetworkConfig;
use crate::pool::PermitDraft;
use crate::utils::UnitError;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
	#[error("RPC error: {0}")]
	Rpc(String),

	#[error("Signing failed: {0}")]
	Signing(String),

	#[error("Unsupported on this network: {0}")]
	Unsupported(String),

	#[error("Invalid address: {0}")]
	InvalidAddress(String),

	#[error("Unit conversion error: {0}")]
	Units(#[from] UnitError),
}

/// Signing domain of a permit-capable token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitDomain {
	pub name: String,
	pub version: String,
	pub chain_id: u64,
	pub verifying_contract: String,
}

/// Permit authorizing the pool to pull `value` native base units from `owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitMessage {
	pub owner: String,
	pub spender: String,
	pub value: u128,
	pub nonce: u64,
	/// Unix seconds
	pub deadline: u64,
	pub salt: Vec<u8>,
}

/// Typed structured-data payload for a permit-style deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedDataPayload {
	pub domain: PermitDomain,
	pub message: PermitMessage,
}

impl TypedDataPayload {
	/// Permit for depositing `value` native base units into the configured pool.
	pub fn permit(
		config: &NetworkConfig,
		owner: &str,
		value: u128,
		nonce: u64,
		draft: &PermitDraft,
	) -> Self {
		Self {
			domain: PermitDomain {
				name: config.token_name.clone(),
				version: config.token_version.clone(),
				chain_id: config.chain_id,
				verifying_contract: config.token_address.clone(),
			},
			message: PermitMessage {
				owner: owner.to_string(),
				spender: config.pool_address.clone(),
				value,
				nonce,
				deadline: draft.deadline,
				salt: draft.salt.clone(),
			},
		}
	}

	/// Render as an EIP-712 `eth_signTypedData_v4` document. Integers are decimal strings.
	pub fn to_json(&self) -> Value {
		json!({
			"types": {
				"EIP712Domain": [
					{ "name": "name", "type": "string" },
					{ "name": "version", "type": "string" },
					{ "name": "chainId", "type": "uint256" },
					{ "name": "verifyingContract", "type": "address" },
				],
				"Permit": [
					{ "name": "owner", "type": "address" },
					{ "name": "spender", "type": "address" },
					{ "name": "value", "type": "uint256" },
					{ "name": "nonce", "type": "uint256" },
					{ "name": "deadline", "type": "uint256" },
					{ "name": "salt", "type": "bytes32" },
				],
			},
			"primaryType": "Permit",
			"domain": self.domain,
			"message": {
				"owner": self.message.owner,
				"spender": self.message.spender,
				"value": self.message.value.to_string(),
				"nonce": self.message.nonce.to_string(),
				"deadline": self.message.deadline.to_string(),
				"salt": format!("0x{}", hex::encode(&self.message.salt)),
			},
		})
	}
}
