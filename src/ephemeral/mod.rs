//! Ephemeral funding addresses.
//!
//! Each unlocked identity owns an unbounded sequence of native-chain addresses derived from its
//! seed by index. They are used to pre-fund deposits without linking the funds to the holder's
//! main address. An address counts as used once the pool has observed any transaction touching
//! it; used addresses never become unused again.

use crate::network::{NetworkAdapter, NetworkError};
use crate::pool::{PoolClient, PoolError};
use crate::utils::serialization::u128_string;

use hkdf::Hkdf;
use serde::Serialize;
use sha2::Sha256;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;
use tracing::{debug, info};
use zeroize::Zeroizing;

const EPHEMERAL_INFO_PREFIX: &str = "ephemeral-address/";

#[derive(Debug, Error)]
pub enum EphemeralError {
	#[error("Key derivation failed for index {0}")]
	Derivation(u32),

	#[error("Ephemeral index space exhausted")]
	IndexOverflow,

	#[error("Network error: {0}")]
	Network(#[from] NetworkError),

	#[error("Pool error: {0}")]
	Pool(#[from] PoolError),
}

/// Raw 32-byte secret of one ephemeral address. Zeroized on drop and never printed.
pub struct EphemeralSecret(Zeroizing<[u8; 32]>);

impl EphemeralSecret {
	pub fn expose(&self) -> &[u8; 32] {
		&self.0
	}

	/// `0x`-prefixed hex, for explicit export only.
	pub fn to_hex(&self) -> Zeroizing<String> {
		Zeroizing::new(format!("0x{}", hex::encode(&self.0[..])))
	}
}

impl std::fmt::Debug for EphemeralSecret {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("EphemeralSecret(<redacted>)")
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EphemeralNonces {
	/// Native transaction count
	pub native: u64,
	/// Token permit nonce, on networks with permits
	pub permit: Option<u64>,
}

/// Snapshot of one ephemeral address. Holds no key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EphemeralAddress {
	pub index: u32,
	pub address: String,
	/// Native base units
	#[serde(with = "u128_string")]
	pub token_balance: u128,
	#[serde(with = "u128_string")]
	pub native_balance: u128,
	pub in_tx_count: u64,
	pub out_tx_count: u64,
	pub nonces: EphemeralNonces,
}

impl EphemeralAddress {
	pub fn is_used(&self) -> bool {
		self.in_tx_count > 0 || self.out_tx_count > 0
	}
}

/// Derive the secret for `index` from an identity seed.
fn derive_secret(seed: &[u8], index: u32) -> Result<EphemeralSecret, EphemeralError> {
	let info = format!("{}{}", EPHEMERAL_INFO_PREFIX, index);
	let mut secret = Zeroizing::new([0u8; 32]);
	Hkdf::<Sha256>::new(None, seed)
		.expand(info.as_bytes(), &mut secret[..])
		.map_err(|_| EphemeralError::Derivation(index))?;
	Ok(EphemeralSecret(secret))
}

/// Derives ephemeral addresses for one identity and tracks the first-unused cursor.
pub struct EphemeralAddressManager {
	seed: Zeroizing<Vec<u8>>,
	network: Arc<dyn NetworkAdapter>,
	pool: Arc<dyn PoolClient>,
	/// Every index below the cursor is known to be used
	cursor: AtomicU32,
}

impl std::fmt::Debug for EphemeralAddressManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EphemeralAddressManager")
			.field("network", &self.network.kind())
			.field("cursor", &self.cursor.load(Ordering::Relaxed))
			.finish_non_exhaustive()
	}
}

impl EphemeralAddressManager {
	pub fn new(seed: &[u8], network: Arc<dyn NetworkAdapter>, pool: Arc<dyn PoolClient>) -> Self {
		Self {
			seed: Zeroizing::new(seed.to_vec()),
			network,
			pool,
			cursor: AtomicU32::new(0),
		}
	}

	/// Address at `index`, without querying balances.
	pub fn address_for(&self, index: u32) -> Result<String, EphemeralError> {
		let secret = derive_secret(&self.seed, index)?;
		Ok(self.network.address_for_secret(secret.expose())?)
	}

	/// Address, balances, usage counters and nonces at `index`. Read-only.
	pub async fn address_at(&self, index: u32) -> Result<EphemeralAddress, EphemeralError> {
		let address = self.address_for(index)?;

		let token_balance = self.network.token_balance(&address).await?;
		let native_balance = self.network.native_balance(&address).await?;
		let usage = self.pool.ephemeral_usage(&address).await?;
		let native_nonce = self.network.transaction_count(&address).await?;
		let permit_nonce = if self.network.supports_permit() {
			Some(self.network.permit_nonce(&address).await?)
		} else {
			None
		};

		Ok(EphemeralAddress {
			index,
			address,
			token_balance,
			native_balance,
			in_tx_count: usage.in_tx_count,
			out_tx_count: usage.out_tx_count,
			nonces: EphemeralNonces {
				native: native_nonce,
				permit: permit_nonce,
			},
		})
	}

	/// First index with no pool-observed activity, scanning up from the cursor.
	///
	/// The scan is unbounded; see [`Self::first_unused_index_within`] for a capped variant.
	pub async fn first_unused_index(&self) -> Result<u32, EphemeralError> {
		match self.scan_unused(None).await? {
			Some(index) => Ok(index),
			None => Err(EphemeralError::IndexOverflow),
		}
	}

	/// Like [`Self::first_unused_index`] but checks at most `limit` indices.
	pub async fn first_unused_index_within(&self, limit: u32) -> Result<Option<u32>, EphemeralError> {
		self.scan_unused(Some(limit)).await
	}

	async fn scan_unused(&self, limit: Option<u32>) -> Result<Option<u32>, EphemeralError> {
		let start = self.cursor.load(Ordering::Acquire);
		let mut index = start;
		let mut checked = 0u32;

		loop {
			if limit.is_some_and(|limit| checked >= limit) {
				debug!("No unused ephemeral address in {} indices from {}", checked, start);
				return Ok(None);
			}

			let address = self.address_for(index)?;
			let usage = self.pool.ephemeral_usage(&address).await?;
			if !usage.is_used() {
				self.cursor.fetch_max(index, Ordering::AcqRel);
				if index != start {
					info!("Ephemeral cursor advanced from {} to {}", start, index);
				}
				return Ok(Some(index));
			}

			index = index.checked_add(1).ok_or(EphemeralError::IndexOverflow)?;
			checked += 1;
		}
	}

	/// The contiguous run of used addresses starting at index 0.
	pub async fn used_addresses(&self) -> Result<Vec<EphemeralAddress>, EphemeralError> {
		let mut used = Vec::new();
		let mut index = 0u32;
		loop {
			let address = self.address_at(index).await?;
			if !address.is_used() {
				break;
			}
			used.push(address);
			index = index.checked_add(1).ok_or(EphemeralError::IndexOverflow)?;
		}
		self.cursor.fetch_max(index, Ordering::AcqRel);
		Ok(used)
	}

	/// Export the secret key at `index`.
	pub fn private_key_at(&self, index: u32) -> Result<EphemeralSecret, EphemeralError> {
		derive_secret(&self.seed, index)
	}
}
