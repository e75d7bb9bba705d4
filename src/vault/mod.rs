//! Password-protected, per-identity storage for seed material.
//!
//! Storage and sealing are separate concerns: [`EncryptedVault`] is a plain string store keyed by
//! identity name and field, while [`cipher`] turns a secret plus a password into an opaque sealed
//! string that is safe to hand to that store.

/// Argon2id + AES-256-GCM sealing of secrets
pub mod cipher;
/// Vault storage backends
pub mod store;

pub use cipher::{open_secret, seal_secret};
pub use store::{EncryptedVault, FileVault, MemoryVault, SEED_FIELD};

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("Invalid identity name: {0:?}")]
	InvalidIdentity(String),

	#[error("Malformed sealed secret: {0}")]
	Malformed(String),

	#[error("Key derivation failed: {0}")]
	KeyDerivation(String),

	#[error("Encryption failed")]
	Encryption,

	#[error("Decryption failed")]
	Decryption,
}
