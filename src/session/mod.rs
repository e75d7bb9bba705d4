//! Session lifecycle: identities, unlock/lock and network binding.

mod identity;
mod manager;

pub use identity::{Identity, MnemonicSource, SpendingKey};
pub use manager::{Binding, CollaboratorFactory, SessionManager};

use crate::config::ConfigError;
use crate::network::NetworkError;
use crate::pool::PoolError;
use crate::utils::UnitError;
use crate::vault::VaultError;
use thiserror::Error;

/// Failures the user can recover from by re-entering a password or phrase.
#[derive(Debug, Error)]
pub enum AuthError {
	#[error("Incorrect password")]
	IncorrectPassword,

	#[error("Invalid mnemonic phrase")]
	InvalidMnemonic,

	#[error("Password must be at least {min} characters")]
	WeakPassword { min: usize },

	#[error("No identity named {0:?}")]
	UnknownIdentity(String),

	#[error("Identity {0:?} already exists")]
	IdentityExists(String),

	#[error("Key derivation failed")]
	KeyDerivation,
}

#[derive(Debug, Error)]
pub enum SessionError {
	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error("Authentication error: {0}")]
	Auth(#[from] AuthError),

	#[error("Vault error: {0}")]
	Vault(#[from] VaultError),

	#[error("Network error: {0}")]
	Network(#[from] NetworkError),

	#[error("Pool error: {0}")]
	Pool(#[from] PoolError),

	#[error("Unit conversion error: {0}")]
	Units(#[from] UnitError),

	#[error("No identity is unlocked")]
	Locked,

	#[error("No network is bound")]
	NotBound,
}
