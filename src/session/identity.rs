use super::AuthError;
use crate::config::NetworkKind;

use bip39::{Language, Mnemonic};
use hkdf::Hkdf;
use rand::Rng;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Entropy for a 12-word phrase.
const GENERATED_ENTROPY_BYTES: usize = 16;

/// Where a new identity's seed phrase comes from.
pub enum MnemonicSource {
	Generate,
	Import(String),
}

impl MnemonicSource {
	pub(crate) fn into_mnemonic(self) -> Result<Mnemonic, AuthError> {
		match self {
			MnemonicSource::Generate => {
				let mut entropy = Zeroizing::new([0u8; GENERATED_ENTROPY_BYTES]);
				rand::rng().fill(&mut entropy[..]);
				Mnemonic::from_entropy(&entropy[..]).map_err(|_| AuthError::InvalidMnemonic)
			}
			MnemonicSource::Import(phrase) => {
				let phrase = Zeroizing::new(phrase);
				parse_mnemonic(&phrase).ok_or(AuthError::InvalidMnemonic)
			}
		}
	}
}

impl std::fmt::Debug for MnemonicSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			MnemonicSource::Generate => f.write_str("Generate"),
			MnemonicSource::Import(_) => f.write_str("Import(<redacted>)"),
		}
	}
}

/// English BIP-39 phrase with a valid checksum, or `None`.
pub(crate) fn parse_mnemonic(phrase: &str) -> Option<Mnemonic> {
	Mnemonic::parse_in_normalized(Language::English, phrase.trim()).ok()
}

/// Chain-specific spending key, derived on demand and never stored.
pub struct SpendingKey(Zeroizing<[u8; 32]>);

impl SpendingKey {
	pub fn expose(&self) -> &[u8; 32] {
		&self.0
	}
}

impl std::fmt::Debug for SpendingKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("SpendingKey(<redacted>)")
	}
}

/// An unlocked identity. Phrase and seed are wiped when it is dropped.
pub struct Identity {
	name: String,
	mnemonic: Zeroizing<String>,
	seed: Zeroizing<[u8; 64]>,
}

impl Identity {
	pub(crate) fn new(name: &str, mnemonic: &Mnemonic) -> Self {
		Self {
			name: name.to_string(),
			mnemonic: Zeroizing::new(mnemonic.to_string()),
			seed: Zeroizing::new(mnemonic.to_seed("")),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// The seed phrase. Only for explicit export.
	pub fn mnemonic(&self) -> &str {
		&self.mnemonic
	}

	pub(crate) fn seed(&self) -> &[u8] {
		&self.seed[..]
	}

	/// Spending key for `kind`, recomputed from the seed on every call.
	pub fn spending_key(&self, kind: NetworkKind) -> Result<SpendingKey, AuthError> {
		let info = format!("spending-key/{}", kind);
		let mut key = Zeroizing::new([0u8; 32]);
		Hkdf::<Sha256>::new(None, &self.seed[..])
			.expand(info.as_bytes(), &mut key[..])
			.map_err(|_| AuthError::KeyDerivation)?;
		Ok(SpendingKey(key))
	}
}

impl std::fmt::Debug for Identity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Identity")
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}
