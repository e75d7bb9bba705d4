//! Sealing of secrets at rest.
//!
//! A sealed secret is a small JSON envelope carrying everything needed to open it again except
//! the password: the Argon2id cost parameters, a random salt, the AES-GCM nonce and the
//! ciphertext with its authentication tag.

use crate::config::KdfParams;
use crate::utils::serialization::hex_bytes;
use crate::vault::VaultError;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Envelope format version.
const VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Serialize, Deserialize)]
struct SealedEnvelope {
	version: u8,
	kdf: KdfParams,
	#[serde(with = "hex_bytes")]
	salt: Vec<u8>,
	#[serde(with = "hex_bytes")]
	nonce: Vec<u8>,
	#[serde(with = "hex_bytes")]
	ciphertext: Vec<u8>,
}

fn derive_key(
	password: &str,
	salt: &[u8],
	kdf: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>, VaultError> {
	let params = Params::new(
		kdf.memory_kib,
		kdf.iterations,
		kdf.parallelism,
		Some(KEY_LEN),
	)
	.map_err(|e| VaultError::KeyDerivation(e.to_string()))?;

	let mut key = Zeroizing::new([0u8; KEY_LEN]);
	Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
		.hash_password_into(password.as_bytes(), salt, &mut key[..])
		.map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
	Ok(key)
}

/// Encrypts `plaintext` under `password`, returning the sealed envelope as a string.
pub fn seal_secret(plaintext: &[u8], password: &str, kdf: &KdfParams) -> Result<String, VaultError> {
	let mut salt = [0u8; SALT_LEN];
	let mut nonce = [0u8; NONCE_LEN];
	rand::rng().fill(&mut salt);
	rand::rng().fill(&mut nonce);

	let key = derive_key(password, &salt, kdf)?;
	let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| VaultError::Encryption)?;
	let ciphertext = cipher
		.encrypt(Nonce::from_slice(&nonce), plaintext)
		.map_err(|_| VaultError::Encryption)?;

	let envelope = SealedEnvelope {
		version: VERSION,
		kdf: *kdf,
		salt: salt.to_vec(),
		nonce: nonce.to_vec(),
		ciphertext,
	};
	Ok(serde_json::to_string(&envelope)?)
}

/// Opens a sealed envelope produced by [`seal_secret`].
///
/// A wrong password surfaces as [`VaultError::Decryption`]; callers must still validate the
/// plaintext, since a successful open only proves the envelope was sealed under this password.
pub fn open_secret(sealed: &str, password: &str) -> Result<Zeroizing<Vec<u8>>, VaultError> {
	let envelope: SealedEnvelope =
		serde_json::from_str(sealed).map_err(|e| VaultError::Malformed(e.to_string()))?;

	if envelope.version != VERSION {
		return Err(VaultError::Malformed(format!(
			"unsupported version {}",
			envelope.version
		)));
	}
	if envelope.salt.len() != SALT_LEN || envelope.nonce.len() != NONCE_LEN {
		return Err(VaultError::Malformed(
			"unexpected salt or nonce length".to_string(),
		));
	}

	let key = derive_key(password, &envelope.salt, &envelope.kdf)?;
	let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| VaultError::Decryption)?;
	let plaintext = cipher
		.decrypt(
			Nonce::from_slice(&envelope.nonce),
			envelope.ciphertext.as_slice(),
		)
		.map_err(|_| VaultError::Decryption)?;

	Ok(Zeroizing::new(plaintext))
}
