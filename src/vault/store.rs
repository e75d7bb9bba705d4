use crate::vault::VaultError;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Field under which an identity's sealed seed phrase is stored.
pub const SEED_FIELD: &str = "seed";

const IDENTITY_FILE_PREFIX: &str = "identity_";
const IDENTITY_FILE_SUFFIX: &str = ".json";

/// String store keyed by identity name and field.
///
/// Values are stored as given; sealing happens before `set`. Writes replace the whole value
/// (last writer wins).
#[async_trait::async_trait]
pub trait EncryptedVault: Send + Sync {
	async fn get(&self, identity: &str, field: &str) -> Result<Option<String>, VaultError>;
	async fn set(&self, identity: &str, field: &str, value: &str) -> Result<(), VaultError>;
	/// Names of every identity holding at least one field, sorted.
	async fn identities(&self) -> Result<Vec<String>, VaultError>;
}

fn validate_identity(identity: &str) -> Result<(), VaultError> {
	let valid = !identity.is_empty()
		&& identity.len() <= 64
		&& identity
			.bytes()
			.all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
	if valid {
		Ok(())
	} else {
		Err(VaultError::InvalidIdentity(identity.to_string()))
	}
}

/// File-based vault: one JSON object of fields per identity.
pub struct FileVault {
	data_dir: PathBuf,
}

impl FileVault {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	/// Creates the vault directory if needed.
	pub async fn open(data_dir: PathBuf) -> Result<Self, VaultError> {
		tokio::fs::create_dir_all(&data_dir).await?;
		Ok(Self::new(data_dir))
	}

	fn get_identity_filename(&self, identity: &str) -> PathBuf {
		self.data_dir.join(format!(
			"{}{}{}",
			IDENTITY_FILE_PREFIX, identity, IDENTITY_FILE_SUFFIX
		))
	}

	async fn load_fields(&self, identity: &str) -> Result<BTreeMap<String, String>, VaultError> {
		let filename = self.get_identity_filename(identity);
		match tokio::fs::read_to_string(&filename).await {
			Ok(content) => Ok(serde_json::from_str(&content)?),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
			Err(e) => Err(e.into()),
		}
	}
}

#[async_trait::async_trait]
impl EncryptedVault for FileVault {
	async fn get(&self, identity: &str, field: &str) -> Result<Option<String>, VaultError> {
		validate_identity(identity)?;
		let mut fields = self.load_fields(identity).await?;
		Ok(fields.remove(field))
	}

	async fn set(&self, identity: &str, field: &str, value: &str) -> Result<(), VaultError> {
		validate_identity(identity)?;
		let mut fields = self.load_fields(identity).await?;
		fields.insert(field.to_string(), value.to_string());

		let filename = self.get_identity_filename(identity);
		let staging = filename.with_extension("json.tmp");
		tokio::fs::write(&staging, serde_json::to_string_pretty(&fields)?).await?;
		tokio::fs::rename(&staging, &filename).await?;

		info!("Stored field {:?} for identity {:?}", field, identity);
		Ok(())
	}

	async fn identities(&self) -> Result<Vec<String>, VaultError> {
		let mut entries = match tokio::fs::read_dir(&self.data_dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(e.into()),
		};

		let mut names = Vec::new();
		while let Some(entry) = entries.next_entry().await? {
			let path = entry.path();
			if let Some(name) = path
				.file_name()
				.and_then(|f| f.to_str())
				.and_then(|f| f.strip_prefix(IDENTITY_FILE_PREFIX))
				.and_then(|f| f.strip_suffix(IDENTITY_FILE_SUFFIX))
			{
				if validate_identity(name).is_ok() {
					names.push(name.to_string());
				} else {
					debug!("Ignoring unexpected vault file {:?}", path);
				}
			}
		}

		names.sort();
		Ok(names)
	}
}

/// In-process vault, lost when dropped.
#[derive(Default)]
pub struct MemoryVault {
	entries: RwLock<HashMap<String, BTreeMap<String, String>>>,
}

impl MemoryVault {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait::async_trait]
impl EncryptedVault for MemoryVault {
	async fn get(&self, identity: &str, field: &str) -> Result<Option<String>, VaultError> {
		validate_identity(identity)?;
		let entries = self.entries.read().await;
		Ok(entries
			.get(identity)
			.and_then(|fields| fields.get(field))
			.cloned())
	}

	async fn set(&self, identity: &str, field: &str, value: &str) -> Result<(), VaultError> {
		validate_identity(identity)?;
		self.entries
			.write()
			.await
			.entry(identity.to_string())
			.or_default()
			.insert(field.to_string(), value.to_string());
		Ok(())
	}

	async fn identities(&self) -> Result<Vec<String>, VaultError> {
		let mut names: Vec<String> = self.entries.read().await.keys().cloned().collect();
		names.sort();
		Ok(names)
	}
}
