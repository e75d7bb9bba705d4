use std::sync::Arc;

use async_trait::async_trait;
use shielded_session::config::{NetworkConfig, SessionConfig};
use shielded_session::network::{ChainBackend, NetworkError};
use shielded_session::pool::{PoolClient, PoolError};
use shielded_session::session::{
	AuthError, CollaboratorFactory, MnemonicSource, SessionError, SessionManager, SpendingKey,
};
use shielded_session::vault::FileVault;
use tracing::{error, info, warn};

/// Chain and pool transports are supplied by the embedding application. The standalone binary
/// only manages identities, so binding a network reports the missing transport.
struct NoTransports;

#[async_trait]
impl CollaboratorFactory for NoTransports {
	async fn chain_backend(
		&self,
		config: &NetworkConfig,
		_key: &SpendingKey,
	) -> Result<Arc<dyn ChainBackend>, NetworkError> {
		Err(NetworkError::Unsupported(format!(
			"no chain transport for {}",
			config.name
		)))
	}

	async fn pool_client(
		&self,
		config: &NetworkConfig,
		_key: &SpendingKey,
	) -> Result<Arc<dyn PoolClient>, PoolError> {
		Err(PoolError::Unsupported(format!(
			"no pool transport for {}",
			config.name
		)))
	}
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting shielded session");

	let config = match std::env::var("SHIELDED_SESSION_CONFIG") {
		Ok(path) => match SessionConfig::load(&path).await {
			Ok(config) => config,
			Err(e) => {
				error!("Failed to load configuration from {}: {}", path, e);
				return;
			}
		},
		Err(_) => {
			warn!("SHIELDED_SESSION_CONFIG not set, using defaults with no networks");
			SessionConfig::default()
		}
	};

	let vault = match FileVault::open(config.vault.dir.clone()).await {
		Ok(vault) => Arc::new(vault),
		Err(e) => {
			error!("Failed to open vault at {:?}: {}", config.vault.dir, e);
			return;
		}
	};

	let mut session = match SessionManager::new(config, vault, Arc::new(NoTransports)) {
		Ok(session) => session,
		Err(e) => {
			error!("Failed to start session: {}", e);
			return;
		}
	};

	match session.identities().await {
		Ok(names) => info!("Vault holds {} identities: {:?}", names.len(), names),
		Err(e) => {
			error!("Failed to list identities: {}", e);
			return;
		}
	}

	let (Ok(name), Ok(password)) = (
		std::env::var("SHIELDED_IDENTITY"),
		std::env::var("SHIELDED_PASSWORD"),
	) else {
		info!("Set SHIELDED_IDENTITY and SHIELDED_PASSWORD to create or unlock an identity");
		return;
	};

	match session.unlock(&name, &password).await {
		Ok(identity) => info!("Identity {} unlocked", identity.name()),
		Err(SessionError::Auth(AuthError::UnknownIdentity(_))) => {
			let source = match std::env::var("SHIELDED_MNEMONIC") {
				Ok(phrase) => MnemonicSource::Import(phrase),
				Err(_) => MnemonicSource::Generate,
			};
			if let Err(e) = session.create(&name, source, &password).await {
				error!("Failed to create identity {}: {}", name, e);
				return;
			}
			if let Err(e) = session.unlock(&name, &password).await {
				error!("Failed to unlock new identity {}: {}", name, e);
				return;
			}
			info!("Identity {} created and unlocked", name);
		}
		Err(e) => {
			error!("Failed to unlock identity {}: {}", name, e);
			return;
		}
	}

	let kinds: Vec<_> = session
		.config()
		.networks
		.iter()
		.map(|network| network.network_kind)
		.collect();
	for kind in kinds {
		if let Err(e) = session.bind_network(kind).await {
			warn!("Network {} not bound: {}", kind, e);
		}
	}

	session.lock();
}
