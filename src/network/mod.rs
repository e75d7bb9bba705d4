//! Chain-kind capability layer.
//!
//! [`NetworkAdapter`] is the only view the rest of the crate has of the base chain. The session
//! picks one variant per bind from the configured [`NetworkKind`](crate::config::NetworkKind);
//! nothing downstream branches on the chain kind again.

mod adapter;
mod evm;
mod substrate;
mod types;

pub use adapter::{ChainBackend, NetworkAdapter};
pub use evm::EvmNetwork;
pub use substrate::SubstrateNetwork;
pub use types::{NetworkError, PermitDomain, PermitMessage, TypedDataPayload};

use crate::config::{NetworkConfig, NetworkKind};
use crate::utils::UnitConverter;
use std::sync::Arc;

/// Build the adapter variant for `config.network_kind` over `backend`.
pub fn adapter_for(
	config: &NetworkConfig,
	backend: Arc<dyn ChainBackend>,
) -> Result<Arc<dyn NetworkAdapter>, NetworkError> {
	let units = UnitConverter::new(config.native_decimals(), config.shielded_decimals)?;
	let adapter: Arc<dyn NetworkAdapter> = match config.network_kind {
		NetworkKind::Evm => Arc::new(EvmNetwork::new(config.clone(), units, backend)),
		NetworkKind::Substrate => Arc::new(SubstrateNetwork::new(config.clone(), units, backend)),
	};
	Ok(adapter)
}
