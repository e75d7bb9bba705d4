//! Session and transaction orchestration for a shielded-token wallet.
//!
//! [`session::SessionManager`] owns the unlocked identity and the collaborators bound for one
//! network. Deposits, shielded transfers and withdrawals run through
//! [`transfer::TransferOrchestrator`], which splits requests into pool-sized parts with
//! [`planner::TransactionPlanner`] and reports progress on the session's event stream.

pub mod compliance;
pub mod config;
pub mod ephemeral;
pub mod events;
pub mod network;
pub mod planner;
pub mod pool;
pub mod session;
pub mod transfer;
pub mod utils;
pub mod vault;
