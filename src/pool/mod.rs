//! Shielded pool collaborator contract.
//!
//! The pool client wraps everything this crate does not implement itself: state sync against the
//! relayer, fee quotes, proof generation and relayed submission. This module defines the trait the
//! host application implements and the value types that cross it.

/// The pool client trait
mod client;
/// Value types exchanged with the pool client
mod types;

pub use client::PoolClient;
pub use types::*;
