use crate::pool::{AccountState, HistoryRecord, IndexedAccount, IndexedNote, NoteState, PoolError};
use crate::utils::serialization::{hex_bytes, option_biguint_string};

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ComplianceError {
	#[error("Failed to fetch history: {0}")]
	History(#[from] PoolError),

	#[error("Invalid window: from {from_ms} is after to {to_ms}")]
	InvalidWindow { from_ms: i64, to_ms: i64 },

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),
}

/// A problem found while assembling one record. The record is flagged, the report continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue")]
pub enum IntegrityIssue {
	/// A finalized record has no tree index to look its state up by
	MissingTxIndex,
	/// The pool client has no decrypted state for the transaction
	MissingDetails { tx_index: u64 },
	/// The pool client failed to return decrypted state
	DetailsUnavailable { tx_index: u64, reason: String },
	MissingNullifier { tx_index: u64 },
	MissingAccount { tx_index: u64 },
	MissingCiphertext { tree_index: u64 },
	MissingEcdhKey { tree_index: u64 },
}

/// Who produced a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exporter {
	pub identity: String,
	pub network: String,
	pub pool_address: String,
}

/// Inclusive time window in Unix milliseconds. A missing bound is open on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportWindow {
	pub from_ms: Option<i64>,
	pub to_ms: Option<i64>,
}

impl ReportWindow {
	pub fn new(from_ms: Option<i64>, to_ms: Option<i64>) -> Result<Self, ComplianceError> {
		if let (Some(from_ms), Some(to_ms)) = (from_ms, to_ms) {
			if from_ms > to_ms {
				return Err(ComplianceError::InvalidWindow { from_ms, to_ms });
			}
		}
		Ok(Self { from_ms, to_ms })
	}

	pub fn contains(&self, timestamp_ms: i64) -> bool {
		self.from_ms.is_none_or(|from| timestamp_ms >= from)
			&& self.to_ms.is_none_or(|to| timestamp_ms <= to)
	}
}

/// Decrypted account with the memo ciphertext and key it was decrypted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecryptedAccount {
	pub tree_index: u64,
	pub account: AccountState,
	#[serde(with = "hex_bytes")]
	pub ciphertext: Vec<u8>,
	#[serde(with = "hex_bytes")]
	pub ecdh_key: Vec<u8>,
}

/// Decrypted note with the memo ciphertext and key it was decrypted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecryptedNote {
	pub tree_index: u64,
	pub note: NoteState,
	#[serde(with = "hex_bytes")]
	pub ciphertext: Vec<u8>,
	#[serde(with = "hex_bytes")]
	pub ecdh_key: Vec<u8>,
}

/// A history record with everything needed to audit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceRecord {
	#[serde(flatten)]
	pub record: HistoryRecord,
	#[serde(with = "option_biguint_string", skip_serializing_if = "Option::is_none")]
	pub nullifier: Option<BigUint>,
	#[serde(with = "option_biguint_string", skip_serializing_if = "Option::is_none")]
	pub next_nullifier: Option<BigUint>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub account: Option<DecryptedAccount>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub notes: Vec<DecryptedNote>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub input_account: Option<IndexedAccount>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub input_notes: Vec<IndexedNote>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub issues: Vec<IntegrityIssue>,
}

impl ComplianceRecord {
	/// The record alone, with nothing attached yet.
	pub fn bare(record: HistoryRecord) -> Self {
		Self {
			record,
			nullifier: None,
			next_nullifier: None,
			account: None,
			notes: Vec::new(),
			input_account: None,
			input_notes: Vec::new(),
			issues: Vec::new(),
		}
	}

	pub fn is_flagged(&self) -> bool {
		!self.issues.is_empty()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportMetadata {
	pub exporter: Exporter,
	pub exported_at: DateTime<Utc>,
	pub window: ReportWindow,
	pub record_count: usize,
	pub flagged_count: usize,
	/// Merkle root at export time, when the pool could provide it
	#[serde(with = "option_biguint_string")]
	pub tree_root: Option<BigUint>,
	pub tree_index: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceReport {
	pub metadata: ReportMetadata,
	pub records: Vec<ComplianceRecord>,
}

impl ComplianceReport {
	pub fn flagged(&self) -> impl Iterator<Item = &ComplianceRecord> {
		self.records.iter().filter(|record| record.is_flagged())
	}

	pub fn to_json_pretty(&self) -> Result<String, ComplianceError> {
		Ok(serde_json::to_string_pretty(self)?)
	}

	/// Write the report as pretty JSON to `path`.
	pub async fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ComplianceError> {
		let content = self.to_json_pretty()?;
		tokio::fs::write(path.as_ref(), content).await?;
		info!(
			"Wrote compliance report with {} records to {:?}",
			self.records.len(),
			path.as_ref()
		);
		Ok(())
	}
}
