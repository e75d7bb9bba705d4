use super::types::*;
use crate::pool::{HistoryRecord, HistoryState, HistoryType, PoolClient, TxComplianceDetails};

use chrono::Utc;
use tracing::{info, warn};

/// Correlates history with decrypted state and key material.
pub struct ComplianceReportBuilder<'a> {
	pool: &'a dyn PoolClient,
	exporter: Exporter,
}

impl<'a> ComplianceReportBuilder<'a> {
	pub fn new(pool: &'a dyn PoolClient, exporter: Exporter) -> Self {
		Self { pool, exporter }
	}

	/// Build a report for records with timestamps in `[from_ms, to_ms]`.
	///
	/// Only a failure to fetch history aborts the report. Anything missing for an individual
	/// record is recorded as an [`IntegrityIssue`] on that record.
	pub async fn build(
		&self,
		from_ms: Option<i64>,
		to_ms: Option<i64>,
	) -> Result<ComplianceReport, ComplianceError> {
		let window = ReportWindow::new(from_ms, to_ms)?;
		let history = self.pool.raw_history(true).await?;

		let mut records = Vec::new();
		for record in history
			.into_iter()
			.filter(|record| window.contains(record.timestamp_ms))
		{
			records.push(self.assemble(record).await);
		}

		let flagged_count = records.iter().filter(|record| record.is_flagged()).count();
		if flagged_count > 0 {
			warn!(
				"{} of {} compliance records flagged",
				flagged_count,
				records.len()
			);
		}

		let (tree_root, tree_index) = match self.pool.tree_state(None).await {
			Ok(tree) => (Some(tree.root), Some(tree.index)),
			Err(e) => {
				warn!("Tree state unavailable for report metadata: {}", e);
				(None, None)
			}
		};

		info!(
			"Built compliance report for {} with {} records",
			self.exporter.identity,
			records.len()
		);

		Ok(ComplianceReport {
			metadata: ReportMetadata {
				exporter: self.exporter.clone(),
				exported_at: Utc::now(),
				window,
				record_count: records.len(),
				flagged_count,
				tree_root,
				tree_index,
			},
			records,
		})
	}

	async fn assemble(&self, record: HistoryRecord) -> ComplianceRecord {
		let kind = record.kind;
		let tx_index = record.tx_index;
		let mut out = ComplianceRecord::bare(record);

		if out.record.state != HistoryState::Done {
			return out;
		}

		// Incoming and direct deposits did not spend this account's state
		let with_account = !matches!(kind, HistoryType::TransferIn | HistoryType::DirectDeposit);
		// Direct deposits carry no encrypted note payload
		let with_notes = kind != HistoryType::DirectDeposit;
		if !with_account && !with_notes {
			return out;
		}

		let Some(tx_index) = tx_index else {
			out.issues.push(IntegrityIssue::MissingTxIndex);
			return out;
		};
		let details = match self.pool.compliance_details(tx_index).await {
			Ok(Some(details)) => details,
			Ok(None) => {
				out.issues.push(IntegrityIssue::MissingDetails { tx_index });
				return out;
			}
			Err(e) => {
				out.issues.push(IntegrityIssue::DetailsUnavailable {
					tx_index,
					reason: e.to_string(),
				});
				return out;
			}
		};

		if with_account {
			attach_account(&mut out, &details, tx_index);
		}
		if with_notes {
			attach_notes(&mut out, &details);
		}
		out
	}
}

/// Ciphertext chunk and key for `tree_index`, flagging whichever is missing.
fn key_material(
	details: &TxComplianceDetails,
	tree_index: u64,
	issues: &mut Vec<IntegrityIssue>,
) -> Option<(Vec<u8>, Vec<u8>)> {
	let chunk = details
		.chunks
		.iter()
		.find(|chunk| chunk.tree_index == tree_index);
	let key = details
		.ecdh_keys
		.iter()
		.find(|key| key.tree_index == tree_index);

	if chunk.is_none() {
		issues.push(IntegrityIssue::MissingCiphertext { tree_index });
	}
	if key.is_none() {
		issues.push(IntegrityIssue::MissingEcdhKey { tree_index });
	}
	Some((chunk?.data.clone(), key?.key.clone()))
}

fn attach_account(out: &mut ComplianceRecord, details: &TxComplianceDetails, tx_index: u64) {
	match &details.nullifier {
		Some(nullifier) => out.nullifier = Some(nullifier.clone()),
		None => out.issues.push(IntegrityIssue::MissingNullifier { tx_index }),
	}
	out.next_nullifier = details.next_nullifier.clone();

	match &details.account {
		Some(indexed) => {
			if let Some((ciphertext, ecdh_key)) =
				key_material(details, indexed.tree_index, &mut out.issues)
			{
				out.account = Some(DecryptedAccount {
					tree_index: indexed.tree_index,
					account: indexed.account.clone(),
					ciphertext,
					ecdh_key,
				});
			}
		}
		None => out.issues.push(IntegrityIssue::MissingAccount { tx_index }),
	}

	out.input_account = details.input_account.clone();
	out.input_notes = details.input_notes.clone();
}

fn attach_notes(out: &mut ComplianceRecord, details: &TxComplianceDetails) {
	for indexed in &details.notes {
		if let Some((ciphertext, ecdh_key)) =
			key_material(details, indexed.tree_index, &mut out.issues)
		{
			out.notes.push(DecryptedNote {
				tree_index: indexed.tree_index,
				note: indexed.note.clone(),
				ciphertext,
				ecdh_key,
			});
		}
	}
}
