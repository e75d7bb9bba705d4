//! Transaction-part planning.
//!
//! Splits one or more destination amounts into the ordered sequence of pool transactions needed
//! to move them under the pool's per-transaction cap, output count and aggregate limits. Each part
//! carries its own fee and the notes it will consume.
//!
//! Planning is structural only. Whether the account can afford the outputs plus fees is checked by
//! the caller before anything is submitted; an empty plan means the request cannot be performed.

use crate::pool::{FeeModel, PoolClient, PoolError, PoolLimits, TransactionPart, TransferRequest, TxKind};
use tracing::debug;

/// Selects the fee model used for planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeModelHint {
	pub kind: TxKind,
	/// Use this model instead of asking the pool.
	pub fee_model: Option<FeeModel>,
}

impl FeeModelHint {
	pub fn for_kind(kind: TxKind) -> Self {
		Self {
			kind,
			fee_model: None,
		}
	}

	pub fn with_model(kind: TxKind, fee_model: FeeModel) -> Self {
		Self {
			kind,
			fee_model: Some(fee_model),
		}
	}
}

/// Pool state a plan is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanningContext {
	/// Largest output total of a single part.
	pub max_per_tx: u128,
	pub min_amount: u128,
	pub limits: PoolLimits,
	/// Balance held in the account, spendable by the first part.
	pub account_balance: u128,
	/// Spendable note balances in spending order.
	pub notes: Vec<u128>,
	pub fee_model: FeeModel,
}

pub struct TransactionPlanner<'a> {
	pool: &'a dyn PoolClient,
}

impl<'a> TransactionPlanner<'a> {
	pub fn new(pool: &'a dyn PoolClient) -> Self {
		Self { pool }
	}

	/// Gather everything [`plan_with`] needs from the pool.
	pub async fn context(&self, hint: FeeModelHint) -> Result<PlanningContext, PoolError> {
		let (max_per_tx, min_amount, limits, notes, balances) = futures::try_join!(
			self.pool.max_transfer_per_tx(hint.kind),
			self.pool.min_tx_amount(),
			self.pool.limits(hint.kind),
			self.pool.spendable_notes(),
			self.pool.balances(),
		)?;
		let fee_model = match hint.fee_model {
			Some(model) => model,
			None => self.pool.fee_model(hint.kind).await?,
		};

		Ok(PlanningContext {
			max_per_tx,
			min_amount,
			limits,
			account_balance: balances.account,
			notes,
			fee_model,
		})
	}

	/// Plan `requests` against the pool's current state.
	pub async fn plan(
		&self,
		requests: &[TransferRequest],
		hint: FeeModelHint,
	) -> Result<Vec<TransactionPart>, PoolError> {
		if requests.is_empty() {
			return Ok(Vec::new());
		}
		let context = self.context(hint).await?;
		let parts = plan_with(&context, requests);
		debug!(
			"Planned {} part(s) for {} request(s) of kind {:?}",
			parts.len(),
			requests.len(),
			hint.kind
		);
		Ok(parts)
	}
}

/// Pure planning step over a fixed [`PlanningContext`].
///
/// Returns an empty plan when `requests` is empty, when any amount is zero or below the pool
/// minimum, when nothing can be spent per transaction, or when the total exceeds the remaining
/// aggregate limit.
pub fn plan_with(context: &PlanningContext, requests: &[TransferRequest]) -> Vec<TransactionPart> {
	let cap = context.max_per_tx;
	if requests.is_empty() || cap == 0 {
		return Vec::new();
	}
	if requests
		.iter()
		.any(|request| request.amount == 0 || request.amount < context.min_amount)
	{
		return Vec::new();
	}
	let Some(total) = requests
		.iter()
		.try_fold(0u128, |acc, request| acc.checked_add(request.amount))
	else {
		return Vec::new();
	};
	if context
		.limits
		.aggregate_remaining
		.is_some_and(|remaining| total > remaining)
	{
		return Vec::new();
	}

	let groups = pack_outputs(requests, cap, context.limits.max_outputs_per_tx.max(1));
	attach_inputs(context, groups)
}

/// Next-fit packing in request order. Only the open group is considered.
fn pack_outputs(
	requests: &[TransferRequest],
	cap: u128,
	max_outputs: usize,
) -> Vec<Vec<TransferRequest>> {
	let mut groups = Vec::new();
	let mut current: Vec<TransferRequest> = Vec::new();
	let mut current_total = 0u128;

	for request in requests {
		if request.amount <= cap {
			if current_total + request.amount > cap || current.len() == max_outputs {
				groups.push(std::mem::take(&mut current));
				current_total = 0;
			}
			current_total += request.amount;
			current.push(request.clone());
			continue;
		}

		// Larger than a single transaction: full-cap chunks, remainder stays open
		if !current.is_empty() {
			groups.push(std::mem::take(&mut current));
		}
		let mut remaining = request.amount;
		while remaining > cap {
			groups.push(vec![TransferRequest::new(request.destination.clone(), cap)]);
			remaining -= cap;
		}
		current_total = remaining;
		current.push(TransferRequest::new(request.destination.clone(), remaining));
	}

	if !current.is_empty() {
		groups.push(current);
	}
	groups
}

fn attach_inputs(context: &PlanningContext, groups: Vec<Vec<TransferRequest>>) -> Vec<TransactionPart> {
	let mut notes = context.notes.iter().copied();
	let mut pending_note = notes.next();
	let mut carried = context.account_balance;
	let mut limit = context.limits.aggregate_remaining.unwrap_or(u128::MAX);

	groups
		.into_iter()
		.map(|outputs| {
			let output_total: u128 = outputs.iter().map(|output| output.amount).sum();
			let mut input_note_count = 0usize;
			let mut input_notes_balance = 0u128;

			let fee = loop {
				let fee = context.fee_model.part_fee(input_note_count, outputs.len());
				let needed = output_total.saturating_add(fee);
				let available = carried.saturating_add(input_notes_balance);
				if available >= needed || input_note_count >= context.limits.max_notes_per_tx {
					break fee;
				}
				match pending_note {
					Some(note) => {
						input_notes_balance = input_notes_balance.saturating_add(note);
						input_note_count += 1;
						pending_note = notes.next();
					}
					None => break fee,
				}
			};

			carried = carried
				.saturating_add(input_notes_balance)
				.saturating_sub(output_total.saturating_add(fee));

			let account_limit = limit;
			if limit != u128::MAX {
				limit = limit.saturating_sub(output_total);
			}

			TransactionPart {
				input_notes_balance,
				input_note_count,
				outputs,
				fee,
				account_limit,
			}
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn context(cap: u128) -> PlanningContext {
		PlanningContext {
			max_per_tx: cap,
			min_amount: 10,
			limits: PoolLimits::default(),
			account_balance: 0,
			notes: Vec::new(),
			fee_model: FeeModel {
				base_per_tx: 5,
				per_input_note: 0,
				per_output: 0,
				l1_per_tx: 0,
			},
		}
	}

	fn request(amount: u128) -> TransferRequest {
		TransferRequest::new("dest", amount)
	}

	fn output_amounts(parts: &[TransactionPart]) -> Vec<Vec<u128>> {
		parts
			.iter()
			.map(|part| part.outputs.iter().map(|output| output.amount).collect())
			.collect()
	}

	#[test]
	fn empty_request_plans_nothing() {
		assert!(plan_with(&context(1000), &[]).is_empty());
	}

	#[test]
	fn below_minimum_plans_nothing() {
		assert!(plan_with(&context(1000), &[request(9)]).is_empty());
		assert!(plan_with(&context(1000), &[request(50), request(0)]).is_empty());
	}

	#[test]
	fn nothing_spendable_plans_nothing() {
		assert!(plan_with(&context(0), &[request(50)]).is_empty());
	}

	#[test]
	fn aggregate_limit_is_respected() {
		let mut ctx = context(1000);
		ctx.limits.aggregate_remaining = Some(100);
		assert!(plan_with(&ctx, &[request(101)]).is_empty());

		let parts = plan_with(&ctx, &[request(60), request(40)]);
		assert_eq!(parts.len(), 1);
		assert_eq!(parts[0].account_limit, 100);
	}

	#[test]
	fn single_part_under_cap() {
		let parts = plan_with(&context(1000), &[request(50)]);
		assert_eq!(output_amounts(&parts), vec![vec![50]]);
		assert_eq!(parts[0].fee, 5);
		assert_eq!(parts[0].account_limit, u128::MAX);
	}

	#[test]
	fn oversized_amount_splits_into_cap_chunks() {
		let parts = plan_with(&context(1000), &[request(2500)]);
		assert_eq!(output_amounts(&parts), vec![vec![1000], vec![1000], vec![500]]);
		assert!(parts.iter().all(|part| part.fee == 5));
	}

	#[test]
	fn destinations_stay_whole_when_they_fit() {
		let parts = plan_with(&context(1000), &[request(600), request(300), request(300)]);
		assert_eq!(output_amounts(&parts), vec![vec![600, 300], vec![300]]);
	}

	#[test]
	fn split_remainder_shares_a_part() {
		let parts = plan_with(&context(1000), &[request(1200), request(700)]);
		assert_eq!(output_amounts(&parts), vec![vec![1000], vec![200, 700]]);
	}

	#[test]
	fn output_count_is_capped() {
		let mut ctx = context(1000);
		ctx.limits.max_outputs_per_tx = 2;
		let parts = plan_with(&ctx, &[request(10), request(10), request(10)]);
		assert_eq!(output_amounts(&parts), vec![vec![10, 10], vec![10]]);
	}

	#[test]
	fn notes_are_attached_until_covered() {
		let mut ctx = context(1000);
		ctx.fee_model.per_input_note = 1;
		ctx.account_balance = 20;
		ctx.notes = vec![30, 30, 30, 30];
		ctx.limits.max_notes_per_tx = 3;

		// needs 50 + 5 + 1 per note; account covers 20
		let parts = plan_with(&ctx, &[request(50)]);
		assert_eq!(parts[0].input_note_count, 2);
		assert_eq!(parts[0].input_notes_balance, 60);
		assert_eq!(parts[0].fee, 7);
	}

	#[test]
	fn affordability_is_not_checked() {
		let mut ctx = context(1000);
		ctx.notes = vec![1];
		let parts = plan_with(&ctx, &[request(500)]);
		assert_eq!(parts.len(), 1);
		assert_eq!(parts[0].input_notes_balance, 1);
	}

	proptest! {
		#[test]
		fn splitting_preserves_the_total(
			amounts in prop::collection::vec(1u128..5_000, 1..20),
			cap in 1u128..3_000,
			max_outputs in 1usize..5,
		) {
			let mut ctx = context(cap);
			ctx.min_amount = 1;
			ctx.limits.max_outputs_per_tx = max_outputs;
			let requests: Vec<_> = amounts.iter().map(|amount| request(*amount)).collect();

			let parts = plan_with(&ctx, &requests);
			let planned: u128 = parts.iter().map(TransactionPart::output_total).sum();

			prop_assert_eq!(planned, amounts.iter().sum::<u128>());
			for part in &parts {
				prop_assert!(part.output_total() <= cap);
				prop_assert!(!part.outputs.is_empty());
				prop_assert!(part.outputs.len() <= max_outputs);
				prop_assert!(part.outputs.iter().all(|output| output.amount > 0));
			}
		}
	}
}
