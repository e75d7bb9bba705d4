//! Transfer orchestrator: drives deposits, shielded transfers and withdrawals.
//!
//! The orchestrator borrows the session's bound network adapter and pool client for the length of
//! one call. It waits (bounded) for the pool to be ready, plans and prices the operation, submits
//! parts one at a time, and finally waits for every submitted job's transaction hash concurrently.
//!
//! Nothing is retried. A failure while submitting stops the remaining parts, but jobs that were
//! already accepted are still awaited and reported in the returned [`TransferOutcome`].

use crate::config::ReadinessConfig;
use crate::events::{EventDispatcher, SessionEvent};
use crate::network::{NetworkAdapter, TypedDataPayload};
use crate::planner::{FeeModelHint, TransactionPlanner};
use crate::pool::{FeeEstimate, JobId, PoolClient, TransactionPart, TransferRequest, TxKind};
use crate::transfer::{
    DepositMode, JobReport, JobStatus, OperationKind, TransferError, TransferOutcome,
    TransferProgress, TransferStage,
};

use futures::future::join_all;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Runs one operation at a time against a bound network and pool.
pub struct TransferOrchestrator<'a> {
    network: &'a dyn NetworkAdapter,
    pool: &'a dyn PoolClient,
    readiness: &'a ReadinessConfig,
    events: &'a EventDispatcher,
}

impl<'a> TransferOrchestrator<'a> {
    pub fn new(
        network: &'a dyn NetworkAdapter,
        pool: &'a dyn PoolClient,
        readiness: &'a ReadinessConfig,
        events: &'a EventDispatcher,
    ) -> Self {
        Self {
            network,
            pool,
            readiness,
            events,
        }
    }

    /// Deposit `amount` shielded units from the chain into the pool.
    ///
    /// # Arguments
    /// * `amount` - Amount to shield, in shielded units.
    /// * `mode` - How the deposit is authorized and funded.
    ///
    /// # Returns
    /// The outcome of the single deposit job, or an error if the deposit was rejected before
    /// anything was sent.
    pub async fn deposit(
        &self,
        amount: u128,
        mode: DepositMode,
    ) -> Result<TransferOutcome, TransferError> {
        let mut progress = TransferProgress::new(OperationKind::Deposit, self.events);
        let fee = match self.prepare_deposit(&mut progress, amount, mode).await {
            Ok(fee) => fee,
            Err(e) => return fail_early(&mut progress, e),
        };

        progress.advance(TransferStage::Submitting);
        progress.set_parts_total(1);

        let mut approval_tx = None;
        let mut report = JobReport {
            part: 0,
            amount,
            fee,
            job_id: None,
            status: JobStatus::NotSubmitted,
        };
        let mut failure = None;

        match self.submit_deposit(amount, fee, mode, &mut approval_tx).await {
            Ok(job_id) => {
                progress.record_submitted(0, &job_id);
                report.job_id = Some(job_id);
            }
            Err(source) => {
                let reason = TransferError::Submission { part: 0, source }.to_string();
                progress.record_failed(0, None, &reason);
                report.status = JobStatus::Failed {
                    reason: reason.clone(),
                };
                failure = Some(reason);
            }
        }

        Ok(self
            .await_hashes(progress, vec![report], approval_tx, failure)
            .await)
    }

    /// Send shielded value to one or more shielded addresses.
    pub async fn transfer_shielded(
        &self,
        requests: &[TransferRequest],
    ) -> Result<TransferOutcome, TransferError> {
        self.run_parts(OperationKind::Transfer, TxKind::Transfer, requests)
            .await
    }

    /// Withdraw `amount` shielded units to the native address `to`.
    pub async fn withdraw(&self, to: &str, amount: u128) -> Result<TransferOutcome, TransferError> {
        let requests = [TransferRequest::new(to, amount)];
        self.run_parts(OperationKind::Withdraw, TxKind::Withdraw, &requests)
            .await
    }

    /// Fee quote for sending `amounts` as `kind`, without syncing first.
    pub async fn estimate_fee(
        &self,
        kind: TxKind,
        amounts: &[u128],
    ) -> Result<FeeEstimate, TransferError> {
        Ok(self.pool.estimate_fee(amounts, kind, false).await?)
    }

    /// Largest amount, in shielded units, that a single operation of `kind` could move after fees.
    ///
    /// Transfers and withdrawals are bounded by the optimistic shielded balance, assuming every
    /// part pays the fee of a full-note transaction. Deposits are bounded by the holder's token
    /// balance.
    pub async fn max_transferable(&self, kind: TxKind) -> Result<u128, TransferError> {
        let model = self.pool.fee_model(kind).await?;
        let limits = self.pool.limits(kind).await?;

        let max = match kind {
            TxKind::Deposit | TxKind::BridgeDeposit => {
                let native = self.network.token_balance(&self.network.address()).await?;
                self.network
                    .from_base_unit(native)
                    .saturating_sub(model.part_fee(0, 1))
            }
            TxKind::Transfer | TxKind::Withdraw => {
                let balance = self.pool.optimistic_total_balance().await?;
                let cap = self.pool.max_transfer_per_tx(kind).await?;
                let part_fee = model.part_fee(limits.max_notes_per_tx, 1);
                if cap == 0 {
                    0
                } else {
                    let chunk = cap.saturating_add(part_fee);
                    let full_parts = balance / chunk;
                    let rest = balance % chunk;
                    full_parts
                        .saturating_mul(cap)
                        .saturating_add(rest.saturating_sub(part_fee))
                }
            }
        };

        Ok(match limits.aggregate_remaining {
            Some(remaining) => max.min(remaining),
            None => max,
        })
    }

    async fn run_parts(
        &self,
        operation: OperationKind,
        kind: TxKind,
        requests: &[TransferRequest],
    ) -> Result<TransferOutcome, TransferError> {
        if requests.is_empty() {
            return Err(TransferError::EmptyRequest);
        }

        let mut progress = TransferProgress::new(operation, self.events);
        let parts = match self.prepare_parts(&mut progress, kind, requests).await {
            Ok(parts) => parts,
            Err(e) => return fail_early(&mut progress, e),
        };

        progress.advance(TransferStage::Submitting);
        progress.set_parts_total(parts.len());

        let mut jobs = Vec::with_capacity(parts.len());
        let mut failure: Option<String> = None;

        // Strictly sequential: each part spends state left by the previous one
        for (index, part) in parts.iter().enumerate() {
            let mut report = JobReport {
                part: index,
                amount: part.output_total(),
                fee: part.fee,
                job_id: None,
                status: JobStatus::NotSubmitted,
            };

            if failure.is_none() {
                match self.submit_part(operation, part).await {
                    Ok(job_id) => {
                        debug!("Part {} of {} accepted as job {}", index, parts.len(), job_id);
                        progress.record_submitted(index, &job_id);
                        report.job_id = Some(job_id);
                    }
                    Err(source) => {
                        let reason = TransferError::Submission {
                            part: index,
                            source,
                        }
                        .to_string();
                        progress.record_failed(index, None, &reason);
                        report.status = JobStatus::Failed {
                            reason: reason.clone(),
                        };
                        failure = Some(reason);
                    }
                }
            }

            jobs.push(report);
        }

        Ok(self.await_hashes(progress, jobs, None, failure).await)
    }

    /// Readiness, address validation, planning and affordability for transfers and withdrawals.
    async fn prepare_parts(
        &self,
        progress: &mut TransferProgress<'_>,
        kind: TxKind,
        requests: &[TransferRequest],
    ) -> Result<Vec<TransactionPart>, TransferError> {
        self.wait_until_ready().await?;
        progress.advance(TransferStage::FeeEstimating);

        for request in requests {
            let valid = match progress.operation() {
                OperationKind::Withdraw => self.network.is_valid_address(&request.destination),
                _ => {
                    self.pool
                        .verify_address_checksum(&request.destination)
                        .await?
                }
            };
            if !valid {
                return Err(TransferError::InvalidAddress(request.destination.clone()));
            }
        }

        let parts = TransactionPlanner::new(self.pool)
            .plan(requests, FeeModelHint::for_kind(kind))
            .await?;
        if parts.is_empty() {
            return Err(self.empty_plan_error(kind, requests).await);
        }

        let amounts: Vec<u128> = requests.iter().map(|request| request.amount).collect();
        let estimate = self.pool.estimate_fee(&amounts, kind, false).await?;
        let required = parts.iter().fold(0u128, |acc, part| {
            acc.saturating_add(part.output_total())
                .saturating_add(part.fee)
        });
        let available = self.pool.optimistic_total_balance().await?;
        if estimate.insufficient_funds || required > available {
            return Err(TransferError::InsufficientFunds {
                required,
                available,
            });
        }

        info!(
            "{:?}: {} part(s), {} total including fees",
            progress.operation(),
            parts.len(),
            required
        );
        Ok(parts)
    }

    /// Readiness, limits and funding checks for a deposit. Returns the fee.
    async fn prepare_deposit(
        &self,
        progress: &mut TransferProgress<'_>,
        amount: u128,
        mode: DepositMode,
    ) -> Result<u128, TransferError> {
        self.wait_until_ready().await?;
        progress.advance(TransferStage::FeeEstimating);

        if mode == DepositMode::Permit && !self.network.supports_permit() {
            return Err(TransferError::Unsupported(format!(
                "permit deposits on {} networks",
                self.network.kind()
            )));
        }

        let minimum = self.pool.min_tx_amount().await?;
        if amount == 0 || amount < minimum {
            return Err(TransferError::AmountTooSmall { amount, minimum });
        }

        let estimate = self.pool.estimate_fee(&[amount], mode.tx_kind(), true).await?;
        let fee = estimate.total;

        // Ephemeral balances are validated by the pool
        if !matches!(mode, DepositMode::Ephemeral { .. }) {
            let required = self.network.to_base_unit(amount.saturating_add(fee))?;
            let available = self
                .network
                .token_balance(&self.network.address())
                .await?;
            if available < required {
                return Err(TransferError::InsufficientFunds {
                    required,
                    available,
                });
            }
        }

        debug!("Deposit of {} with fee {} via {:?}", amount, fee, mode);
        Ok(fee)
    }

    async fn submit_deposit(
        &self,
        amount: u128,
        fee: u128,
        mode: DepositMode,
        approval_tx: &mut Option<String>,
    ) -> Result<JobId, CollaboratorError> {
        match mode {
            DepositMode::Allowance => {
                let pool_address = &self.network.config().pool_address;
                let required = self.network.to_base_unit(amount.saturating_add(fee))?;
                let current = self.network.allowance(pool_address).await?;
                if current < required {
                    let tx_hash = self
                        .network
                        .increase_allowance(pool_address, required - current)
                        .await?;
                    self.events.dispatch(SessionEvent::ApprovalSubmitted {
                        tx_hash: tx_hash.clone(),
                    });
                    *approval_tx = Some(tx_hash);
                } else {
                    debug!(
                        "Allowance {} covers {}, skipping approval",
                        current, required
                    );
                }
                Ok(self.pool.submit_deposit(amount, fee).await?)
            }
            DepositMode::Permit => {
                let owner = self.network.address();
                let draft = self.pool.prepare_permit_deposit(amount, fee, &owner).await?;
                let nonce = self.network.permit_nonce(&owner).await?;
                let value = self.network.to_base_unit(amount.saturating_add(fee))?;
                let payload =
                    TypedDataPayload::permit(self.network.config(), &owner, value, nonce, &draft);
                let signature = self.network.sign_typed_data(&payload).await?;
                self.events
                    .dispatch(SessionEvent::PermitSigned { owner: owner.clone() });
                Ok(self.pool.submit_permit_deposit(&draft, &signature).await?)
            }
            DepositMode::Ephemeral { index } => Ok(self
                .pool
                .submit_ephemeral_deposit(amount, fee, index)
                .await?),
        }
    }

    async fn submit_part(
        &self,
        operation: OperationKind,
        part: &TransactionPart,
    ) -> Result<JobId, CollaboratorError> {
        let job_id = match operation {
            OperationKind::Withdraw => self.pool.submit_withdraw(part).await?,
            _ => self.pool.submit_transfer(part).await?,
        };
        Ok(job_id)
    }

    /// Wait for every submitted job concurrently and settle the outcome.
    async fn await_hashes(
        &self,
        mut progress: TransferProgress<'_>,
        mut jobs: Vec<JobReport>,
        approval_tx: Option<String>,
        mut failure: Option<String>,
    ) -> TransferOutcome {
        progress.advance(TransferStage::AwaitingHashes);

        let pool = self.pool;
        let waits = jobs
            .iter()
            .filter_map(|job| job.job_id.clone().map(|job_id| (job.part, job_id)))
            .map(move |(part, job_id)| async move {
                let result = pool.await_job_hash(&job_id).await;
                (part, job_id, result)
            });

        // join_all yields results in input order
        let results = join_all(waits).await;
        for (part, job_id, result) in results {
            let Some(report) = jobs.get_mut(part) else {
                continue;
            };
            match result {
                Ok(tx_hash) => {
                    progress.record_resolved(part, &job_id, &tx_hash);
                    report.status = JobStatus::Resolved {
                        tx_url: self.network.transaction_url(&tx_hash),
                        tx_hash,
                    };
                }
                Err(e) => {
                    let reason = format!("Job {} failed: {}", job_id, e);
                    progress.record_failed(part, Some(&job_id), &reason);
                    report.status = JobStatus::Failed {
                        reason: reason.clone(),
                    };
                    failure.get_or_insert(reason);
                }
            }
        }

        let all_resolved = jobs
            .iter()
            .all(|job| matches!(job.status, JobStatus::Resolved { .. }));
        match &failure {
            None if all_resolved => {
                progress.advance(TransferStage::Completed);
            }
            Some(reason) => progress.fail(reason),
            None => progress.fail("unresolved jobs"),
        }
        progress.log_summary();

        TransferOutcome {
            operation: progress.operation(),
            stage: progress.stage(),
            jobs,
            approval_tx,
            failure,
        }
    }

    /// Bounded polling of the pool's readiness predicate.
    async fn wait_until_ready(&self) -> Result<(), TransferError> {
        let started = Instant::now();
        let max_wait = self.readiness.max_wait();

        loop {
            if self.pool.is_ready_to_transact().await? {
                return Ok(());
            }

            let elapsed = started.elapsed();
            if elapsed >= max_wait {
                return Err(TransferError::ReadinessTimeout {
                    waited_ms: elapsed.as_millis() as u64,
                });
            }

            self.events.dispatch(SessionEvent::AwaitingReadiness {
                elapsed_ms: elapsed.as_millis() as u64,
            });
            sleep(self.readiness.poll_interval().min(max_wait - elapsed)).await;
        }
    }

    /// Why the planner could not produce any parts.
    async fn empty_plan_error(&self, kind: TxKind, requests: &[TransferRequest]) -> TransferError {
        let minimum = match self.pool.min_tx_amount().await {
            Ok(minimum) => minimum,
            Err(e) => return e.into(),
        };
        if let Some(request) = requests
            .iter()
            .find(|request| request.amount == 0 || request.amount < minimum)
        {
            return TransferError::AmountTooSmall {
                amount: request.amount,
                minimum,
            };
        }

        let required = requests
            .iter()
            .fold(0u128, |acc, request| acc.saturating_add(request.amount));
        match self.pool.limits(kind).await {
            Ok(limits) => {
                if let Some(remaining) = limits.aggregate_remaining.filter(|r| required > *r) {
                    return TransferError::LimitExceeded {
                        requested: required,
                        remaining,
                    };
                }
            }
            Err(e) => return e.into(),
        }
        match self.pool.optimistic_total_balance().await {
            Ok(available) => TransferError::InsufficientFunds {
                required,
                available,
            },
            Err(e) => e.into(),
        }
    }
}

fn fail_early<T>(
    progress: &mut TransferProgress<'_>,
    error: TransferError,
) -> Result<T, TransferError> {
    progress.fail(&error.to_string());
    progress.log_summary();
    Err(error)
}
