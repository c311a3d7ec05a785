//! Execution Submitter: dry-run, sign and send `executePolicy`, then wait for
//! settlement.
//!
//! ```text
//! simulate ──fail──▶ SubmissionFailed
//!    │
//! send ─────fail──▶ SubmissionFailed
//!    │
//! poll receipt ──deadline──▶ SubmissionFailed
//!    │
//! Settled(receipt)   receipt.success distinguishes executed from reverted
//! ```

use alloy_primitives::{TxHash, U256};
use tokio::time::Instant;

use crate::config::LoopSettings;
use crate::error::{Result, SentinelError, SubmitStage};
use crate::ledger::LedgerWriter;
use crate::types::{format_amount, Receipt};

#[derive(Debug)]
pub enum ExecutionOutcome {
    /// Included on the ledger. Check `receipt.success`: `false` means the
    /// ledger's own logic reverted it.
    Settled(Receipt),
    /// Never accepted, or settlement could not be confirmed in time.
    SubmissionFailed(SentinelError),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Settled(r) if r.success)
    }
}

pub struct Submitter<'a, L: ?Sized> {
    ledger: &'a L,
    settings: &'a LoopSettings,
}

impl<'a, L> Submitter<'a, L>
where
    L: LedgerWriter + ?Sized,
{
    pub fn new(ledger: &'a L, settings: &'a LoopSettings) -> Self {
        Self { ledger, settings }
    }

    /// Execute policy `id`. `total` is only used for logging.
    pub async fn execute(&self, id: u64, total: U256) -> ExecutionOutcome {
        let hard_limit = self.settings.submission_timeout();
        match tokio::time::timeout(hard_limit, self.attempt(id, total)).await {
            Ok(Ok(receipt)) => ExecutionOutcome::Settled(receipt),
            Ok(Err(e)) => ExecutionOutcome::SubmissionFailed(e),
            Err(_) => ExecutionOutcome::SubmissionFailed(SentinelError::submission(
                id,
                SubmitStage::Confirm,
                format!("attempt exceeded {}ms", hard_limit.as_millis()),
            )),
        }
    }

    async fn attempt(&self, id: u64, total: U256) -> Result<Receipt> {
        tracing::info!(
            policy_id = id,
            total = %format_amount(total, self.settings.asset_decimals),
            "executing policy"
        );

        self.bounded(id, SubmitStage::Simulate, self.ledger.simulate_execute(id))
            .await?;

        let tx_hash = self
            .bounded(id, SubmitStage::Submit, self.ledger.send_execute(id))
            .await?;
        tracing::info!(policy_id = id, %tx_hash, "transaction sent");

        self.await_settlement(id, tx_hash).await
    }

    async fn bounded<T>(
        &self,
        id: u64,
        stage: SubmitStage,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.settings.read_timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(SentinelError::submission(id, stage, e)),
            Err(_) => Err(SentinelError::submission(
                id,
                stage,
                format!("timed out after {}ms", self.settings.read_timeout.as_millis()),
            )),
        }
    }

    /// Poll until the receipt exists with enough confirmations, or the
    /// settlement wait expires. Poll errors are tolerated until the deadline:
    /// the transaction is already broadcast and may still land.
    async fn await_settlement(&self, id: u64, tx_hash: TxHash) -> Result<Receipt> {
        let deadline = Instant::now() + self.settings.settlement_timeout;
        let mut last_error: Option<SentinelError> = None;

        loop {
            match self.poll_once(tx_hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(policy_id = id, %tx_hash, error = %e, "receipt poll failed");
                    last_error = Some(e);
                }
            }

            if Instant::now() >= deadline {
                let waited = self.settings.settlement_timeout.as_millis();
                let detail = match last_error {
                    Some(e) => format!("not settled within {waited}ms (last error: {e})"),
                    None => format!("not settled within {waited}ms"),
                };
                return Err(SentinelError::submission(id, SubmitStage::Confirm, detail));
            }
            tokio::time::sleep(self.settings.receipt_poll_interval).await;
        }
    }

    async fn poll_once(&self, tx_hash: TxHash) -> Result<Option<Receipt>> {
        let Some(receipt) = self.ledger.receipt(tx_hash).await? else {
            return Ok(None);
        };
        if self.settings.confirmations <= 1 {
            return Ok(Some(receipt));
        }
        let Some(included) = receipt.block_number else {
            return Ok(None);
        };
        let head = self.ledger.block_number().await?;
        let confirmations = head.saturating_sub(included) + 1;
        Ok((confirmations >= self.settings.confirmations).then_some(receipt))
    }
}
