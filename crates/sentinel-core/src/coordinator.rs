//! Cycle Coordinator: one full pass over every policy in the vault.
//!
//! ```text
//! Idle → Reading → Evaluating(0) → [Executing(0)] → Evaluating(1) → … → Idle
//! ```
//!
//! Policies are processed strictly in ascending id order, one at a time, all
//! against the single vault snapshot taken at the start of the cycle. A
//! failure on one policy is logged and recorded; it never stops the cycle.
//! The ledger re-checks every precondition when it applies an execution, so
//! an execution submitted against a stale snapshot is rejected there.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::LoopSettings;
use crate::eligibility::{evaluate, SkipReason, Verdict};
use crate::error::SentinelError;
use crate::ledger::Ledger;
use crate::reader::{read_policy, read_vault};
use crate::stats::{CyclePhase, CycleSummary, StatsHandle};
use crate::submitter::{ExecutionOutcome, Submitter};
use crate::types::{format_amount, ObservedPolicy, Receipt, VaultSnapshot};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleStatus {
    Completed,
    /// The vault snapshot could not be read; no policy was looked at.
    Aborted { reason: String },
    /// Another cycle held the guard; this call did nothing.
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PolicyOutcome {
    /// Read failed: not evaluated this cycle (distinct from "not eligible").
    Unreadable { error: String },
    Skipped { reason: SkipReason },
    Executed { receipt: Receipt },
    /// Included, but the ledger's own checks reverted it.
    Reverted { receipt: Receipt },
    /// Dry-run, submission or settlement wait failed.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyReport {
    pub policy_id: u64,
    #[serde(flatten)]
    pub outcome: PolicyOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    #[serde(flatten)]
    pub status: CycleStatus,
    pub vault: Option<VaultSnapshot>,
    pub policies: Vec<PolicyReport>,
}

impl CycleReport {
    fn new(started_at: DateTime<Utc>, status: CycleStatus) -> Self {
        Self {
            started_at,
            status,
            vault: None,
            policies: Vec::new(),
        }
    }

    pub fn summary(&self) -> CycleSummary {
        let mut s = CycleSummary::default();
        for report in &self.policies {
            match report.outcome {
                PolicyOutcome::Unreadable { .. } => s.unreadable += 1,
                PolicyOutcome::Skipped { .. } => {
                    s.evaluated += 1;
                    s.skipped += 1;
                }
                PolicyOutcome::Executed { .. } => {
                    s.evaluated += 1;
                    s.executed += 1;
                }
                PolicyOutcome::Reverted { .. } | PolicyOutcome::Failed { .. } => {
                    s.evaluated += 1;
                    s.failed += 1;
                }
            }
        }
        s
    }
}

// ---------------------------------------------------------------------------
// Re-entrancy guard
// ---------------------------------------------------------------------------

/// Held for the duration of a cycle; released on drop, including on panic.
struct CycleGuard<'a>(&'a AtomicBool);

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// CycleCoordinator
// ---------------------------------------------------------------------------

pub struct CycleCoordinator<L: ?Sized> {
    ledger: Arc<L>,
    stats: StatsHandle,
    settings: LoopSettings,
    running: AtomicBool,
}

impl<L> CycleCoordinator<L>
where
    L: Ledger + ?Sized,
{
    pub fn new(ledger: Arc<L>, stats: StatsHandle, settings: LoopSettings) -> Self {
        Self {
            ledger,
            stats,
            settings,
            running: AtomicBool::new(false),
        }
    }

    pub fn stats(&self) -> &StatsHandle {
        &self.stats
    }

    pub async fn run_cycle(&self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle treating `now` as the current time for due checks.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleReport {
        let Some(_guard) = CycleGuard::acquire(&self.running) else {
            tracing::warn!("previous cycle still running; skipping trigger");
            return CycleReport::new(now, CycleStatus::AlreadyRunning);
        };

        self.stats
            .cycle_started(u64::try_from(now.timestamp_millis()).unwrap_or(0));
        tracing::info!("starting policy evaluation cycle");

        let vault = match read_vault(self.ledger.as_ref(), self.settings.read_timeout).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(phase = "read_vault", error = %e, "vault snapshot unavailable; aborting cycle");
                self.stats.cycle_aborted();
                return CycleReport::new(
                    now,
                    CycleStatus::Aborted {
                        reason: e.to_string(),
                    },
                );
            }
        };

        tracing::info!(
            policy_count = vault.policy_count,
            balance = %format_amount(vault.balance, self.settings.asset_decimals),
            paused = vault.paused,
            "vault snapshot"
        );

        let mut report = CycleReport::new(now, CycleStatus::Completed);
        report.vault = Some(vault);

        if vault.policy_count == 0 {
            tracing::info!("no policies to execute");
        }

        let now_secs = u64::try_from(now.timestamp()).unwrap_or(0);
        for id in 0..vault.policy_count {
            let outcome = self.process_policy(id, now_secs, &vault).await;
            report.policies.push(PolicyReport {
                policy_id: id,
                outcome,
            });
        }

        let summary = report.summary();
        self.stats.cycle_finished(summary);
        tracing::info!(
            evaluated = summary.evaluated,
            skipped = summary.skipped,
            executed = summary.executed,
            failed = summary.failed,
            unreadable = summary.unreadable,
            "cycle complete"
        );
        report
    }

    async fn process_policy(&self, id: u64, now: u64, vault: &VaultSnapshot) -> PolicyOutcome {
        self.stats.set_phase(CyclePhase::Evaluating(id));

        let observed =
            match read_policy(self.ledger.as_ref(), id, self.settings.read_timeout).await {
                Ok(o) => o,
                Err(e) => {
                    tracing::error!(policy_id = id, phase = "read_policy", error = %e, "policy not evaluated this cycle");
                    return PolicyOutcome::Unreadable {
                        error: e.to_string(),
                    };
                }
            };

        self.log_observed(&observed, now, vault);

        match evaluate(&observed, now, vault) {
            Verdict::Skip(reason) => {
                log_skip(id, reason);
                PolicyOutcome::Skipped { reason }
            }
            Verdict::Execute => {
                tracing::info!(policy_id = id, "policy ready for execution");
                self.stats.set_phase(CyclePhase::Executing(id));
                self.execute(id, observed.total).await
            }
        }
    }

    async fn execute(&self, id: u64, total: U256) -> PolicyOutcome {
        let submitter = Submitter::new(self.ledger.as_ref(), &self.settings);
        match submitter.execute(id, total).await {
            ExecutionOutcome::Settled(receipt) if receipt.success => {
                self.stats.record_execution();
                tracing::info!(
                    policy_id = id,
                    tx_hash = %receipt.tx_hash,
                    total = %format_amount(total, self.settings.asset_decimals),
                    gas_used = receipt.gas_used,
                    effective_gas_price = receipt.effective_gas_price,
                    "policy executed"
                );
                PolicyOutcome::Executed { receipt }
            }
            ExecutionOutcome::Settled(receipt) => {
                let err = SentinelError::LedgerRejection {
                    policy_id: id,
                    tx_hash: receipt.tx_hash.to_string(),
                };
                tracing::error!(
                    policy_id = id,
                    phase = "settle",
                    gas_used = receipt.gas_used,
                    error = %err,
                    "policy execution reverted"
                );
                PolicyOutcome::Reverted { receipt }
            }
            ExecutionOutcome::SubmissionFailed(e) => {
                tracing::error!(policy_id = id, phase = "execute", error = %e, "policy execution failed");
                PolicyOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn log_observed(&self, observed: &ObservedPolicy, now: u64, vault: &VaultSnapshot) {
        let p = &observed.policy;
        let decimals = self.settings.asset_decimals;
        tracing::debug!(
            policy_id = p.id,
            enabled = p.enabled,
            requires_approval = p.requires_approval,
            approved = p.approved,
            next_execution_time = p.next_execution_time,
            now,
            one_shot = p.is_one_shot(),
            total = %format_amount(observed.total, decimals),
            vault_balance = %format_amount(vault.balance, decimals),
            executions = p.executions,
            "policy state"
        );
        if observed.total_drifted() {
            tracing::warn!(
                policy_id = p.id,
                ledger_total = %observed.total,
                local_total = ?p.local_total(),
                "ledger total differs from summed amounts"
            );
        }
    }
}

fn log_skip(id: u64, reason: SkipReason) {
    let level = reason.severity();
    if level == tracing::Level::ERROR {
        tracing::error!(policy_id = id, reason = %reason, "policy skipped: ledger reports total above its cap");
    } else if level == tracing::Level::WARN {
        tracing::warn!(policy_id = id, reason = %reason, "policy skipped");
    } else if level == tracing::Level::INFO {
        tracing::info!(policy_id = id, reason = %reason, "policy skipped");
    } else {
        tracing::debug!(policy_id = id, reason = %reason, "policy skipped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{policy, MockLedger};
    use chrono::TimeZone;
    use std::time::Duration;

    fn settings() -> LoopSettings {
        LoopSettings {
            read_timeout: Duration::from_secs(1),
            settlement_timeout: Duration::from_secs(5),
            receipt_poll_interval: Duration::from_millis(50),
            confirmations: 1,
            asset_decimals: 6,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn coordinator(ledger: MockLedger) -> (Arc<MockLedger>, CycleCoordinator<MockLedger>) {
        let ledger = Arc::new(ledger);
        let c = CycleCoordinator::new(ledger.clone(), StatsHandle::new(), settings());
        (ledger, c)
    }

    #[tokio::test]
    async fn zero_policies_reads_nothing_and_counts_nothing() {
        let (ledger, c) = coordinator(MockLedger::new(U256::from(500)));
        let report = c.run_cycle_at(now()).await;

        assert_eq!(report.status, CycleStatus::Completed);
        assert!(report.policies.is_empty());
        assert!(ledger.policy_reads().is_empty());
        let s = c.stats().snapshot();
        assert_eq!(s.executed_count, 0);
        assert_eq!(s.cycles_started, 1);
        assert_eq!(s.last_run_timestamp, 1_700_000_000_000);
    }

    #[tokio::test]
    async fn funded_due_policy_executes_once() {
        let ledger = MockLedger::new(U256::from(500));
        ledger.push_policy(policy(0, 100));
        let (ledger, c) = coordinator(ledger);

        let report = c.run_cycle_at(now()).await;
        assert!(matches!(
            report.policies[0].outcome,
            PolicyOutcome::Executed { .. }
        ));
        assert_eq!(c.stats().snapshot().executed_count, 1);
        assert_eq!(ledger.sent(), vec![0]);
    }

    #[tokio::test]
    async fn underfunded_policy_is_skipped() {
        let ledger = MockLedger::new(U256::from(50));
        ledger.push_policy(policy(0, 100));
        let (ledger, c) = coordinator(ledger);

        let report = c.run_cycle_at(now()).await;
        assert_eq!(
            report.policies[0].outcome,
            PolicyOutcome::Skipped {
                reason: SkipReason::InsufficientFunds
            }
        );
        assert_eq!(c.stats().snapshot().executed_count, 0);
        assert!(ledger.sent().is_empty());
    }

    #[tokio::test]
    async fn unreadable_policy_does_not_stop_its_neighbours() {
        let ledger = MockLedger::new(U256::from(1_000));
        for id in 0..3 {
            ledger.push_policy(policy(id, 100));
        }
        ledger.fail_policy_read(1);
        let (ledger, c) = coordinator(ledger);

        let report = c.run_cycle_at(now()).await;
        let outcomes: Vec<_> = report.policies.iter().map(|r| &r.outcome).collect();
        assert!(matches!(outcomes[0], PolicyOutcome::Executed { .. }));
        assert!(matches!(outcomes[1], PolicyOutcome::Unreadable { .. }));
        assert!(matches!(outcomes[2], PolicyOutcome::Executed { .. }));
        assert_eq!(ledger.policy_reads(), vec![0, 1, 2]);
        assert_eq!(c.stats().snapshot().executed_count, 2);
        assert_eq!(report.summary().unreadable, 1);
    }

    #[tokio::test]
    async fn vault_read_failure_aborts_before_any_policy_read() {
        let ledger = MockLedger::new(U256::from(500));
        ledger.push_policy(policy(0, 100));
        ledger.fail_vault_read();
        let (ledger, c) = coordinator(ledger);

        let report = c.run_cycle_at(now()).await;
        assert!(matches!(report.status, CycleStatus::Aborted { .. }));
        assert!(ledger.policy_reads().is_empty());
        let s = c.stats().snapshot();
        assert_eq!(s.cycles_aborted, 1);
        assert_eq!(s.last_run_timestamp, 1_700_000_000_000);
        assert_eq!(s.phase, CyclePhase::Idle);
    }

    #[tokio::test]
    async fn counter_moves_only_on_settled_success() {
        let ledger = MockLedger::new(U256::from(10_000));
        // 0: skipped (disabled), 1: dry-run fails, 2: reverted, 3: executed
        let mut disabled = policy(0, 100);
        disabled.enabled = false;
        ledger.push_policy(disabled);
        ledger.push_policy(policy(1, 100));
        ledger.push_policy(policy(2, 100));
        ledger.push_policy(policy(3, 100));
        ledger.fail_simulation(1);
        ledger.revert_on_apply(2);
        let (_ledger, c) = coordinator(ledger);

        let report = c.run_cycle_at(now()).await;
        let summary = report.summary();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.executed, 1);
        assert!(matches!(
            report.policies[2].outcome,
            PolicyOutcome::Reverted { .. }
        ));
        assert_eq!(c.stats().snapshot().executed_count, 1);
        assert_eq!(c.stats().snapshot().last_cycle, Some(summary));
    }

    #[tokio::test]
    async fn later_policy_uses_pre_execution_snapshot_and_ledger_rejects_it() {
        // Both fit the snapshot balance of 500, only the first fits after it pays.
        let ledger = MockLedger::new(U256::from(500));
        ledger.push_policy(policy(0, 300));
        ledger.push_policy(policy(1, 300));
        let (ledger, c) = coordinator(ledger);

        let report = c.run_cycle_at(now()).await;
        assert!(matches!(
            report.policies[0].outcome,
            PolicyOutcome::Executed { .. }
        ));
        assert!(matches!(
            report.policies[1].outcome,
            PolicyOutcome::Reverted { .. }
        ));
        assert_eq!(ledger.sent(), vec![0, 1]);
        assert_eq!(ledger.balance(), U256::from(200));
        assert_eq!(c.stats().snapshot().executed_count, 1);
    }

    #[tokio::test]
    async fn executed_policy_is_not_due_next_cycle() {
        let ledger = MockLedger::new(U256::from(1_000));
        ledger.push_policy(policy(0, 100));
        let (ledger, c) = coordinator(ledger);

        // The mock ledger pushes next_execution_time forward by the interval
        // from 0, so run with a clock before that.
        let early = Utc.timestamp_opt(1_000, 0).unwrap();
        c.run_cycle_at(early).await;
        let second = c.run_cycle_at(early).await;
        assert_eq!(
            second.policies[0].outcome,
            PolicyOutcome::Skipped {
                reason: SkipReason::NotDue
            }
        );
        assert_eq!(ledger.sent(), vec![0]);
        assert_eq!(c.stats().snapshot().executed_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_cycle_is_refused() {
        let ledger = MockLedger::new(U256::from(500));
        ledger.set_read_delay(Duration::from_millis(200));
        let (_ledger, c) = coordinator(ledger);

        let (first, second) = tokio::join!(c.run_cycle_at(now()), c.run_cycle_at(now()));
        assert_eq!(first.status, CycleStatus::Completed);
        assert_eq!(second.status, CycleStatus::AlreadyRunning);
        assert_eq!(c.stats().snapshot().cycles_started, 1);

        // Guard is released once the first cycle finishes.
        let third = c.run_cycle_at(now()).await;
        assert_eq!(third.status, CycleStatus::Completed);
    }

    #[tokio::test]
    async fn report_serializes_flat() {
        let ledger = MockLedger::new(U256::from(50));
        ledger.push_policy(policy(0, 100));
        let (_ledger, c) = coordinator(ledger);

        let report = c.run_cycle_at(now()).await;
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["policies"][0]["policyId"], 0);
        assert_eq!(json["policies"][0]["outcome"], "skipped");
        assert_eq!(json["policies"][0]["reason"], "insufficient funds");
    }
}
