//! State Reader: turns ledger queries into per-cycle snapshots.
//!
//! Every query is bounded by `timeout`. Failures are surfaced as
//! [`SentinelError::Read`] and never retried here; the coordinator decides
//! whether a failure aborts the cycle (vault level) or skips one policy.

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, SentinelError};
use crate::ledger::LedgerReader;
use crate::types::{ObservedPolicy, VaultSnapshot};

/// Read balance, pause flag and policy count for the vault.
pub async fn read_vault<L>(ledger: &L, timeout: Duration) -> Result<VaultSnapshot>
where
    L: LedgerReader + ?Sized,
{
    let policy_count = bounded("policyCount", timeout, ledger.policy_count()).await?;
    let balance = bounded("balanceOf(vault)", timeout, ledger.vault_balance()).await?;
    let paused = bounded("paused", timeout, ledger.paused()).await?;
    Ok(VaultSnapshot {
        balance,
        paused,
        policy_count,
    })
}

/// Read one policy and its ledger-computed total.
pub async fn read_policy<L>(ledger: &L, id: u64, timeout: Duration) -> Result<ObservedPolicy>
where
    L: LedgerReader + ?Sized,
{
    let what = format!("getPolicy({id})");
    let policy = bounded(&what, timeout, ledger.policy(id)).await?;

    if policy.id != id {
        return Err(SentinelError::read(
            what,
            format!("ledger returned policy {} for id {id}", policy.id),
        ));
    }
    if policy.recipients.is_empty() {
        return Err(SentinelError::read(what, "policy has no recipients"));
    }
    if policy.recipients.len() != policy.amounts.len() {
        return Err(SentinelError::read(
            what,
            format!(
                "{} recipients but {} amounts",
                policy.recipients.len(),
                policy.amounts.len()
            ),
        ));
    }

    let total = bounded(
        &format!("totalPerExecution({id})"),
        timeout,
        ledger.total_per_execution(id),
    )
    .await?;

    Ok(ObservedPolicy { policy, total })
}

async fn bounded<T, F>(what: &str, timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(SentinelError::read(
            what,
            format!("timed out after {}ms", timeout.as_millis()),
        )),
    }
}
