use std::time::Duration;

use alloy_primitives::Address;
use serde::Serialize;

use crate::ledger::LedgerReader;

/// Result of comparing the signing credential with the vault's `agent()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentCheck {
    Authorized,
    Mismatch { expected: Address, actual: Address },
    /// The vault could not be asked.
    Unverified { reason: String },
}

/// One-shot startup check. Never fatal: an unauthorized agent simply has its
/// executions rejected by the ledger, so this only warns.
pub async fn verify_agent<L>(ledger: &L, expected: Address, timeout: Duration) -> AgentCheck
where
    L: LedgerReader + ?Sized,
{
    let actual = match tokio::time::timeout(timeout, ledger.agent()).await {
        Ok(Ok(a)) => a,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "failed to verify agent authorization");
            return AgentCheck::Unverified {
                reason: e.to_string(),
            };
        }
        Err(_) => {
            tracing::error!(
                timeout_ms = timeout.as_millis() as u64,
                "timed out verifying agent authorization"
            );
            return AgentCheck::Unverified {
                reason: format!("timed out after {}ms", timeout.as_millis()),
            };
        }
    };

    if actual == expected {
        tracing::info!(agent = %expected, "agent is authorized");
        AgentCheck::Authorized
    } else {
        tracing::warn!(
            expected = %expected,
            actual = %actual,
            "agent address mismatch; this wallet may not be authorized to execute policies"
        );
        tracing::warn!("set the agent address on the vault contract using the owner account");
        AgentCheck::Mismatch { expected, actual }
    }
}
