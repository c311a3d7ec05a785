use alloy_primitives::utils::format_units;
use alloy_primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

/// Render base units as a decimal string for logs.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// A payout policy as last observed on the ledger.
///
/// The agent owns none of these fields; it only holds a per-cycle copy and
/// triggers `executePolicy` on the ledger, which mutates the real record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: u64,
    pub enabled: bool,
    pub requires_approval: bool,
    pub approved: bool,
    /// `0` means one-shot.
    pub interval_seconds: u64,
    /// Unix seconds; the policy is due once `now >= next_execution_time`.
    pub next_execution_time: u64,
    pub max_per_execution: U256,
    pub executions: u64,
    /// Unix seconds, `0` if never executed.
    pub last_executed_at: u64,
    pub recipients: Vec<Address>,
    pub amounts: Vec<U256>,
}

impl Policy {
    pub fn is_one_shot(&self) -> bool {
        self.interval_seconds == 0
    }

    /// Sum of `amounts` computed locally. `None` on overflow.
    ///
    /// Only used to detect drift against the ledger-reported total; eligibility
    /// always uses the ledger's figure.
    pub fn local_total(&self) -> Option<U256> {
        self.amounts
            .iter()
            .try_fold(U256::ZERO, |acc, amount| acc.checked_add(*amount))
    }
}

/// A policy snapshot paired with the ledger's `totalPerExecution(id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedPolicy {
    pub policy: Policy,
    pub total: U256,
}

impl ObservedPolicy {
    pub fn id(&self) -> u64 {
        self.policy.id
    }

    /// True when the ledger total disagrees with the locally summed amounts.
    pub fn total_drifted(&self) -> bool {
        self.policy.local_total() != Some(self.total)
    }
}

// ---------------------------------------------------------------------------
// VaultSnapshot
// ---------------------------------------------------------------------------

/// Vault-level state read once per cycle and shared by every evaluation in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSnapshot {
    /// Settlement-asset balance held by the vault, in base units.
    pub balance: U256,
    pub paused: bool,
    pub policy_count: u64,
}

// ---------------------------------------------------------------------------
// Receipt
// ---------------------------------------------------------------------------

/// Settlement confirmation for a submitted `executePolicy` transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub tx_hash: TxHash,
    /// `false` when the transaction was included but reverted.
    pub success: bool,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub block_number: Option<u64>,
}
