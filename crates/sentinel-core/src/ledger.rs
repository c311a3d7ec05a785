//! The seam between the agent and the external ledger.
//!
//! The ledger is the only authority over policy state and the only thing that
//! can durably apply an execution. Everything in this crate talks to it through
//! these two traits; `sentinel-chain` provides the JSON-RPC implementation and
//! tests use an in-memory one.

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Policy, Receipt};

/// Read-only queries against the vault contract and its settlement asset.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    async fn policy_count(&self) -> Result<u64>;

    async fn policy(&self, id: u64) -> Result<Policy>;

    /// `totalPerExecution(id)` as computed by the ledger itself.
    async fn total_per_execution(&self, id: u64) -> Result<U256>;

    async fn paused(&self) -> Result<bool>;

    /// Settlement-asset `balanceOf(vault)`.
    async fn vault_balance(&self) -> Result<U256>;

    /// The address the vault currently authorizes to execute policies.
    async fn agent(&self) -> Result<Address>;
}

/// State-changing access, signed by the automation credential.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Dry-run `executePolicy(id)` without broadcasting. `Err` means the call
    /// would revert (or could not be simulated).
    async fn simulate_execute(&self, id: u64) -> Result<()>;

    /// Sign and broadcast `executePolicy(id)`, returning the transaction hash.
    async fn send_execute(&self, id: u64) -> Result<TxHash>;

    /// Non-blocking receipt lookup; `None` while the transaction is pending.
    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>>;

    /// Current head block, used to count confirmations.
    async fn block_number(&self) -> Result<u64>;
}

/// Full ledger access required by the cycle coordinator.
pub trait Ledger: LedgerReader + LedgerWriter {}

impl<T: LedgerReader + LedgerWriter> Ledger for T {}
