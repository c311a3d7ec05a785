//! In-memory ledger used by unit tests.
//!
//! Applies executions the way the vault contract would: the ledger re-checks
//! balance at apply time and reverts if it cannot pay, regardless of what the
//! agent decided.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::error::{Result, SentinelError};
use crate::ledger::{LedgerReader, LedgerWriter};
use crate::types::{Policy, Receipt};

pub(crate) const AGENT: Address = Address::repeat_byte(0xa6);

/// Enabled, due since epoch, one recipient paid `amount`, capped at `amount`.
pub(crate) fn policy(id: u64, amount: u64) -> Policy {
    Policy {
        id,
        enabled: true,
        requires_approval: false,
        approved: false,
        interval_seconds: 3_600,
        next_execution_time: 0,
        max_per_execution: U256::from(amount),
        executions: 0,
        last_executed_at: 0,
        recipients: vec![Address::repeat_byte(0x11)],
        amounts: vec![U256::from(amount)],
    }
}

#[derive(Default)]
struct MockState {
    balance: U256,
    paused: bool,
    agent: Address,
    policies: Vec<Policy>,
    total_overrides: HashMap<u64, U256>,
    read_delay: Option<Duration>,
    fail_vault: bool,
    failing_policies: HashSet<u64>,
    failing_simulations: HashSet<u64>,
    failing_sends: HashSet<u64>,
    reverting: HashSet<u64>,
    unmined: HashSet<u64>,
    blocks_per_poll: u64,
    block: u64,
    next_tx: u64,
    txs: HashMap<TxHash, (u64, Receipt)>,
    policy_reads: Vec<u64>,
    sent: Vec<u64>,
}

pub(crate) struct MockLedger {
    state: Mutex<MockState>,
}

impl MockLedger {
    pub(crate) fn new(balance: U256) -> Self {
        Self {
            state: Mutex::new(MockState {
                balance,
                agent: AGENT,
                block: 1,
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn push_policy(&self, p: Policy) {
        self.lock().policies.push(p);
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.lock().paused = paused;
    }

    pub(crate) fn set_agent(&self, agent: Address) {
        self.lock().agent = agent;
    }

    pub(crate) fn override_total(&self, id: u64, total: U256) {
        self.lock().total_overrides.insert(id, total);
    }

    pub(crate) fn set_read_delay(&self, delay: Duration) {
        self.lock().read_delay = Some(delay);
    }

    pub(crate) fn fail_vault_read(&self) {
        self.lock().fail_vault = true;
    }

    pub(crate) fn fail_policy_read(&self, id: u64) {
        self.lock().failing_policies.insert(id);
    }

    pub(crate) fn fail_simulation(&self, id: u64) {
        self.lock().failing_simulations.insert(id);
    }

    pub(crate) fn fail_send(&self, id: u64) {
        self.lock().failing_sends.insert(id);
    }

    pub(crate) fn revert_on_apply(&self, id: u64) {
        self.lock().reverting.insert(id);
    }

    pub(crate) fn never_mine(&self, id: u64) {
        self.lock().unmined.insert(id);
    }

    pub(crate) fn advance_blocks_per_poll(&self, n: u64) {
        self.lock().blocks_per_poll = n;
    }

    pub(crate) fn balance(&self) -> U256 {
        self.lock().balance
    }

    pub(crate) fn block(&self) -> u64 {
        self.lock().block
    }

    pub(crate) fn sent(&self) -> Vec<u64> {
        self.lock().sent.clone()
    }

    pub(crate) fn policy_reads(&self) -> Vec<u64> {
        self.lock().policy_reads.clone()
    }

    pub(crate) fn mined_block(&self, id: u64) -> Option<u64> {
        self.lock()
            .txs
            .values()
            .find(|(policy_id, _)| *policy_id == id)
            .and_then(|(_, r)| r.block_number)
    }

    async fn delay(&self) {
        let delay = self.lock().read_delay;
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
    }

    fn total_of(state: &MockState, id: u64) -> Option<U256> {
        if let Some(t) = state.total_overrides.get(&id) {
            return Some(*t);
        }
        state
            .policies
            .iter()
            .find(|p| p.id == id)
            .and_then(Policy::local_total)
    }
}

fn unreachable_ledger(what: &str) -> SentinelError {
    SentinelError::read(what, "connection refused")
}

#[async_trait]
impl LedgerReader for MockLedger {
    async fn policy_count(&self) -> Result<u64> {
        self.delay().await;
        let s = self.lock();
        if s.fail_vault {
            return Err(unreachable_ledger("policyCount"));
        }
        Ok(s.policies.len() as u64)
    }

    async fn policy(&self, id: u64) -> Result<Policy> {
        self.delay().await;
        let mut s = self.lock();
        s.policy_reads.push(id);
        if s.failing_policies.contains(&id) {
            return Err(unreachable_ledger("getPolicy"));
        }
        s.policies
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| SentinelError::read("getPolicy", format!("no policy {id}")))
    }

    async fn total_per_execution(&self, id: u64) -> Result<U256> {
        self.delay().await;
        let s = self.lock();
        Self::total_of(&s, id)
            .ok_or_else(|| SentinelError::read("totalPerExecution", format!("no policy {id}")))
    }

    async fn paused(&self) -> Result<bool> {
        self.delay().await;
        Ok(self.lock().paused)
    }

    async fn vault_balance(&self) -> Result<U256> {
        self.delay().await;
        let s = self.lock();
        if s.fail_vault {
            return Err(unreachable_ledger("balanceOf"));
        }
        Ok(s.balance)
    }

    async fn agent(&self) -> Result<Address> {
        self.delay().await;
        let s = self.lock();
        if s.fail_vault {
            return Err(unreachable_ledger("agent"));
        }
        Ok(s.agent)
    }
}

#[async_trait]
impl LedgerWriter for MockLedger {
    async fn simulate_execute(&self, id: u64) -> Result<()> {
        if self.lock().failing_simulations.contains(&id) {
            return Err(SentinelError::ledger("eth_call executePolicy", "execution reverted"));
        }
        Ok(())
    }

    async fn send_execute(&self, id: u64) -> Result<TxHash> {
        let mut s = self.lock();
        if s.failing_sends.contains(&id) {
            return Err(SentinelError::ledger("eth_sendRawTransaction", "nonce too low"));
        }
        s.sent.push(id);
        s.next_tx += 1;
        s.block += 1;

        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&s.next_tx.to_be_bytes());
        let tx_hash = TxHash::from(bytes);

        let total = Self::total_of(&s, id).unwrap_or(U256::MAX);
        let success = !s.reverting.contains(&id) && total <= s.balance && !s.paused;
        if success {
            s.balance -= total;
            if let Some(p) = s.policies.iter_mut().find(|p| p.id == id) {
                p.executions += 1;
                p.next_execution_time += p.interval_seconds.max(1);
            }
        }

        let block_number = Some(s.block);
        s.txs.insert(
            tx_hash,
            (
                id,
                Receipt {
                    tx_hash,
                    success,
                    gas_used: 84_000,
                    effective_gas_price: 1_000_000_000,
                    block_number,
                },
            ),
        );
        Ok(tx_hash)
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>> {
        let mut s = self.lock();
        let step = s.blocks_per_poll;
        s.block += step;
        let Some((id, receipt)) = s.txs.get(&tx_hash).cloned() else {
            return Ok(None);
        };
        if s.unmined.contains(&id) {
            return Ok(None);
        }
        Ok(Some(receipt))
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.lock().block)
    }
}
