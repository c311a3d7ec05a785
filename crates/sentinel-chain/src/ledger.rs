use std::str::FromStr;

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::sync::OnceCell;

use sentinel_core::config::AgentConfig;
use sentinel_core::error::{Result, SentinelError};
use sentinel_core::ledger::{LedgerReader, LedgerWriter};
use sentinel_core::types::{Policy, Receipt};

use crate::contract::{ITreasuryVault, IERC20};
use crate::error::ChainError;

type VaultInstance = ITreasuryVault::ITreasuryVaultInstance<DynProvider>;

/// The vault contract reached over JSON-RPC, signing as the automation agent.
pub struct ChainLedger {
    provider: DynProvider,
    vault: VaultInstance,
    agent_address: Address,
    /// Settlement asset, read from `usdc()` on first use.
    asset: OnceCell<Address>,
}

impl ChainLedger {
    /// Build a signing HTTP provider for `config`. No request is made until
    /// the first query.
    pub fn connect(config: &AgentConfig) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(config.private_key.expose())
            .map_err(|e| ChainError::InvalidKey(e.to_string()))?;
        let agent_address = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(config.rpc_url.clone())
            .erased();
        let vault = ITreasuryVault::new(config.vault_address, provider.clone());

        tracing::debug!(
            rpc_url = %config.redacted_rpc_url(),
            vault = %config.vault_address,
            agent = %agent_address,
            "ledger client ready"
        );

        Ok(Self {
            provider,
            vault,
            agent_address,
            asset: OnceCell::new(),
        })
    }

    /// Address derived from the signing key.
    pub fn agent_address(&self) -> Address {
        self.agent_address
    }

    pub fn vault_address(&self) -> Address {
        *self.vault.address()
    }

    async fn asset(&self) -> Result<Address> {
        self.asset
            .get_or_try_init(|| async {
                let asset = self
                    .vault
                    .usdc()
                    .call()
                    .await
                    .map_err(|e| SentinelError::read("usdc", e))?;
                tracing::debug!(%asset, "settlement asset resolved");
                Ok::<_, SentinelError>(asset)
            })
            .await
            .copied()
    }
}

fn to_u64(field: &'static str, value: U256) -> std::result::Result<u64, ChainError> {
    u64::try_from(value).map_err(|_| ChainError::OutOfRange {
        field,
        value: value.to_string(),
    })
}

#[async_trait]
impl LedgerReader for ChainLedger {
    async fn policy_count(&self) -> Result<u64> {
        let count = self
            .vault
            .policyCount()
            .call()
            .await
            .map_err(|e| SentinelError::read("policyCount", e))?;
        Ok(to_u64("policyCount", count)?)
    }

    async fn policy(&self, id: u64) -> Result<Policy> {
        let p = self
            .vault
            .getPolicy(U256::from(id))
            .call()
            .await
            .map_err(|e| SentinelError::read(format!("getPolicy({id})"), e))?;

        Ok(Policy {
            id,
            enabled: p.enabled,
            requires_approval: p.requiresApproval,
            approved: p.approved,
            interval_seconds: to_u64("intervalSeconds", p.intervalSeconds)?,
            next_execution_time: to_u64("nextExecutionTime", p.nextExecutionTime)?,
            max_per_execution: p.maxPerExecution,
            executions: to_u64("executions", p.executions)?,
            last_executed_at: to_u64("lastExecutedAt", p.lastExecutedAt)?,
            recipients: p.recipients,
            amounts: p.amounts,
        })
    }

    async fn total_per_execution(&self, id: u64) -> Result<U256> {
        self.vault
            .totalPerExecution(U256::from(id))
            .call()
            .await
            .map_err(|e| SentinelError::read(format!("totalPerExecution({id})"), e))
    }

    async fn paused(&self) -> Result<bool> {
        self.vault
            .paused()
            .call()
            .await
            .map_err(|e| SentinelError::read("paused", e))
    }

    async fn vault_balance(&self) -> Result<U256> {
        let asset = self.asset().await?;
        IERC20::new(asset, self.provider.clone())
            .balanceOf(self.vault_address())
            .call()
            .await
            .map_err(|e| SentinelError::read("balanceOf(vault)", e))
    }

    async fn agent(&self) -> Result<Address> {
        self.vault
            .agent()
            .call()
            .await
            .map_err(|e| SentinelError::read("agent", e))
    }
}

#[async_trait]
impl LedgerWriter for ChainLedger {
    async fn simulate_execute(&self, id: u64) -> Result<()> {
        self.vault
            .executePolicy(U256::from(id))
            .from(self.agent_address)
            .call()
            .await
            .map(|_| ())
            .map_err(|e| SentinelError::ledger("eth_call executePolicy", e))
    }

    async fn send_execute(&self, id: u64) -> Result<TxHash> {
        let pending = self
            .vault
            .executePolicy(U256::from(id))
            .from(self.agent_address)
            .send()
            .await
            .map_err(|e| SentinelError::ledger("eth_sendRawTransaction", e))?;
        Ok(*pending.tx_hash())
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| SentinelError::read("eth_getTransactionReceipt", e))?;

        Ok(receipt.map(|r| Receipt {
            tx_hash: r.transaction_hash(),
            success: r.status(),
            gas_used: r.gas_used(),
            effective_gas_price: r.effective_gas_price(),
            block_number: r.block_number(),
        }))
    }

    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| SentinelError::read("eth_blockNumber", e))
    }
}
