use clap::Args;
use sentinel_core::config::RawConfig;

/// Connection and loop settings. Every flag falls back to the environment
/// variable of the same name; validation happens in `sentinel_core::config`.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// JSON-RPC endpoint of the ledger (http or https)
    #[arg(long, env = "RPC_URL", global = true)]
    pub rpc_url: Option<String>,

    /// Hex-encoded automation key (0x + 64 hex characters)
    #[arg(long, env = "PRIVATE_KEY", global = true, hide_env_values = true)]
    pub private_key: Option<String>,

    /// TreasuryVault contract address
    #[arg(long, env = "VAULT_ADDRESS", global = true)]
    pub vault_address: Option<String>,

    /// Milliseconds between cycle starts
    #[arg(long, env = "POLL_INTERVAL_MS", global = true)]
    pub poll_interval_ms: Option<String>,

    /// Health endpoint port [default: 3001]
    #[arg(long, env = "PORT", global = true)]
    pub port: Option<String>,

    /// Per-query ledger timeout [default: 10000]
    #[arg(long, env = "READ_TIMEOUT_MS", global = true)]
    pub read_timeout_ms: Option<String>,

    /// How long to wait for a sent transaction to settle [default: 120000]
    #[arg(long, env = "SETTLEMENT_TIMEOUT_MS", global = true)]
    pub settlement_timeout_ms: Option<String>,

    /// Receipt polling period [default: 1000]
    #[arg(long, env = "RECEIPT_POLL_MS", global = true)]
    pub receipt_poll_ms: Option<String>,

    /// Blocks required before a receipt counts as settled [default: 1]
    #[arg(long, env = "CONFIRMATIONS", global = true)]
    pub confirmations: Option<String>,

    /// Settlement asset decimals, for log formatting [default: 6]
    #[arg(long, env = "ASSET_DECIMALS", global = true)]
    pub asset_decimals: Option<String>,
}

impl ConfigArgs {
    pub fn to_raw(&self) -> RawConfig {
        RawConfig {
            rpc_url: self.rpc_url.clone(),
            private_key: self.private_key.clone(),
            vault_address: self.vault_address.clone(),
            poll_interval_ms: self.poll_interval_ms.clone(),
            port: self.port.clone(),
            read_timeout_ms: self.read_timeout_ms.clone(),
            settlement_timeout_ms: self.settlement_timeout_ms.clone(),
            receipt_poll_ms: self.receipt_poll_ms.clone(),
            confirmations: self.confirmations.clone(),
            asset_decimals: self.asset_decimals.clone(),
        }
    }
}
