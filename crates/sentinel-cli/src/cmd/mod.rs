pub mod check;
pub mod once;
pub mod run;

use std::sync::Arc;

use anyhow::Result;
use sentinel_chain::ChainLedger;
use sentinel_core::config::AgentConfig;

/// Log the effective configuration (never the key) and open the ledger client.
fn connect(config: &AgentConfig) -> Result<Arc<ChainLedger>> {
    tracing::info!(
        rpc_url = %config.redacted_rpc_url(),
        vault = %config.vault_address,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "configuration loaded"
    );
    let ledger = ChainLedger::connect(config)?;
    tracing::info!(agent = %ledger.agent_address(), "agent wallet initialized");
    Ok(Arc::new(ledger))
}
