use alloy_primitives::Address;
use anyhow::{bail, Result};
use serde::Serialize;

use sentinel_core::config::AgentConfig;
use sentinel_core::reader::read_vault;
use sentinel_core::startup::{verify_agent, AgentCheck};
use sentinel_core::types::{format_amount, VaultSnapshot};

use crate::output::print_json;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
    rpc_url: String,
    vault_address: Address,
    agent_address: Address,
    poll_interval_ms: u64,
    port: u16,
    vault: Option<VaultSnapshot>,
    vault_error: Option<String>,
    agent: AgentCheck,
}

/// Validate configuration against the live vault without executing anything.
/// Fails unless the vault is readable and the key is the authorized agent.
pub fn run(config: AgentConfig, json: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(async {
        let ledger = super::connect(&config)?;
        let timeout = config.settings.read_timeout;
        let (vault, vault_error) = match read_vault(ledger.as_ref(), timeout).await {
            Ok(v) => (Some(v), None),
            Err(e) => (None, Some(e.to_string())),
        };
        let agent = verify_agent(ledger.as_ref(), ledger.agent_address(), timeout).await;
        anyhow::Ok(CheckReport {
            rpc_url: config.redacted_rpc_url(),
            vault_address: config.vault_address,
            agent_address: ledger.agent_address(),
            poll_interval_ms: config.poll_interval.as_millis() as u64,
            port: config.port,
            vault,
            vault_error,
            agent,
        })
    })?;

    if json {
        print_json(&report)?;
    } else {
        print_human(&report, config.settings.asset_decimals);
    }

    if let Some(e) = &report.vault_error {
        bail!("vault unreadable: {e}");
    }
    match &report.agent {
        AgentCheck::Authorized => Ok(()),
        AgentCheck::Mismatch { actual, .. } => {
            bail!("key is not the vault's agent (vault authorizes {actual})")
        }
        AgentCheck::Unverified { reason } => bail!("agent unverified: {reason}"),
    }
}

fn print_human(report: &CheckReport, decimals: u8) {
    println!("RPC:      {}", report.rpc_url);
    println!("Vault:    {}", report.vault_address);
    println!("Agent:    {}", report.agent_address);
    println!(
        "Polling:  every {}ms, health on :{}",
        report.poll_interval_ms, report.port
    );
    match (&report.vault, &report.vault_error) {
        (Some(v), _) => println!(
            "State:    {} policies, balance {}, {}",
            v.policy_count,
            format_amount(v.balance, decimals),
            if v.paused { "paused" } else { "active" }
        ),
        (None, Some(e)) => println!("State:    unreadable ({e})"),
        (None, None) => {}
    }
    let auth = match &report.agent {
        AgentCheck::Authorized => "authorized".to_string(),
        AgentCheck::Mismatch { actual, .. } => format!("NOT authorized (vault agent is {actual})"),
        AgentCheck::Unverified { reason } => format!("unverified ({reason})"),
    };
    println!("Auth:     {auth}");
}
