use anyhow::{bail, Result};
use sentinel_core::config::AgentConfig;
use sentinel_core::coordinator::{CycleCoordinator, CycleReport, CycleStatus, PolicyOutcome};
use sentinel_core::stats::StatsHandle;
use sentinel_core::types::format_amount;

use crate::output::{print_json, print_table};

/// Run exactly one cycle and print what happened to each policy.
pub fn run(config: AgentConfig, json: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(async {
        let ledger = super::connect(&config)?;
        let coordinator = CycleCoordinator::new(ledger, StatsHandle::new(), config.settings.clone());
        anyhow::Ok(coordinator.run_cycle().await)
    })?;

    if json {
        print_json(&report)?;
    } else {
        print_report(&report, config.settings.asset_decimals);
    }

    if let CycleStatus::Aborted { reason } = &report.status {
        bail!("cycle aborted: {reason}");
    }
    Ok(())
}

fn print_report(report: &CycleReport, decimals: u8) {
    let Some(vault) = report.vault else {
        println!("No vault snapshot.");
        return;
    };
    println!(
        "Vault: {} policies, balance {}, {}",
        vault.policy_count,
        format_amount(vault.balance, decimals),
        if vault.paused { "paused" } else { "active" }
    );
    if report.policies.is_empty() {
        println!("No policies to execute.");
        return;
    }

    let rows = report
        .policies
        .iter()
        .map(|p| {
            let (outcome, detail) = match &p.outcome {
                PolicyOutcome::Unreadable { error } => ("unreadable", error.clone()),
                PolicyOutcome::Skipped { reason } => ("skipped", reason.to_string()),
                PolicyOutcome::Executed { receipt } => ("executed", receipt.tx_hash.to_string()),
                PolicyOutcome::Reverted { receipt } => ("reverted", receipt.tx_hash.to_string()),
                PolicyOutcome::Failed { error } => ("failed", error.clone()),
            };
            vec![p.policy_id.to_string(), outcome.to_string(), detail]
        })
        .collect();
    print_table(&["POLICY", "OUTCOME", "DETAIL"], rows);

    let s = report.summary();
    println!(
        "\n{} evaluated, {} executed, {} skipped, {} failed, {} unreadable",
        s.evaluated, s.executed, s.skipped, s.failed, s.unreadable
    );
}
