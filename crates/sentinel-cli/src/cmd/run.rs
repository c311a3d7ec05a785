use anyhow::{Context, Result};
use sentinel_core::config::AgentConfig;
use sentinel_core::coordinator::CycleCoordinator;
use sentinel_core::scheduler::run_loop;
use sentinel_core::startup::verify_agent;
use sentinel_core::stats::StatsHandle;
use sentinel_server::AppState;

pub fn run(config: AgentConfig) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_agent(config))
}

async fn run_agent(config: AgentConfig) -> Result<()> {
    tracing::info!("starting sentinel agent");
    let ledger = super::connect(&config)?;
    let agent = ledger.agent_address();

    verify_agent(ledger.as_ref(), agent, config.settings.read_timeout).await;

    let stats = StatsHandle::new();
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind health endpoint on port {}", config.port))?;
    let state = AppState::new(stats.clone(), agent, config.vault_address);
    let server = tokio::spawn(async move {
        if let Err(e) = sentinel_server::serve_on(listener, state).await {
            tracing::error!(error = %e, "health server stopped");
        }
    });

    let coordinator = CycleCoordinator::new(ledger, stats, config.settings.clone());
    let cycles = run_loop(&coordinator, config.poll_interval, shutdown_signal()).await;

    server.abort();
    tracing::info!(
        cycles,
        executed = coordinator.stats().snapshot().executed_count,
        "sentinel agent stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
