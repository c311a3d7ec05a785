use alloy_primitives::Address;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use sentinel_core::stats::{CyclePhase, CycleSummary};

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub agent_address: Address,
    pub vault_address: Address,
    pub executed_count: u64,
    /// Unix milliseconds of the last cycle start; `0` before the first.
    pub last_run: u64,
    pub cycles_started: u64,
    pub cycles_aborted: u64,
    pub phase: CyclePhase,
    pub last_cycle: Option<CycleSummary>,
    /// Seconds since the server started.
    pub uptime: u64,
}

/// GET /health: liveness plus a copy of the loop counters.
pub async fn get_health(State(app): State<AppState>) -> Json<HealthResponse> {
    let stats = app.stats.snapshot();
    Json(HealthResponse {
        status: "ok",
        agent_address: app.agent_address,
        vault_address: app.vault_address,
        executed_count: stats.executed_count,
        last_run: stats.last_run_timestamp,
        cycles_started: stats.cycles_started,
        cycles_aborted: stats.cycles_aborted,
        phase: stats.phase,
        last_cycle: stats.last_cycle,
        uptime: app.uptime_secs(),
    })
}
