use std::time::Instant;

use alloy_primitives::Address;
use sentinel_core::stats::StatsHandle;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub stats: StatsHandle,
    pub agent_address: Address,
    pub vault_address: Address,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(stats: StatsHandle, agent_address: Address, vault_address: Address) -> Self {
        Self {
            stats,
            agent_address,
            vault_address,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
