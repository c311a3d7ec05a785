//! Process-wide cycle counters shared between the loop and the health surface.
//!
//! The coordinator is the only writer. Readers take a copy via
//! [`StatsHandle::snapshot`]; the lock is held only for the copy and never
//! across an `.await`, so a reader can never stall a cycle.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

/// Where the coordinator currently is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "policyId", rename_all = "snake_case")]
pub enum CyclePhase {
    #[default]
    Idle,
    Reading,
    Evaluating(u64),
    Executing(u64),
}

/// Per-cycle tallies of what happened to each policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    pub evaluated: u64,
    pub skipped: u64,
    pub executed: u64,
    pub failed: u64,
    pub unreadable: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStats {
    /// Confirmed successful executions since process start.
    pub executed_count: u64,
    /// Unix milliseconds at which the most recent cycle started; `0` before
    /// the first cycle.
    pub last_run_timestamp: u64,
    pub cycles_started: u64,
    /// Cycles abandoned because the vault snapshot could not be read.
    pub cycles_aborted: u64,
    pub phase: CyclePhase,
    pub last_cycle: Option<CycleSummary>,
}

/// Cloneable handle to the shared [`CycleStats`] cell.
#[derive(Debug, Clone, Default)]
pub struct StatsHandle {
    inner: Arc<RwLock<CycleStats>>,
}

impl StatsHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing counters instead of zero.
    pub fn with_stats(stats: CycleStats) -> Self {
        Self {
            inner: Arc::new(RwLock::new(stats)),
        }
    }

    pub fn snapshot(&self) -> CycleStats {
        self.read().clone()
    }

    pub(crate) fn cycle_started(&self, at_ms: u64) {
        let mut s = self.write();
        s.cycles_started += 1;
        s.last_run_timestamp = at_ms;
        s.phase = CyclePhase::Reading;
    }

    pub(crate) fn set_phase(&self, phase: CyclePhase) {
        self.write().phase = phase;
    }

    pub(crate) fn record_execution(&self) {
        self.write().executed_count += 1;
    }

    pub(crate) fn cycle_aborted(&self) {
        let mut s = self.write();
        s.cycles_aborted += 1;
        s.phase = CyclePhase::Idle;
    }

    pub(crate) fn cycle_finished(&self, summary: CycleSummary) {
        let mut s = self.write();
        s.last_cycle = Some(summary);
        s.phase = CyclePhase::Idle;
    }

    fn read(&self) -> RwLockReadGuard<'_, CycleStats> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::error!("stats lock poisoned; recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, CycleStats> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::error!("stats lock poisoned; recovering");
            poisoned.into_inner()
        })
    }
}
