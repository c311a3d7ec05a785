use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::coordinator::CycleCoordinator;
use crate::ledger::Ledger;

/// Drive cycles until `shutdown` resolves.
///
/// The first cycle runs immediately, then one per `poll_interval`. Each cycle
/// is awaited inside the loop body, so the next tick is not even polled until
/// the previous cycle has finished; a slow cycle delays the schedule instead
/// of overlapping. `shutdown` is only observed between cycles.
///
/// Returns the number of cycles run.
pub async fn run_loop<L, F>(
    coordinator: &CycleCoordinator<L>,
    poll_interval: Duration,
    shutdown: F,
) -> u64
where
    L: Ledger + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        poll_interval_ms = poll_interval.as_millis() as u64,
        "starting policy polling"
    );

    let mut cycles = 0;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!(cycles, "shutdown requested; polling stopped");
                break;
            }
            _ = ticker.tick() => {
                coordinator.run_cycle().await;
                cycles += 1;
            }
        }
    }
    cycles
}
