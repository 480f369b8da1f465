//! Fixed-period cycle scheduler.
//!
//! The first cycle fires immediately. Each following cycle is due one period
//! after the previous *nominal* fire time, so cycle duration does not shift
//! the schedule. When a cycle overruns its slot the next one fires right away
//! and the schedule re-anchors there. Cycles never overlap.
//!
//! Errors and panics inside a cycle are logged and counted; the loop keeps
//! going until its [`CancellationToken`] is cancelled. A cycle in flight is
//! allowed to finish.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::pipeline::{CycleReport, CycleTask};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub cycles: u64,
    pub completed: u64,
    pub skipped: u64,
    pub failures: u64,
}

impl SchedulerStats {
    fn record(&mut self, outcome: &Result<CycleReport, String>) {
        self.cycles += 1;
        match outcome {
            Ok(CycleReport::Completed { .. }) => self.completed += 1,
            Ok(CycleReport::Skipped) => self.skipped += 1,
            Err(_) => self.failures += 1,
        }
    }
}

/// Shortest accepted period; shorter values are raised to this.
pub const MIN_PERIOD: Duration = Duration::from_secs(1);

pub struct Scheduler {
    period: Duration,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(period: Duration, cancel: CancellationToken) -> Self {
        Self {
            period: period.max(MIN_PERIOD),
            cancel,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run cycles until cancelled.
    pub async fn run(&self, task: &dyn CycleTask) -> SchedulerStats {
        let mut stats = SchedulerStats::default();
        let mut nominal = Instant::now();
        info!(task = task.name(), period_secs = self.period.as_secs(), "scheduler started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep_until(nominal) => {}
            }

            let outcome = run_isolated(task).await;
            stats.record(&outcome);

            if self.cancel.is_cancelled() {
                break;
            }
            let now = Instant::now();
            nominal = next_fire(nominal, self.period, now);
            if nominal == now {
                warn!(task = task.name(), "cycle overran its period, next cycle starts now");
            }
        }

        info!(
            task = task.name(),
            cycles = stats.cycles,
            completed = stats.completed,
            skipped = stats.skipped,
            failures = stats.failures,
            "scheduler stopped"
        );
        stats
    }

    /// Run exactly one isolated cycle.
    pub async fn run_once(task: &dyn CycleTask) -> SchedulerStats {
        let mut stats = SchedulerStats::default();
        stats.record(&run_isolated(task).await);
        stats
    }
}

/// Next nominal fire time: one period after `previous`, or `now` if that is already past.
pub fn next_fire(previous: Instant, period: Duration, now: Instant) -> Instant {
    let next = previous + period;
    if next <= now {
        now
    } else {
        next
    }
}

async fn run_isolated(task: &dyn CycleTask) -> Result<CycleReport, String> {
    match AssertUnwindSafe(task.run_cycle()).catch_unwind().await {
        Ok(Ok(report)) => Ok(report),
        Ok(Err(e)) => {
            warn!(task = task.name(), error = %e, "cycle failed");
            Err(e.to_string())
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(task = task.name(), panic = %message, "cycle panicked");
            Err(message)
        }
    }
}
