//! Periodic sync driver.
//!
//! Runs one sync pass immediately, then one every `period`. Each tick
//! spawns an independent pass; a slow fetch does not delay the next tick,
//! and overlapping passes are tolerated because merging is idempotent and
//! the store serializes writes.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

use crate::sync::SyncService;

/// Counts for one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub started: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct Scheduler {
    service: SyncService,
    period: Duration,
}

impl Scheduler {
    pub fn new(service: SyncService, period: Duration) -> Self {
        Self { service, period }
    }

    /// Drive sync passes until `shutdown` resolves or `max_passes` passes
    /// have been started.
    ///
    /// With a pass limit, outstanding passes are awaited before returning.
    /// On shutdown, outstanding passes are aborted, including while waiting
    /// for them after the limit was reached.
    pub async fn run<S>(&self, max_passes: Option<usize>, shutdown: S) -> SchedulerReport
    where
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut passes: JoinSet<bool> = JoinSet::new();
        let mut report = SchedulerReport::default();

        loop {
            if max_passes.is_some_and(|max| report.started >= max) {
                break;
            }
            tokio::select! {
                _ = &mut shutdown => {
                    debug!(outstanding = passes.len(), "scheduler shutting down");
                    passes.shutdown().await;
                    return report;
                }
                _ = ticker.tick() => {
                    report.started += 1;
                    let service = self.service.clone();
                    passes.spawn(async move {
                        match service.run_pass().await {
                            Ok(_) => true,
                            Err(e) => {
                                error!(error = %format!("{:#}", e), "sync pass failed");
                                false
                            }
                        }
                    });
                }
                Some(joined) = passes.join_next(), if !passes.is_empty() => {
                    record(&mut report, joined);
                }
            }
        }

        while !passes.is_empty() {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!(outstanding = passes.len(), "scheduler shutting down while draining");
                    passes.shutdown().await;
                    return report;
                }
                Some(joined) = passes.join_next() => {
                    record(&mut report, joined);
                }
            }
        }
        report
    }
}

fn record(report: &mut SchedulerReport, joined: Result<bool, tokio::task::JoinError>) {
    match joined {
        Ok(true) => report.succeeded += 1,
        Ok(false) => report.failed += 1,
        Err(e) => {
            warn!(error = %e, "sync pass task did not complete");
            report.failed += 1;
        }
    }
}
