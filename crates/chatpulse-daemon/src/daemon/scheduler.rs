// ABOUTME: Runs sampling cycles on a fixed interval until the run window closes or shutdown
// ABOUTME: Cycles never overlap; a failed cycle is logged and the next tick proceeds normally

use chatpulse_core::{ChatPlatform, GraphStore, Settings};
use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{error, info};

use super::cycle::{run_cycle, CycleOutcome};

/// Totals accumulated over a scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerReport {
    pub cycles: u64,
    pub submitted: u64,
    pub skipped: u64,
    pub failed: u64,
}

pub struct Scheduler {
    platform: Arc<dyn ChatPlatform>,
    store: Arc<dyn GraphStore>,
    settings: Arc<Settings>,
}

impl Scheduler {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        store: Arc<dyn GraphStore>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            platform,
            store,
            settings,
        }
    }

    /// Runs the first cycle immediately, then one per interval.
    ///
    /// Returns when `shutdown` resolves or `schedule.run_for_secs` has elapsed.
    /// A cycle in progress is allowed to finish first.
    pub async fn run<F>(&self, shutdown: F) -> SchedulerReport
    where
        F: Future<Output = ()>,
    {
        let schedule = &self.settings.schedule;
        let mut ticker = interval(schedule.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let run_for = schedule.run_for();
        let deadline = async move {
            match run_for {
                Some(window) => sleep(window).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        info!(
            "Scheduler started: interval {}s, run window {}",
            schedule.interval_secs,
            run_for.map_or_else(|| "unbounded".to_string(), |d| format!("{}s", d.as_secs()))
        );

        let mut report = SchedulerReport::default();
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested; stopping scheduler");
                    break;
                }
                _ = &mut deadline => {
                    info!("Run window elapsed; stopping scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_once(&mut report).await;
                }
            }
        }

        info!(
            "Scheduler stopped after {} cycles ({} submitted, {} skipped, {} failed)",
            report.cycles, report.submitted, report.skipped, report.failed
        );
        report
    }

    async fn run_once(&self, report: &mut SchedulerReport) {
        report.cycles += 1;
        match run_cycle(
            self.platform.as_ref(),
            self.store.as_ref(),
            &self.settings,
            Utc::now(),
        )
        .await
        {
            Ok(CycleOutcome::Submitted { .. }) => report.submitted += 1,
            Ok(CycleOutcome::Skipped) => report.skipped += 1,
            Err(e) => {
                report.failed += 1;
                error!("Cycle {} failed: {:#}", report.cycles, e);
            }
        }
    }
}
