//! Scheduler
//!
//! Drives discovery and proof sync on two independent timers. Each job has
//! its own try-lock: a tick that finds the previous run still in flight is
//! skipped, never queued.

use crate::error::EngineError;
use crate::lifecycle::{LifecycleCoordinator, TickReport};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

/// Default discovery period
pub const DISCOVERY_INTERVAL: Duration = Duration::from_secs(30);

/// Default proof-sync period
pub const PROOF_SYNC_INTERVAL: Duration = Duration::from_secs(40);

/// Scheduler configuration
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub discovery_interval: Duration,
    pub proof_sync_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            discovery_interval: DISCOVERY_INTERVAL,
            proof_sync_interval: PROOF_SYNC_INTERVAL,
        }
    }
}

/// Non-blocking exclusion flag for one job category
#[derive(Debug)]
pub struct JobGuard {
    name: &'static str,
    running: AtomicBool,
}

/// Held while a job runs; releases the guard on drop
#[derive(Debug)]
pub struct JobPermit<'a> {
    guard: &'a JobGuard,
}

impl JobGuard {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            running: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Take the guard, or `None` if a run is already in flight
    pub fn try_acquire(&self) -> Option<JobPermit<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| JobPermit { guard: self })
    }

    pub fn is_held(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for JobPermit<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}

/// What happened to one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Previous run still in flight
    Skipped,
    /// Pass completed (per-item failures are counted in the report)
    Completed(TickReport),
    /// Pass aborted before or during the fetch of its work list
    Aborted,
}

/// Periodic driver for one lifecycle coordinator
pub struct Scheduler {
    coordinator: Arc<LifecycleCoordinator>,
    config: SchedulerConfig,
    discovery: JobGuard,
    proof_sync: JobGuard,
    running: AtomicBool,
    shutdown: Notify,
}

impl Scheduler {
    pub fn new(coordinator: Arc<LifecycleCoordinator>, config: SchedulerConfig) -> Self {
        Self {
            coordinator,
            config,
            discovery: JobGuard::new("discovery"),
            proof_sync: JobGuard::new("proof-sync"),
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    pub fn discovery_guard(&self) -> &JobGuard {
        &self.discovery
    }

    pub fn proof_sync_guard(&self) -> &JobGuard {
        &self.proof_sync
    }

    pub fn coordinator(&self) -> &Arc<LifecycleCoordinator> {
        &self.coordinator
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One discovery tick under the discovery guard
    pub async fn discovery_tick(&self) -> TickOutcome {
        let Some(_permit) = self.discovery.try_acquire() else {
            tracing::debug!("Skipping {} tick, previous run still active", self.discovery.name());
            return TickOutcome::Skipped;
        };
        self.finish(self.discovery.name(), self.coordinator.run_discovery().await)
    }

    /// One proof-sync tick under the proof-sync guard
    pub async fn proof_sync_tick(&self) -> TickOutcome {
        let Some(_permit) = self.proof_sync.try_acquire() else {
            tracing::debug!("Skipping {} tick, previous run still active", self.proof_sync.name());
            return TickOutcome::Skipped;
        };
        self.finish(self.proof_sync.name(), self.coordinator.run_proof_sync().await)
    }

    fn finish(&self, job: &str, result: Result<TickReport, EngineError>) -> TickOutcome {
        match result {
            Ok(report) => {
                if report.processed > 0 {
                    tracing::info!(
                        "{} {} tick: {} processed, {} advanced, {} skipped, {} failed",
                        self.coordinator.role(),
                        job,
                        report.processed,
                        report.advanced,
                        report.skipped,
                        report.failed
                    );
                }
                TickOutcome::Completed(report)
            }
            Err(e) if e.is_config() => {
                tracing::warn!("{} tick aborted: {}", job, e);
                TickOutcome::Aborted
            }
            Err(e) => {
                tracing::error!("{} tick failed: {}", job, e);
                TickOutcome::Aborted
            }
        }
    }

    /// Run both timers until [`Scheduler::stop`] is called.
    ///
    /// Ticks are spawned so a slow job never delays the other timer. After a
    /// stop, returns only once every in-flight tick has finished.
    pub async fn run(self: Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);

        let mut discovery = tokio::time::interval(self.config.discovery_interval);
        discovery.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut proof_sync = tokio::time::interval(self.config.proof_sync_interval);
        proof_sync.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = JoinSet::new();

        tracing::info!(
            "Scheduler started as {} (discovery every {:?}, proof sync every {:?})",
            self.coordinator.role(),
            self.config.discovery_interval,
            self.config.proof_sync_interval
        );

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = discovery.tick() => {
                    let this = self.clone();
                    ticks.spawn(async move {
                        this.discovery_tick().await;
                    });
                }
                _ = proof_sync.tick() => {
                    let this = self.clone();
                    ticks.spawn(async move {
                        this.proof_sync_tick().await;
                    });
                }
                Some(joined) = ticks.join_next() => {
                    if let Err(e) = joined {
                        tracing::error!("Tick task failed: {}", e);
                    }
                }
                _ = self.shutdown.notified() => break,
            }
        }

        self.running.store(false, Ordering::SeqCst);
        if !ticks.is_empty() {
            tracing::info!("Waiting for {} in-flight ticks", ticks.len());
        }
        while let Some(joined) = ticks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Tick task failed: {}", e);
            }
        }
        tracing::info!("Scheduler stopped");
    }

    /// Stop scheduling new ticks; in-flight ticks run to completion before `run` returns
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_exclusive_until_dropped() {
        let guard = JobGuard::new("discovery");
        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.is_held());
        assert!(guard.try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_held());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_guards_are_independent() {
        let discovery = JobGuard::new("discovery");
        let proof_sync = JobGuard::new("proof-sync");
        let _held = discovery.try_acquire().unwrap();
        assert!(proof_sync.try_acquire().is_some());
    }

    #[test]
    fn test_default_intervals() {
        let config = SchedulerConfig::default();
        assert_eq!(config.discovery_interval, Duration::from_secs(30));
        assert_eq!(config.proof_sync_interval, Duration::from_secs(40));
    }
}
