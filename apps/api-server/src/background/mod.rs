//! Background work: the periodic policy cache sweep.

use std::sync::Arc;
use std::time::Duration;

use quota_core::services::PolicyCache;

#[cfg(feature = "scheduler")]
pub mod scheduler;

/// Clear every cached policy so the next lookups re-read the policy store.
pub async fn sweep_policy_cache(cache: &PolicyCache) -> usize {
    let evicted = cache.clear().await;
    tracing::info!(evicted, "Evicted policy cache");
    evicted
}

/// Handle on the running sweep, stopped at shutdown.
pub enum PolicySweep {
    #[cfg(feature = "scheduler")]
    Scheduled(scheduler::Scheduler),
    Interval(tokio::task::JoinHandle<()>),
}

impl PolicySweep {
    pub async fn stop(self) -> anyhow::Result<()> {
        match self {
            #[cfg(feature = "scheduler")]
            Self::Scheduled(mut scheduler) => scheduler
                .shutdown()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to stop scheduler: {e:?}")),
            Self::Interval(handle) => {
                handle.abort();
                Ok(())
            }
        }
    }
}

/// Register and start the sweep job.
///
/// With the scheduler disabled the sweep still runs, on a plain tokio interval.
#[cfg(feature = "scheduler")]
pub async fn start_policy_sweep(
    cache: Arc<PolicyCache>,
    period: Duration,
    config: scheduler::SchedulerConfig,
) -> Result<PolicySweep, tokio_cron_scheduler::JobSchedulerError> {
    if !config.enabled {
        tracing::info!("Scheduler disabled, sweeping the policy cache on an interval");
        return Ok(PolicySweep::Interval(spawn_interval_sweep(cache, period)));
    }

    let scheduler = scheduler::Scheduler::new().await?;
    scheduler
        .add_repeated(period, move || {
            let cache = cache.clone();
            async move {
                sweep_policy_cache(&cache).await;
            }
        })
        .await?;
    scheduler.start().await?;
    Ok(PolicySweep::Scheduled(scheduler))
}

#[cfg(not(feature = "scheduler"))]
pub fn start_policy_sweep(cache: Arc<PolicyCache>, period: Duration) -> PolicySweep {
    PolicySweep::Interval(spawn_interval_sweep(cache, period))
}

/// Sweep every `period` on a tokio task.
pub fn spawn_interval_sweep(
    cache: Arc<PolicyCache>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately; nothing is cached yet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_policy_cache(&cache).await;
        }
    })
}
