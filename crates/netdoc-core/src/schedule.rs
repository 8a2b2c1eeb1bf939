// # Auto-sync schedule
//
// Periodic sync requests for providers configured with an hourly or daily
// interval. Each provider ticks on its own task; ticks go through
// `SyncCoordinator::request_sync`, so a tick landing on an in-flight run is
// rejected by the coordinator and skipped here.

use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::coordinator::SyncCoordinator;
use crate::model::ProviderId;

/// A provider with its sync cadence
#[derive(Debug, Clone)]
pub struct ScheduledProvider {
    pub provider: ProviderId,
    pub config: ProviderConfig,
    /// `None` means manual-only
    pub period: Option<Duration>,
}

impl ScheduledProvider {
    /// Schedule from the config's `sync_interval`
    pub fn new(provider: ProviderId, config: ProviderConfig) -> Self {
        let period = if config.enabled {
            config.sync_interval.period()
        } else {
            None
        };
        Self {
            provider,
            config,
            period,
        }
    }

    /// Override the cadence
    pub fn every(mut self, period: Duration) -> Self {
        self.period = Some(period);
        self
    }
}

/// Spawns per-provider schedule tasks
pub struct AutoSync;

impl AutoSync {
    /// Start one ticking task per provider that has a period
    ///
    /// The first tick fires one period after the call. Must be called from
    /// within a Tokio runtime.
    pub fn spawn(coordinator: SyncCoordinator, providers: Vec<ScheduledProvider>) -> AutoSyncHandle {
        let mut tasks = JoinSet::new();

        for scheduled in providers {
            let Some(period) = scheduled.period.filter(|p| !p.is_zero()) else {
                debug!("Provider {} has no sync interval, not scheduled", scheduled.provider);
                continue;
            };

            info!("Scheduling {} every {:?}", scheduled.provider, period);
            tasks.spawn(tick(coordinator.clone(), scheduled.provider, scheduled.config, period));
        }

        AutoSyncHandle { tasks }
    }
}

async fn tick(coordinator: SyncCoordinator, provider: ProviderId, config: ProviderConfig, period: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks = IntervalStream::new(interval);

    while ticks.next().await.is_some() {
        match coordinator.request_sync(&provider, config.clone()) {
            Ok(_) => debug!("Scheduled sync started for {}", provider),
            Err(e) if e.is_rejection() => {
                debug!("Scheduled sync for {} skipped: {}", provider, e);
            }
            Err(e) => warn!("Scheduled sync for {} not started: {}", provider, e),
        }
    }
}

/// Handle to running schedule tasks
pub struct AutoSyncHandle {
    tasks: JoinSet<()>,
}

impl AutoSyncHandle {
    /// Number of scheduled providers
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Stop all schedule tasks and wait for them to finish
    ///
    /// Runs already spawned by a tick are not cancelled.
    pub async fn shutdown(mut self) {
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
        debug!("Auto-sync schedule stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncInterval;

    fn pid(s: &str) -> ProviderId {
        ProviderId::new(s).unwrap()
    }

    #[test]
    fn test_period_follows_interval() {
        let manual = ScheduledProvider::new(pid("a"), ProviderConfig::default());
        assert!(manual.period.is_none());

        let hourly = ScheduledProvider::new(
            pid("b"),
            ProviderConfig::default().with_sync_interval(SyncInterval::Hourly),
        );
        assert_eq!(hourly.period, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_disabled_provider_not_scheduled() {
        let mut config = ProviderConfig::default().with_sync_interval(SyncInterval::Daily);
        config.enabled = false;
        assert!(ScheduledProvider::new(pid("c"), config).period.is_none());
    }
}
