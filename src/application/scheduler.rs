//! Periodic report sending: the on/off auto-send job and the fixed-hour schedule

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::shared::errors::ConfigError;

/// Auto-send state. Transitions are `Off → On` and `On → Off` only.
#[derive(Debug, Default)]
pub enum AutoSendState {
    #[default]
    Off,
    On {
        interval: Duration,
        handle: JoinHandle<()>,
    },
}

/// Outcome of an enable/disable request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Enabled(Duration),
    AlreadyOn(Duration),
    Disabled,
    AlreadyOff,
}

/// Owns the single periodic job. Concurrent enable calls are serialized by the lock.
#[derive(Debug, Default)]
pub struct AutoSender {
    state: Mutex<AutoSendState>,
}

impl AutoSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a job with `spawn` unless one is already running
    pub async fn enable<F>(&self, interval: Duration, spawn: F) -> Transition
    where
        F: FnOnce(Duration) -> JoinHandle<()>,
    {
        let mut state = self.state.lock().await;
        if let AutoSendState::On { interval: current, handle } = &*state {
            if !handle.is_finished() {
                return Transition::AlreadyOn(*current);
            }
        }
        *state = AutoSendState::On {
            interval,
            handle: spawn(interval),
        };
        info!("⏱️ Auto-send enabled every {}s", interval.as_secs());
        Transition::Enabled(interval)
    }

    pub async fn disable(&self) -> Transition {
        let mut state = self.state.lock().await;
        match std::mem::take(&mut *state) {
            AutoSendState::On { handle, .. } => {
                handle.abort();
                info!("⏹️ Auto-send disabled");
                Transition::Disabled
            }
            AutoSendState::Off => Transition::AlreadyOff,
        }
    }

    pub async fn interval(&self) -> Option<Duration> {
        match &*self.state.lock().await {
            AutoSendState::On { interval, handle } if !handle.is_finished() => Some(*interval),
            _ => None,
        }
    }
}

/// Spawn `job` every `interval`. The first run happens one interval from now.
pub fn spawn_periodic<F, Fut>(interval: Duration, job: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            job().await;
        }
    })
}

/// Fires once per (local date, hour) slot for each configured hour
#[derive(Debug, Clone)]
pub struct FixedHourSchedule {
    hours: Vec<u32>,
    offset: FixedOffset,
    last_slot: Option<(NaiveDate, u32)>,
}

impl FixedHourSchedule {
    pub fn new(hours: Vec<u32>, utc_offset_hours: i32) -> Result<Self, ConfigError> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600).ok_or_else(|| {
            ConfigError::Invalid(format!("invalid utc_offset_hours {}", utc_offset_hours))
        })?;
        Ok(Self {
            hours,
            offset,
            last_slot: None,
        })
    }

    /// Returns the slot to fire for `now`, if any, and marks it as fired
    pub fn due(&mut self, now: DateTime<Utc>) -> Option<(NaiveDate, u32)> {
        let local = now.with_timezone(&self.offset);
        let slot = (local.date_naive(), local.hour());
        if !self.hours.contains(&slot.1) || self.last_slot == Some(slot) {
            return None;
        }
        self.last_slot = Some(slot);
        Some(slot)
    }

    /// Poll forever, running `job` whenever a slot becomes due
    pub async fn run<F, Fut>(mut self, poll_interval: Duration, job: F)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ()>,
    {
        info!("🕒 Fixed-hour schedule at {:?} (UTC{})", self.hours, self.offset);
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            match self.due(Utc::now()) {
                Some((date, hour)) => {
                    info!("🕒 Scheduled report for {} {:02}:00", date, hour);
                    job().await;
                }
                None => debug!("Scheduler tick, nothing due"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn idle_job(_: Duration) -> JoinHandle<()> {
        tokio::spawn(futures::future::pending::<()>())
    }

    #[tokio::test]
    async fn test_enable_twice_keeps_one_job() {
        let sender = AutoSender::new();
        let spawned = Arc::new(AtomicUsize::new(0));

        for secs in [3600, 120] {
            let spawned = spawned.clone();
            sender
                .enable(Duration::from_secs(secs), move |interval| {
                    spawned.fetch_add(1, Ordering::SeqCst);
                    idle_job(interval)
                })
                .await;
        }

        assert_eq!(spawned.load(Ordering::SeqCst), 1);
        assert_eq!(sender.interval().await, Some(Duration::from_secs(3600)));
    }

    #[tokio::test]
    async fn test_transitions() {
        let sender = AutoSender::new();
        assert_eq!(sender.disable().await, Transition::AlreadyOff);
        assert_eq!(
            sender.enable(Duration::from_secs(60), idle_job).await,
            Transition::Enabled(Duration::from_secs(60))
        );
        assert_eq!(
            sender.enable(Duration::from_secs(90), idle_job).await,
            Transition::AlreadyOn(Duration::from_secs(60))
        );
        assert_eq!(sender.disable().await, Transition::Disabled);
        assert_eq!(sender.disable().await, Transition::AlreadyOff);
        assert_eq!(sender.interval().await, None);
    }

    #[tokio::test]
    async fn test_finished_job_can_be_restarted() {
        let sender = AutoSender::new();
        sender
            .enable(Duration::from_secs(60), |_| tokio::spawn(async {}))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            sender.enable(Duration::from_secs(60), idle_job).await,
            Transition::Enabled(Duration::from_secs(60))
        );
    }

    #[tokio::test]
    async fn test_periodic_job_runs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let handle = spawn_periodic(Duration::from_millis(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();
        assert!(runs.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_fixed_hours_in_local_time() {
        let mut schedule = FixedHourSchedule::new(vec![6, 10, 14, 18], -5).unwrap();
        // 11:30 UTC is 06:30 in UTC-5
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 11, 30, 0).unwrap();
        assert_eq!(
            schedule.due(now),
            Some((NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(), 6))
        );
        // same slot only fires once
        assert_eq!(schedule.due(now + chrono::Duration::minutes(20)), None);
        // 07:00 local is not scheduled
        assert_eq!(schedule.due(now + chrono::Duration::hours(1)), None);
        // 10:00 local fires
        assert!(schedule.due(Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap()).is_some());
    }

    #[test]
    fn test_fixed_hours_fire_again_next_day() {
        let mut schedule = FixedHourSchedule::new(vec![18], -5).unwrap();
        let day_one = Utc.with_ymd_and_hms(2026, 3, 1, 23, 5, 0).unwrap();
        assert!(schedule.due(day_one).is_some());
        assert!(schedule.due(day_one + chrono::Duration::days(1)).is_some());
    }

    #[test]
    fn test_invalid_offset() {
        assert!(FixedHourSchedule::new(vec![6], 30).is_err());
    }
}
