//! Periodic refresh timer with suspend/resume support

use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not started yet; the listing has not been resolved.
    Idle,
    Running,
    Suspended,
}

pub struct UpdateScheduler {
    interval: Duration,
    timer: Option<Interval>,
    state: SchedulerState,
    last_update: Option<Instant>,
}

impl UpdateScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            // tokio intervals reject a zero period
            interval: interval.max(Duration::from_millis(1)),
            timer: None,
            state: SchedulerState::Idle,
            last_update: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    fn arm(&mut self) {
        let mut timer = interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Replacing the previous timer drops it, so there is never more than one.
        self.timer = Some(timer);
        self.state = SchedulerState::Running;
    }

    /// Arms the periodic timer. The first tick fires one interval from now.
    pub fn start(&mut self) {
        info!(
            "Update scheduled to run automatically every {} minutes",
            self.interval.as_secs_f64() / 60.0
        );
        self.arm();
    }

    /// Disarms the timer. Tracked state and the last update time are kept.
    pub fn suspend(&mut self) {
        if self.state == SchedulerState::Running {
            debug!("Suspending updates");
            self.timer = None;
            self.state = SchedulerState::Suspended;
        }
    }

    /// Re-arms a suspended timer and reports whether an out-of-cycle refresh
    /// is due because a full interval passed since the last update.
    ///
    /// Does nothing before [`UpdateScheduler::start`].
    pub fn resume(&mut self, now: Instant) -> bool {
        match self.state {
            SchedulerState::Idle => false,
            SchedulerState::Running => false,
            SchedulerState::Suspended => {
                debug!("Resuming updates");
                self.arm();
                self.is_due(now)
            }
        }
    }

    /// True when no update succeeded yet or the last one is at least one
    /// interval old.
    pub fn is_due(&self, now: Instant) -> bool {
        self.last_update
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    pub fn mark_updated(&mut self, now: Instant) {
        self.last_update = Some(now);
    }

    /// Waits for the next tick. Never completes while the timer is disarmed.
    pub async fn tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => futures::future::pending::<()>().await,
        }
    }
}
