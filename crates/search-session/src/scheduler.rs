//! Timer that decides when the next automatic poll fires.
//!
//! The scheduler owns at most one timer task. Arming again replaces the previous timer,
//! and every arm gets a new generation so a tick that was already in flight when its
//! timer got replaced or disarmed is rejected by [`PollScheduler::fire`].

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum SchedulerState {
    #[default]
    Idle,
    Armed,
    Firing,
}

/// Delivered by an elapsed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    generation: u64,
}

pub struct PollScheduler {
    interval: Duration,
    state: SchedulerState,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

impl PollScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: SchedulerState::Idle,
            timer: None,
            generation: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == SchedulerState::Armed
    }

    /// Start a timer that calls `on_fire` once `delay` has elapsed, replacing any pending
    /// timer. Must be called from within a tokio runtime.
    pub fn arm<F>(&mut self, delay: Duration, on_fire: F)
    where
        F: FnOnce(Tick) + Send + 'static,
    {
        self.cancel_timer();
        self.generation += 1;
        let tick = Tick {
            generation: self.generation,
        };

        trace!(generation = tick.generation, ?delay, "poll timer armed");
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire(tick);
        }));
        self.state = SchedulerState::Armed;
    }

    /// [`arm`](Self::arm) with the fixed polling interval.
    pub fn arm_interval<F>(&mut self, on_fire: F)
    where
        F: FnOnce(Tick) + Send + 'static,
    {
        self.arm(self.interval, on_fire);
    }

    pub fn disarm(&mut self) {
        self.cancel_timer();
        self.state = SchedulerState::Idle;
    }

    /// Accept a tick from the current timer. Returns `false` for ticks of a timer that
    /// has since been replaced or disarmed.
    pub fn fire(&mut self, tick: Tick) -> bool {
        if self.state != SchedulerState::Armed || tick.generation != self.generation {
            trace!(generation = tick.generation, "stale poll tick ignored");
            return false;
        }
        self.timer = None;
        self.state = SchedulerState::Firing;
        true
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        // Invalidates a tick that was sent but not yet delivered
        self.generation += 1;
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn channel() -> (
        mpsc::UnboundedSender<Tick>,
        mpsc::UnboundedReceiver<Tick>,
    ) {
        mpsc::unbounded_channel()
    }

    fn sender(tx: &mpsc::UnboundedSender<Tick>) -> impl FnOnce(Tick) + Send + 'static {
        let tx = tx.clone();
        move |tick| {
            let _ = tx.send(tick);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_interval() {
        let (tx, mut rx) = channel();
        let mut scheduler = PollScheduler::new(Duration::from_secs(2));

        scheduler.arm_interval(sender(&tx));
        assert_eq!(scheduler.state(), SchedulerState::Armed);

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert!(rx.try_recv().is_err());

        let tick = rx.recv().await.unwrap();
        assert!(scheduler.fire(tick));
        assert_eq!(scheduler.state(), SchedulerState::Firing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_pending_timer() {
        let (tx, mut rx) = channel();
        let mut scheduler = PollScheduler::new(Duration::from_secs(2));

        scheduler.arm(Duration::from_secs(1), sender(&tx));
        scheduler.arm(Duration::from_secs(5), sender(&tx));

        tokio::time::sleep(Duration::from_secs(10)).await;
        let tick = rx.try_recv().unwrap();
        assert!(rx.try_recv().is_err(), "only one timer may fire");
        assert!(scheduler.fire(tick));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_prevents_fire() {
        let (tx, mut rx) = channel();
        let mut scheduler = PollScheduler::new(Duration::from_secs(2));

        scheduler.arm_interval(sender(&tx));
        scheduler.disarm();
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_delivered_before_disarm_is_rejected() {
        let (tx, mut rx) = channel();
        let mut scheduler = PollScheduler::new(Duration::from_secs(1));

        scheduler.arm_interval(sender(&tx));
        let tick = rx.recv().await.unwrap();

        // The tick is already queued when the session decides to stop polling
        scheduler.disarm();
        assert!(!scheduler.fire(tick));

        // Nor is it accepted by a later arm
        scheduler.arm_interval(sender(&tx));
        assert!(!scheduler.fire(tick));
        assert!(scheduler.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_scheduler_cancels_timer() {
        let (tx, mut rx) = channel();
        let mut scheduler = PollScheduler::new(Duration::from_secs(1));
        scheduler.arm_interval(sender(&tx));
        drop(scheduler);
        drop(tx);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.recv().await.is_none());
    }
}
