use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Selector, Sender};

/// Time source for the hop schedule.
pub trait HopClock: Send + 'static {
    fn now(&self) -> Instant;

    /// Block until `deadline`, or until `stop` receives a message or is
    /// disconnected. Returns `true` only when the deadline was reached.
    fn sleep_until(&mut self, deadline: Instant, stop: &Receiver<()>) -> bool;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl HopClock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&mut self, deadline: Instant, stop: &Receiver<()>) -> bool {
        matches!(stop.recv_deadline(deadline), Err(RecvTimeoutError::Timeout))
    }
}

/// Manually stepped clock.
///
/// Virtual time only moves when a tick is delivered through the paired
/// [`StepHandle`]; each tick completes one pending sleep and jumps `now` to
/// its deadline.
#[derive(Debug)]
pub struct StepClock {
    now: Instant,
    ticks: Receiver<()>,
}

/// Drives a [`StepClock`] from another thread.
#[derive(Debug, Clone)]
pub struct StepHandle {
    ticks: Sender<()>,
}

impl StepClock {
    pub fn new() -> (Self, StepHandle) {
        let (tx, rx) = flume::unbounded();
        (
            Self {
                now: Instant::now(),
                ticks: rx,
            },
            StepHandle { ticks: tx },
        )
    }
}

impl StepHandle {
    /// Let the pending (or next) sleep complete.
    pub fn tick(&self) {
        let _ = self.ticks.send(());
    }
}

impl HopClock for StepClock {
    fn now(&self) -> Instant {
        self.now
    }

    fn sleep_until(&mut self, deadline: Instant, stop: &Receiver<()>) -> bool {
        let fired = Selector::new()
            .recv(stop, |_| false)
            .recv(&self.ticks, |tick| tick.is_ok())
            .wait();
        if fired {
            self.now = self.now.max(deadline);
        }
        fired
    }
}

/// Elapsed virtual time between two instants, for event timestamps.
pub(crate) fn since(origin: Instant, now: Instant) -> Duration {
    now.saturating_duration_since(origin)
}
