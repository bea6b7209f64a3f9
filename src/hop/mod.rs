//! Periodic two-channel frequency hopping.
//!
//! A dedicated thread sleeps on a [`HopClock`] and toggles the [`Tuner`]
//! between channel A and B on every fire. The next deadline is measured
//! from the fire time, so wake-up latency accumulates as drift over long
//! runs.

mod clock;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread;
use std::time::Duration;

use flume::{Receiver, Sender};
use log::{debug, error, info, warn};

use crate::config::RadioConfig;
use crate::error::{Error, Result};
use crate::event::HopEvent;
use crate::radio::{Channel, RadioMonitor, Tuner};

pub use clock::{HopClock, StepClock, StepHandle, SystemClock};

/// Consecutive apply failures after which the controller gives up.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// State of the hop timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Armed,
    Fired,
    Cancelled,
}

impl TimerState {
    fn as_str(self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Armed => "armed",
            TimerState::Fired => "fired",
            TimerState::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone)]
struct SharedTimerState(Arc<AtomicU8>);

impl SharedTimerState {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(TimerState::Idle as u8)))
    }

    fn get(&self) -> TimerState {
        match self.0.load(Ordering::Acquire) {
            0 => TimerState::Idle,
            1 => TimerState::Armed,
            2 => TimerState::Fired,
            _ => TimerState::Cancelled,
        }
    }

    fn set(&self, state: TimerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Toggles the sink between the two configured channels every hop interval.
pub struct HopController {
    interval: Duration,
    tuner: Option<Tuner>,
    clock: Option<Box<dyn HopClock>>,
    events: Sender<HopEvent>,
    monitor: RadioMonitor,
    timer: SharedTimerState,
    cancelled: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl HopController {
    /// Create a controller on the wall clock and tune the sink to channel A.
    pub fn new(config: &RadioConfig, tuner: Tuner, events: Sender<HopEvent>) -> Result<Self> {
        Self::with_clock(config, tuner, events, Box::new(SystemClock))
    }

    /// Create a controller driven by `clock` and tune the sink to channel A.
    pub fn with_clock(
        config: &RadioConfig,
        mut tuner: Tuner,
        events: Sender<HopEvent>,
        clock: Box<dyn HopClock>,
    ) -> Result<Self> {
        config.validate()?;
        let freq = tuner.apply(Channel::A)?;
        info!("Initial center frequency {}", freq);
        Ok(Self {
            interval: config.hop_interval,
            monitor: tuner.monitor(),
            tuner: Some(tuner),
            clock: Some(clock),
            events,
            timer: SharedTimerState::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            worker: None,
        })
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer.get()
    }

    /// Read-only view of the channel the sink is tuned to.
    pub fn monitor(&self) -> RadioMonitor {
        self.monitor.clone()
    }

    /// Arm the timer for one interval from now. Does not block.
    pub fn start(&mut self) -> Result<()> {
        let state = self.timer.get();
        if state != TimerState::Idle {
            return Err(Error::InvalidState {
                component: "hop controller",
                action: "start",
                state: state.as_str(),
            });
        }
        let (Some(tuner), Some(clock)) = (self.tuner.take(), self.clock.take()) else {
            return Err(Error::InvalidState {
                component: "hop controller",
                action: "start",
                state: "consumed",
            });
        };

        let (stop_tx, stop_rx) = flume::bounded(1);
        let schedule = Schedule {
            interval: self.interval,
            tuner,
            clock,
            events: self.events.clone(),
            timer: self.timer.clone(),
            cancelled: Arc::clone(&self.cancelled),
            stop_rx,
        };
        self.timer.set(TimerState::Armed);
        self.worker = Some(thread::spawn(move || schedule.run()));
        self.stop_tx = Some(stop_tx);
        debug!("Hop timer armed every {:?}", self.interval);
        Ok(())
    }

    /// Cancel the schedule.
    ///
    /// A hop that is already applying finishes, but nothing re-arms. Once
    /// this returns the worker has exited and no further hop can fire.
    /// Calling it again, or before `start`, is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        self.cancelled.store(true, Ordering::Release);
        // Dropping the sender wakes a sleeping worker.
        self.stop_tx = None;
        let joined = match self.worker.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::ThreadPanicked("hop controller")),
            None => Ok(()),
        };
        self.timer.set(TimerState::Cancelled);
        joined
    }
}

impl Drop for HopController {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            debug!("Error stopping hop controller: {}", e);
        }
    }
}

/// Everything the hop thread owns.
struct Schedule {
    interval: Duration,
    tuner: Tuner,
    clock: Box<dyn HopClock>,
    events: Sender<HopEvent>,
    timer: SharedTimerState,
    cancelled: Arc<AtomicBool>,
    stop_rx: Receiver<()>,
}

impl Schedule {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn run(mut self) {
        let origin = self.clock.now();
        let mut deadline = origin + self.interval;
        let mut failures = 0;

        loop {
            if !self.clock.sleep_until(deadline, &self.stop_rx) || self.is_cancelled() {
                break;
            }
            self.timer.set(TimerState::Fired);
            let fired_at = self.clock.now();

            let target = self.tuner.current().other();
            match self.tuner.apply(target) {
                Ok(freq) => {
                    failures = 0;
                    info!("Hopped to channel {} ({})", target, freq);
                    let _ = self.events.send(HopEvent::Hopped {
                        channel: target,
                        freq,
                        elapsed: clock::since(origin, fired_at),
                    });
                }
                Err(err) => {
                    failures += 1;
                    if failures >= MAX_CONSECUTIVE_FAILURES {
                        error!("Hop failed {} times in a row, giving up: {}", failures, err);
                        let _ = self.events.send(HopEvent::Fatal(Error::HopEscalated {
                            failures,
                            last: Box::new(err),
                        }));
                        break;
                    }
                    warn!("Hop attempt {} failed: {}", failures, err);
                    let _ = self.events.send(HopEvent::ApplyFailed {
                        attempt: failures,
                        error: err,
                    });
                }
            }

            if self.is_cancelled() {
                break;
            }
            deadline = fired_at + self.interval;
            self.timer.set(TimerState::Armed);
        }

        self.timer.set(TimerState::Cancelled);
        debug!("Hop schedule ended");
    }
}
