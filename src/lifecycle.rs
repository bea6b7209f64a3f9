//! Startup, supervision and ordered teardown of the transmitter.

use std::io::Write;
use std::time::Duration;

use flume::{Receiver, Selector};
use log::{error, info, warn};

use crate::config::RadioConfig;
use crate::device::DeviceDriver;
use crate::error::Result;
use crate::event::HopEvent;
use crate::hop::{HopClock, HopController, SystemClock};
use crate::pipeline::Pipeline;

/// How long teardown waits for the transmit graph to quiesce.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Runs the pipeline and the hop controller until a stop is requested.
pub struct Lifecycle {
    config: RadioConfig,
    clock: Box<dyn HopClock>,
    grace: Duration,
    stop_hint: Option<String>,
}

enum Wake {
    Stop,
    Event(HopEvent),
}

impl Lifecycle {
    pub fn new(config: RadioConfig) -> Self {
        Self {
            config,
            clock: Box::new(SystemClock),
            grace: SHUTDOWN_GRACE,
            stop_hint: None,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn HopClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Extra line printed once streaming has started, telling the operator
    /// how to stop.
    pub fn with_stop_hint(mut self, hint: impl Into<String>) -> Self {
        self.stop_hint = Some(hint.into());
        self
    }

    /// Start everything, block until `stop` fires (a message or a
    /// disconnect), then tear down.
    ///
    /// Startup order is pipeline (opens and configures the device), initial
    /// tune, pipeline start, controller start. Teardown always runs over
    /// whatever was constructed: controller first, then the pipeline, so no
    /// hop can touch the device once the graph is going away.
    pub fn run<W: Write>(
        self,
        driver: &dyn DeviceDriver,
        stop: Receiver<()>,
        console: &mut W,
    ) -> Result<()> {
        let Lifecycle {
            config,
            clock,
            grace,
            stop_hint,
        } = self;
        let (events_tx, events_rx) = flume::unbounded();
        let mut pipeline = None;
        let mut controller = None;

        let outcome = startup(&config, driver, clock, events_tx, &mut pipeline, &mut controller)
            .and_then(|()| {
                say(
                    console,
                    format_args!(
                        "Transmitter started: hopping between {} and {} every {:?}",
                        config.channel_a, config.channel_b, config.hop_interval
                    ),
                );
                if let Some(hint) = &stop_hint {
                    say(console, format_args!("{}", hint));
                }
                supervise(&stop, &events_rx, console)
            });
        if let Err(e) = &outcome {
            error!("Transmitter failed: {}", e);
            say(console, format_args!("Transmitter failed: {}", e));
        }

        let started = pipeline.is_some();
        let teardown = teardown(controller, pipeline, grace);
        if let Err(e) = &teardown {
            say(console, format_args!("Shutdown failed: {}", e));
        }
        if started {
            say(console, format_args!("Transmitter stopped"));
        }

        match (outcome, teardown) {
            (Err(e), Err(t)) => {
                warn!("Teardown also failed: {}", t);
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(()),
        }
    }
}

fn startup(
    config: &RadioConfig,
    driver: &dyn DeviceDriver,
    clock: Box<dyn HopClock>,
    events: flume::Sender<HopEvent>,
    pipeline: &mut Option<Pipeline>,
    controller: &mut Option<HopController>,
) -> Result<()> {
    let (built, tuner) = Pipeline::open(config, driver)?;
    let pipeline = pipeline.insert(built);
    let controller = controller.insert(HopController::with_clock(config, tuner, events, clock)?);
    pipeline.start()?;
    controller.start()?;
    Ok(())
}

fn supervise<W: Write>(
    stop: &Receiver<()>,
    events: &Receiver<HopEvent>,
    console: &mut W,
) -> Result<()> {
    loop {
        let wake = Selector::new()
            .recv(stop, |_| Wake::Stop)
            .recv(events, |event| event.map_or(Wake::Stop, Wake::Event))
            .wait();
        match wake {
            Wake::Stop => {
                info!("Stop requested");
                return Ok(());
            }
            Wake::Event(HopEvent::Hopped { freq, .. }) => {
                say(
                    console,
                    format_args!("Center frequency switched: {:.3} MHz", freq.as_mhz()),
                );
            }
            Wake::Event(HopEvent::ApplyFailed { attempt, error }) => {
                say(
                    console,
                    format_args!("Frequency hop attempt {} failed: {}", attempt, error),
                );
            }
            Wake::Event(HopEvent::Fatal(e)) => return Err(e),
        }
    }
}

fn teardown(
    controller: Option<HopController>,
    pipeline: Option<Pipeline>,
    grace: Duration,
) -> Result<()> {
    let mut result = Ok(());
    if let Some(mut controller) = controller {
        if let Err(e) = controller.stop() {
            warn!("Stopping hop controller: {}", e);
            result = Err(e);
        }
    }
    if let Some(mut pipeline) = pipeline {
        pipeline.stop();
        if let Err(e) = pipeline.wait_timeout(grace) {
            error!("Stopping pipeline: {}", e);
            result = result.and(Err(e));
        }
    }
    result
}

fn say<W: Write>(console: &mut W, line: std::fmt::Arguments<'_>) {
    if let Err(e) = writeln!(console, "{}", line) {
        warn!("Console write failed: {}", e);
    }
}
