//! The continuous transmit pipeline.
//!
//! Three rustradio blocks wired in a fixed order and run on their own
//! thread once started:
//!
//! ```text
//! NoiseSource ──▶ Throttle ──▶ TxSink ──▶ TxDevice
//! ```
//!
//! The pipeline never reads the center frequency. Retuning happens through
//! the [`Tuner`] returned alongside it, directly on the shared device.

mod graph;
mod sinks;
mod sources;
pub mod throttle;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError};
use log::{debug, info};
use rustradio::graph::{CancellationToken, Graph, GraphRunner};

use crate::config::RadioConfig;
use crate::device::{DeviceDriver, DeviceError, GainStage, TX_CHANNEL, TxDevice};
use crate::error::{Error, Result};
use crate::radio::Tuner;

pub use sources::ComplexGaussian;

/// Lifecycle of a [`Pipeline`]. There is no way back from `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Constructed,
    Running,
    Stopped,
}

impl PipelineState {
    fn as_str(self) -> &'static str {
        match self {
            PipelineState::Constructed => "constructed",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }
}

/// Counters shared with the running graph.
#[derive(Debug, Default)]
pub struct StreamStats {
    transmitted: AtomicU64,
    underruns: AtomicU64,
}

impl StreamStats {
    pub fn samples_transmitted(&self) -> u64 {
        self.transmitted.load(Ordering::Relaxed)
    }

    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    pub(crate) fn record_transmitted(&self, n: usize) {
        self.transmitted.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }
}

type GraphResult = std::result::Result<(), rustradio::Error>;

/// Handle over the noise → throttle → sink graph.
pub struct Pipeline {
    state: PipelineState,
    graph: Option<Graph>,
    cancel: CancellationToken,
    worker: Option<thread::JoinHandle<GraphResult>>,
    done_rx: Option<Receiver<()>>,
    stats: Arc<StreamStats>,
}

impl Pipeline {
    /// Open the configured device through `driver` and build the pipeline on it.
    pub fn open(config: &RadioConfig, driver: &dyn DeviceDriver) -> Result<(Self, Tuner)> {
        config.validate()?;
        let device = driver
            .open(&config.device_args)
            .map_err(|source| unavailable(config, source))?;
        Self::new(config, device)
    }

    /// Configure `device` and build the pipeline on it.
    ///
    /// Every setter except the center frequency is applied here, before any
    /// sample is streamed. The center frequency belongs to the returned
    /// [`Tuner`].
    pub fn new(config: &RadioConfig, device: Arc<dyn TxDevice>) -> Result<(Self, Tuner)> {
        config.validate()?;
        configure_device(config, device.as_ref()).map_err(|source| unavailable(config, source))?;

        let noise = ComplexGaussian::new(config.noise_amplitude)?;
        let stats = Arc::new(StreamStats::default());
        let graph = graph::build_graph(config, noise, Arc::clone(&device), Arc::clone(&stats));
        let cancel = graph.cancel_token();
        debug!(
            "Constructed pipeline at {} with noise amplitude {}",
            config.sample_rate, config.noise_amplitude
        );

        let pipeline = Self {
            state: PipelineState::Constructed,
            graph: Some(graph),
            cancel,
            worker: None,
            done_rx: None,
            stats,
        };
        Ok((pipeline, Tuner::new(device, config)))
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> Arc<StreamStats> {
        Arc::clone(&self.stats)
    }

    /// Start streaming on a dedicated thread. Does not block.
    pub fn start(&mut self) -> Result<()> {
        let graph = match (self.state, self.graph.take()) {
            (PipelineState::Constructed, Some(graph)) => graph,
            (state, graph) => {
                self.graph = graph;
                return Err(Error::InvalidState {
                    component: "pipeline",
                    action: "start",
                    state: state.as_str(),
                });
            }
        };

        let (done_tx, done_rx) = flume::bounded(1);
        let mut graph = graph;
        let handle = thread::spawn(move || {
            let result = graph.run();
            let _ = done_tx.send(());
            result
        });

        self.worker = Some(handle);
        self.done_rx = Some(done_rx);
        self.state = PipelineState::Running;
        info!("Pipeline running");
        Ok(())
    }

    /// Request the graph to stop. Safe before `start` and safe to repeat.
    pub fn stop(&mut self) {
        match self.state {
            PipelineState::Constructed => {
                self.graph = None;
            }
            PipelineState::Running => {
                debug!("Cancelling transmit graph");
                self.cancel.cancel();
            }
            PipelineState::Stopped => return,
        }
        self.state = PipelineState::Stopped;
    }

    /// Block until the graph thread has exited.
    ///
    /// Once this returns, no further samples reach the device.
    pub fn wait(&mut self) -> Result<()> {
        if let Some(done_rx) = self.done_rx.take() {
            // Disconnected means the thread is gone as well.
            let _ = done_rx.recv();
        }
        self.join()
    }

    /// Like [`Pipeline::wait`], but gives up after `grace`.
    pub fn wait_timeout(&mut self, grace: Duration) -> Result<()> {
        if let Some(done_rx) = &self.done_rx {
            if let Err(RecvTimeoutError::Timeout) = done_rx.recv_timeout(grace) {
                return Err(Error::ShutdownTimeout(grace));
            }
            self.done_rx = None;
        }
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        let Some(handle) = self.worker.take() else {
            return Ok(());
        };
        let result = handle
            .join()
            .map_err(|_| Error::ThreadPanicked("pipeline"))?;
        debug!("Transmit graph thread finished");
        result.map_err(|e| Error::Graph(e.to_string()))
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.state == PipelineState::Running {
            self.cancel.cancel();
        }
    }
}

fn unavailable(config: &RadioConfig, source: DeviceError) -> Error {
    Error::DeviceUnavailable {
        selector: config.device_args.clone(),
        source,
    }
}

fn configure_device(config: &RadioConfig, device: &dyn TxDevice) -> std::result::Result<(), DeviceError> {
    device.set_sample_rate(config.sample_rate.as_hz())?;
    device.set_freq_correction(config.freq_correction_ppm, TX_CHANNEL)?;
    device.set_gain(GainStage::Rf, config.rf_gain.as_db(), TX_CHANNEL)?;
    device.set_gain(GainStage::If, config.if_gain.as_db(), TX_CHANNEL)?;
    device.set_gain(GainStage::Baseband, config.bb_gain.as_db(), TX_CHANNEL)?;
    if !config.antenna.is_empty() {
        device.set_antenna(&config.antenna, TX_CHANNEL)?;
    }
    device.set_bandwidth(config.bandwidth.as_hz(), TX_CHANNEL)?;
    Ok(())
}
