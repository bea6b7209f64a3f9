#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use hoptx::device::{DeviceDriver, DeviceError, GainStage, TxDevice};
use hoptx::{Hertz, RadioConfig};
use num_complex::Complex32;

pub const CHANNEL_A: f64 = 2.465e9;
pub const CHANNEL_B: f64 = 2.46e9;

// Test helpers to reduce boilerplate

pub fn test_config() -> RadioConfig {
    RadioConfig {
        device_args: "mock=0".to_string(),
        sample_rate: Hertz(100_000.0),
        channel_a: Hertz(CHANNEL_A),
        channel_b: Hertz(CHANNEL_B),
        noise_amplitude: 1.0,
        hop_interval: Duration::from_secs(2),
        ..Default::default()
    }
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Mock transmitter that records every call.
#[derive(Default)]
pub struct RecordingDevice {
    settings: Mutex<Vec<&'static str>>,
    tuned: Mutex<Vec<f64>>,
    tune_attempts: AtomicUsize,
    tune_script: Mutex<VecDeque<bool>>,
    fail_sample_rate: AtomicBool,
    fail_writes: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
    write_gate: Mutex<Option<flume::Receiver<()>>>,
    parked_writes: AtomicUsize,
    samples: AtomicU64,
}

impl RecordingDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script upcoming `set_center_freq` results; `true` fails that call.
    /// Calls past the end of the script succeed.
    pub fn script_tunes(&self, fails: &[bool]) {
        self.tune_script.lock().unwrap().extend(fails.iter().copied());
    }

    pub fn fail_sample_rate(&self) {
        self.fail_sample_rate.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Make every write take at least `delay`.
    pub fn slow_writes(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }

    /// Park every write until the returned sender is used or dropped.
    pub fn block_writes(&self) -> flume::Sender<()> {
        let (release, gate) = flume::bounded(0);
        *self.write_gate.lock().unwrap() = Some(gate);
        release
    }

    /// Writes that have entered the parked state.
    pub fn parked_writes(&self) -> usize {
        self.parked_writes.load(Ordering::SeqCst)
    }

    /// Successfully applied center frequencies, in order.
    pub fn tuned(&self) -> Vec<f64> {
        self.tuned.lock().unwrap().clone()
    }

    /// Every `set_center_freq` call, successful or not.
    pub fn tune_attempts(&self) -> usize {
        self.tune_attempts.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> Vec<&'static str> {
        self.settings.lock().unwrap().clone()
    }

    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::SeqCst)
    }

    fn record(&self, setting: &'static str) {
        self.settings.lock().unwrap().push(setting);
    }
}

impl TxDevice for RecordingDevice {
    fn set_sample_rate(&self, _rate_hz: f64) -> Result<(), DeviceError> {
        if self.fail_sample_rate.load(Ordering::SeqCst) {
            return Err(DeviceError::Driver("sample rate rejected".into()));
        }
        self.record("sample_rate");
        Ok(())
    }

    fn set_center_freq(&self, freq_hz: f64, _channel: usize) -> Result<(), DeviceError> {
        self.tune_attempts.fetch_add(1, Ordering::SeqCst);
        let fail = self.tune_script.lock().unwrap().pop_front().unwrap_or(false);
        if fail {
            return Err(DeviceError::Driver("synthesizer did not lock".into()));
        }
        self.tuned.lock().unwrap().push(freq_hz);
        Ok(())
    }

    fn set_freq_correction(&self, _ppm: f64, _channel: usize) -> Result<(), DeviceError> {
        self.record("freq_correction");
        Ok(())
    }

    fn set_gain(&self, stage: GainStage, _db: f64, _channel: usize) -> Result<(), DeviceError> {
        self.record(match stage {
            GainStage::Rf => "rf_gain",
            GainStage::If => "if_gain",
            GainStage::Baseband => "bb_gain",
        });
        Ok(())
    }

    fn set_antenna(&self, _name: &str, _channel: usize) -> Result<(), DeviceError> {
        self.record("antenna");
        Ok(())
    }

    fn set_bandwidth(&self, _bandwidth_hz: f64, _channel: usize) -> Result<(), DeviceError> {
        self.record("bandwidth");
        Ok(())
    }

    fn write(&self, samples: &[Complex32]) -> Result<usize, DeviceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DeviceError::Driver("usb transfer failed".into()));
        }
        let gate = self.write_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.parked_writes.fetch_add(1, Ordering::SeqCst);
            let _ = gate.recv();
        }
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        self.samples.fetch_add(samples.len() as u64, Ordering::SeqCst);
        Ok(samples.len())
    }
}

/// Driver handing out one recording device, or nothing.
pub struct RecordingDriver {
    device: Option<Arc<RecordingDevice>>,
    opens: AtomicUsize,
}

impl RecordingDriver {
    pub fn with(device: Arc<RecordingDevice>) -> Self {
        Self {
            device: Some(device),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn absent() -> Self {
        Self {
            device: None,
            opens: AtomicUsize::new(0),
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl DeviceDriver for RecordingDriver {
    fn open(&self, selector: &str) -> Result<Arc<dyn TxDevice>, DeviceError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match &self.device {
            Some(device) => Ok(device.clone() as Arc<dyn TxDevice>),
            None => Err(DeviceError::NotFound(selector.to_string())),
        }
    }
}

/// Console buffer readable while the lifecycle thread writes to it.
#[derive(Clone, Default)]
pub struct SharedConsole(Arc<Mutex<Vec<u8>>>);

impl SharedConsole {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedConsole {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
