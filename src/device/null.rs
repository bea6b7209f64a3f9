use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use num_complex::Complex32;

use super::{DeviceError, GainStage, TxDevice};

/// A device that accepts everything and transmits nothing.
///
/// Useful for dry runs of the full pipeline without hardware attached.
#[derive(Debug, Default)]
pub struct NullDevice {
    center_freq: Mutex<Option<f64>>,
    samples: AtomicU64,
}

impl NullDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last center frequency applied, if any.
    pub fn center_freq(&self) -> Option<f64> {
        self.center_freq.lock().ok().and_then(|freq| *freq)
    }

    /// Total samples accepted so far.
    pub fn samples_written(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }
}

impl TxDevice for NullDevice {
    fn set_sample_rate(&self, rate_hz: f64) -> Result<(), DeviceError> {
        debug!("null: sample rate {} Hz", rate_hz);
        Ok(())
    }

    fn set_center_freq(&self, freq_hz: f64, _channel: usize) -> Result<(), DeviceError> {
        let mut freq = self
            .center_freq
            .lock()
            .map_err(|_| DeviceError::Driver("frequency state poisoned".into()))?;
        *freq = Some(freq_hz);
        Ok(())
    }

    fn set_freq_correction(&self, _ppm: f64, _channel: usize) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_gain(&self, stage: GainStage, db: f64, _channel: usize) -> Result<(), DeviceError> {
        debug!("null: {:?} gain {} dB", stage, db);
        Ok(())
    }

    fn set_antenna(&self, _name: &str, _channel: usize) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_bandwidth(&self, _bandwidth_hz: f64, _channel: usize) -> Result<(), DeviceError> {
        Ok(())
    }

    fn write(&self, samples: &[Complex32]) -> Result<usize, DeviceError> {
        self.samples
            .fetch_add(samples.len() as u64, Ordering::Relaxed);
        Ok(samples.len())
    }
}
