use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use log::{debug, info};
use num_complex::Complex32;

use super::{DeviceError, GainStage, TxDevice};

/// File-backed transmit device that records the sample stream to disk.
/// Writes interleaved I/Q samples as little-endian f32 pairs.
/// Tuning calls are accepted and logged; they do not affect the recording.
#[derive(Debug)]
pub struct FileDevice {
    out: Mutex<BufWriter<File>>,
}

impl FileDevice {
    /// Create (or truncate) the recording at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, DeviceError> {
        let file = File::create(path.as_ref())?;
        debug!("Recording transmit stream to {}", path.as_ref().display());
        Ok(Self {
            out: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Flush buffered samples to disk.
    pub fn flush(&self) -> Result<(), DeviceError> {
        self.lock()?.flush()?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BufWriter<File>>, DeviceError> {
        self.out
            .lock()
            .map_err(|_| DeviceError::Driver("recording writer poisoned".into()))
    }
}

impl TxDevice for FileDevice {
    fn set_sample_rate(&self, rate_hz: f64) -> Result<(), DeviceError> {
        debug!("file: sample rate {} Hz", rate_hz);
        Ok(())
    }

    fn set_center_freq(&self, freq_hz: f64, channel: usize) -> Result<(), DeviceError> {
        info!("file: channel {} tuned to {:.3} MHz", channel, freq_hz / 1e6);
        Ok(())
    }

    fn set_freq_correction(&self, _ppm: f64, _channel: usize) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_gain(&self, stage: GainStage, db: f64, _channel: usize) -> Result<(), DeviceError> {
        debug!("file: {:?} gain {} dB", stage, db);
        Ok(())
    }

    fn set_antenna(&self, _name: &str, _channel: usize) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_bandwidth(&self, _bandwidth_hz: f64, _channel: usize) -> Result<(), DeviceError> {
        Ok(())
    }

    fn write(&self, samples: &[Complex32]) -> Result<usize, DeviceError> {
        let mut bytes = Vec::with_capacity(samples.len() * 2 * std::mem::size_of::<f32>());
        for sample in samples {
            bytes.extend_from_slice(&sample.re.to_le_bytes());
            bytes.extend_from_slice(&sample.im.to_le_bytes());
        }
        self.lock()?.write_all(&bytes)?;
        Ok(samples.len())
    }
}

impl Drop for FileDevice {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            debug!("Error flushing recording: {}", e);
        }
    }
}
