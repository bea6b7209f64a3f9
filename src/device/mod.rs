//! Transmit device abstraction.
//!
//! The pipeline and the hop controller share one [`TxDevice`] through an
//! `Arc`. Setters take `&self`, so every implementation synchronises its own
//! state; a frequency apply from the hop thread may land while the graph
//! thread is inside `write`.

mod file;
mod null;
#[cfg(feature = "soapysdr")]
mod soapy;

use std::sync::Arc;

use log::debug;
use num_complex::Complex32;
use thiserror::Error;

pub use file::FileDevice;
pub use null::NullDevice;
#[cfg(feature = "soapysdr")]
pub use soapy::SoapyDevice;

/// Channel index used for every setter and for the sample stream.
pub const TX_CHANNEL: usize = 0;

/// Errors reported by device drivers.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no device matches `{0}`")]
    NotFound(String),

    #[error("driver error: {0}")]
    Driver(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Independent gain stages of the transmit chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GainStage {
    /// RF amplifier.
    Rf,
    /// Intermediate frequency (VGA) stage.
    If,
    /// Baseband stage.
    Baseband,
}

/// A radio that accepts a complex sample stream for transmission.
pub trait TxDevice: Send + Sync {
    fn set_sample_rate(&self, rate_hz: f64) -> Result<(), DeviceError>;

    /// Retune the transmit path. Takes effect on the live stream.
    fn set_center_freq(&self, freq_hz: f64, channel: usize) -> Result<(), DeviceError>;

    fn set_freq_correction(&self, ppm: f64, channel: usize) -> Result<(), DeviceError>;

    fn set_gain(&self, stage: GainStage, db: f64, channel: usize) -> Result<(), DeviceError>;

    fn set_antenna(&self, name: &str, channel: usize) -> Result<(), DeviceError>;

    fn set_bandwidth(&self, bandwidth_hz: f64, channel: usize) -> Result<(), DeviceError>;

    /// Transmit samples on [`TX_CHANNEL`].
    /// Returns how many samples the device accepted.
    fn write(&self, samples: &[Complex32]) -> Result<usize, DeviceError>;
}

/// Opens devices from a selector string.
pub trait DeviceDriver {
    fn open(&self, selector: &str) -> Result<Arc<dyn TxDevice>, DeviceError>;
}

/// Default driver.
///
/// Selectors:
/// - `null` discards samples
/// - `file=<path>` writes interleaved little-endian f32 I/Q pairs to `path`
/// - anything else is passed to SoapySDR (requires the `soapysdr` feature)
#[derive(Debug, Default, Clone, Copy)]
pub struct SdrDriver;

impl DeviceDriver for SdrDriver {
    fn open(&self, selector: &str) -> Result<Arc<dyn TxDevice>, DeviceError> {
        debug!("Opening device `{}`", selector);
        if selector == "null" {
            return Ok(Arc::new(NullDevice::new()));
        }
        if let Some(path) = selector.strip_prefix("file=") {
            return Ok(Arc::new(FileDevice::create(path)?));
        }
        open_hardware(selector)
    }
}

#[cfg(feature = "soapysdr")]
fn open_hardware(selector: &str) -> Result<Arc<dyn TxDevice>, DeviceError> {
    Ok(Arc::new(SoapyDevice::open(selector)?))
}

#[cfg(not(feature = "soapysdr"))]
fn open_hardware(selector: &str) -> Result<Arc<dyn TxDevice>, DeviceError> {
    debug!("Built without SoapySDR support, cannot open `{}`", selector);
    Err(DeviceError::NotFound(selector.to_string()))
}
