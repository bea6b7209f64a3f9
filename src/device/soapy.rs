//! SoapySDR-backed transmitter.
//!
//! Install libSoapySDR and the plugin for your radio
//! (e.g. `soapysdr-module-hackrf`), then build with `--features soapysdr`.

use std::sync::Mutex;

use log::{debug, info};
use num_complex::Complex32;
use soapysdr::{Device, Direction, TxStream};

use super::{DeviceError, GainStage, TX_CHANNEL, TxDevice};

const WRITE_TIMEOUT_US: i64 = 1_000_000;

/// A SoapySDR device streaming on [`TX_CHANNEL`].
pub struct SoapyDevice {
    device: Device,
    stream: Mutex<TxState>,
}

struct TxState {
    stream: TxStream<Complex32>,
    active: bool,
}

impl SoapyDevice {
    pub fn open(args: &str) -> Result<Self, DeviceError> {
        let device = Device::new(args).map_err(|e| {
            debug!("SoapySDR open failed: {}", e);
            DeviceError::NotFound(args.to_string())
        })?;
        let stream = device.tx_stream::<Complex32>(&[TX_CHANNEL]).map_err(driver)?;
        info!("Opened SoapySDR device `{}`", args);
        Ok(Self {
            device,
            stream: Mutex::new(TxState {
                stream,
                active: false,
            }),
        })
    }

    /// Driver gain element for a stage, if the radio exposes one.
    fn gain_element(&self, stage: GainStage, channel: usize) -> Result<Option<String>, DeviceError> {
        let wanted: &[&str] = match stage {
            GainStage::Rf => &["AMP", "RF", "PA"],
            GainStage::If => &["VGA", "IF"],
            GainStage::Baseband => &["BB"],
        };
        let available = self
            .device
            .list_gains(Direction::Tx, channel)
            .map_err(driver)?;
        Ok(available.into_iter().find(|name| wanted.contains(&name.as_str())))
    }
}

fn driver(e: soapysdr::Error) -> DeviceError {
    DeviceError::Driver(e.to_string())
}

impl TxDevice for SoapyDevice {
    fn set_sample_rate(&self, rate_hz: f64) -> Result<(), DeviceError> {
        self.device
            .set_sample_rate(Direction::Tx, TX_CHANNEL, rate_hz)
            .map_err(driver)
    }

    fn set_center_freq(&self, freq_hz: f64, channel: usize) -> Result<(), DeviceError> {
        self.device
            .set_frequency(Direction::Tx, channel, freq_hz, "")
            .map_err(driver)
    }

    fn set_freq_correction(&self, ppm: f64, channel: usize) -> Result<(), DeviceError> {
        self.device
            .set_frequency_correction(Direction::Tx, channel, ppm)
            .map_err(driver)
    }

    fn set_gain(&self, stage: GainStage, db: f64, channel: usize) -> Result<(), DeviceError> {
        match self.gain_element(stage, channel)? {
            Some(name) => self
                .device
                .set_gain_element(Direction::Tx, channel, name.as_str(), db)
                .map_err(driver),
            None => {
                debug!("No {:?} gain element on this device, skipping", stage);
                Ok(())
            }
        }
    }

    fn set_antenna(&self, name: &str, channel: usize) -> Result<(), DeviceError> {
        self.device
            .set_antenna(Direction::Tx, channel, name)
            .map_err(driver)
    }

    fn set_bandwidth(&self, bandwidth_hz: f64, channel: usize) -> Result<(), DeviceError> {
        self.device
            .set_bandwidth(Direction::Tx, channel, bandwidth_hz)
            .map_err(driver)
    }

    fn write(&self, samples: &[Complex32]) -> Result<usize, DeviceError> {
        let mut tx = self
            .stream
            .lock()
            .map_err(|_| DeviceError::Driver("tx stream poisoned".into()))?;
        if !tx.active {
            tx.stream.activate(None).map_err(driver)?;
            tx.active = true;
        }
        tx.stream
            .write_all(&[samples], None, false, WRITE_TIMEOUT_US)
            .map_err(driver)?;
        Ok(samples.len())
    }
}

impl Drop for SoapyDevice {
    fn drop(&mut self) {
        if let Ok(mut tx) = self.stream.lock() {
            if tx.active {
                if let Err(e) = tx.stream.deactivate(None) {
                    debug!("Error deactivating tx stream: {}", e);
                }
            }
        }
    }
}
