use std::time::Duration;

use crate::error::{Error, Result};
use crate::units::{Decibels, Hertz};

/// Fixed radio parameters for one run of the transmitter.
///
/// Nothing here changes once the pipeline is built. The hop controller only
/// ever picks between `channel_a` and `channel_b`.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioConfig {
    /// Driver selector handed to the device driver, e.g. `hackrf=117ca7`.
    pub device_args: String,
    /// Complex samples per second through the pipeline and into the sink.
    pub sample_rate: Hertz,
    /// Initial center frequency.
    pub channel_a: Hertz,
    /// Alternate center frequency.
    pub channel_b: Hertz,
    /// Noise amplitude; complex power of the generated noise is amplitude².
    pub noise_amplitude: f32,
    /// Time between hops, measured from each fire.
    pub hop_interval: Duration,
    pub freq_correction_ppm: f64,
    pub rf_gain: Decibels,
    pub if_gain: Decibels,
    pub bb_gain: Decibels,
    /// Antenna port name. Empty keeps the driver default.
    pub antenna: String,
    pub bandwidth: Hertz,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            device_args: "hackrf=117ca7".to_string(),
            sample_rate: Hertz::mhz(20.0),
            channel_a: Hertz(2.465e9),
            channel_b: Hertz(2.46e9),
            noise_amplitude: 100.0,
            hop_interval: Duration::from_secs(2),
            freq_correction_ppm: 0.0,
            rf_gain: Decibels(14.0),
            if_gain: Decibels(62.0),
            bb_gain: Decibels(0.0),
            antenna: String::new(),
            bandwidth: Hertz::mhz(20.0),
        }
    }
}

impl RadioConfig {
    /// Check the invariants every component relies on.
    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_positive() {
            return Err(invalid(format!("sample rate {} must be positive", self.sample_rate.0)));
        }
        if !self.channel_a.is_positive() || !self.channel_b.is_positive() {
            return Err(invalid(format!(
                "channel frequencies must be positive (a={}, b={})",
                self.channel_a.0, self.channel_b.0
            )));
        }
        if self.channel_a == self.channel_b {
            return Err(invalid(format!(
                "channels must differ, both are {}",
                self.channel_a
            )));
        }
        if self.hop_interval.is_zero() {
            return Err(invalid("hop interval must be non-zero".to_string()));
        }
        if !self.noise_amplitude.is_finite() || self.noise_amplitude < 0.0 {
            return Err(invalid(format!(
                "noise amplitude {} must be finite and non-negative",
                self.noise_amplitude
            )));
        }
        if !self.freq_correction_ppm.is_finite() {
            return Err(invalid("frequency correction must be finite".to_string()));
        }
        if !self.bandwidth.is_positive() {
            return Err(invalid(format!("bandwidth {} must be positive", self.bandwidth.0)));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> Error {
    Error::InvalidConfig(msg)
}
