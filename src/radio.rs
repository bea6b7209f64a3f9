//! Live tuning state of the transmitter.
//!
//! The current center frequency is stored as a [`Channel`], never as a raw
//! frequency, so it can only ever be one of the two configured values.
//! [`Tuner`] is the single writer; it is not `Clone` and is moved into the
//! hop controller. Anyone else observes through a [`RadioMonitor`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use log::debug;

use crate::config::RadioConfig;
use crate::device::{TX_CHANNEL, TxDevice};
use crate::error::{Error, Result};
use crate::units::Hertz;

/// One of the two hop channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    A,
    B,
}

impl Channel {
    /// The channel a hop from `self` lands on.
    pub fn other(self) -> Self {
        match self {
            Channel::A => Channel::B,
            Channel::B => Channel::A,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Channel::A => 0,
            Channel::B => 1,
        }
    }

    fn from_u8(v: u8) -> Self {
        if v == 0 { Channel::A } else { Channel::B }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::A => write!(f, "A"),
            Channel::B => write!(f, "B"),
        }
    }
}

/// Writer handle over the sink's center frequency.
pub struct Tuner {
    device: Arc<dyn TxDevice>,
    channel_a: Hertz,
    channel_b: Hertz,
    current: Arc<AtomicU8>,
}

impl Tuner {
    pub(crate) fn new(device: Arc<dyn TxDevice>, config: &RadioConfig) -> Self {
        Self {
            device,
            channel_a: config.channel_a,
            channel_b: config.channel_b,
            current: Arc::new(AtomicU8::new(Channel::A.to_u8())),
        }
    }

    pub fn freq_of(&self, channel: Channel) -> Hertz {
        match channel {
            Channel::A => self.channel_a,
            Channel::B => self.channel_b,
        }
    }

    pub fn current(&self) -> Channel {
        Channel::from_u8(self.current.load(Ordering::Acquire))
    }

    pub fn current_freq(&self) -> Hertz {
        self.freq_of(self.current())
    }

    /// Tune the sink to `channel`.
    ///
    /// The recorded channel only changes once the device accepted the new
    /// frequency, so a failed apply leaves the previous state in place.
    pub fn apply(&mut self, channel: Channel) -> Result<Hertz> {
        let freq = self.freq_of(channel);
        self.device
            .set_center_freq(freq.as_hz(), TX_CHANNEL)
            .map_err(|source| Error::DeviceApplyFailure {
                setting: "center frequency",
                source,
            })?;
        self.current.store(channel.to_u8(), Ordering::Release);
        debug!("Tuned to channel {} ({})", channel, freq);
        Ok(freq)
    }

    pub fn monitor(&self) -> RadioMonitor {
        RadioMonitor {
            channel_a: self.channel_a,
            channel_b: self.channel_b,
            current: Arc::clone(&self.current),
        }
    }
}

/// Read-only view of the current channel.
#[derive(Debug, Clone)]
pub struct RadioMonitor {
    channel_a: Hertz,
    channel_b: Hertz,
    current: Arc<AtomicU8>,
}

impl RadioMonitor {
    pub fn current(&self) -> Channel {
        Channel::from_u8(self.current.load(Ordering::Acquire))
    }

    pub fn current_freq(&self) -> Hertz {
        match self.current() {
            Channel::A => self.channel_a,
            Channel::B => self.channel_b,
        }
    }
}
