//! Continuous noise transmitter that hops its carrier between two channels.
//!
//! A rustradio graph streams complex Gaussian noise, paced to the sample
//! rate, into a transmit device. Independently, a hop controller retunes
//! the same device between two fixed frequencies on a wall-clock timer.
//! [`Lifecycle`] wires both together and tears them down in order.

pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod hop;
pub mod lifecycle;
pub mod pipeline;
pub mod radio;
pub mod units;

pub use config::RadioConfig;
pub use error::{Error, Result};
pub use event::HopEvent;
pub use hop::HopController;
pub use lifecycle::Lifecycle;
pub use pipeline::Pipeline;
pub use radio::{Channel, RadioMonitor, Tuner};
pub use units::{Decibels, Hertz};
