use std::time::Duration;

use thiserror::Error;

use crate::device::DeviceError;

/// Result type for transmitter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the transmitter core.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid radio configuration: {0}")]
    InvalidConfig(String),

    /// The sink could not be opened or configured. Fatal at startup.
    #[error("device unavailable ({selector}): {source}")]
    DeviceUnavailable {
        selector: String,
        #[source]
        source: DeviceError,
    },

    /// A runtime setter call failed. Retried on the next scheduled hop.
    #[error("failed to apply {setting} to device: {source}")]
    DeviceApplyFailure {
        setting: &'static str,
        #[source]
        source: DeviceError,
    },

    #[error("frequency hop failed {failures} consecutive times")]
    HopEscalated {
        failures: u32,
        #[source]
        last: Box<Error>,
    },

    #[error("rate limiter fell {lag} samples behind the sample clock")]
    PipelineUnderrun { lag: u64 },

    #[error("pipeline did not quiesce within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("graph error: {0}")]
    Graph(String),

    #[error("{component} cannot {action} while {state}")]
    InvalidState {
        component: &'static str,
        action: &'static str,
        state: &'static str,
    },

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
