use std::time::Duration;

use crate::error::Error;
use crate::radio::Channel;
use crate::units::Hertz;

/// Notifications sent from the hop controller.
#[derive(Debug)]
pub enum HopEvent {
    /// The sink was retuned.
    Hopped {
        channel: Channel,
        freq: Hertz,
        /// Time since the controller started, at the fire that caused the hop.
        elapsed: Duration,
    },
    /// A hop could not be applied; the schedule keeps running.
    ApplyFailed { attempt: u32, error: Error },
    /// The controller gave up; no further hops will happen.
    Fatal(Error),
}
