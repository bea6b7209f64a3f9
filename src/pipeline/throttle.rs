use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;
use rustradio::block::{Block, BlockRet};
use rustradio::stream::{ReadStream, WriteStream};
use rustradio::{Complex, Error, rustradio_macros};

use super::StreamStats;
use crate::error::Error as TxError;

/// How far the stream may fall behind the sample clock before it counts as
/// an underrun.
pub const MAX_LAG: Duration = Duration::from_millis(100);

/// Upper bound on a single pacing sleep, so cancellation stays responsive.
const MAX_SLEEP: Duration = Duration::from_millis(5);

/// Outcome of one pacing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pace {
    /// Samples that may be released now.
    pub allowed: usize,
    /// Set when the stream had fallen more than [`MAX_LAG`] behind; holds the
    /// lag in samples.
    pub underrun: Option<u64>,
}

/// Wall-clock sample pacer.
///
/// Releases samples no faster than `rate` per second, measured from the
/// first poll. When the stream falls too far behind, the backlog is dropped
/// and the clock restarts instead of bursting to catch up.
#[derive(Debug, Clone)]
pub struct Pacer {
    rate: f64,
    origin: Option<Instant>,
    released: u64,
    max_lag: u64,
}

impl Pacer {
    pub fn new(rate: f64) -> Self {
        let rate = rate.max(1.0);
        Self {
            rate,
            origin: None,
            released: 0,
            max_lag: (rate * MAX_LAG.as_secs_f64()).ceil() as u64,
        }
    }

    fn due(&self, origin: Instant, now: Instant) -> u64 {
        (now.saturating_duration_since(origin).as_secs_f64() * self.rate) as u64
    }

    /// Decide how many of `available` samples may go out at `now`.
    pub fn poll(&mut self, now: Instant, available: usize) -> Pace {
        let origin = *self.origin.get_or_insert(now);
        let backlog = self.due(origin, now).saturating_sub(self.released);
        if backlog > self.max_lag {
            self.origin = Some(now);
            self.released = 0;
            return Pace {
                allowed: 0,
                underrun: Some(backlog),
            };
        }
        let allowed = (backlog as usize).min(available);
        self.released += allowed as u64;
        Pace {
            allowed,
            underrun: None,
        }
    }

    /// Time until the next sample is due.
    pub fn until_next(&self, now: Instant) -> Duration {
        let Some(origin) = self.origin else {
            return Duration::ZERO;
        };
        let next_at = Duration::from_secs_f64((self.released + 1) as f64 / self.rate);
        next_at.saturating_sub(now.saturating_duration_since(origin))
    }
}

/// Rate limiter block: passes samples through at the configured sample rate.
#[derive(rustradio_macros::Block)]
pub struct Throttle {
    #[rustradio(in)]
    src: ReadStream<Complex>,
    #[rustradio(out)]
    dst: WriteStream<Complex>,
    pacer: Pacer,
    stats: Arc<StreamStats>,
}

impl Throttle {
    pub fn new(
        src: ReadStream<Complex>,
        rate: f64,
        stats: Arc<StreamStats>,
    ) -> (Self, ReadStream<Complex>) {
        let (dst, prev) = rustradio::stream::new_stream();
        (
            Self {
                src,
                dst,
                pacer: Pacer::new(rate),
                stats,
            },
            prev,
        )
    }
}

impl Block for Throttle {
    fn work(&mut self) -> std::result::Result<BlockRet<'_>, Error> {
        let (input, _tags) = self.src.read_buf()?;
        let mut output = self.dst.write_buf()?;
        let room = input.len().min(output.len());

        let now = Instant::now();
        let pace = self.pacer.poll(now, room);
        if let Some(lag) = pace.underrun {
            self.stats.record_underrun();
            warn!("{}", TxError::PipelineUnderrun { lag });
            return Ok(BlockRet::Again);
        }
        if room == 0 {
            return Ok(BlockRet::Pending);
        }
        if pace.allowed == 0 {
            std::thread::sleep(self.pacer.until_next(now).min(MAX_SLEEP));
            return Ok(BlockRet::Again);
        }

        let n = pace.allowed;
        output.slice()[..n].copy_from_slice(&input.slice()[..n]);
        input.consume(n);
        output.produce(n, &[]);
        Ok(BlockRet::Again)
    }
}
