use std::sync::Arc;

use log::error;
use rustradio::block::{Block, BlockRet};
use rustradio::graph::CancellationToken;
use rustradio::stream::ReadStream;
use rustradio::{Complex, Error, rustradio_macros};

use super::super::StreamStats;
use crate::device::TxDevice;

/// A sink block that hands the paced sample stream to the transmit device.
#[derive(rustradio_macros::Block)]
#[rustradio(new)]
pub struct TxSink {
    #[rustradio(in)]
    src: ReadStream<Complex>,
    device: Arc<dyn TxDevice>,
    stats: Arc<StreamStats>,
    cancel: CancellationToken,
}

impl Block for TxSink {
    fn work(&mut self) -> Result<BlockRet<'_>, Error> {
        let (input, _tags) = self.src.read_buf()?;
        if input.len() == 0 {
            return Ok(BlockRet::Pending);
        }

        match self.device.write(input.slice()) {
            Ok(n) => {
                self.stats.record_transmitted(n);
                input.consume(n);
                Ok(BlockRet::Again)
            }
            Err(e) => {
                // Nothing downstream can recover from this, take the graph down.
                error!("Transmit failed, stopping pipeline: {}", e);
                self.cancel.cancel();
                Ok(BlockRet::EOF)
            }
        }
    }
}
