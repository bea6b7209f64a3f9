use std::sync::Arc;

use rustradio::graph::{Graph, GraphRunner};

use super::StreamStats;
use super::sinks::TxSink;
use super::sources::{ComplexGaussian, NoiseSource};
use super::throttle::Throttle;
use crate::config::RadioConfig;
use crate::device::TxDevice;

/// Build the transmit graph: noise source → throttle → device sink.
pub fn build_graph(
    config: &RadioConfig,
    noise: ComplexGaussian,
    device: Arc<dyn TxDevice>,
    stats: Arc<StreamStats>,
) -> Graph {
    let mut graph = Graph::new();
    let cancel = graph.cancel_token();

    let (noise_source, prev) = NoiseSource::new(noise);
    let (throttle, prev) = Throttle::new(prev, config.sample_rate.as_hz(), stats.clone());
    let tx_sink = TxSink::new(prev, device, stats, cancel);

    graph.add(Box::new(noise_source));
    graph.add(Box::new(throttle));
    graph.add(Box::new(tx_sink));

    graph
}
