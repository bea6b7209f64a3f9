mod tx;

pub use tx::TxSink;
