// Stages module - concrete pipeline stages
//
// - Tee: logs main current to a text file, forwards buffers unchanged
// - SampleAggregator: running count/sum after a warm-up period (parallel)
// - DownSampler: integer-factor block averaging with cross-buffer carry

pub mod aggregator;
pub mod downsampler;
pub mod tee;

pub use aggregator::{AggregateTotals, SampleAggregator};
pub use downsampler::DownSampler;
pub use tee::Tee;
