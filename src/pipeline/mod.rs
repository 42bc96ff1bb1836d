// Pipeline module - ordered chain of stages over buffers of readings
//
// A reader delivers a continuous sequence of fixed-size buffers. Each buffer
// passes through an ordered chain of stages; every stage consumes one buffer
// and emits zero or more output buffers which become the next stage's input.
//
// Architecture:
// - transformer: SequentialTransformer / ParallelTransformer + combinators
// - source: BufferSource implementations (pre-recorded, chunked)
// - buffer_queue: lock-free SPSC handoff between reader and pipeline threads
// - assembly_line: builder + synchronous driver
// - runner: background reader thread feeding an assembly line

use serde::{Deserialize, Serialize};

pub mod assembly_line;
pub mod buffer_queue;
pub mod runner;
pub mod source;
pub mod transformer;

pub use assembly_line::{AssemblyLine, RunSummary};
pub use buffer_queue::{BufferQueue, BufferQueueChannels, DEFAULT_QUEUE_CAPACITY};
pub use runner::ThreadedRunner;
pub use source::{BufferSource, ChunkedSource, ManualSource};
pub use transformer::{Chain, Inline, ParallelPool, ParallelTransformer, SequentialTransformer};

/// Native sampling rate of the Monsoon HVPM
pub const NATIVE_SAMPLE_RATE_HZ: u32 = 5000;

/// An ordered batch of items processed as one unit
pub type Buffer<T> = Vec<T>;

/// Zero or more buffers emitted for one input buffer
pub type BufferList<T> = Vec<Buffer<T>>;

/// Minimum view of a measurement the stages need
pub trait Sample {
    /// Seconds since the start of the measurement
    fn sample_time(&self) -> f64;

    /// Main channel current in Amps
    fn main_current(&self) -> f64;
}

/// One timestamped measurement from the power monitor
///
/// Immutable once produced by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    pub sample_time: f64,
    pub main_current: f64,
    pub usb_current: f64,
    pub aux_current: f64,
    pub main_voltage: f64,
    pub usb_voltage: f64,
}

impl Reading {
    /// Reading with only the main channel populated
    pub fn new(sample_time: f64, main_current: f64) -> Self {
        Self {
            sample_time,
            main_current,
            ..Self::default()
        }
    }
}

impl Sample for Reading {
    fn sample_time(&self) -> f64 {
        self.sample_time
    }

    fn main_current(&self) -> f64 {
        self.main_current
    }
}

/// Build readings spaced at the native rate starting from `start_index`
///
/// Handy for replaying captured current values through the pipeline.
pub fn readings_at_native_rate(start_index: usize, currents: &[f64]) -> Buffer<Reading> {
    currents
        .iter()
        .enumerate()
        .map(|(offset, &current)| {
            let index = (start_index + offset) as f64;
            Reading::new(index / NATIVE_SAMPLE_RATE_HZ as f64, current)
        })
        .collect()
}
