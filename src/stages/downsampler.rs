// DownSampler - integer-factor rate reduction by block averaging
//
// Every output is the mean `main_current` of `factor` consecutive input
// samples. Blocks may straddle buffer boundaries: samples that do not yet fill
// a block are carried in `leftovers` (always shorter than `factor` between
// calls) and are consumed first on the next call.
//
// Per call with leftovers L and buffer B:
// 1. tail = (|L| + |B|) mod factor
// 2. A = L ++ B[..|B| - tail]          (|A| is a multiple of factor)
// 3. emit mean of each factor-wide row of A
// 4. L' = B[|B| - tail..]
// If |L| + |B| < factor nothing is emitted and B is appended to L.
//
// Only the main channel survives; other channels are dropped.

use std::marker::PhantomData;

use crate::error::PipelineError;
use crate::pipeline::{Buffer, BufferList, Sample, SequentialTransformer};

/// Block-averaging rate reducer
pub struct DownSampler<S> {
    factor: usize,
    leftovers: Vec<f64>,
    outputs_emitted: u64,
    _sample: PhantomData<fn() -> S>,
}

impl<S> DownSampler<S> {
    /// # Panics
    /// Panics if `factor` is 0
    pub fn new(factor: usize) -> Self {
        assert!(factor > 0, "factor must be greater than 0");
        Self {
            factor,
            leftovers: Vec::with_capacity(factor),
            outputs_emitted: 0,
            _sample: PhantomData,
        }
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Samples waiting for the rest of their block
    pub fn leftovers(&self) -> &[f64] {
        &self.leftovers
    }

    /// Total block means emitted since construction
    pub fn outputs_emitted(&self) -> u64 {
        self.outputs_emitted
    }

    /// Time offset of output `index` relative to the first input sample
    ///
    /// Outputs carry no timestamp of their own.
    pub fn output_time(&self, index: u64, native_rate_hz: u32) -> f64 {
        (index as f64 * self.factor as f64) / native_rate_hz as f64
    }
}

impl<S: Sample> SequentialTransformer for DownSampler<S> {
    type Input = S;
    type Output = f64;

    fn transform_buffer(&mut self, buffer: Buffer<S>) -> Result<BufferList<f64>, PipelineError> {
        let total = self.leftovers.len() + buffer.len();
        if total < self.factor {
            self.leftovers
                .extend(buffer.iter().map(|sample| sample.main_current()));
            return Ok(Vec::new());
        }

        let tail_length = total % self.factor;
        let split = buffer.len() - tail_length;

        let mut outputs = Vec::with_capacity((total - tail_length) / self.factor);
        let mut block_sum: f64 = self.leftovers.iter().sum();
        let mut block_fill = self.leftovers.len();
        for sample in &buffer[..split] {
            block_sum += sample.main_current();
            block_fill += 1;
            if block_fill == self.factor {
                outputs.push(block_sum / self.factor as f64);
                block_sum = 0.0;
                block_fill = 0;
            }
        }
        debug_assert_eq!(block_fill, 0);

        self.leftovers.clear();
        self.leftovers
            .extend(buffer[split..].iter().map(|sample| sample.main_current()));
        self.outputs_emitted += outputs.len() as u64;

        if outputs.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![outputs])
        }
    }

    fn on_end(&mut self) -> Result<(), PipelineError> {
        if !self.leftovers.is_empty() {
            tracing::debug!(
                "[DownSampler] Stream ended with {} samples short of a full block",
                self.leftovers.len()
            );
        }
        Ok(())
    }
}
