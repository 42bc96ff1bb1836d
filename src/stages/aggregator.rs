// SampleAggregator - running count and sum of the main channel current
//
// Readings before `start_after_seconds` (warm-up) contribute nothing. The stage
// is a ParallelTransformer: each call folds its buffer into a local partial,
// then merges the (count, sum) pair under one lock so the two counters never
// disagree, whatever order or thread the buffers arrive on.

use std::marker::PhantomData;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::error::PipelineError;
use crate::pipeline::{Buffer, BufferList, ParallelTransformer, Sample};

/// Count and sum of the samples accepted so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateTotals {
    pub num_samples: u64,
    pub sum_currents: f64,
}

impl AggregateTotals {
    fn merge(&mut self, partial: AggregateTotals) {
        self.num_samples += partial.num_samples;
        self.sum_currents += partial.sum_currents;
    }

    /// Mean current, or `None` before any sample was accepted
    pub fn mean_current(&self) -> Option<f64> {
        if self.num_samples == 0 {
            None
        } else {
            Some(self.sum_currents / self.num_samples as f64)
        }
    }
}

/// Running mean of `main_current` excluding a warm-up period
pub struct SampleAggregator<S> {
    start_after_seconds: f64,
    totals: Mutex<AggregateTotals>,
    _sample: PhantomData<fn() -> S>,
}

impl<S> SampleAggregator<S> {
    pub fn new(start_after_seconds: f64) -> Self {
        Self {
            start_after_seconds,
            totals: Mutex::new(AggregateTotals::default()),
            _sample: PhantomData,
        }
    }

    pub fn start_after_seconds(&self) -> f64 {
        self.start_after_seconds
    }

    /// Consistent copy of both counters
    pub fn totals(&self) -> AggregateTotals {
        // Merges are two plain additions, so a poisoned guard still holds a valid pair
        *self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn num_samples(&self) -> u64 {
        self.totals().num_samples
    }

    pub fn sum_currents(&self) -> f64 {
        self.totals().sum_currents
    }

    pub fn mean_current(&self) -> Option<f64> {
        self.totals().mean_current()
    }
}

impl<S: Sample> ParallelTransformer for SampleAggregator<S> {
    type Input = S;
    type Output = S;

    fn transform_buffer(&self, buffer: Buffer<S>) -> Result<BufferList<S>, PipelineError> {
        let mut partial = AggregateTotals::default();
        for sample in buffer
            .iter()
            .filter(|sample| sample.sample_time() >= self.start_after_seconds)
        {
            partial.num_samples += 1;
            partial.sum_currents += sample.main_current();
        }

        self.totals
            .lock()
            .map_err(|_| PipelineError::LockPoisoned {
                component: "SampleAggregator".to_string(),
            })?
            .merge(partial);

        Ok(vec![buffer])
    }
}
