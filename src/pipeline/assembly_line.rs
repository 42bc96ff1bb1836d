// AssemblyLine - builder and synchronous driver for a chain of stages

use std::sync::Arc;

use serde::Serialize;

use super::source::BufferSource;
use super::transformer::{Chain, Inline, ParallelPool, ParallelTransformer, SequentialTransformer};
use super::Buffer;
use crate::error::{log_pipeline_error, PipelineError};

/// Counters for one run of an assembly line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub buffers_in: u64,
    pub items_in: u64,
    pub buffers_out: u64,
    pub items_out: u64,
}

/// An ordered chain of stages
///
/// # Example
/// ```ignore
/// let aggregator = Arc::new(SampleAggregator::new(2.0));
/// let mut line = AssemblyLine::new(Tee::new("main_current.txt", 2.0))
///     .then_pooled(Arc::clone(&aggregator), 4)
///     .then(DownSampler::new(50));
///
/// let mut averaged = Vec::new();
/// line.run(&mut source, |buffer| averaged.extend(buffer))?;
/// let mean = aggregator.mean_current();
/// ```
pub struct AssemblyLine<T> {
    stages: T,
}

impl<T: SequentialTransformer> AssemblyLine<T> {
    pub fn new(stage: T) -> Self {
        Self { stages: stage }
    }

    /// Append a sequential stage
    pub fn then<B>(self, stage: B) -> AssemblyLine<Chain<T, B>>
    where
        B: SequentialTransformer<Input = T::Output>,
    {
        AssemblyLine {
            stages: Chain::new(self.stages, stage),
        }
    }

    /// Append a parallel stage run on the pipeline thread
    pub fn then_parallel<P>(self, stage: Arc<P>) -> AssemblyLine<Chain<T, Inline<P>>>
    where
        P: ParallelTransformer<Input = T::Output>,
    {
        self.then(Inline::new(stage))
    }

    /// Append a parallel stage fanned out across `workers` threads
    pub fn then_pooled<P>(
        self,
        stage: Arc<P>,
        workers: usize,
    ) -> AssemblyLine<Chain<T, ParallelPool<P>>>
    where
        P: ParallelTransformer<Input = T::Output>,
        P::Input: Send,
        P::Output: Send,
    {
        self.then(ParallelPool::new(stage, workers))
    }

    pub fn stages(&self) -> &T {
        &self.stages
    }

    pub fn into_stages(self) -> T {
        self.stages
    }

    /// Run every stage's begin hook
    pub fn begin(&mut self) -> Result<(), PipelineError> {
        tracing::debug!("[AssemblyLine] Running begin hooks");
        self.stages.on_begin().inspect_err(|err| {
            log_pipeline_error(err, "on_begin");
        })
    }

    /// Push one buffer through the chain, handing every output buffer to `sink`
    pub fn process<F>(
        &mut self,
        buffer: Buffer<T::Input>,
        sink: &mut F,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError>
    where
        F: FnMut(Buffer<T::Output>),
    {
        summary.buffers_in += 1;
        summary.items_in += buffer.len() as u64;

        let outputs = self.stages.transform_buffer(buffer).inspect_err(|err| {
            log_pipeline_error(err, "transform_buffer");
        })?;
        for output in outputs {
            summary.buffers_out += 1;
            summary.items_out += output.len() as u64;
            sink(output);
        }
        Ok(())
    }

    /// Run every stage's end hook
    pub fn end(&mut self) -> Result<(), PipelineError> {
        tracing::debug!("[AssemblyLine] Running end hooks");
        self.stages.on_end().inspect_err(|err| {
            log_pipeline_error(err, "on_end");
        })
    }

    /// Drive the whole stream on the calling thread
    ///
    /// End hooks run even when a buffer fails; the first error is returned.
    pub fn run<S, F>(&mut self, source: &mut S, mut sink: F) -> Result<RunSummary, PipelineError>
    where
        S: BufferSource<Item = T::Input>,
        F: FnMut(Buffer<T::Output>),
    {
        self.begin()?;

        let mut summary = RunSummary::default();
        let streamed = self.pump(source, &mut sink, &mut summary);
        let ended = self.end();
        streamed.and(ended)?;

        tracing::info!(
            "[AssemblyLine] Stream finished: {} buffers ({} items) in, {} buffers ({} items) out",
            summary.buffers_in,
            summary.items_in,
            summary.buffers_out,
            summary.items_out
        );
        Ok(summary)
    }

    fn pump<S, F>(
        &mut self,
        source: &mut S,
        sink: &mut F,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError>
    where
        S: BufferSource<Item = T::Input>,
        F: FnMut(Buffer<T::Output>),
    {
        while let Some(buffer) = source.next_buffer()? {
            self.process(buffer, sink, summary)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::source::ManualSource;
    use crate::pipeline::BufferList;

    /// Forwards buffers and fails on a marker value
    struct FailOn {
        marker: i32,
        ended: bool,
    }

    impl SequentialTransformer for FailOn {
        type Input = i32;
        type Output = i32;

        fn transform_buffer(&mut self, buffer: Buffer<i32>) -> Result<BufferList<i32>, PipelineError> {
            if buffer.contains(&self.marker) {
                return Err(PipelineError::SourceFailed {
                    reason: "marker".to_string(),
                });
            }
            Ok(vec![buffer])
        }

        fn on_end(&mut self) -> Result<(), PipelineError> {
            self.ended = true;
            Ok(())
        }
    }

    /// Drops every other buffer
    #[derive(Default)]
    struct EveryOther {
        seen: usize,
    }

    impl SequentialTransformer for EveryOther {
        type Input = i32;
        type Output = i32;

        fn transform_buffer(&mut self, buffer: Buffer<i32>) -> Result<BufferList<i32>, PipelineError> {
            self.seen += 1;
            if self.seen % 2 == 0 {
                Ok(vec![])
            } else {
                Ok(vec![buffer])
            }
        }
    }

    #[test]
    fn test_run_counts_buffers_and_items() {
        let mut source = ManualSource::new(vec![vec![1, 2], vec![3], vec![4, 5, 6]]);
        let mut line = AssemblyLine::new(EveryOther::default());

        let mut collected = Vec::new();
        let summary = line.run(&mut source, |b| collected.push(b)).unwrap();

        assert_eq!(collected, vec![vec![1, 2], vec![4, 5, 6]]);
        assert_eq!(
            summary,
            RunSummary {
                buffers_in: 3,
                items_in: 6,
                buffers_out: 2,
                items_out: 5,
            }
        );
    }

    #[test]
    fn test_end_hooks_run_after_failure() {
        let mut stage = FailOn {
            marker: 3,
            ended: false,
        };
        let mut source = ManualSource::new(vec![vec![1], vec![3], vec![4]]);
        let mut collected = Vec::new();

        let result = AssemblyLine::new(&mut stage).run(&mut source, |b| collected.push(b));

        assert!(matches!(result, Err(PipelineError::SourceFailed { .. })));
        assert!(stage.ended);
        assert_eq!(collected, vec![vec![1]]);
        // Buffer after the failure was never pulled
        assert_eq!(source.remaining(), 1);
    }
}
