// Stage framework - sequential and parallel transformers
//
// SequentialTransformer: sees buffers strictly in arrival order, may hold
// cross-call state (leftovers, file handles) and has begin/end hooks that run
// once per stream.
//
// ParallelTransformer: order-independent. Only commutative/associative
// accumulation is allowed, and it takes `&self`, so any shared counters must
// be merged race-free inside the stage.
//
// Combinators:
// - Chain<A, B>: A's output buffers feed B, order preserved
// - Inline<P>: runs a parallel stage on the pipeline thread
// - ParallelPool<P>: fans one buffer out across scoped worker threads

use std::sync::Arc;
use std::thread;

use super::{Buffer, BufferList};
use crate::error::{log_pipeline_error, PipelineError};

/// Order-dependent stage
pub trait SequentialTransformer {
    type Input;
    type Output;

    /// Called once before the first buffer
    fn on_begin(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Consume one buffer, emitting zero or more output buffers
    fn transform_buffer(
        &mut self,
        buffer: Buffer<Self::Input>,
    ) -> Result<BufferList<Self::Output>, PipelineError>;

    /// Called once after the last buffer
    fn on_end(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Order-independent stage
pub trait ParallelTransformer: Send + Sync {
    type Input;
    type Output;

    fn transform_buffer(
        &self,
        buffer: Buffer<Self::Input>,
    ) -> Result<BufferList<Self::Output>, PipelineError>;
}

/// Lets callers keep ownership of a stage and inspect it after the run
impl<T: SequentialTransformer + ?Sized> SequentialTransformer for &mut T {
    type Input = T::Input;
    type Output = T::Output;

    fn on_begin(&mut self) -> Result<(), PipelineError> {
        (**self).on_begin()
    }

    fn transform_buffer(
        &mut self,
        buffer: Buffer<Self::Input>,
    ) -> Result<BufferList<Self::Output>, PipelineError> {
        (**self).transform_buffer(buffer)
    }

    fn on_end(&mut self) -> Result<(), PipelineError> {
        (**self).on_end()
    }
}

/// An absent stage forwards every buffer untouched
impl<T, I> SequentialTransformer for Option<T>
where
    T: SequentialTransformer<Input = I, Output = I>,
{
    type Input = I;
    type Output = I;

    fn on_begin(&mut self) -> Result<(), PipelineError> {
        match self {
            Some(stage) => stage.on_begin(),
            None => Ok(()),
        }
    }

    fn transform_buffer(
        &mut self,
        buffer: Buffer<Self::Input>,
    ) -> Result<BufferList<Self::Output>, PipelineError> {
        match self {
            Some(stage) => stage.transform_buffer(buffer),
            None => Ok(vec![buffer]),
        }
    }

    fn on_end(&mut self) -> Result<(), PipelineError> {
        match self {
            Some(stage) => stage.on_end(),
            None => Ok(()),
        }
    }
}

/// Two sequential stages composed in order
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A, B> Chain<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }

    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A, B> SequentialTransformer for Chain<A, B>
where
    A: SequentialTransformer,
    B: SequentialTransformer<Input = A::Output>,
{
    type Input = A::Input;
    type Output = B::Output;

    /// A failed downstream begin ends the upstream stage before returning
    fn on_begin(&mut self) -> Result<(), PipelineError> {
        self.first.on_begin()?;
        if let Err(err) = self.second.on_begin() {
            if let Err(end_err) = self.first.on_end() {
                log_pipeline_error(&end_err, "Chain::on_begin rollback");
            }
            return Err(err);
        }
        Ok(())
    }

    fn transform_buffer(
        &mut self,
        buffer: Buffer<Self::Input>,
    ) -> Result<BufferList<Self::Output>, PipelineError> {
        let mut outputs = Vec::new();
        for intermediate in self.first.transform_buffer(buffer)? {
            outputs.extend(self.second.transform_buffer(intermediate)?);
        }
        Ok(outputs)
    }

    /// Both hooks always run; the upstream error wins
    fn on_end(&mut self) -> Result<(), PipelineError> {
        let first = self.first.on_end();
        let second = self.second.on_end();
        first.and(second)
    }
}

/// Runs a parallel stage on the calling thread
pub struct Inline<P> {
    stage: Arc<P>,
}

impl<P> Inline<P> {
    pub fn new(stage: Arc<P>) -> Self {
        Self { stage }
    }

    pub fn stage(&self) -> &Arc<P> {
        &self.stage
    }
}

impl<P: ParallelTransformer> SequentialTransformer for Inline<P> {
    type Input = P::Input;
    type Output = P::Output;

    fn transform_buffer(
        &mut self,
        buffer: Buffer<Self::Input>,
    ) -> Result<BufferList<Self::Output>, PipelineError> {
        self.stage.transform_buffer(buffer)
    }
}

/// Splits each buffer into contiguous slices processed on worker threads
///
/// Outputs are reassembled in slice order, so the stage downstream still sees
/// items in arrival order. Buffers shorter than the worker count run inline.
pub struct ParallelPool<P> {
    stage: Arc<P>,
    workers: usize,
}

impl<P> ParallelPool<P> {
    /// # Panics
    /// Panics if `workers` is 0
    pub fn new(stage: Arc<P>, workers: usize) -> Self {
        assert!(workers > 0, "workers must be greater than 0");
        Self { stage, workers }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl<P> SequentialTransformer for ParallelPool<P>
where
    P: ParallelTransformer,
    P::Input: Send,
    P::Output: Send,
{
    type Input = P::Input;
    type Output = P::Output;

    fn transform_buffer(
        &mut self,
        buffer: Buffer<Self::Input>,
    ) -> Result<BufferList<Self::Output>, PipelineError> {
        if self.workers == 1 || buffer.len() < self.workers {
            return self.stage.transform_buffer(buffer);
        }

        let slice_len = buffer.len().div_ceil(self.workers);
        let mut slices = Vec::with_capacity(self.workers);
        let mut rest = buffer;
        while rest.len() > slice_len {
            let tail = rest.split_off(slice_len);
            slices.push(rest);
            rest = tail;
        }
        slices.push(rest);

        let stage = &self.stage;
        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = slices
                .into_iter()
                .map(|slice| scope.spawn(move || stage.transform_buffer(slice)))
                .collect();
            handles.into_iter().map(|handle| handle.join()).collect()
        });

        let mut outputs = Vec::new();
        for result in results {
            let list = result.map_err(|_| PipelineError::WorkerPanicked {
                component: "ParallelPool".to_string(),
            })??;
            outputs.extend(list);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Doubles each item and records begin/end calls
    #[derive(Default)]
    struct Doubler {
        events: Vec<&'static str>,
    }

    impl SequentialTransformer for Doubler {
        type Input = i64;
        type Output = i64;

        fn on_begin(&mut self) -> Result<(), PipelineError> {
            self.events.push("begin");
            Ok(())
        }

        fn transform_buffer(&mut self, buffer: Buffer<i64>) -> Result<BufferList<i64>, PipelineError> {
            Ok(vec![buffer.into_iter().map(|x| x * 2).collect()])
        }

        fn on_end(&mut self) -> Result<(), PipelineError> {
            self.events.push("end");
            Ok(())
        }
    }

    /// Splits every buffer into one-item buffers
    struct Splitter;

    impl SequentialTransformer for Splitter {
        type Input = i64;
        type Output = i64;

        fn transform_buffer(&mut self, buffer: Buffer<i64>) -> Result<BufferList<i64>, PipelineError> {
            Ok(buffer.into_iter().map(|x| vec![x]).collect())
        }
    }

    struct FailingEnd;

    impl SequentialTransformer for FailingEnd {
        type Input = i64;
        type Output = i64;

        fn transform_buffer(&mut self, buffer: Buffer<i64>) -> Result<BufferList<i64>, PipelineError> {
            Ok(vec![buffer])
        }

        fn on_end(&mut self) -> Result<(), PipelineError> {
            Err(PipelineError::SourceFailed {
                reason: "end".to_string(),
            })
        }
    }

    struct FailingBegin;

    impl SequentialTransformer for FailingBegin {
        type Input = i64;
        type Output = i64;

        fn on_begin(&mut self) -> Result<(), PipelineError> {
            Err(PipelineError::InvalidConfig {
                reason: "begin".to_string(),
            })
        }

        fn transform_buffer(&mut self, buffer: Buffer<i64>) -> Result<BufferList<i64>, PipelineError> {
            Ok(vec![buffer])
        }
    }

    /// Panics on any slice containing a negative item
    struct PanicsOnNegative;

    impl ParallelTransformer for PanicsOnNegative {
        type Input = i64;
        type Output = i64;

        fn transform_buffer(&self, buffer: Buffer<i64>) -> Result<BufferList<i64>, PipelineError> {
            if buffer.iter().any(|&x| x < 0) {
                panic!("negative item");
            }
            Ok(vec![buffer])
        }
    }

    /// Sums items and forwards the buffer
    #[derive(Default)]
    struct Summer {
        total: Mutex<i64>,
    }

    impl ParallelTransformer for Summer {
        type Input = i64;
        type Output = i64;

        fn transform_buffer(&self, buffer: Buffer<i64>) -> Result<BufferList<i64>, PipelineError> {
            let partial: i64 = buffer.iter().sum();
            *self.total.lock().unwrap() += partial;
            Ok(vec![buffer])
        }
    }

    #[test]
    fn test_chain_preserves_order_and_fans_out() {
        let mut chain = Chain::new(Doubler::default(), Splitter);
        chain.on_begin().unwrap();
        let outputs = chain.transform_buffer(vec![1, 2, 3]).unwrap();
        chain.on_end().unwrap();

        assert_eq!(outputs, vec![vec![2], vec![4], vec![6]]);
        assert_eq!(chain.first().events, vec!["begin", "end"]);
    }

    #[test]
    fn test_chain_runs_every_end_hook() {
        let mut doubler = Doubler::default();
        {
            let mut chain = Chain::new(FailingEnd, &mut doubler);
            assert!(chain.on_end().is_err());
        }
        assert_eq!(doubler.events, vec!["end"]);
    }

    #[test]
    fn test_failed_begin_ends_upstream_stage() {
        let mut doubler = Doubler::default();
        {
            let mut chain = Chain::new(&mut doubler, FailingBegin);
            assert!(matches!(
                chain.on_begin(),
                Err(PipelineError::InvalidConfig { .. })
            ));
        }
        assert_eq!(doubler.events, vec!["begin", "end"]);
    }

    #[test]
    fn test_absent_stage_passes_through() {
        let mut stage: Option<Doubler> = None;
        stage.on_begin().unwrap();
        assert_eq!(stage.transform_buffer(vec![1, 2]).unwrap(), vec![vec![1, 2]]);

        let mut stage = Some(Doubler::default());
        assert_eq!(stage.transform_buffer(vec![1, 2]).unwrap(), vec![vec![2, 4]]);
    }

    #[test]
    fn test_inline_uses_shared_stage() {
        let summer = Arc::new(Summer::default());
        let mut inline = Inline::new(Arc::clone(&summer));
        let outputs = inline.transform_buffer(vec![1, 2, 3]).unwrap();

        assert_eq!(outputs, vec![vec![1, 2, 3]]);
        assert_eq!(*summer.total.lock().unwrap(), 6);
    }

    #[test]
    fn test_pool_reassembles_slices_in_order() {
        let summer = Arc::new(Summer::default());
        let mut pool = ParallelPool::new(Arc::clone(&summer), 3);
        let input: Vec<i64> = (1..=10).collect();

        let outputs = pool.transform_buffer(input.clone()).unwrap();
        let flattened: Vec<i64> = outputs.into_iter().flatten().collect();

        assert_eq!(flattened, input);
        assert_eq!(*summer.total.lock().unwrap(), 55);
    }

    #[test]
    fn test_pool_small_buffer_runs_inline() {
        let summer = Arc::new(Summer::default());
        let mut pool = ParallelPool::new(Arc::clone(&summer), 8);
        let outputs = pool.transform_buffer(vec![4, 5]).unwrap();
        assert_eq!(outputs, vec![vec![4, 5]]);
    }

    #[test]
    fn test_pool_worker_panic_maps_to_worker_panicked() {
        let mut pool = ParallelPool::new(Arc::new(PanicsOnNegative), 4);
        let result = pool.transform_buffer(vec![1, 2, 3, 4, 5, -6, 7, 8]);
        assert!(matches!(
            result,
            Err(PipelineError::WorkerPanicked { .. })
        ));

        // The pool stays usable after a worker panic
        let outputs = pool.transform_buffer(vec![1, 2, 3, 4]).unwrap();
        assert_eq!(outputs.into_iter().flatten().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    #[should_panic(expected = "workers must be greater than 0")]
    fn test_pool_zero_workers_panics() {
        ParallelPool::new(Arc::new(Summer::default()), 0);
    }
}
