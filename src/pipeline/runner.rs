// ThreadedRunner - background reader thread feeding an assembly line
//
// The reader thread owns the BufferSource and only ever blocks on device I/O
// or on a full queue. The calling thread is the single logical pipeline
// thread: it pops buffers in delivery order and drives every sequential
// stage, so stage state is never touched concurrently.
//
// Shutdown:
// - Source exhausted: reader sets `reader_done`, pipeline drains the queue
// - Stage error: pipeline sets `stop`, reader abandons its pending buffer
// - End hooks always run on the pipeline thread before returning

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use rtrb::{Consumer, PopError, Producer, PushError};

use super::assembly_line::{AssemblyLine, RunSummary};
use super::buffer_queue::{BufferQueue, BufferQueueChannels, DEFAULT_QUEUE_CAPACITY};
use super::source::BufferSource;
use super::transformer::SequentialTransformer;
use super::Buffer;
use crate::error::{log_pipeline_error, PipelineError};

const BACKOFF: Duration = Duration::from_millis(1);

/// Runs an assembly line with the source on its own thread
#[derive(Debug, Clone, Copy)]
pub struct ThreadedRunner {
    queue_capacity: usize,
}

impl Default for ThreadedRunner {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl ThreadedRunner {
    /// # Panics
    /// Panics if `queue_capacity` is 0
    pub fn new(queue_capacity: usize) -> Self {
        assert!(queue_capacity > 0, "queue_capacity must be greater than 0");
        Self { queue_capacity }
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Stream every buffer from `source` through `line`
    ///
    /// Errors are reported in priority order: stage error, reader error, end
    /// hook error.
    pub fn run<T, S, F>(
        &self,
        line: &mut AssemblyLine<T>,
        source: S,
        mut sink: F,
    ) -> Result<RunSummary, PipelineError>
    where
        T: SequentialTransformer,
        T::Input: Send,
        S: BufferSource<Item = T::Input> + Send,
        F: FnMut(Buffer<T::Output>),
    {
        line.begin()?;

        let BufferQueueChannels { producer, consumer } =
            BufferQueue::new::<Buffer<T::Input>>(self.queue_capacity);
        let reader_done = AtomicBool::new(false);
        let stop = AtomicBool::new(false);
        let mut summary = RunSummary::default();

        let (processed, read) = thread::scope(|scope| {
            let reader = scope.spawn(|| {
                // Also set on unwind, or a panicking source would stall the drain loop
                let _done = DoneOnDrop(&reader_done);
                pump_reader(source, producer, &stop)
            });

            let processed = drain_queue(line, consumer, &reader_done, &mut sink, &mut summary);
            if processed.is_err() {
                stop.store(true, Ordering::SeqCst);
            }

            let read = reader.join().unwrap_or_else(|_| {
                Err(PipelineError::WorkerPanicked {
                    component: "ThreadedRunner reader".to_string(),
                })
            });
            (processed, read)
        });

        if let Err(err) = &read {
            log_pipeline_error(err, "reader thread");
        }
        let ended = line.end();
        processed.and(read.map(|_| ())).and(ended)?;

        tracing::info!(
            "[ThreadedRunner] Stream finished: {} buffers in, {} buffers out",
            summary.buffers_in,
            summary.buffers_out
        );
        Ok(summary)
    }
}

/// Raises the reader's done flag however the reader thread exits
struct DoneOnDrop<'a>(&'a AtomicBool);

impl Drop for DoneOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Reader thread body; returns the number of buffers queued
fn pump_reader<S: BufferSource>(
    mut source: S,
    mut producer: Producer<Buffer<S::Item>>,
    stop: &AtomicBool,
) -> Result<u64, PipelineError> {
    let mut queued = 0u64;
    while !stop.load(Ordering::SeqCst) {
        let Some(mut buffer) = source.next_buffer()? else {
            break;
        };
        loop {
            match producer.push(buffer) {
                Ok(()) => {
                    queued += 1;
                    break;
                }
                Err(PushError::Full(rejected)) => {
                    if stop.load(Ordering::SeqCst) {
                        tracing::warn!("[ThreadedRunner] Pipeline stopped, dropping pending buffer");
                        return Ok(queued);
                    }
                    buffer = rejected;
                    thread::sleep(BACKOFF);
                }
            }
        }
    }
    tracing::debug!("[ThreadedRunner] Reader finished after {} buffers", queued);
    Ok(queued)
}

/// Pipeline thread body
fn drain_queue<T, F>(
    line: &mut AssemblyLine<T>,
    mut consumer: Consumer<Buffer<T::Input>>,
    reader_done: &AtomicBool,
    sink: &mut F,
    summary: &mut RunSummary,
) -> Result<(), PipelineError>
where
    T: SequentialTransformer,
    F: FnMut(Buffer<T::Output>),
{
    loop {
        match consumer.pop() {
            Ok(buffer) => line.process(buffer, sink, summary)?,
            Err(PopError::Empty) => {
                // Every push happens before the done flag is set
                if reader_done.load(Ordering::SeqCst) {
                    if consumer.is_empty() {
                        return Ok(());
                    }
                    continue;
                }
                thread::sleep(BACKOFF);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::source::{ChunkedSource, ManualSource};
    use crate::pipeline::BufferList;

    struct Identity;

    impl SequentialTransformer for Identity {
        type Input = u32;
        type Output = u32;

        fn transform_buffer(&mut self, buffer: Buffer<u32>) -> Result<BufferList<u32>, PipelineError> {
            Ok(vec![buffer])
        }
    }

    struct FailingSource {
        delivered: bool,
    }

    impl BufferSource for FailingSource {
        type Item = u32;

        fn next_buffer(&mut self) -> Result<Option<Buffer<u32>>, PipelineError> {
            if self.delivered {
                return Err(PipelineError::SourceFailed {
                    reason: "device disconnected".to_string(),
                });
            }
            self.delivered = true;
            Ok(Some(vec![7]))
        }
    }

    #[test]
    fn test_threaded_run_preserves_order_through_small_queue() {
        let source = ChunkedSource::new((0..1000).collect(), 7);
        let mut line = AssemblyLine::new(Identity);
        let mut collected = Vec::new();

        let summary = ThreadedRunner::new(2)
            .run(&mut line, source, |b| collected.extend(b))
            .unwrap();

        assert_eq!(collected, (0..1000).collect::<Vec<u32>>());
        assert_eq!(summary.items_in, 1000);
        assert_eq!(summary.buffers_in, 143);
    }

    #[test]
    fn test_reader_error_surfaces_after_processing() {
        let mut line = AssemblyLine::new(Identity);
        let mut collected = Vec::new();

        let result = ThreadedRunner::default().run(
            &mut line,
            FailingSource { delivered: false },
            |b| collected.extend(b),
        );

        assert!(matches!(result, Err(PipelineError::SourceFailed { .. })));
        assert_eq!(collected, vec![7]);
    }

    struct PanickingSource;

    impl BufferSource for PanickingSource {
        type Item = u32;

        fn next_buffer(&mut self) -> Result<Option<Buffer<u32>>, PipelineError> {
            panic!("driver crashed");
        }
    }

    #[test]
    fn test_reader_panic_maps_to_worker_panicked() {
        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let mut line = AssemblyLine::new(Identity);
            let result = ThreadedRunner::default().run(&mut line, PanickingSource, |_| {});
            let _ = tx.send(result);
        });

        let result = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("runner did not return after the reader panicked");
        assert!(matches!(result, Err(PipelineError::WorkerPanicked { .. })));
    }

    #[test]
    fn test_buffers_queued_before_reader_panic_are_processed() {
        struct PanicAfterTwo {
            sent: u32,
        }

        impl BufferSource for PanicAfterTwo {
            type Item = u32;

            fn next_buffer(&mut self) -> Result<Option<Buffer<u32>>, PipelineError> {
                if self.sent == 2 {
                    panic!("driver crashed");
                }
                self.sent += 1;
                Ok(Some(vec![self.sent]))
            }
        }

        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let mut line = AssemblyLine::new(Identity);
            let mut collected = Vec::new();
            let result = ThreadedRunner::new(4).run(
                &mut line,
                PanicAfterTwo { sent: 0 },
                |b| collected.extend(b),
            );
            let _ = tx.send((result, collected));
        });

        let (result, collected) = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("runner did not return after the reader panicked");
        assert!(matches!(result, Err(PipelineError::WorkerPanicked { .. })));
        assert_eq!(collected, vec![1, 2]);
    }

    #[test]
    fn test_empty_source() {
        let mut line = AssemblyLine::new(Identity);
        let summary = ThreadedRunner::default()
            .run(&mut line, ManualSource::new(vec![]), |_| {})
            .unwrap();
        assert_eq!(summary, RunSummary::default());
    }
}
