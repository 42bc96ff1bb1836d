// BufferQueue - lock-free handoff between the reader and pipeline threads
//
// The reader thread pulls buffers off the device at the native rate and must
// never wait on pipeline locks. It pushes each filled buffer into a bounded
// SPSC ring buffer; the pipeline thread pops them in delivery order, which is
// the ordering sequential stages depend on.
//
// Buffer flow:
// 1. Reader thread receives a buffer from its BufferSource
// 2. Reader thread pushes it to the queue (backs off while full)
// 3. Pipeline thread pops it and drives the assembly line
// 4. Buffers are dropped once they leave the final stage

use rtrb::{Consumer, Producer};

/// Default number of in-flight buffers between reader and pipeline
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Split queue ends for producer/consumer separation
pub struct BufferQueueChannels<T> {
    /// Reader thread side
    pub producer: Producer<T>,
    /// Pipeline thread side
    pub consumer: Consumer<T>,
}

/// Bounded SPSC queue of buffers
///
/// # Thread Safety
/// - Lock-free: No mutex locks in queue operations
/// - Wait-free: Push/pop operations have bounded execution time
pub struct BufferQueue;

impl BufferQueue {
    /// Create a queue holding at most `capacity` buffers
    ///
    /// # Panics
    /// Panics if capacity is 0
    #[allow(clippy::new_ret_no_self)]
    pub fn new<T>(capacity: usize) -> BufferQueueChannels<T> {
        assert!(capacity > 0, "capacity must be greater than 0");
        let (producer, consumer) = rtrb::RingBuffer::new(capacity);
        BufferQueueChannels { producer, consumer }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Buffer, Reading};
    use rtrb::PushError;

    #[test]
    fn test_queue_preserves_order() {
        let mut channels = BufferQueue::new::<Buffer<Reading>>(4);
        for i in 0..3 {
            channels
                .producer
                .push(vec![Reading::new(i as f64, 0.0)])
                .unwrap();
        }

        for i in 0..3 {
            let buffer = channels.consumer.pop().unwrap();
            assert_eq!(buffer[0].sample_time, i as f64);
        }
        assert!(channels.consumer.pop().is_err());
    }

    #[test]
    fn test_full_queue_returns_buffer() {
        let mut channels = BufferQueue::new::<Buffer<u8>>(1);
        channels.producer.push(vec![1]).unwrap();

        match channels.producer.push(vec![2]) {
            Err(PushError::Full(rejected)) => assert_eq!(rejected, vec![2]),
            other => panic!("Expected Full, got: {:?}", other),
        }
    }

    #[test]
    fn test_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Producer<Buffer<Reading>>>();
        assert_send::<Consumer<Buffer<Reading>>>();
        assert_send::<BufferQueueChannels<Buffer<Reading>>>();
    }

    #[test]
    #[should_panic(expected = "capacity must be greater than 0")]
    fn test_zero_capacity_panics() {
        BufferQueue::new::<Buffer<u8>>(0);
    }
}
