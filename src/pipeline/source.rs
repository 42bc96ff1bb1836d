// Buffer sources - producers of the ordered buffer stream
//
// The device reader lives outside this crate; it plugs in by implementing
// BufferSource. ManualSource and ChunkedSource cover replay and tests.

use std::collections::VecDeque;

use super::Buffer;
use crate::error::PipelineError;

/// Delivers buffers in order until the stream ends
pub trait BufferSource {
    type Item;

    /// Next buffer, or `None` once the stream is exhausted
    fn next_buffer(&mut self) -> Result<Option<Buffer<Self::Item>>, PipelineError>;
}

impl<S: BufferSource + ?Sized> BufferSource for &mut S {
    type Item = S::Item;

    fn next_buffer(&mut self) -> Result<Option<Buffer<Self::Item>>, PipelineError> {
        (**self).next_buffer()
    }
}

/// Replays a fixed list of buffers
#[derive(Debug, Clone)]
pub struct ManualSource<T> {
    buffers: VecDeque<Buffer<T>>,
}

impl<T> ManualSource<T> {
    pub fn new(buffers: Vec<Buffer<T>>) -> Self {
        Self {
            buffers: buffers.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffers.len()
    }
}

impl<T> BufferSource for ManualSource<T> {
    type Item = T;

    fn next_buffer(&mut self) -> Result<Option<Buffer<T>>, PipelineError> {
        Ok(self.buffers.pop_front())
    }
}

/// Slices a flat list of items into fixed-size buffers, like the device
/// reader does; the final buffer may be shorter
#[derive(Debug, Clone)]
pub struct ChunkedSource<T> {
    items: VecDeque<T>,
    buffer_size: usize,
}

impl<T> ChunkedSource<T> {
    /// # Panics
    /// Panics if `buffer_size` is 0
    pub fn new(items: Vec<T>, buffer_size: usize) -> Self {
        assert!(buffer_size > 0, "buffer_size must be greater than 0");
        Self {
            items: items.into(),
            buffer_size,
        }
    }
}

impl<T> BufferSource for ChunkedSource<T> {
    type Item = T;

    fn next_buffer(&mut self) -> Result<Option<Buffer<T>>, PipelineError> {
        if self.items.is_empty() {
            return Ok(None);
        }
        let take = self.buffer_size.min(self.items.len());
        Ok(Some(self.items.drain(..take).collect()))
    }
}
