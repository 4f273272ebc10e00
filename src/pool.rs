//! Reusable phasor buffers.

use crossbeam::queue::SegQueue;

use crate::{IqError, IqResult, SampleFormat, Samples};

/// A pool of equally shaped [`Samples`] buffers.
///
/// Hot paths that allocate one buffer per chunk can recycle them here
/// instead. The pool is lock-free and may be shared between threads.
#[derive(Debug)]
pub struct SamplesPool {
    format: SampleFormat,
    length: usize,
    free: SegQueue<Samples>,
}

impl SamplesPool {
    /// A pool handing out zeroed buffers of `length` `format` phasors.
    pub fn new(format: SampleFormat, length: usize) -> Self {
        Self {
            format,
            length,
            free: SegQueue::new(),
        }
    }

    /// Take a buffer, allocating one if the pool is empty.
    ///
    /// Recycled buffers keep whatever data they last held.
    pub fn get(&self) -> Samples {
        self.free
            .pop()
            .unwrap_or_else(|| Samples::new(self.format, self.length))
    }

    /// Return a buffer to the pool.
    ///
    /// # Errors
    /// Rejects buffers of a different format or length.
    pub fn put(&self, samples: Samples) -> IqResult<()> {
        if samples.format() != self.format {
            return Err(IqError::format_mismatch(self.format, samples.format()));
        }
        if samples.len() != self.length {
            return Err(IqError::invalid_parameter(format!(
                "pool holds buffers of {} phasors, got {}",
                self.length,
                samples.len()
            )));
        }
        self.free.push(samples);
        Ok(())
    }

    /// Number of idle buffers.
    pub fn idle(&self) -> usize {
        self.free.len()
    }
}
