//! Fixed-geometry ring buffer with overrun and underrun accounting.
//!
//! A [`RingBuffer`] holds `slots` slots of `slot_length` phasors each, all
//! allocated up front. Every write fills one slot (possibly partially); every
//! read drains one slot. When the writer laps the reader, the oldest unread
//! slot is dropped and counted as an overrun. One slot always stays free, so
//! at most `slots - 1` writes can be pending.
//!
//! All state lives behind one mutex, held for the whole of each read or
//! write, so no slot is ever touched by two threads at once.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::conversions::copy;
use crate::{
    Closer, IqError, IqResult, Reader, SampleFormat, Samples, SamplesMut, SamplesRef, Writer,
};

/// Geometry and read policy of a [`RingBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingBufferOptions {
    /// Number of slots.
    pub slots: usize,

    /// Phasors per slot.
    pub slot_length: usize,

    /// Wait for data on an empty buffer instead of reporting an underrun.
    pub block_reads: bool,
}

impl Default for RingBufferOptions {
    fn default() -> Self {
        Self {
            slots: 16,
            slot_length: 16 * 1024,
            block_reads: true,
        }
    }
}

/// Counters reported by [`RingBuffer::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingBufferStats {
    /// Slots dropped because the writer lapped the reader.
    pub overruns: u64,
    /// Non-blocking reads that found the buffer empty.
    pub underruns: u64,
    /// Slots written but not yet read.
    pub pending: usize,
}

struct RingState {
    buf: Samples,
    lens: Vec<usize>,
    ridx: usize,
    widx: usize,
    closed: bool,
    err: Option<IqError>,
    overruns: u64,
    underruns: u64,
}

impl RingState {
    fn next(&self, idx: usize) -> usize {
        (idx + 1) % self.lens.len()
    }

    fn pending(&self) -> usize {
        let slots = self.lens.len();
        (self.widx + slots - self.ridx) % slots
    }

    /// Claim the slot to read, if any.
    fn advance_read(&mut self) -> Option<usize> {
        if self.ridx == self.widx {
            return None;
        }
        let id = self.ridx;
        self.ridx = self.next(id);
        Some(id)
    }

    /// Claim the slot to write, dropping the oldest unread slot if full.
    fn advance_write(&mut self) -> usize {
        let next = self.next(self.widx);
        if next == self.ridx {
            self.ridx = self.next(self.ridx);
            self.overruns += 1;
            tracing::trace!(overruns = self.overruns, "ring buffer overrun");
        }
        let id = self.widx;
        self.widx = next;
        id
    }

    fn terminal_error(&self) -> Option<IqError> {
        self.closed
            .then(|| self.err.clone().unwrap_or(IqError::PipeClosed))
    }
}

struct RingShared {
    format: SampleFormat,
    sample_rate: u32,
    options: RingBufferOptions,
    state: Mutex<RingState>,
    readable: Condvar,
}

/// A bounded buffer of phasor slots.
///
/// Cloning yields another handle to the same buffer, so a producer and a
/// consumer thread can each own one.
#[derive(Clone)]
pub struct RingBuffer {
    shared: Arc<RingShared>,
}

impl RingBuffer {
    /// Allocate a ring buffer for `format` phasors at `sample_rate`.
    ///
    /// # Errors
    /// [`IqError::InvalidParameter`] if `slots` is below two or
    /// `slot_length` is zero.
    pub fn new(sample_rate: u32, format: SampleFormat, options: RingBufferOptions) -> IqResult<Self> {
        if options.slots < 2 {
            return Err(IqError::invalid_parameter("ring buffer needs at least two slots"));
        }
        if options.slot_length == 0 {
            return Err(IqError::invalid_parameter("ring buffer slot length must be non-zero"));
        }
        let total = options.slots.checked_mul(options.slot_length).ok_or_else(|| {
            IqError::invalid_parameter("ring buffer geometry overflows the address space")
        })?;

        let state = RingState {
            buf: Samples::new(format, total),
            lens: vec![0; options.slots],
            ridx: 0,
            widx: 0,
            closed: false,
            err: None,
            overruns: 0,
            underruns: 0,
        };
        Ok(Self {
            shared: Arc::new(RingShared {
                format,
                sample_rate,
                options,
                state: Mutex::new(state),
                readable: Condvar::new(),
            }),
        })
    }

    /// The geometry this buffer was built with.
    pub fn options(&self) -> RingBufferOptions {
        self.shared.options
    }

    /// Overrun and underrun counts so far.
    pub fn stats(&self) -> RingBufferStats {
        let state = self.shared.state.lock();
        RingBufferStats {
            overruns: state.overruns,
            underruns: state.underruns,
            pending: state.pending(),
        }
    }

    fn check_format(&self, format: SampleFormat) -> IqResult<()> {
        if format == self.shared.format {
            Ok(())
        } else {
            Err(IqError::format_mismatch(self.shared.format, format))
        }
    }

    /// Drain the oldest unread slot into `buf`.
    ///
    /// # Errors
    /// - [`IqError::FormatMismatch`] or [`IqError::DestinationTooSmall`]
    ///   before any state is touched.
    /// - [`IqError::BufferUnderrun`] on an empty, non-blocking buffer.
    /// - The terminal error once closed.
    pub fn read_slot(&self, mut buf: SamplesMut<'_>) -> IqResult<usize> {
        self.check_format(buf.format())?;
        let slot_length = self.shared.options.slot_length;
        if buf.len() < slot_length {
            return Err(IqError::DestinationTooSmall {
                needed: slot_length,
                available: buf.len(),
            });
        }

        let mut state = self.shared.state.lock();
        let id = loop {
            if let Some(err) = state.terminal_error() {
                return Err(err);
            }
            if let Some(id) = state.advance_read() {
                break id;
            }
            if !self.shared.options.block_reads {
                state.underruns += 1;
                tracing::trace!(underruns = state.underruns, "ring buffer underrun");
                return Err(IqError::BufferUnderrun);
            }
            self.shared.readable.wait(&mut state);
        };

        let start = id * slot_length;
        let len = std::mem::take(&mut state.lens[id]);
        copy(buf.reborrow(), state.buf.slice(start, start + len))
    }

    /// Copy `buf` into the next slot.
    ///
    /// # Errors
    /// - [`IqError::FormatMismatch`] or [`IqError::DestinationTooSmall`] (the
    ///   slot is the destination) before any state is touched.
    /// - The terminal error once closed.
    pub fn write_slot(&self, buf: SamplesRef<'_>) -> IqResult<usize> {
        self.check_format(buf.format())?;
        let slot_length = self.shared.options.slot_length;
        if buf.len() > slot_length {
            return Err(IqError::DestinationTooSmall {
                needed: buf.len(),
                available: slot_length,
            });
        }
        self.write_with(|slot| copy(slot, buf).unwrap_or(0))
    }

    /// Fill the next slot in place.
    ///
    /// `fill` receives the whole slot and returns how many phasors it wrote;
    /// larger counts are clamped to the slot length. The buffer's lock is
    /// held while `fill` runs.
    ///
    /// # Errors
    /// The terminal error once closed.
    pub fn write_with<F>(&self, fill: F) -> IqResult<usize>
    where
        F: FnOnce(SamplesMut<'_>) -> usize,
    {
        let slot_length = self.shared.options.slot_length;
        let mut state = self.shared.state.lock();
        if let Some(err) = state.terminal_error() {
            return Err(err);
        }

        let id = state.advance_write();
        let start = id * slot_length;
        let n = fill(state.buf.slice_mut(start, start + slot_length)).min(slot_length);
        state.lens[id] = n;
        drop(state);
        self.shared.readable.notify_all();
        Ok(n)
    }

    /// Close with the default [`IqError::PipeClosed`] condition. Idempotent.
    pub fn close(&self) {
        self.close_with_error(IqError::PipeClosed);
    }

    /// Close with a sticky `err`, waking every blocked reader.
    ///
    /// Only the first close decides the error.
    pub fn close_with_error(&self, err: IqError) {
        let mut state = self.shared.state.lock();
        if !state.closed {
            state.closed = true;
            state.err = Some(err);
        }
        drop(state);
        self.shared.readable.notify_all();
    }
}

impl Reader for RingBuffer {
    fn read(&mut self, buf: SamplesMut<'_>) -> IqResult<usize> {
        self.read_slot(buf)
    }

    fn sample_format(&self) -> SampleFormat {
        self.shared.format
    }

    fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }
}

impl Writer for RingBuffer {
    fn write(&mut self, buf: SamplesRef<'_>) -> IqResult<usize> {
        self.write_slot(buf)
    }

    fn sample_format(&self) -> SampleFormat {
        self.shared.format
    }

    fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }
}

impl Closer for RingBuffer {
    fn close(&self) -> IqResult<()> {
        RingBuffer::close(self);
        Ok(())
    }
}
