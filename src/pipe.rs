//! Synchronous, unbuffered phasor pipe.
//!
//! [`pipe`] returns a linked [`PipeReader`] and [`PipeWriter`]. A write blocks
//! until readers have consumed the whole buffer; a read blocks until a writer
//! offers data. Data is copied exactly once, straight from the writer's buffer
//! into the reader's.
//!
//! ```text
//! Open ──close()──────────────▶ Closed(PipeClosed)
//!   └───close_with_error(e)───▶ Closed(e)
//! ```
//!
//! Once closed (from either end, or by cancelling the [`Lifetime`]), every
//! operation on both ends returns the same terminal error.

use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use parking_lot::Mutex;

use crate::conversions::copy;
use crate::{
    Closer, IqError, IqResult, Lifetime, Reader, SampleFormat, SamplesMut, SamplesRef, Writer,
};

/// A writer's buffer, lent to the reader for one exchange.
///
/// This is the only place the crate extends a borrow past what the compiler
/// can see. The writer stays blocked in [`PipeWriter::write`] until the reader
/// acknowledges the exchange, so the borrowed storage outlives every use.
struct Lease(SamplesRef<'static>);

impl Lease {
    /// # Safety
    /// The caller must not return, drop or mutate `buf`'s storage until the
    /// lease has either been dropped unsent, or a reader that received it has
    /// acknowledged on the pipe's ack channel.
    unsafe fn new(buf: SamplesRef<'_>) -> Self {
        // SAFETY: only the lifetime changes; upheld by the caller.
        Self(unsafe { std::mem::transmute::<SamplesRef<'_>, SamplesRef<'static>>(buf) })
    }

    fn samples(&self) -> SamplesRef<'_> {
        self.0
    }
}

struct Shared {
    format: SampleFormat,
    sample_rate: u32,
    lifetime: Lifetime,
    err: Mutex<Option<IqError>>,
    lease_tx: Sender<Lease>,
    lease_rx: Receiver<Lease>,
    ack_tx: Sender<usize>,
    ack_rx: Receiver<usize>,
}

impl Shared {
    /// The error every operation returns once the pipe is closed.
    fn terminal_error(&self) -> IqError {
        self.err.lock().clone().unwrap_or(IqError::PipeClosed)
    }

    fn error(&self) -> Option<IqError> {
        self.lifetime.is_cancelled().then(|| self.terminal_error())
    }

    fn close_with_error(&self, err: IqError) {
        {
            let mut slot = self.err.lock();
            if slot.is_none() && !self.lifetime.is_cancelled() {
                tracing::debug!(%err, format = %self.format, "pipe closed with error");
                *slot = Some(err);
            }
        }
        self.lifetime.cancel();
    }

    fn close(&self) {
        self.lifetime.cancel();
    }
}

/// Create a connected pipe carrying `format` phasors at `sample_rate`.
pub fn pipe(sample_rate: u32, format: SampleFormat) -> (PipeReader, PipeWriter) {
    pipe_with_lifetime(&Lifetime::new(), sample_rate, format)
}

/// Like [`pipe`], but the pipe also closes when `parent` is cancelled.
pub fn pipe_with_lifetime(
    parent: &Lifetime,
    sample_rate: u32,
    format: SampleFormat,
) -> (PipeReader, PipeWriter) {
    let (lease_tx, lease_rx) = channel::bounded(0);
    let (ack_tx, ack_rx) = channel::bounded(1);
    let shared = Arc::new(Shared {
        format,
        sample_rate,
        lifetime: parent.child(),
        err: Mutex::new(None),
        lease_tx,
        lease_rx,
        ack_tx,
        ack_rx,
    });
    (
        PipeReader {
            shared: Arc::clone(&shared),
        },
        PipeWriter { shared },
    )
}

/// Cloneable handle that can close a pipe from any thread.
#[derive(Clone)]
pub struct PipeCloser {
    shared: Arc<Shared>,
}

impl PipeCloser {
    /// Close with the default [`IqError::PipeClosed`] condition.
    pub fn close(&self) {
        self.shared.close();
    }

    /// Close, making `err` the sticky terminal error for both ends.
    ///
    /// Only the first error attached to a pipe is kept.
    pub fn close_with_error(&self, err: IqError) {
        self.shared.close_with_error(err);
    }

    /// Whether the pipe is closed.
    pub fn is_closed(&self) -> bool {
        self.shared.lifetime.is_cancelled()
    }
}

macro_rules! impl_pipe_end {
    ($ty:ident) => {
        impl $ty {
            /// Close with the default [`IqError::PipeClosed`] condition.
            pub fn close(&self) {
                self.shared.close();
            }

            /// Close, making `err` the sticky terminal error for both ends.
            pub fn close_with_error(&self, err: IqError) {
                self.shared.close_with_error(err);
            }

            /// A handle that can close this pipe from another thread.
            pub fn closer(&self) -> PipeCloser {
                PipeCloser {
                    shared: Arc::clone(&self.shared),
                }
            }

            /// The pipe's cancellation token.
            pub fn lifetime(&self) -> &Lifetime {
                &self.shared.lifetime
            }

            /// The terminal error, if the pipe is closed.
            pub fn error(&self) -> Option<IqError> {
                self.shared.error()
            }
        }

        impl Closer for $ty {
            fn close(&self) -> IqResult<()> {
                self.shared.close();
                Ok(())
            }
        }

        impl Drop for $ty {
            fn drop(&mut self) {
                self.shared.close();
            }
        }
    };
}

/// Reading end of a [`pipe`]. Closes the pipe when dropped.
pub struct PipeReader {
    shared: Arc<Shared>,
}

/// Writing end of a [`pipe`]. Closes the pipe when dropped.
pub struct PipeWriter {
    shared: Arc<Shared>,
}

impl_pipe_end!(PipeReader);
impl_pipe_end!(PipeWriter);

impl Reader for PipeReader {
    fn read(&mut self, mut buf: SamplesMut<'_>) -> IqResult<usize> {
        let shared = &*self.shared;
        if let Some(err) = shared.error() {
            return Err(err);
        }
        if buf.format() != shared.format {
            return Err(IqError::format_mismatch(shared.format, buf.format()));
        }
        if buf.is_empty() {
            return Ok(0);
        }

        select! {
            recv(shared.lease_rx) -> lease => {
                let Ok(lease) = lease else {
                    return Err(shared.terminal_error());
                };
                let result = copy(buf.reborrow(), lease.samples());
                drop(lease);
                // The writer is blocked on this ack; the channel has room
                // for exactly one exchange.
                let _ = shared.ack_tx.send(*result.as_ref().unwrap_or(&0));
                result
            }
            recv(shared.lifetime.done()) -> _ => Err(shared.terminal_error()),
        }
    }

    fn sample_format(&self) -> SampleFormat {
        self.shared.format
    }

    fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }
}

impl Writer for PipeWriter {
    fn write(&mut self, buf: SamplesRef<'_>) -> IqResult<usize> {
        let shared = &*self.shared;
        if let Some(err) = shared.error() {
            return Err(err);
        }
        if buf.format() != shared.format {
            return Err(IqError::format_mismatch(shared.format, buf.format()));
        }

        let mut written = 0;
        while written < buf.len() {
            let remaining = buf.slice(written, buf.len());
            // SAFETY: if the lease is sent, we block on `ack_rx` below
            // before touching `buf` again or returning.
            let lease = unsafe { Lease::new(remaining) };
            select! {
                send(shared.lease_tx, lease) -> sent => {
                    if sent.is_err() {
                        return Err(shared.terminal_error());
                    }
                    match shared.ack_rx.recv() {
                        Ok(n) => written += n,
                        Err(_) => return Err(shared.terminal_error()),
                    }
                }
                recv(shared.lifetime.done()) -> _ => return Err(shared.terminal_error()),
            }
        }
        Ok(written)
    }

    fn sample_format(&self) -> SampleFormat {
        self.shared.format
    }

    fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }
}
