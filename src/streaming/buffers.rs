//! Buffered pipes.
//!
//! Both variants copy every written buffer into a bounded queue. A background
//! thread drains the queue into an ordinary [`pipe`](crate::pipe), so the
//! producer never waits on the consumer unless the queue is full.
//!
//! - [`buf_pipe`] fails a write on a full queue with [`IqError::BufferOverrun`]
//!   and poisons the pipe with it, unless configured to block.
//! - [`buf_pipe2`] fails a write on a full queue by closing the pipe; callers
//!   see the sticky terminal error and cannot tell overrun from closure.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use crossbeam::select;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    Closer, IqError, IqResult, Lifetime, PipeReader, PipeWriter, Reader, SampleFormat, Samples,
    SamplesMut, SamplesRef, Writer, pipe_with_lifetime,
};

/// Configuration for buffered pipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufPipeConfig {
    /// Number of written buffers that may be queued.
    pub capacity: usize,

    /// Block writes on a full queue instead of failing them.
    pub blocking: bool,
}

impl Default for BufPipeConfig {
    fn default() -> Self {
        Self {
            capacity: 16,
            blocking: false,
        }
    }
}

fn spawn_forwarder<F>(name: &str, body: F) -> IqResult<()>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_owned())
        .spawn(body)
        .map(drop)
        .map_err(IqError::from)
}

// ---------------------------------------------------------------------------
// Blocking-capable variant
// ---------------------------------------------------------------------------

struct BufShared {
    format: SampleFormat,
    sample_rate: u32,
    lifetime: Lifetime,
    blocking: AtomicBool,
    err: Mutex<Option<IqError>>,
    queue: Mutex<Option<Sender<Samples>>>,
}

impl BufShared {
    fn error(&self) -> Option<IqError> {
        self.err.lock().clone()
    }

    fn set_error(&self, err: IqError) {
        let mut slot = self.err.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    /// Stop accepting writes; queued buffers still reach the reader.
    fn close(&self) {
        self.queue.lock().take();
    }

    /// Fail both ends with `err` right away.
    fn close_with_error(&self, err: IqError) {
        tracing::debug!(%err, format = %self.format, "buffered pipe closed with error");
        self.set_error(err);
        self.close();
        self.lifetime.cancel();
    }
}

/// Create a buffered pipe carrying `format` phasors at `sample_rate`.
///
/// # Errors
/// [`IqError::InvalidParameter`] for a zero capacity, or an I/O error if the
/// forwarding thread cannot be spawned.
pub fn buf_pipe(
    config: BufPipeConfig,
    sample_rate: u32,
    format: SampleFormat,
) -> IqResult<(BufPipeReader, BufPipeWriter)> {
    buf_pipe_with_lifetime(&Lifetime::new(), config, sample_rate, format)
}

/// Like [`buf_pipe`], but the pipe also closes when `parent` is cancelled.
///
/// # Errors
/// As [`buf_pipe`].
pub fn buf_pipe_with_lifetime(
    parent: &Lifetime,
    config: BufPipeConfig,
    sample_rate: u32,
    format: SampleFormat,
) -> IqResult<(BufPipeReader, BufPipeWriter)> {
    if config.capacity == 0 {
        return Err(IqError::invalid_parameter("buffered pipe capacity must be non-zero"));
    }
    let (queue_tx, queue_rx) = channel::bounded(config.capacity);
    let shared = Arc::new(BufShared {
        format,
        sample_rate,
        lifetime: parent.child(),
        blocking: AtomicBool::new(config.blocking),
        err: Mutex::new(None),
        queue: Mutex::new(Some(queue_tx)),
    });
    let (reader, writer) = pipe_with_lifetime(&shared.lifetime, sample_rate, format);

    let forward = Arc::clone(&shared);
    spawn_forwarder("iq-bufpipe", move || forward_blocking(&forward, &queue_rx, writer))?;

    Ok((
        BufPipeReader {
            shared: Arc::clone(&shared),
            inner: reader,
        },
        BufPipeWriter { shared },
    ))
}

fn forward_blocking(shared: &BufShared, queue: &Receiver<Samples>, mut out: PipeWriter) {
    loop {
        select! {
            recv(queue) -> msg => match msg {
                Ok(samples) => {
                    if let Err(err) = out.write(samples.as_ref()) {
                        shared.close_with_error(err);
                        return;
                    }
                }
                Err(_) => {
                    shared.set_error(IqError::PipeClosed);
                    tracing::trace!("buffered pipe drained");
                    return;
                }
            },
            recv(shared.lifetime.done()) -> _ => return,
        }
    }
}

/// Reading end of a [`buf_pipe`].
pub struct BufPipeReader {
    shared: Arc<BufShared>,
    inner: PipeReader,
}

/// Writing end of a [`buf_pipe`]. Closes the pipe when dropped.
pub struct BufPipeWriter {
    shared: Arc<BufShared>,
}

impl BufPipeWriter {
    /// Choose between blocking and failing on a full queue.
    pub fn set_blocking(&self, blocking: bool) {
        self.shared.blocking.store(blocking, Ordering::Relaxed);
    }

    /// Stop accepting writes. Already queued buffers are still delivered,
    /// then reads fail with [`IqError::PipeClosed`].
    pub fn close(&self) {
        self.shared.close();
    }

    /// Close both ends immediately with a sticky `err`.
    pub fn close_with_error(&self, err: IqError) {
        self.shared.close_with_error(err);
    }

    /// The terminal error, if any.
    pub fn error(&self) -> Option<IqError> {
        self.shared.error()
    }
}

impl BufPipeReader {
    /// Close both ends immediately with a sticky `err`.
    pub fn close_with_error(&self, err: IqError) {
        self.shared.close_with_error(err);
    }
}

impl Reader for BufPipeReader {
    fn read(&mut self, buf: SamplesMut<'_>) -> IqResult<usize> {
        if let Some(err) = self.shared.error() {
            return Err(err);
        }
        if buf.format() != self.shared.format {
            return Err(IqError::format_mismatch(self.shared.format, buf.format()));
        }
        self.inner
            .read(buf)
            .map_err(|err| self.shared.error().unwrap_or(err))
    }

    fn sample_format(&self) -> SampleFormat {
        self.shared.format
    }

    fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }
}

impl Writer for BufPipeWriter {
    fn write(&mut self, buf: SamplesRef<'_>) -> IqResult<usize> {
        let shared = &*self.shared;
        if let Some(err) = shared.error() {
            return Err(err);
        }
        if buf.format() != shared.format {
            return Err(IqError::format_mismatch(shared.format, buf.format()));
        }
        let Some(queue) = shared.queue.lock().clone() else {
            return Err(IqError::PipeClosed);
        };

        let n = buf.len();
        let dupe = buf.to_samples();
        if shared.blocking.load(Ordering::Relaxed) {
            select! {
                send(queue, dupe) -> sent => sent
                    .map(|()| n)
                    .map_err(|_| shared.error().unwrap_or(IqError::PipeClosed)),
                recv(shared.lifetime.done()) -> _ => {
                    Err(shared.error().unwrap_or(IqError::PipeClosed))
                }
            }
        } else {
            match queue.try_send(dupe) {
                Ok(()) => Ok(n),
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(format = %shared.format, "buffered pipe overrun");
                    shared.close_with_error(IqError::BufferOverrun);
                    Err(IqError::BufferOverrun)
                }
                Err(TrySendError::Disconnected(_)) => {
                    Err(shared.error().unwrap_or(IqError::PipeClosed))
                }
            }
        }
    }

    fn sample_format(&self) -> SampleFormat {
        self.shared.format
    }

    fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }
}

impl Closer for BufPipeReader {
    fn close(&self) -> IqResult<()> {
        self.shared.close_with_error(IqError::PipeClosed);
        Ok(())
    }
}

impl Closer for BufPipeWriter {
    fn close(&self) -> IqResult<()> {
        self.shared.close();
        Ok(())
    }
}

impl Drop for BufPipeWriter {
    fn drop(&mut self) {
        self.shared.close();
    }
}

// ---------------------------------------------------------------------------
// Simple variant
// ---------------------------------------------------------------------------

struct SimpleShared {
    format: SampleFormat,
    sample_rate: u32,
    blocking: bool,
    lifetime: Lifetime,
    err: Mutex<Option<IqError>>,
    queue: Mutex<Option<Sender<Samples>>>,
}

impl SimpleShared {
    fn terminal_error(&self) -> IqError {
        self.err.lock().clone().unwrap_or(IqError::PipeClosed)
    }

    fn close_with_error(&self, err: IqError) {
        {
            let mut slot = self.err.lock();
            if slot.is_none() {
                *slot = Some(err);
            }
        }
        self.queue.lock().take();
    }
}

/// Create the simple buffered pipe.
///
/// # Errors
/// As [`buf_pipe`].
pub fn buf_pipe2(
    config: BufPipeConfig,
    sample_rate: u32,
    format: SampleFormat,
) -> IqResult<(BufPipe2Reader, BufPipe2Writer)> {
    if config.capacity == 0 {
        return Err(IqError::invalid_parameter("buffered pipe capacity must be non-zero"));
    }
    let (queue_tx, queue_rx) = channel::bounded(config.capacity);
    let lifetime = Lifetime::new();
    let (reader, writer) = pipe_with_lifetime(&lifetime, sample_rate, format);
    let shared = Arc::new(SimpleShared {
        format,
        sample_rate,
        blocking: config.blocking,
        lifetime,
        err: Mutex::new(None),
        queue: Mutex::new(Some(queue_tx)),
    });

    let forward = Arc::clone(&shared);
    spawn_forwarder("iq-bufpipe2", move || {
        let mut out = writer;
        for samples in &queue_rx {
            if let Err(err) = out.write(samples.as_ref()) {
                forward.close_with_error(err);
                break;
            }
        }
        out.close_with_error(forward.terminal_error());
    })?;

    Ok((
        BufPipe2Reader {
            shared: Arc::clone(&shared),
            inner: reader,
        },
        BufPipe2Writer { shared },
    ))
}

/// Reading end of a [`buf_pipe2`].
pub struct BufPipe2Reader {
    shared: Arc<SimpleShared>,
    inner: PipeReader,
}

/// Writing end of a [`buf_pipe2`]. Closes the pipe when dropped.
pub struct BufPipe2Writer {
    shared: Arc<SimpleShared>,
}

impl BufPipe2Writer {
    /// Stop accepting writes, letting queued buffers drain.
    pub fn close(&self) {
        self.shared.close_with_error(IqError::PipeClosed);
    }

    /// Stop accepting writes with a sticky `err`.
    pub fn close_with_error(&self, err: IqError) {
        self.shared.close_with_error(err);
    }
}

impl Reader for BufPipe2Reader {
    fn read(&mut self, buf: SamplesMut<'_>) -> IqResult<usize> {
        self.inner.read(buf)
    }

    fn sample_format(&self) -> SampleFormat {
        self.shared.format
    }

    fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }
}

impl Writer for BufPipe2Writer {
    fn write(&mut self, buf: SamplesRef<'_>) -> IqResult<usize> {
        let shared = &*self.shared;
        if buf.format() != shared.format {
            return Err(IqError::format_mismatch(shared.format, buf.format()));
        }
        let Some(queue) = shared.queue.lock().clone() else {
            return Err(shared.terminal_error());
        };

        let n = buf.len();
        let dupe = buf.to_samples();
        let sent = if shared.blocking {
            queue.send(dupe).is_ok()
        } else {
            queue.try_send(dupe).is_ok()
        };
        if sent {
            Ok(n)
        } else {
            shared.close_with_error(IqError::PipeClosed);
            Err(shared.terminal_error())
        }
    }

    fn sample_format(&self) -> SampleFormat {
        self.shared.format
    }

    fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }
}

impl Closer for BufPipe2Reader {
    fn close(&self) -> IqResult<()> {
        self.shared.close_with_error(IqError::PipeClosed);
        self.shared.lifetime.cancel();
        Ok(())
    }
}

impl Closer for BufPipe2Writer {
    fn close(&self) -> IqResult<()> {
        BufPipe2Writer::close(self);
        Ok(())
    }
}

impl Drop for BufPipe2Writer {
    fn drop(&mut self) {
        self.shared.close_with_error(IqError::PipeClosed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;

    fn chunk(value: f32, len: usize) -> Samples {
        Samples::C64(vec![Complex32::new(value, -value); len])
    }

    #[test]
    fn test_writes_do_not_wait_for_reader() {
        let config = BufPipeConfig {
            capacity: 4,
            blocking: false,
        };
        let (mut reader, mut writer) = buf_pipe(config, 1_000, SampleFormat::C64).unwrap();
        for i in 0..3 {
            assert_eq!(writer.write(chunk(i as f32, 8).as_ref()).unwrap(), 8);
        }
        writer.close();

        let mut buf = Samples::new(SampleFormat::C64, 8);
        for i in 0..3 {
            assert_eq!(reader.read(buf.as_mut()).unwrap(), 8);
            assert_eq!(buf, chunk(i as f32, 8));
        }
        assert!(matches!(reader.read(buf.as_mut()), Err(IqError::PipeClosed)));
    }

    #[test]
    fn test_overrun_poisons_pipe() {
        let config = BufPipeConfig {
            capacity: 1,
            blocking: false,
        };
        let (mut reader, mut writer) = buf_pipe(config, 1_000, SampleFormat::C64).unwrap();
        let buf = chunk(1.0, 4);
        // Nobody reads: the forwarder holds at most one buffer in flight and
        // the queue holds one more.
        let mut result = Ok(0);
        for _ in 0..8 {
            result = writer.write(buf.as_ref());
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(IqError::BufferOverrun)));
        assert!(matches!(writer.write(buf.as_ref()), Err(IqError::BufferOverrun)));
        let mut out = Samples::new(SampleFormat::C64, 4);
        assert!(matches!(reader.read(out.as_mut()), Err(IqError::BufferOverrun)));
    }

    #[test]
    fn test_blocking_writer_waits_for_space() {
        let config = BufPipeConfig {
            capacity: 1,
            blocking: true,
        };
        let (mut reader, mut writer) = buf_pipe(config, 1_000, SampleFormat::C64).unwrap();
        let producer = thread::spawn(move || {
            for i in 0..16 {
                writer.write(chunk(i as f32, 2).as_ref())?;
            }
            Ok::<_, IqError>(())
        });

        let mut buf = Samples::new(SampleFormat::C64, 2);
        for i in 0..16 {
            assert_eq!(reader.read(buf.as_mut()).unwrap(), 2);
            assert_eq!(buf, chunk(i as f32, 2));
        }
        producer.join().unwrap().unwrap();
    }

    #[test]
    fn test_format_mismatch() {
        let (mut reader, mut writer) =
            buf_pipe(BufPipeConfig::default(), 1_000, SampleFormat::I8).unwrap();
        let mut wrong = Samples::new(SampleFormat::U8, 4);
        assert!(matches!(
            reader.read(wrong.as_mut()),
            Err(IqError::FormatMismatch { .. })
        ));
        assert!(matches!(
            writer.write(wrong.as_ref()),
            Err(IqError::FormatMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = BufPipeConfig {
            capacity: 0,
            blocking: false,
        };
        assert!(buf_pipe(config, 1, SampleFormat::C64).is_err());
        assert!(buf_pipe2(config, 1, SampleFormat::C64).is_err());
    }

    #[test]
    fn test_simple_variant_delivers_in_order() {
        let (mut reader, mut writer) =
            buf_pipe2(BufPipeConfig::default(), 1_000, SampleFormat::C64).unwrap();
        for i in 0..4 {
            writer.write(chunk(i as f32, 3).as_ref()).unwrap();
        }
        writer.close();
        assert!(matches!(
            writer.write(chunk(9.0, 3).as_ref()),
            Err(IqError::PipeClosed)
        ));

        let mut buf = Samples::new(SampleFormat::C64, 3);
        for i in 0..4 {
            assert_eq!(reader.read(buf.as_mut()).unwrap(), 3);
            assert_eq!(buf, chunk(i as f32, 3));
        }
        assert!(matches!(reader.read(buf.as_mut()), Err(IqError::PipeClosed)));
    }

    #[test]
    fn test_simple_variant_overrun_looks_like_close() {
        let config = BufPipeConfig {
            capacity: 1,
            blocking: false,
        };
        let (_reader, mut writer) = buf_pipe2(config, 1_000, SampleFormat::C64).unwrap();
        let buf = chunk(1.0, 4);
        let mut result = Ok(0);
        for _ in 0..8 {
            result = writer.write(buf.as_ref());
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(IqError::PipeClosed)));
    }

    #[test]
    fn test_simple_variant_keeps_custom_error() {
        let (mut reader, mut writer) =
            buf_pipe2(BufPipeConfig::default(), 1_000, SampleFormat::C64).unwrap();
        writer.close_with_error(IqError::UnexpectedEnd);
        assert!(matches!(
            writer.write(chunk(0.0, 1).as_ref()),
            Err(IqError::UnexpectedEnd)
        ));
        let mut buf = Samples::new(SampleFormat::C64, 1);
        assert!(matches!(reader.read(buf.as_mut()), Err(IqError::UnexpectedEnd)));
    }
}
