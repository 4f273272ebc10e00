//! Lazily started radio streams.
//!
//! A standby reader (or writer) owns a radio and only starts streaming when
//! the first buffer is requested. Closing it stops the stream but keeps the
//! radio, so the same handle can be read again later and will restart
//! reception on demand.

use parking_lot::Mutex;

use crate::{
    BoxReadCloser, Closer, IqError, IqResult, Reader, Receiver, SampleFormat, SamplesMut,
    SamplesRef, Transmitter, WriteCloser, Writer,
};

struct RxState<X> {
    rx: X,
    stream: Option<BoxReadCloser>,
}

/// A reader that starts reception on first read and stops it on close.
pub struct StandbyReader<X> {
    state: Mutex<RxState<X>>,
    format: SampleFormat,
    sample_rate: u32,
}

impl<X: Receiver> StandbyReader<X> {
    /// Wrap `rx`, capturing its current sample rate and format.
    ///
    /// The rate must not change afterwards; a stream started at a different
    /// rate is rejected on read.
    ///
    /// # Errors
    /// Errors from querying the radio's sample rate.
    pub fn new(rx: X) -> IqResult<Self> {
        let sample_rate = rx.sample_rate()?;
        let format = rx.sample_format();
        Ok(Self {
            state: Mutex::new(RxState { rx, stream: None }),
            format,
            sample_rate,
        })
    }

    /// Whether reception is currently running.
    pub fn is_streaming(&self) -> bool {
        self.state.lock().stream.is_some()
    }
}

impl<X: Receiver> Reader for StandbyReader<X> {
    fn read(&mut self, buf: SamplesMut<'_>) -> IqResult<usize> {
        let state = self.state.get_mut();
        let stream = match &mut state.stream {
            Some(stream) => stream,
            slot => {
                let stream = state.rx.start_rx()?;
                if stream.sample_rate() != self.sample_rate {
                    if let Err(err) = stream.close() {
                        tracing::warn!(%err, "failed to stop mismatched receiver stream");
                    }
                    return Err(IqError::invalid_parameter(format!(
                        "receiver started at {} phasors per second, expected {}",
                        stream.sample_rate(),
                        self.sample_rate
                    )));
                }
                tracing::debug!(rate = self.sample_rate, "standby receiver started");
                slot.insert(stream)
            }
        };
        stream.read(buf)
    }

    fn sample_format(&self) -> SampleFormat {
        self.format
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl<X: Receiver> Closer for StandbyReader<X> {
    fn close(&self) -> IqResult<()> {
        match self.state.lock().stream.take() {
            Some(stream) => {
                tracing::debug!("standby receiver stopped");
                stream.close()
            }
            None => Ok(()),
        }
    }
}

struct TxState<X> {
    tx: X,
    stream: Option<Box<dyn WriteCloser>>,
}

/// A writer that starts transmission on first write and stops it on close.
pub struct StandbyWriter<X> {
    state: Mutex<TxState<X>>,
    format: SampleFormat,
    sample_rate: u32,
}

impl<X: Transmitter> StandbyWriter<X> {
    /// Wrap `tx`, capturing its current sample rate and format.
    ///
    /// # Errors
    /// Errors from querying the radio's sample rate.
    pub fn new(tx: X) -> IqResult<Self> {
        let sample_rate = tx.sample_rate()?;
        let format = tx.sample_format();
        Ok(Self {
            state: Mutex::new(TxState { tx, stream: None }),
            format,
            sample_rate,
        })
    }
}

impl<X: Transmitter> Writer for StandbyWriter<X> {
    fn write(&mut self, buf: SamplesRef<'_>) -> IqResult<usize> {
        let state = self.state.get_mut();
        let stream = match &mut state.stream {
            Some(stream) => stream,
            slot => {
                let stream = state.tx.start_tx()?;
                if stream.sample_rate() != self.sample_rate {
                    if let Err(err) = stream.close() {
                        tracing::warn!(%err, "failed to stop mismatched transmitter stream");
                    }
                    return Err(IqError::invalid_parameter(format!(
                        "transmitter started at {} phasors per second, expected {}",
                        stream.sample_rate(),
                        self.sample_rate
                    )));
                }
                slot.insert(stream)
            }
        };
        stream.write(buf)
    }

    fn sample_format(&self) -> SampleFormat {
        self.format
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl<X: Transmitter> Closer for StandbyWriter<X> {
    fn close(&self) -> IqResult<()> {
        self.state.lock().stream.take().map_or(Ok(()), |stream| stream.close())
    }
}
