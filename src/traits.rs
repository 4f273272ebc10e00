//! Reader and Writer capability contracts.
//!
//! Everything that produces phasors (a radio driver, a pipe endpoint, a
//! transform stage) implements [`Reader`]; everything that consumes them
//! implements [`Writer`]. Both declare a fixed [`SampleFormat`] and sample
//! rate, and both reject buffers of any other format with
//! [`IqError::FormatMismatch`](crate::IqError::FormatMismatch) before touching
//! any data.

use crate::{IqResult, SampleFormat, SamplesMut, SamplesRef};

/// A source of phasors.
pub trait Reader: Send {
    /// Fill some prefix of `buf`, returning how many phasors were written.
    ///
    /// A successful return of `0` only happens for an empty `buf`. The end of
    /// a finite stream is reported as
    /// [`IqError::EndOfStream`](crate::IqError::EndOfStream).
    fn read(&mut self, buf: SamplesMut<'_>) -> IqResult<usize>;

    /// Format of the phasors this reader produces.
    fn sample_format(&self) -> SampleFormat;

    /// Phasors per second.
    fn sample_rate(&self) -> u32;
}

/// A sink for phasors.
pub trait Writer: Send {
    /// Consume phasors from `buf`, returning how many were accepted.
    fn write(&mut self, buf: SamplesRef<'_>) -> IqResult<usize>;

    /// Format of the phasors this writer accepts.
    fn sample_format(&self) -> SampleFormat;

    /// Phasors per second.
    fn sample_rate(&self) -> u32;
}

/// Something that can be shut down, waking anything blocked on it.
pub trait Closer {
    /// Release the component. Idempotent.
    fn close(&self) -> IqResult<()>;
}

/// A [`Reader`] that can also be closed.
pub trait ReadCloser: Reader + Closer {}

impl<T: Reader + Closer + ?Sized> ReadCloser for T {}

/// A [`Writer`] that can also be closed.
pub trait WriteCloser: Writer + Closer {}

impl<T: Writer + Closer + ?Sized> WriteCloser for T {}

impl<R: Reader + ?Sized> Reader for Box<R> {
    fn read(&mut self, buf: SamplesMut<'_>) -> IqResult<usize> {
        (**self).read(buf)
    }

    fn sample_format(&self) -> SampleFormat {
        (**self).sample_format()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }
}

impl<R: Reader + ?Sized> Reader for &mut R {
    fn read(&mut self, buf: SamplesMut<'_>) -> IqResult<usize> {
        (**self).read(buf)
    }

    fn sample_format(&self) -> SampleFormat {
        (**self).sample_format()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }
}

impl<W: Writer + ?Sized> Writer for Box<W> {
    fn write(&mut self, buf: SamplesRef<'_>) -> IqResult<usize> {
        (**self).write(buf)
    }

    fn sample_format(&self) -> SampleFormat {
        (**self).sample_format()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }
}

impl<W: Writer + ?Sized> Writer for &mut W {
    fn write(&mut self, buf: SamplesRef<'_>) -> IqResult<usize> {
        (**self).write(buf)
    }

    fn sample_format(&self) -> SampleFormat {
        (**self).sample_format()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }
}

impl<C: Closer + ?Sized> Closer for Box<C> {
    fn close(&self) -> IqResult<()> {
        (**self).close()
    }
}

/// Boxed reader, the currency of stream stage constructors.
pub type BoxReader = Box<dyn Reader>;

/// Boxed closable reader.
pub type BoxReadCloser = Box<dyn ReadCloser>;
