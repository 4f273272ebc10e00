//! Generic helpers over [`Reader`] and [`Writer`].
//!
//! These mirror the familiar byte-stream helpers (`read_exact`, `io::copy`,
//! `Read::chain`) for phasor streams. Counts are always in phasors.

use crate::{
    BoxReader, Closer, IqError, IqResult, Reader, SampleFormat, Samples, SamplesMut, SamplesRef,
    Writer,
};

/// Scratch buffer length used when the caller does not supply one.
pub const DEFAULT_BUFFER_LENGTH: usize = 32 * 1024;

/// Read repeatedly until `buf` holds at least `min` phasors.
///
/// # Errors
/// - [`IqError::ShortBuffer`] if `buf` is shorter than `min`.
/// - [`IqError::UnexpectedEnd`] if the stream ends after a partial fill.
/// - [`IqError::EndOfStream`] if it ends before producing anything.
/// - Any other error from `reader`, as is.
pub fn read_at_least<R: Reader + ?Sized>(
    reader: &mut R,
    mut buf: SamplesMut<'_>,
    min: usize,
) -> IqResult<usize> {
    if buf.len() < min {
        return Err(IqError::ShortBuffer);
    }
    match fill(reader, buf.reborrow(), min) {
        (n, None) => Ok(n),
        (n, Some(IqError::EndOfStream)) if n > 0 => Err(IqError::UnexpectedEnd),
        (_, Some(err)) => Err(err),
    }
}

/// Read until `buf` is completely full.
///
/// # Errors
/// As [`read_at_least`] with `min = buf.len()`.
pub fn read_full<R: Reader + ?Sized>(reader: &mut R, buf: SamplesMut<'_>) -> IqResult<usize> {
    let len = buf.len();
    read_at_least(reader, buf, len)
}

/// Read until at least `min` phasors arrived or the reader fails, reporting
/// both the count and the failure so that the caller can still use the
/// partial data.
pub(crate) fn fill<R: Reader + ?Sized>(
    reader: &mut R,
    mut buf: SamplesMut<'_>,
    min: usize,
) -> (usize, Option<IqError>) {
    let len = buf.len();
    let mut n = 0;
    while n < min {
        match reader.read(buf.reborrow().slice_mut(n, len)) {
            Ok(0) => return (n, Some(IqError::UnexpectedEnd)),
            Ok(nn) => n += nn,
            Err(err) => return (n, Some(err)),
        }
    }
    (n, None)
}

/// Move phasors from `src` to `dst` until `src` ends, returning the count.
///
/// # Errors
/// [`IqError::FormatMismatch`] if the two formats differ, [`IqError::ShortWrite`]
/// if `dst` accepts fewer phasors than offered, and any other error from
/// either side. A clean [`IqError::EndOfStream`] from `src` is not an error.
pub fn copy_stream<W, R>(dst: &mut W, src: &mut R) -> IqResult<u64>
where
    W: Writer + ?Sized,
    R: Reader + ?Sized,
{
    let mut buf = Samples::new(dst.sample_format(), DEFAULT_BUFFER_LENGTH);
    copy_stream_with_buffer(dst, src, &mut buf)
}

/// Like [`copy_stream`], using `buf` as scratch space.
///
/// # Errors
/// As [`copy_stream`]; also [`IqError::FormatMismatch`] if `buf` is the wrong
/// format.
pub fn copy_stream_with_buffer<W, R>(dst: &mut W, src: &mut R, buf: &mut Samples) -> IqResult<u64>
where
    W: Writer + ?Sized,
    R: Reader + ?Sized,
{
    if dst.sample_format() != src.sample_format() {
        return Err(IqError::format_mismatch(
            dst.sample_format(),
            src.sample_format(),
        ));
    }
    if buf.format() != dst.sample_format() {
        return Err(IqError::format_mismatch(dst.sample_format(), buf.format()));
    }

    let mut written = 0u64;
    loop {
        let nr = match src.read(buf.as_mut()) {
            Ok(n) => n,
            Err(IqError::EndOfStream) => return Ok(written),
            Err(err) => return Err(err),
        };
        let nw = dst.write(buf.slice(0, nr))?;
        written += nw as u64;
        if nw != nr {
            return Err(IqError::ShortWrite);
        }
    }
}

pub(crate) fn check_uniform(
    mut streams: impl Iterator<Item = (SampleFormat, u32)>,
    what: &str,
) -> IqResult<(SampleFormat, u32)> {
    let Some((format, rate)) = streams.next() else {
        return Err(IqError::invalid_parameter(format!("{what}: no streams given")));
    };
    for (f, r) in streams {
        if f != format {
            return Err(IqError::format_mismatch(format, f));
        }
        if r != rate {
            return Err(IqError::invalid_parameter(format!(
                "{what}: sample rate mismatch ({rate} vs {r})"
            )));
        }
    }
    Ok((format, rate))
}

/// Concatenation of readers: drains each in turn.
pub struct MultiReader {
    readers: Vec<BoxReader>,
    idx: usize,
    err: Option<IqError>,
    format: SampleFormat,
    sample_rate: u32,
}

impl MultiReader {
    /// Chain `readers`, which must share a format and sample rate.
    ///
    /// # Errors
    /// Fails on an empty list, or on format or rate disagreement.
    pub fn new(readers: Vec<BoxReader>) -> IqResult<Self> {
        let (format, sample_rate) = check_uniform(
            readers.iter().map(|r| (r.sample_format(), r.sample_rate())),
            "MultiReader",
        )?;
        Ok(Self {
            readers,
            idx: 0,
            err: None,
            format,
            sample_rate,
        })
    }
}

impl Reader for MultiReader {
    fn read(&mut self, mut buf: SamplesMut<'_>) -> IqResult<usize> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        if buf.format() != self.format {
            return Err(IqError::format_mismatch(self.format, buf.format()));
        }
        loop {
            let Some(reader) = self.readers.get_mut(self.idx) else {
                self.err = Some(IqError::EndOfStream);
                return Err(IqError::EndOfStream);
            };
            match reader.read(buf.reborrow()) {
                Ok(n) => return Ok(n),
                Err(IqError::EndOfStream) => self.idx += 1,
                Err(err) => {
                    self.err = Some(err.clone());
                    return Err(err);
                }
            }
        }
    }

    fn sample_format(&self) -> SampleFormat {
        self.format
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Tee: every write is forwarded, in full, to each inner writer in order.
pub struct MultiWriter {
    writers: Vec<Box<dyn Writer>>,
    format: SampleFormat,
    sample_rate: u32,
}

impl MultiWriter {
    /// Fan out to `writers`.
    ///
    /// # Errors
    /// Fails if any writer disagrees with `format` or `sample_rate`.
    pub fn new(
        sample_rate: u32,
        format: SampleFormat,
        writers: Vec<Box<dyn Writer>>,
    ) -> IqResult<Self> {
        check_uniform(
            std::iter::once((format, sample_rate))
                .chain(writers.iter().map(|w| (w.sample_format(), w.sample_rate()))),
            "MultiWriter",
        )?;
        Ok(Self {
            writers,
            format,
            sample_rate,
        })
    }
}

impl Writer for MultiWriter {
    fn write(&mut self, buf: SamplesRef<'_>) -> IqResult<usize> {
        if buf.format() != self.format {
            return Err(IqError::format_mismatch(self.format, buf.format()));
        }
        for writer in &mut self.writers {
            if writer.write(buf)? != buf.len() {
                return Err(IqError::ShortWrite);
            }
        }
        Ok(buf.len())
    }

    fn sample_format(&self) -> SampleFormat {
        self.format
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// A group of readers handled together, e.g. the channels of a coherent
/// receiver.
#[derive(Default)]
pub struct Readers(pub Vec<BoxReader>);

impl Readers {
    /// The shared sample rate, or `None` if empty or inconsistent.
    pub fn sample_rate(&self) -> Option<u32> {
        let first = self.0.first()?.sample_rate();
        self.0
            .iter()
            .all(|r| r.sample_rate() == first)
            .then_some(first)
    }

    /// The shared sample format, or `None` if empty or inconsistent.
    pub fn sample_format(&self) -> Option<SampleFormat> {
        let first = self.0.first()?.sample_format();
        self.0
            .iter()
            .all(|r| r.sample_format() == first)
            .then_some(first)
    }

    /// Apply `f` to every reader.
    pub fn wrap(self, f: impl FnMut(BoxReader) -> BoxReader) -> Self {
        Self(self.0.into_iter().map(f).collect())
    }

    /// Apply a fallible `f` to every reader, stopping at the first error.
    ///
    /// # Errors
    /// The first error returned by `f`.
    pub fn try_wrap(self, f: impl FnMut(BoxReader) -> IqResult<BoxReader>) -> IqResult<Self> {
        Ok(Self(self.0.into_iter().map(f).collect::<IqResult<_>>()?))
    }

    /// Unwrap into the underlying vector.
    pub fn into_inner(self) -> Vec<BoxReader> {
        self.0
    }
}

/// A reader paired with a custom close action.
pub struct ReaderWithCloser<R, F> {
    reader: R,
    closer: F,
}

impl<R, F> ReaderWithCloser<R, F>
where
    R: Reader,
    F: Fn() -> IqResult<()>,
{
    /// Attach `closer` to `reader`.
    pub const fn new(reader: R, closer: F) -> Self {
        Self { reader, closer }
    }
}

impl<R: Reader, F: Send> Reader for ReaderWithCloser<R, F> {
    fn read(&mut self, buf: SamplesMut<'_>) -> IqResult<usize> {
        self.reader.read(buf)
    }

    fn sample_format(&self) -> SampleFormat {
        self.reader.sample_format()
    }

    fn sample_rate(&self) -> u32 {
        self.reader.sample_rate()
    }
}

impl<R, F: Fn() -> IqResult<()>> Closer for ReaderWithCloser<R, F> {
    fn close(&self) -> IqResult<()> {
        (self.closer)()
    }
}
