//! Adapters between raw byte streams and phasor streams.
//!
//! [`ByteReader`] wraps any [`std::io::Read`] (a file, a TCP socket, a child
//! process) and yields phasors of a declared format and byte order.
//! [`ByteWriter`] is the mirror image over [`std::io::Write`]. Both count in
//! phasors; a byte stream that delivers half a phasor is buffered until the
//! rest arrives.

use std::io::{ErrorKind, Read, Write};

use serde::{Deserialize, Serialize};

use crate::{IqError, IqResult, Reader, SampleFormat, SamplesMut, SamplesRef, Writer};

/// Byte order of multi-byte components on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

impl ByteOrder {
    /// Byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::Little
        } else {
            Self::Big
        }
    }

    /// Whether data in this order can be used without swapping.
    pub const fn is_native(self) -> bool {
        matches!(
            (self, Self::native()),
            (Self::Little, Self::Little) | (Self::Big, Self::Big)
        )
    }
}

/// Width in bytes of one component (I or Q) of a phasor.
const fn component_width(format: SampleFormat) -> usize {
    format.size() / 2
}

fn swap_components(bytes: &mut [u8], format: SampleFormat) {
    let width = component_width(format);
    if width > 1 {
        for component in bytes.chunks_exact_mut(width) {
            component.reverse();
        }
    }
}

/// Phasors decoded from a byte stream.
pub struct ByteReader<R> {
    inner: R,
    order: ByteOrder,
    format: SampleFormat,
    sample_rate: u32,
    pending: Vec<u8>,
}

impl<R: Read + Send> ByteReader<R> {
    /// Decode `format` phasors in `order` from `inner`.
    pub const fn new(inner: R, order: ByteOrder, sample_rate: u32, format: SampleFormat) -> Self {
        Self {
            inner,
            order,
            format,
            sample_rate,
            pending: Vec::new(),
        }
    }

    /// Consume the adapter, returning the byte stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Send> Reader for ByteReader<R> {
    fn read(&mut self, mut buf: SamplesMut<'_>) -> IqResult<usize> {
        if buf.format() != self.format {
            return Err(IqError::format_mismatch(self.format, buf.format()));
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let size = self.format.size();
        let bytes = buf.as_bytes_mut();
        let mut filled = self.pending.len();
        bytes[..filled].copy_from_slice(&self.pending);
        self.pending.clear();

        while filled < size {
            match self.inner.read(&mut bytes[filled..]) {
                Ok(0) if filled == 0 => return Err(IqError::EndOfStream),
                Ok(0) => return Err(IqError::UnexpectedEnd),
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    self.pending.extend_from_slice(&bytes[..filled]);
                    return Err(err.into());
                }
            }
        }

        let whole = filled - filled % size;
        self.pending.extend_from_slice(&bytes[whole..filled]);
        if !self.order.is_native() {
            swap_components(&mut bytes[..whole], self.format);
        }
        Ok(whole / size)
    }

    fn sample_format(&self) -> SampleFormat {
        self.format
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Phasors encoded onto a byte stream.
pub struct ByteWriter<W> {
    inner: W,
    order: ByteOrder,
    format: SampleFormat,
    sample_rate: u32,
    scratch: Vec<u8>,
}

impl<W: Write + Send> ByteWriter<W> {
    /// Encode `format` phasors in `order` onto `inner`.
    pub const fn new(inner: W, order: ByteOrder, sample_rate: u32, format: SampleFormat) -> Self {
        Self {
            inner,
            order,
            format,
            sample_rate,
            scratch: Vec::new(),
        }
    }

    /// Consume the adapter, returning the byte stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Send> Writer for ByteWriter<W> {
    fn write(&mut self, buf: SamplesRef<'_>) -> IqResult<usize> {
        if buf.format() != self.format {
            return Err(IqError::format_mismatch(self.format, buf.format()));
        }
        if self.order.is_native() {
            self.inner.write_all(buf.as_bytes())?;
        } else {
            self.scratch.clear();
            self.scratch.extend_from_slice(buf.as_bytes());
            swap_components(&mut self.scratch, self.format);
            self.inner.write_all(&self.scratch)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Samples;
    use num_complex::Complex32;

    /// Returns at most `step` bytes per read.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.step).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_big_endian_i16() {
        let data = vec![0x01, 0x02, 0xFF, 0xFE];
        let mut reader = ByteReader::new(&data[..], ByteOrder::Big, 1, SampleFormat::I16);
        let mut buf = Samples::new(SampleFormat::I16, 4);
        assert_eq!(reader.read(buf.as_mut()).unwrap(), 1);
        assert_eq!(buf.as_typed::<[i16; 2]>().unwrap()[0], [0x0102, -2]);
        assert!(matches!(reader.read(buf.as_mut()), Err(IqError::EndOfStream)));
    }

    #[test]
    fn test_partial_phasors_accumulate() {
        let src = Samples::C64(vec![Complex32::new(1.5, -2.25), Complex32::new(0.5, 8.0)]);
        let mut encoded = ByteWriter::new(Vec::new(), ByteOrder::Little, 1, SampleFormat::C64);
        encoded.write(src.as_ref()).unwrap();

        let mut reader = ByteReader::new(
            Trickle {
                data: encoded.into_inner(),
                pos: 0,
                step: 3,
            },
            ByteOrder::Little,
            1,
            SampleFormat::C64,
        );
        let mut out = Vec::new();
        let mut buf = Samples::new(SampleFormat::C64, 2);
        loop {
            match reader.read(buf.as_mut()) {
                Ok(n) => out.extend_from_slice(&buf.as_typed::<Complex32>().unwrap()[..n]),
                Err(IqError::EndOfStream) => break,
                Err(err) => panic!("unexpected error: {err}"),
            }
        }
        assert_eq!(Samples::C64(out), src);
    }

    #[test]
    fn test_truncated_stream() {
        let data = vec![1, 2, 3];
        let mut reader = ByteReader::new(&data[..], ByteOrder::Little, 1, SampleFormat::I16);
        let mut buf = Samples::new(SampleFormat::I16, 1);
        assert!(matches!(reader.read(buf.as_mut()), Err(IqError::UnexpectedEnd)));
    }

    #[test]
    fn test_writer_swaps_foreign_order() {
        let src = Samples::I16(vec![[0x0102, 0x0304]]);
        let mut writer = ByteWriter::new(Vec::new(), ByteOrder::Big, 1, SampleFormat::I16);
        assert_eq!(writer.write(src.as_ref()).unwrap(), 1);
        assert_eq!(writer.into_inner(), vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_format_mismatch() {
        let mut writer = ByteWriter::new(Vec::new(), ByteOrder::native(), 1, SampleFormat::U8);
        let wrong = Samples::new(SampleFormat::I8, 1);
        assert!(matches!(
            writer.write(wrong.as_ref()),
            Err(IqError::FormatMismatch { .. })
        ));
    }
}
