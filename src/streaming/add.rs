//! Summing several coherent streams into one.
//!
//! [`add`] accepts complex and signed integer streams; integer sums wrap on
//! overflow, so inputs should be attenuated with [`gain`](super::gain) first.
//! [`mix`] is the complex-only form.

use num_traits::WrappingAdd;

use crate::io::{check_uniform, read_full};
use crate::simd::add_complex_in_place;
use crate::{BoxReader, IqError, IqResult, Reader, SampleFormat, Samples, SamplesMut, SamplesRef};

/// Reader produced by [`add`] and [`mix`].
pub struct AddReader {
    readers: Vec<BoxReader>,
    format: SampleFormat,
    sample_rate: u32,
    scratch: Samples,
    err: Option<IqError>,
}

/// Sum `readers` phasor by phasor.
///
/// A single reader is returned as is.
///
/// # Errors
/// - [`IqError::InvalidParameter`] for an empty list or differing rates.
/// - [`IqError::FormatMismatch`] for differing formats.
/// - [`IqError::UnsupportedFormat`] for [`SampleFormat::U8`] streams.
pub fn add(readers: Vec<BoxReader>) -> IqResult<BoxReader> {
    build(readers, "add", &[SampleFormat::C64, SampleFormat::I16, SampleFormat::I8])
}

/// Sum complex `readers` phasor by phasor.
///
/// # Errors
/// As [`add`], and [`IqError::UnsupportedFormat`] for any format but
/// [`SampleFormat::C64`].
pub fn mix(readers: Vec<BoxReader>) -> IqResult<BoxReader> {
    build(readers, "mix", &[SampleFormat::C64])
}

fn build(
    mut readers: Vec<BoxReader>,
    operation: &'static str,
    supported: &[SampleFormat],
) -> IqResult<BoxReader> {
    let (format, sample_rate) = check_uniform(
        readers.iter().map(|r| (r.sample_format(), r.sample_rate())),
        operation,
    )?;
    if !supported.contains(&format) {
        return Err(IqError::UnsupportedFormat { operation, format });
    }
    if readers.len() == 1 {
        return Ok(readers.remove(0));
    }
    Ok(Box::new(AddReader {
        readers,
        format,
        sample_rate,
        scratch: Samples::new(format, 0),
        err: None,
    }))
}

fn wrapping_accumulate<T: WrappingAdd>(acc: &mut [[T; 2]], b: &[[T; 2]]) {
    for (a, b) in acc.iter_mut().zip(b) {
        a[0] = a[0].wrapping_add(&b[0]);
        a[1] = a[1].wrapping_add(&b[1]);
    }
}

/// `acc[i] += b[i]` for one of the formats [`add`] supports.
fn accumulate(acc: SamplesMut<'_>, b: SamplesRef<'_>) -> IqResult<()> {
    match (acc, b) {
        (SamplesMut::C64(acc), SamplesRef::C64(b)) => add_complex_in_place(acc, b),
        (SamplesMut::I16(acc), SamplesRef::I16(b)) => {
            wrapping_accumulate(acc, b);
            Ok(())
        }
        (SamplesMut::I8(acc), SamplesRef::I8(b)) => {
            wrapping_accumulate(acc, b);
            Ok(())
        }
        (acc, _) => Err(IqError::UnsupportedFormat {
            operation: "add",
            format: acc.format(),
        }),
    }
}

impl AddReader {
    fn sum_into(&mut self, mut buf: SamplesMut<'_>) -> IqResult<usize> {
        let n = buf.len();
        if self.scratch.len() < n {
            self.scratch = Samples::new(self.format, n);
        }
        buf.zero();
        for reader in &mut self.readers {
            read_full(reader, self.scratch.slice_mut(0, n))?;
            accumulate(buf.reborrow(), self.scratch.slice(0, n))?;
        }
        Ok(n)
    }
}

impl Reader for AddReader {
    fn read(&mut self, buf: SamplesMut<'_>) -> IqResult<usize> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        if buf.format() != self.format {
            return Err(IqError::format_mismatch(self.format, buf.format()));
        }
        if buf.is_empty() {
            return Ok(0);
        }
        self.sum_into(buf).inspect_err(|err| self.err = Some(err.clone()))
    }

    fn sample_format(&self) -> SampleFormat {
        self.format
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
