//! Complex multiplication (rotation) of a stream.
//!
//! Complex streams are multiplied directly with the vector kernel. 8-bit
//! streams go through a [`LookupTable`] rebuilt whenever the multiplier
//! changes, which pays one 65,536-entry pass to make every later phasor a
//! single table read. 16-bit streams are multiplied through their complex
//! value.

use std::sync::Arc;

use num_complex::Complex32;
use parking_lot::Mutex;

use crate::conversions::{complex_to_i16, i16_to_complex};
use crate::simd::rotate_complex;
use crate::{IqError, IqResult, LookupTable, Reader, SampleFormat, SamplesMut};

const ONE: Complex32 = Complex32::new(1.0, 0.0);

#[derive(Debug)]
struct State {
    value: Complex32,
    table: Option<Arc<LookupTable>>,
}

/// Shared handle to the multiplier of a [`MultiplyReader`].
///
/// Clones refer to the same value, so a controller thread can retune a
/// reader that another thread is consuming.
#[derive(Debug, Clone)]
pub struct Multiplier {
    format: SampleFormat,
    state: Arc<Mutex<State>>,
}

impl Multiplier {
    fn new(format: SampleFormat, value: Complex32) -> IqResult<Self> {
        let multiplier = Self {
            format,
            state: Arc::new(Mutex::new(State { value: ONE, table: None })),
        };
        multiplier.set(value)?;
        Ok(multiplier)
    }

    /// Replace the multiplier. Later reads use the new value.
    ///
    /// # Errors
    /// Only if a lookup table cannot be built, which does not happen for the
    /// formats [`multiply`] accepts.
    pub fn set(&self, value: Complex32) -> IqResult<()> {
        let table = if self.format.is_narrow() {
            Some(Arc::new(LookupTable::multiplier(self.format, value)?))
        } else {
            None
        };
        *self.state.lock() = State { value, table };
        Ok(())
    }

    /// The current multiplier.
    pub fn get(&self) -> Complex32 {
        self.state.lock().value
    }

    fn snapshot(&self) -> (Complex32, Option<Arc<LookupTable>>) {
        let state = self.state.lock();
        (state.value, state.table.clone())
    }
}

/// Apply `value` to `buf`, using `table` for 8-bit formats.
fn apply(buf: SamplesMut<'_>, value: Complex32, table: Option<&LookupTable>) -> IqResult<()> {
    match buf {
        SamplesMut::C64(iq) => {
            rotate_complex(value, iq);
            Ok(())
        }
        SamplesMut::I16(iq) => {
            for v in iq.iter_mut() {
                *v = complex_to_i16(i16_to_complex(*v) * value);
            }
            Ok(())
        }
        narrow => match table {
            Some(table) => table.lookup_in_place(narrow).map(drop),
            None => Err(IqError::UnsupportedFormat {
                operation: "multiply",
                format: narrow.format(),
            }),
        },
    }
}

/// A reader that multiplies every phasor by a complex constant.
pub struct MultiplyReader<R> {
    input: R,
    multiplier: Multiplier,
}

/// Multiply every phasor of `input` by `m`.
///
/// # Errors
/// Only on failure to build the initial lookup table for 8-bit streams.
pub fn multiply<R: Reader>(input: R, m: Complex32) -> IqResult<MultiplyReader<R>> {
    let multiplier = Multiplier::new(input.sample_format(), m)?;
    Ok(MultiplyReader { input, multiplier })
}

impl<R: Reader> MultiplyReader<R> {
    /// Replace the multiplier.
    ///
    /// # Errors
    /// As [`Multiplier::set`].
    pub fn set_multiplier(&self, m: Complex32) -> IqResult<()> {
        self.multiplier.set(m)
    }

    /// A handle for retuning this reader from elsewhere.
    pub fn multiplier(&self) -> Multiplier {
        self.multiplier.clone()
    }
}

impl<R: Reader> Reader for MultiplyReader<R> {
    fn read(&mut self, mut buf: SamplesMut<'_>) -> IqResult<usize> {
        let format = self.input.sample_format();
        if buf.format() != format {
            return Err(IqError::format_mismatch(format, buf.format()));
        }
        let n = self.input.read(buf.reborrow())?;
        let (value, table) = self.multiplier.snapshot();
        if value != ONE {
            apply(buf.slice_mut(0, n), value, table.as_deref())?;
        }
        Ok(n)
    }

    fn sample_format(&self) -> SampleFormat {
        self.input.sample_format()
    }

    fn sample_rate(&self) -> u32 {
        self.input.sample_rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Samples;
    use crate::conversions::convert_to;
    use crate::streaming::tests::SliceReader;

    #[test]
    fn test_complex_rotation() {
        let input = SliceReader::new(Samples::C64(vec![Complex32::new(1.0, 0.0); 6]), 1_000);
        let mut reader = multiply(input, Complex32::new(0.0, 1.0)).unwrap();
        let mut out = Samples::new(SampleFormat::C64, 6);
        reader.read(out.as_mut()).unwrap();
        for v in out.as_typed::<Complex32>().unwrap() {
            assert!((v - Complex32::new(0.0, 1.0)).norm() < 1e-6);
        }
    }

    #[test]
    fn test_narrow_matches_direct_multiply() {
        let m = Complex32::from_polar(0.8, 0.7);
        let data = Samples::I8(vec![[64, -32], [-128, 127], [0, 0], [17, 99]]);
        let mut reader = multiply(SliceReader::new(data.clone(), 1_000), m).unwrap();
        let mut out = Samples::new(SampleFormat::I8, 4);
        reader.read(out.as_mut()).unwrap();

        let mut direct = convert_to(data.as_ref(), SampleFormat::C64).unwrap();
        rotate_complex(m, direct.as_typed_mut().unwrap());
        let direct = convert_to(direct.as_ref(), SampleFormat::I8).unwrap();
        let pairs = out
            .as_typed::<[i8; 2]>()
            .unwrap()
            .iter()
            .zip(direct.as_typed::<[i8; 2]>().unwrap());
        for (got, want) in pairs {
            assert!((i16::from(got[0]) - i16::from(want[0])).abs() <= 1);
            assert!((i16::from(got[1]) - i16::from(want[1])).abs() <= 1);
        }
    }

    #[test]
    fn test_retune_through_handle() {
        let input = SliceReader::new(Samples::U8(vec![[255, 128]; 8]), 1_000);
        let mut reader = multiply(input, ONE).unwrap();
        let handle = reader.multiplier();
        handle.set(Complex32::new(-1.0, 0.0)).unwrap();
        assert_eq!(reader.multiplier().get(), Complex32::new(-1.0, 0.0));

        let mut out = Samples::new(SampleFormat::U8, 8);
        reader.read(out.as_mut()).unwrap();
        // 255 is +1, which negates to 0; 128 is just above the center and
        // lands just below it.
        assert_eq!(out.as_typed::<[u8; 2]>().unwrap()[0], [0, 127]);
    }

    #[test]
    fn test_int16_rotation() {
        let input = SliceReader::new(Samples::I16(vec![[1000, 0]]), 1_000);
        let mut reader = multiply(input, Complex32::new(0.0, 1.0)).unwrap();
        let mut out = Samples::new(SampleFormat::I16, 1);
        reader.read(out.as_mut()).unwrap();
        assert_eq!(out, Samples::I16(vec![[0, 1000]]));
    }
}
