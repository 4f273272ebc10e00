//! Scalar gain.

use crate::conversions::{
    complex_to_i8, complex_to_i16, complex_to_u8, i8_to_complex, i16_to_complex, u8_to_complex,
};
use crate::simd::scale_complex;
use crate::{IqError, IqResult, Reader, SampleFormat, SamplesMut};

/// Multiply every phasor of `buf` by `factor`.
///
/// Complex buffers use the vector kernel. Integer buffers are scaled through
/// their complex value and saturate at the edges of their range.
pub fn scale_buffer(buf: SamplesMut<'_>, factor: f32) {
    match buf {
        SamplesMut::C64(iq) => scale_complex(factor, iq),
        SamplesMut::I16(iq) => {
            for v in iq.iter_mut() {
                *v = complex_to_i16(i16_to_complex(*v) * factor);
            }
        }
        SamplesMut::I8(iq) => {
            for v in iq.iter_mut() {
                *v = complex_to_i8(i8_to_complex(*v) * factor);
            }
        }
        SamplesMut::U8(iq) => {
            for v in iq.iter_mut() {
                *v = complex_to_u8(u8_to_complex(*v) * factor);
            }
        }
    }
}

/// A reader that scales everything it reads by a constant.
pub struct Gain<R> {
    input: R,
    factor: f32,
}

/// Scale `input` by `factor` as it is read.
pub const fn gain<R: Reader>(input: R, factor: f32) -> Gain<R> {
    Gain { input, factor }
}

impl<R> Gain<R> {
    /// Change the factor applied to later reads.
    pub fn set_factor(&mut self, factor: f32) {
        self.factor = factor;
    }

    /// The factor currently applied.
    pub const fn factor(&self) -> f32 {
        self.factor
    }
}

impl<R: Reader> Reader for Gain<R> {
    fn read(&mut self, mut buf: SamplesMut<'_>) -> IqResult<usize> {
        let format = self.input.sample_format();
        if buf.format() != format {
            return Err(IqError::format_mismatch(format, buf.format()));
        }
        let n = self.input.read(buf.reborrow())?;
        scale_buffer(buf.slice_mut(0, n), self.factor);
        Ok(n)
    }

    fn sample_format(&self) -> SampleFormat {
        self.input.sample_format()
    }

    fn sample_rate(&self) -> u32 {
        self.input.sample_rate()
    }
}
