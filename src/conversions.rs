//! Conversions between the four phasor encodings.
//!
//! The numeric mapping, per component:
//!
//! | From → To | Formula |
//! |---|---|
//! | u8 → c64 | `(v - 127.5) / 127.5` |
//! | c64 → u8 | `round(f * 127.5 + 127.5)`, saturated to `0..=255` |
//! | i8 → c64 | `v / 128` |
//! | c64 → i8 | `round(f * 128)`, saturated to `-128..=127` |
//! | i16 → c64 | `v / 32767` |
//! | c64 → i16 | `round(f * 32767)`, saturated to the `i16` range |
//! | u8 ↔ i8 | offset by 128 |
//! | u8 ↔ i16 | widen into the high byte, `0 → -32768` |
//! | i8 ↔ i16 | shift by 8 bits |
//!
//! Note the two 8-bit conventions: unsigned centers on 127.5 so both
//! extremes map to ±1, signed divides by 128 so `-128` is exactly `-1`.
//!
//! Out-of-range floats saturate on the way back to an integer encoding
//! rather than wrapping.

use num_complex::Complex32;

use crate::{IqError, IqResult, Phasor, SampleFormat, Samples, SamplesMut, SamplesRef};

/// Copy `min(dst.len(), src.len())` phasors from `src` into `dst`.
///
/// # Errors
/// Returns [`IqError::FormatMismatch`] if the formats differ.
pub fn copy(dst: SamplesMut<'_>, src: SamplesRef<'_>) -> IqResult<usize> {
    match (dst, src) {
        (SamplesMut::U8(d), SamplesRef::U8(s)) => Ok(copy_slice(d, s)),
        (SamplesMut::I8(d), SamplesRef::I8(s)) => Ok(copy_slice(d, s)),
        (SamplesMut::I16(d), SamplesRef::I16(s)) => Ok(copy_slice(d, s)),
        (SamplesMut::C64(d), SamplesRef::C64(s)) => Ok(copy_slice(d, s)),
        (dst, src) => Err(IqError::format_mismatch(dst.format(), src.format())),
    }
}

fn copy_slice<T: Copy>(dst: &mut [T], src: &[T]) -> usize {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
    n
}

/// Transcode every phasor of `src` into the format of `dst`.
///
/// Behaves as [`copy`] when the formats already match. Returns the number of
/// phasors written, which is always `src.len()`.
///
/// # Errors
/// Returns [`IqError::DestinationTooSmall`] if `dst` is shorter than `src`.
pub fn convert(dst: SamplesMut<'_>, src: SamplesRef<'_>) -> IqResult<usize> {
    if dst.len() < src.len() {
        return Err(IqError::DestinationTooSmall {
            needed: src.len(),
            available: dst.len(),
        });
    }

    let n = src.len();
    match (dst, src) {
        (SamplesMut::U8(d), SamplesRef::U8(s)) => copy_slice(d, s),
        (SamplesMut::I8(d), SamplesRef::I8(s)) => copy_slice(d, s),
        (SamplesMut::I16(d), SamplesRef::I16(s)) => copy_slice(d, s),
        (SamplesMut::C64(d), SamplesRef::C64(s)) => copy_slice(d, s),

        (SamplesMut::I8(d), SamplesRef::U8(s)) => map_into(d, s, |v| v.map(u8_to_i8)),
        (SamplesMut::I16(d), SamplesRef::U8(s)) => map_into(d, s, |v| v.map(u8_to_i16)),
        (SamplesMut::C64(d), SamplesRef::U8(s)) => {
            crate::simd::convert_u8_to_complex(s, &mut d[..n]);
            n
        }

        (SamplesMut::U8(d), SamplesRef::I8(s)) => map_into(d, s, |v| v.map(i8_to_u8)),
        (SamplesMut::I16(d), SamplesRef::I8(s)) => map_into(d, s, |v| v.map(i8_to_i16)),
        (SamplesMut::C64(d), SamplesRef::I8(s)) => map_into(d, s, i8_to_complex),

        (SamplesMut::U8(d), SamplesRef::I16(s)) => map_into(d, s, |v| v.map(i16_to_u8)),
        (SamplesMut::I8(d), SamplesRef::I16(s)) => map_into(d, s, |v| v.map(i16_to_i8)),
        (SamplesMut::C64(d), SamplesRef::I16(s)) => map_into(d, s, i16_to_complex),

        (SamplesMut::U8(d), SamplesRef::C64(s)) => map_into(d, s, complex_to_u8),
        (SamplesMut::I8(d), SamplesRef::C64(s)) => map_into(d, s, complex_to_i8),
        (SamplesMut::I16(d), SamplesRef::C64(s)) => map_into(d, s, complex_to_i16),
    };
    Ok(n)
}

/// Transcode `src` into a newly allocated buffer of `format`.
///
/// # Errors
/// Propagates errors from [`convert`].
pub fn convert_to(src: SamplesRef<'_>, format: SampleFormat) -> IqResult<Samples> {
    let mut out = Samples::new(format, src.len());
    convert(out.as_mut(), src)?;
    Ok(out)
}

fn map_into<S: Phasor, D: Phasor>(dst: &mut [D], src: &[S], f: impl Fn(S) -> D) -> usize {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = f(*s);
    }
    src.len()
}

/// Left-shift every component of a signed 16-bit buffer by `16 - bits`.
///
/// Radios with a 12-bit ADC deliver values in the low bits of each `i16`;
/// this moves them up to full scale.
///
/// # Errors
/// [`IqError::UnsupportedFormat`] for any format but `I16`, and
/// [`IqError::InvalidParameter`] if `bits` is not in `1..=16`.
pub fn shift_bit_alignment(buf: SamplesMut<'_>, bits: u32) -> IqResult<()> {
    if !(1..=16).contains(&bits) {
        return Err(IqError::invalid_parameter(format!(
            "bit width must be between 1 and 16, got {bits}"
        )));
    }
    let format = buf.format();
    let SamplesMut::I16(iq) = buf else {
        return Err(IqError::UnsupportedFormat {
            operation: "shift_bit_alignment",
            format,
        });
    };
    let shift = 16 - bits;
    for phasor in iq.iter_mut() {
        phasor[0] <<= shift;
        phasor[1] <<= shift;
    }
    Ok(())
}

// ======================
// Per-component mappings
// ======================

#[inline]
const fn u8_to_i8(v: u8) -> i8 {
    (v ^ 0x80) as i8
}

#[inline]
const fn i8_to_u8(v: i8) -> u8 {
    (v as u8) ^ 0x80
}

#[inline]
const fn u8_to_i16(v: u8) -> i16 {
    (((v as i32) << 8) - 32768) as i16
}

#[inline]
const fn i16_to_u8(v: i16) -> u8 {
    ((v as i32 + 32768) >> 8) as u8
}

#[inline]
const fn i8_to_i16(v: i8) -> i16 {
    (v as i16) << 8
}

#[inline]
const fn i16_to_i8(v: i16) -> i8 {
    (v >> 8) as i8
}

/// `u8` component to float, centered on 127.5.
#[inline]
pub(crate) fn u8_component_to_f32(v: u8) -> f32 {
    (f32::from(v) - 127.5) / 127.5
}

#[inline]
pub(crate) fn u8_to_complex(v: [u8; 2]) -> Complex32 {
    Complex32::new(u8_component_to_f32(v[0]), u8_component_to_f32(v[1]))
}

#[inline]
pub(crate) fn i8_to_complex(v: [i8; 2]) -> Complex32 {
    Complex32::new(f32::from(v[0]) / 128.0, f32::from(v[1]) / 128.0)
}

#[inline]
pub(crate) fn i16_to_complex(v: [i16; 2]) -> Complex32 {
    Complex32::new(f32::from(v[0]) / 32767.0, f32::from(v[1]) / 32767.0)
}

#[inline]
fn f32_to_u8(v: f32) -> u8 {
    (v * 127.5 + 127.5).round().clamp(0.0, 255.0) as u8
}

#[inline]
fn f32_to_i8(v: f32) -> i8 {
    (v * 128.0).round().clamp(-128.0, 127.0) as i8
}

#[inline]
fn f32_to_i16(v: f32) -> i16 {
    (v * 32767.0).round().clamp(-32768.0, 32767.0) as i16
}

#[inline]
pub(crate) fn complex_to_u8(v: Complex32) -> [u8; 2] {
    [f32_to_u8(v.re), f32_to_u8(v.im)]
}

#[inline]
pub(crate) fn complex_to_i8(v: Complex32) -> [i8; 2] {
    [f32_to_i8(v.re), f32_to_i8(v.im)]
}

#[inline]
pub(crate) fn complex_to_i16(v: Complex32) -> [i16; 2] {
    [f32_to_i16(v.re), f32_to_i16(v.im)]
}
