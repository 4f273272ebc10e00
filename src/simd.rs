//! Vectorized complex arithmetic kernels.
//!
//! This module provides the hot-loop primitives used by the stream stages:
//! - element-wise addition of complex buffers
//! - scaling a complex buffer by a real factor
//! - rotating (multiplying) a complex buffer by a fixed phasor
//! - widening interleaved `u8` phasors to complex floats
//!
//! ## Feature gating
//! The vector implementations are behind the `simd` crate feature and use
//! `wide::f32x8`, which holds four interleaved phasors per lane group. The
//! scalar path handles any remainder (`len % 4`) and is always available as
//! the `*_scalar` reference functions.
//!
//! ## Capability probing
//! [`probe`] checks the host CPU once. If the probe fails the dispatchers log a
//! warning and run the scalar path; nothing aborts. Callers that would rather
//! fail fast can call [`probe`] themselves and propagate
//! [`IqError::HardwareFeatureUnsupported`].
//!
//! ## Numerical equivalence
//! Each lane performs the same IEEE operations in the same order as the scalar
//! reference, so `add`, `scale` and `rotate` results are bit-identical between
//! the two paths.

use std::sync::OnceLock;

use num_complex::Complex32;

use crate::conversions::u8_to_complex;
use crate::{IqError, IqResult};

/// Phasors processed per vector iteration.
pub const LANE_PHASORS: usize = 4;

/// Check whether the running CPU has the vector unit the `simd` kernels
/// are tuned for.
///
/// # Errors
/// Returns [`IqError::HardwareFeatureUnsupported`] when vector support was not
/// compiled in, or the CPU lacks it.
pub fn probe() -> IqResult<()> {
    if !cfg!(feature = "simd") {
        return Err(IqError::HardwareFeatureUnsupported(
            "built without the `simd` feature".to_string(),
        ));
    }
    host_vector_unit()
}

#[cfg(target_arch = "x86_64")]
fn host_vector_unit() -> IqResult<()> {
    if std::arch::is_x86_feature_detected!("avx") {
        Ok(())
    } else {
        Err(IqError::HardwareFeatureUnsupported(
            "CPU does not support AVX".to_string(),
        ))
    }
}

#[cfg(target_arch = "aarch64")]
fn host_vector_unit() -> IqResult<()> {
    Ok(())
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn host_vector_unit() -> IqResult<()> {
    Err(IqError::HardwareFeatureUnsupported(format!(
        "no vector kernels for {}",
        std::env::consts::ARCH
    )))
}

/// Whether the dispatchers below take the vector path. Probed once.
pub fn vector_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| match probe() {
        Ok(()) => {
            tracing::debug!("vector kernels enabled");
            true
        }
        Err(err) if cfg!(feature = "simd") => {
            tracing::warn!(%err, "vector kernels unavailable, using scalar fallback");
            false
        }
        Err(_) => false,
    })
}

fn check_lengths(a: usize, b: usize, out: usize) -> IqResult<()> {
    if a != b || a != out {
        return Err(IqError::invalid_parameter(format!(
            "slice lengths must match, got {a}, {b} and {out}"
        )));
    }
    Ok(())
}

// ======================
// Dispatchers
// ======================

/// `out[i] = a[i] + b[i]`.
///
/// # Errors
/// Returns an error if the three slices differ in length.
pub fn add_complex(a: &[Complex32], b: &[Complex32], out: &mut [Complex32]) -> IqResult<()> {
    check_lengths(a.len(), b.len(), out.len())?;
    #[cfg(feature = "simd")]
    if vector_enabled() {
        vector::add(a, b, out);
        return Ok(());
    }
    add_complex_scalar(a, b, out);
    Ok(())
}

/// `acc[i] += b[i]`, the in-place form of [`add_complex`].
///
/// # Errors
/// Returns an error if the slices differ in length.
pub fn add_complex_in_place(acc: &mut [Complex32], b: &[Complex32]) -> IqResult<()> {
    check_lengths(acc.len(), b.len(), acc.len())?;
    #[cfg(feature = "simd")]
    if vector_enabled() {
        vector::add_in_place(acc, b);
        return Ok(());
    }
    add_complex_in_place_scalar(acc, b);
    Ok(())
}

/// `buf[i] *= factor`.
pub fn scale_complex(factor: f32, buf: &mut [Complex32]) {
    #[cfg(feature = "simd")]
    if vector_enabled() {
        vector::scale(factor, buf);
        return;
    }
    scale_complex_scalar(factor, buf);
}

/// `buf[i] *= phase`.
pub fn rotate_complex(phase: Complex32, buf: &mut [Complex32]) {
    #[cfg(feature = "simd")]
    if vector_enabled() {
        vector::rotate(phase, buf);
        return;
    }
    rotate_complex_scalar(phase, buf);
}

/// Widen interleaved `u8` phasors into `out`, which must be at least as long.
pub(crate) fn convert_u8_to_complex(src: &[[u8; 2]], out: &mut [Complex32]) {
    #[cfg(feature = "simd")]
    if vector_enabled() {
        vector::u8_to_complex(src, out);
        return;
    }
    convert_u8_to_complex_scalar(src, out);
}

// ======================
// Scalar reference
// ======================

/// Scalar reference for [`add_complex`].
pub fn add_complex_scalar(a: &[Complex32], b: &[Complex32], out: &mut [Complex32]) {
    for ((o, x), y) in out.iter_mut().zip(a).zip(b) {
        *o = *x + *y;
    }
}

/// Scalar reference for [`add_complex_in_place`].
pub fn add_complex_in_place_scalar(acc: &mut [Complex32], b: &[Complex32]) {
    for (o, y) in acc.iter_mut().zip(b) {
        *o += *y;
    }
}

/// Scalar reference for [`scale_complex`].
pub fn scale_complex_scalar(factor: f32, buf: &mut [Complex32]) {
    for v in buf.iter_mut() {
        *v = Complex32::new(v.re * factor, v.im * factor);
    }
}

/// Scalar reference for [`rotate_complex`].
pub fn rotate_complex_scalar(phase: Complex32, buf: &mut [Complex32]) {
    for v in buf.iter_mut() {
        *v = Complex32::new(
            v.re * phase.re - v.im * phase.im,
            v.re * phase.im + v.im * phase.re,
        );
    }
}

/// Scalar reference for the `u8` widening conversion.
pub fn convert_u8_to_complex_scalar(src: &[[u8; 2]], out: &mut [Complex32]) {
    for (o, v) in out.iter_mut().zip(src) {
        *o = u8_to_complex(*v);
    }
}

#[cfg(feature = "simd")]
mod vector {
    //! `f32x8` implementations. Each function splits its input into whole
    //! lane groups and hands the tail to the scalar reference.

    use num_complex::Complex32;
    use wide::f32x8;

    use super::LANE_PHASORS;

    fn split(len: usize) -> usize {
        len - len % LANE_PHASORS
    }

    fn lanes(buf: &[Complex32]) -> &[[f32; 8]] {
        bytemuck::cast_slice(buf)
    }

    fn lanes_mut(buf: &mut [Complex32]) -> &mut [[f32; 8]] {
        bytemuck::cast_slice_mut(buf)
    }

    pub(super) fn add(a: &[Complex32], b: &[Complex32], out: &mut [Complex32]) {
        let n = split(out.len());
        let (head, tail) = out.split_at_mut(n);
        for ((o, x), y) in lanes_mut(head)
            .iter_mut()
            .zip(lanes(&a[..n]))
            .zip(lanes(&b[..n]))
        {
            *o = (f32x8::from(*x) + f32x8::from(*y)).to_array();
        }
        super::add_complex_scalar(&a[n..], &b[n..], tail);
    }

    pub(super) fn add_in_place(acc: &mut [Complex32], b: &[Complex32]) {
        let n = split(acc.len());
        let (head, tail) = acc.split_at_mut(n);
        for (o, y) in lanes_mut(head).iter_mut().zip(lanes(&b[..n])) {
            *o = (f32x8::from(*o) + f32x8::from(*y)).to_array();
        }
        super::add_complex_in_place_scalar(tail, &b[n..]);
    }

    pub(super) fn scale(factor: f32, buf: &mut [Complex32]) {
        let n = split(buf.len());
        let (head, tail) = buf.split_at_mut(n);
        let f = f32x8::splat(factor);
        for o in lanes_mut(head).iter_mut() {
            *o = (f32x8::from(*o) * f).to_array();
        }
        super::scale_complex_scalar(factor, tail);
    }

    pub(super) fn rotate(phase: Complex32, buf: &mut [Complex32]) {
        let n = split(buf.len());
        let (head, tail) = buf.split_at_mut(n);
        let (c, s) = (phase.re, phase.im);
        let real = f32x8::splat(c);
        let cross = f32x8::from([-s, s, -s, s, -s, s, -s, s]);
        for o in lanes_mut(head).iter_mut() {
            let v = *o;
            // Swap re/im within each phasor.
            let swapped = [v[1], v[0], v[3], v[2], v[5], v[4], v[7], v[6]];
            *o = (f32x8::from(v) * real + f32x8::from(swapped) * cross).to_array();
        }
        super::rotate_complex_scalar(phase, tail);
    }

    pub(super) fn u8_to_complex(src: &[[u8; 2]], out: &mut [Complex32]) {
        let n = split(src.len());
        let (head, tail) = out.split_at_mut(n);
        let center = f32x8::splat(127.5);
        for (o, chunk) in lanes_mut(head).iter_mut().zip(src[..n].chunks_exact(LANE_PHASORS)) {
            let v = f32x8::from([
                f32::from(chunk[0][0]),
                f32::from(chunk[0][1]),
                f32::from(chunk[1][0]),
                f32::from(chunk[1][1]),
                f32::from(chunk[2][0]),
                f32::from(chunk[2][1]),
                f32::from(chunk[3][0]),
                f32::from(chunk[3][1]),
            ]);
            *o = ((v - center) / center).to_array();
        }
        super::convert_u8_to_complex_scalar(&src[n..], tail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, offset: f32) -> Vec<Complex32> {
        (0..len)
            .map(|i| Complex32::new(i as f32 * 0.37 + offset, offset - i as f32 * 1.13))
            .collect()
    }

    fn bits(buf: &[Complex32]) -> Vec<(u32, u32)> {
        buf.iter().map(|c| (c.re.to_bits(), c.im.to_bits())).collect()
    }

    // Lengths both divisible and not divisible by the lane width.
    const LENGTHS: [usize; 6] = [0, 1, 4, 7, 64, 1027];

    #[test]
    fn test_add_matches_scalar() {
        for len in LENGTHS {
            let a = ramp(len, 0.25);
            let b = ramp(len, -3.5);
            let mut fast = vec![Complex32::new(0.0, 0.0); len];
            let mut slow = fast.clone();
            add_complex(&a, &b, &mut fast).unwrap();
            add_complex_scalar(&a, &b, &mut slow);
            assert_eq!(bits(&fast), bits(&slow), "len {len}");
        }
    }

    #[test]
    fn test_add_in_place_matches_scalar() {
        for len in LENGTHS {
            let b = ramp(len, 9.0);
            let mut fast = ramp(len, 1.5);
            let mut slow = fast.clone();
            add_complex_in_place(&mut fast, &b).unwrap();
            add_complex_in_place_scalar(&mut slow, &b);
            assert_eq!(bits(&fast), bits(&slow), "len {len}");
        }
    }

    #[test]
    fn test_add_rejects_mismatched_lengths() {
        let a = ramp(4, 0.0);
        let b = ramp(5, 0.0);
        let mut out = ramp(4, 0.0);
        assert!(matches!(
            add_complex(&a, &b, &mut out),
            Err(IqError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_scale_matches_scalar() {
        for len in LENGTHS {
            let mut fast = ramp(len, 0.5);
            let mut slow = fast.clone();
            scale_complex(0.731, &mut fast);
            scale_complex_scalar(0.731, &mut slow);
            assert_eq!(bits(&fast), bits(&slow), "len {len}");
        }
    }

    #[test]
    fn test_rotate_matches_scalar() {
        let phase = Complex32::from_polar(1.0, 0.3);
        for len in LENGTHS {
            let mut fast = ramp(len, 2.0);
            let mut slow = fast.clone();
            rotate_complex(phase, &mut fast);
            rotate_complex_scalar(phase, &mut slow);
            for (f, s) in fast.iter().zip(&slow) {
                assert!((f - s).norm() < 1e-4);
            }
        }
    }

    #[test]
    fn test_rotate_by_i() {
        let mut buf = vec![Complex32::new(1.0, 0.0); 5];
        rotate_complex(Complex32::new(0.0, 1.0), &mut buf);
        for v in buf {
            assert_eq!(v, Complex32::new(0.0, 1.0));
        }
    }

    #[test]
    fn test_u8_widen_matches_scalar() {
        let src: Vec<[u8; 2]> = (0..=255u8).map(|v| [v, 255 - v]).collect();
        let mut fast = vec![Complex32::new(0.0, 0.0); src.len()];
        let mut slow = fast.clone();
        convert_u8_to_complex(&src[..253], &mut fast[..253]);
        convert_u8_to_complex_scalar(&src[..253], &mut slow[..253]);
        assert_eq!(bits(&fast), bits(&slow));
    }

    #[test]
    fn test_probe_is_consistent() {
        assert_eq!(probe().is_ok(), vector_enabled());
    }
}
