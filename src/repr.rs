//! Phasor buffer representation.
//!
//! A phasor buffer is one of four concrete backing arrays, chosen by its
//! [`SampleFormat`]:
//!
//! | Format | Element |
//! |---|---|
//! | [`SampleFormat::U8`] | `[u8; 2]` |
//! | [`SampleFormat::I8`] | `[i8; 2]` |
//! | [`SampleFormat::I16`] | `[i16; 2]` |
//! | [`SampleFormat::C64`] | [`Complex32`] |
//!
//! [`Samples`] owns its storage. [`SamplesRef`] and [`SamplesMut`] are views
//! that alias existing storage; mutation through a [`SamplesMut`] mutates the
//! buffer it was sliced from. All three share the same capability set:
//! `format()`, `byte_size()`, `len()` (phasor count, not byte count) and
//! slicing.
//!
//! ```rust
//! use iq_samples::{Samples, SampleFormat};
//!
//! let mut buf = Samples::new(SampleFormat::I16, 8);
//! {
//!     let view = buf.slice_mut(2, 4);
//!     let iq = view.into_typed::<[i16; 2]>().unwrap();
//!     iq[0] = [100, -100];
//! }
//! assert_eq!(buf.as_typed::<[i16; 2]>().unwrap()[2], [100, -100]);
//! ```
//!
//! Raw byte access goes through [`SamplesRef::as_bytes`] and
//! [`SamplesMut::as_bytes_mut`], which are checked `bytemuck` casts; no other
//! code in the crate reinterprets phasor memory.

use bytemuck::Pod;
use num_complex::Complex32;

use crate::{IqError, IqResult, SampleFormat};

/// Apply the same expression to whichever variant a buffer enum holds.
macro_rules! dispatch {
    ($enum:ident, $value:expr, $inner:ident => $body:expr) => {
        match $value {
            $enum::U8($inner) => $body,
            $enum::I8($inner) => $body,
            $enum::I16($inner) => $body,
            $enum::C64($inner) => $body,
        }
    };
}

/// Like `dispatch!`, but rewraps the result in the same variant of `$out`.
macro_rules! dispatch_map {
    ($enum:ident => $out:ident, $value:expr, $inner:ident => $body:expr) => {
        match $value {
            $enum::U8($inner) => $out::U8($body),
            $enum::I8($inner) => $out::I8($body),
            $enum::I16($inner) => $out::I16($body),
            $enum::C64($inner) => $out::C64($body),
        }
    };
}

pub(crate) use dispatch;

/// One phasor in a concrete encoding.
///
/// Implemented for the four element types only. Lets generic code move
/// between the untyped buffer enums and typed slices.
pub trait Phasor: Pod + PartialEq + Send + Sync + std::fmt::Debug + 'static {
    /// Format this element type encodes.
    const FORMAT: SampleFormat;

    /// Borrow a typed slice out of a view, if the formats agree.
    fn from_ref<'a>(samples: SamplesRef<'a>) -> Option<&'a [Self]>;

    /// Borrow a typed mutable slice out of a view, if the formats agree.
    fn from_mut<'a>(samples: SamplesMut<'a>) -> Option<&'a mut [Self]>;

    /// Wrap a typed slice as an untyped view.
    fn wrap_ref(slice: &[Self]) -> SamplesRef<'_>;

    /// Wrap a typed mutable slice as an untyped view.
    fn wrap_mut(slice: &mut [Self]) -> SamplesMut<'_>;

    /// Wrap an owned vector.
    fn wrap_vec(vec: Vec<Self>) -> Samples;
}

macro_rules! impl_phasor {
    ($ty:ty, $variant:ident) => {
        impl Phasor for $ty {
            const FORMAT: SampleFormat = SampleFormat::$variant;

            fn from_ref<'a>(samples: SamplesRef<'a>) -> Option<&'a [Self]> {
                match samples {
                    SamplesRef::$variant(s) => Some(s),
                    _ => None,
                }
            }

            fn from_mut<'a>(samples: SamplesMut<'a>) -> Option<&'a mut [Self]> {
                match samples {
                    SamplesMut::$variant(s) => Some(s),
                    _ => None,
                }
            }

            fn wrap_ref(slice: &[Self]) -> SamplesRef<'_> {
                SamplesRef::$variant(slice)
            }

            fn wrap_mut(slice: &mut [Self]) -> SamplesMut<'_> {
                SamplesMut::$variant(slice)
            }

            fn wrap_vec(vec: Vec<Self>) -> Samples {
                Samples::$variant(vec)
            }
        }

        impl From<Vec<$ty>> for Samples {
            fn from(vec: Vec<$ty>) -> Self {
                Samples::$variant(vec)
            }
        }

        impl<'a> From<&'a [$ty]> for SamplesRef<'a> {
            fn from(slice: &'a [$ty]) -> Self {
                SamplesRef::$variant(slice)
            }
        }

        impl<'a> From<&'a mut [$ty]> for SamplesMut<'a> {
            fn from(slice: &'a mut [$ty]) -> Self {
                SamplesMut::$variant(slice)
            }
        }
    };
}

impl_phasor!([u8; 2], U8);
impl_phasor!([i8; 2], I8);
impl_phasor!([i16; 2], I16);
impl_phasor!(Complex32, C64);

/// An owned phasor buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    /// Interleaved unsigned 8-bit phasors.
    U8(Vec<[u8; 2]>),
    /// Interleaved signed 8-bit phasors.
    I8(Vec<[i8; 2]>),
    /// Interleaved signed 16-bit phasors.
    I16(Vec<[i16; 2]>),
    /// 32-bit float complex phasors.
    C64(Vec<Complex32>),
}

/// A read-only view into phasor storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplesRef<'a> {
    /// Interleaved unsigned 8-bit phasors.
    U8(&'a [[u8; 2]]),
    /// Interleaved signed 8-bit phasors.
    I8(&'a [[i8; 2]]),
    /// Interleaved signed 16-bit phasors.
    I16(&'a [[i16; 2]]),
    /// 32-bit float complex phasors.
    C64(&'a [Complex32]),
}

/// A mutable view into phasor storage.
#[derive(Debug, PartialEq)]
pub enum SamplesMut<'a> {
    /// Interleaved unsigned 8-bit phasors.
    U8(&'a mut [[u8; 2]]),
    /// Interleaved signed 8-bit phasors.
    I8(&'a mut [[i8; 2]]),
    /// Interleaved signed 16-bit phasors.
    I16(&'a mut [[i16; 2]]),
    /// 32-bit float complex phasors.
    C64(&'a mut [Complex32]),
}

impl Samples {
    /// Allocate a zeroed buffer of `len` phasors.
    ///
    /// Zero means all-zero bits, so a fresh `U8` buffer holds the value just
    /// below the encoding's midpoint, exactly as a fresh `I16` buffer holds
    /// the numeric zero.
    pub fn new(format: SampleFormat, len: usize) -> Self {
        match format {
            SampleFormat::U8 => Self::U8(vec![[0; 2]; len]),
            SampleFormat::I8 => Self::I8(vec![[0; 2]; len]),
            SampleFormat::I16 => Self::I16(vec![[0; 2]; len]),
            SampleFormat::C64 => Self::C64(vec![Complex32::new(0.0, 0.0); len]),
        }
    }

    /// Format of the backing array.
    pub const fn format(&self) -> SampleFormat {
        match self {
            Self::U8(_) => SampleFormat::U8,
            Self::I8(_) => SampleFormat::I8,
            Self::I16(_) => SampleFormat::I16,
            Self::C64(_) => SampleFormat::C64,
        }
    }

    /// Number of phasors.
    pub fn len(&self) -> usize {
        dispatch!(Self, self, v => v.len())
    }

    /// Whether the buffer holds no phasors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.len() * self.format().size()
    }

    /// Borrow the whole buffer.
    pub fn as_ref(&self) -> SamplesRef<'_> {
        dispatch_map!(Self => SamplesRef, self, v => v.as_slice())
    }

    /// Mutably borrow the whole buffer.
    pub fn as_mut(&mut self) -> SamplesMut<'_> {
        dispatch_map!(Self => SamplesMut, self, v => v.as_mut_slice())
    }

    /// View phasors `start..end`.
    ///
    /// # Panics
    /// Panics if the range is out of bounds, like slice indexing.
    pub fn slice(&self, start: usize, end: usize) -> SamplesRef<'_> {
        self.as_ref().slice(start, end)
    }

    /// Mutably view phasors `start..end`.
    ///
    /// # Panics
    /// Panics if the range is out of bounds, like slice indexing.
    pub fn slice_mut(&mut self, start: usize, end: usize) -> SamplesMut<'_> {
        self.as_mut().slice_mut(start, end)
    }

    /// Borrow the buffer as a typed slice.
    ///
    /// # Errors
    /// Returns [`IqError::FormatMismatch`] if `P` does not match the buffer.
    pub fn as_typed<P: Phasor>(&self) -> IqResult<&[P]> {
        self.as_ref().into_typed()
    }

    /// Mutably borrow the buffer as a typed slice.
    ///
    /// # Errors
    /// Returns [`IqError::FormatMismatch`] if `P` does not match the buffer.
    pub fn as_typed_mut<P: Phasor>(&mut self) -> IqResult<&mut [P]> {
        self.as_mut().into_typed()
    }

    /// Set every phasor to all-zero bits.
    pub fn zero(&mut self) {
        self.as_mut().zero();
    }
}

impl<'a> SamplesRef<'a> {
    /// Format of the viewed storage.
    pub const fn format(&self) -> SampleFormat {
        match self {
            Self::U8(_) => SampleFormat::U8,
            Self::I8(_) => SampleFormat::I8,
            Self::I16(_) => SampleFormat::I16,
            Self::C64(_) => SampleFormat::C64,
        }
    }

    /// Number of phasors.
    pub fn len(&self) -> usize {
        dispatch!(Self, self, v => v.len())
    }

    /// Whether the view holds no phasors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the view in bytes.
    pub fn byte_size(&self) -> usize {
        self.len() * self.format().size()
    }

    /// Narrow the view to phasors `start..end`.
    ///
    /// # Panics
    /// Panics if the range is out of bounds, like slice indexing.
    pub fn slice(self, start: usize, end: usize) -> SamplesRef<'a> {
        dispatch_map!(Self => SamplesRef, self, v => &v[start..end])
    }

    /// Typed access to the viewed storage.
    ///
    /// # Errors
    /// Returns [`IqError::FormatMismatch`] if `P` does not match the view.
    pub fn into_typed<P: Phasor>(self) -> IqResult<&'a [P]> {
        let actual = self.format();
        P::from_ref(self).ok_or(IqError::format_mismatch(P::FORMAT, actual))
    }

    /// The viewed phasors as raw bytes in native byte order.
    pub fn as_bytes(&self) -> &'a [u8] {
        dispatch!(Self, *self, v => bytemuck::cast_slice(v))
    }

    /// Copy the view into a freshly allocated buffer.
    pub fn to_samples(&self) -> Samples {
        dispatch_map!(Self => Samples, *self, v => v.to_vec())
    }
}

impl<'a> SamplesMut<'a> {
    /// Format of the viewed storage.
    pub const fn format(&self) -> SampleFormat {
        match self {
            Self::U8(_) => SampleFormat::U8,
            Self::I8(_) => SampleFormat::I8,
            Self::I16(_) => SampleFormat::I16,
            Self::C64(_) => SampleFormat::C64,
        }
    }

    /// Number of phasors.
    pub fn len(&self) -> usize {
        dispatch!(Self, self, v => v.len())
    }

    /// Whether the view holds no phasors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the view in bytes.
    pub fn byte_size(&self) -> usize {
        self.len() * self.format().size()
    }

    /// Reborrow for a shorter lifetime, leaving `self` usable afterwards.
    pub fn reborrow(&mut self) -> SamplesMut<'_> {
        dispatch_map!(Self => SamplesMut, self, v => &mut **v)
    }

    /// Read-only view of the same storage.
    pub fn as_ref(&self) -> SamplesRef<'_> {
        dispatch_map!(Self => SamplesRef, self, v => &**v)
    }

    /// Narrow the view to phasors `start..end`.
    ///
    /// # Panics
    /// Panics if the range is out of bounds, like slice indexing.
    pub fn slice_mut(self, start: usize, end: usize) -> SamplesMut<'a> {
        dispatch_map!(Self => SamplesMut, self, v => &mut v[start..end])
    }

    /// Typed access to the viewed storage.
    ///
    /// # Errors
    /// Returns [`IqError::FormatMismatch`] if `P` does not match the view.
    pub fn into_typed<P: Phasor>(self) -> IqResult<&'a mut [P]> {
        let actual = self.format();
        P::from_mut(self).ok_or(IqError::format_mismatch(P::FORMAT, actual))
    }

    /// The viewed phasors as mutable raw bytes in native byte order.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        dispatch!(Self, self, v => bytemuck::cast_slice_mut(&mut **v))
    }

    /// Set every phasor to all-zero bits.
    pub fn zero(&mut self) {
        dispatch!(Self, self, v => v.fill(bytemuck::Zeroable::zeroed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        for format in SampleFormat::ALL {
            let buf = Samples::new(format, 16);
            assert_eq!(buf.format(), format);
            assert_eq!(buf.len(), 16);
            assert_eq!(buf.byte_size(), 16 * format.size());
            assert!(buf.as_ref().as_bytes().iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_slice_aliases_storage() {
        let mut buf = Samples::new(SampleFormat::C64, 10);
        {
            let view = buf.slice_mut(5, 10);
            assert_eq!(view.len(), 5);
            let iq = view.into_typed::<Complex32>().unwrap();
            iq[0] = Complex32::new(1.0, -1.0);
        }
        let iq = buf.as_typed::<Complex32>().unwrap();
        assert_eq!(iq[5], Complex32::new(1.0, -1.0));
        assert_eq!(iq[4], Complex32::new(0.0, 0.0));
    }

    #[test]
    fn test_typed_access_checks_format() {
        let buf = Samples::new(SampleFormat::U8, 4);
        let err = buf.as_typed::<[i8; 2]>().unwrap_err();
        assert!(matches!(
            err,
            IqError::FormatMismatch {
                expected: SampleFormat::I8,
                actual: SampleFormat::U8
            }
        ));
    }

    #[test]
    fn test_byte_view_length() {
        let buf = Samples::I16(vec![[1, 2], [3, 4]]);
        let bytes = buf.as_ref().as_bytes();
        assert_eq!(bytes.len(), 8);
        assert_eq!(i16::from_ne_bytes([bytes[2], bytes[3]]), 2);
    }

    #[test]
    fn test_to_samples_copies() {
        let buf = Samples::U8(vec![[1, 2], [3, 4], [5, 6]]);
        let copy = buf.slice(1, 3).to_samples();
        assert_eq!(copy, Samples::U8(vec![[3, 4], [5, 6]]));
    }

    #[test]
    fn test_zero() {
        let mut buf = Samples::I8(vec![[1, 2], [3, 4]]);
        buf.zero();
        assert_eq!(buf, Samples::I8(vec![[0, 0], [0, 0]]));
    }
}
