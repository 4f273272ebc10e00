//! Precomputed transforms for 8-bit phasor streams.
//!
//! An 8-bit phasor is two bytes, so there are only 65,536 distinct inputs.
//! A [`LookupTable`] maps each of them to an output phasor (of any format),
//! which turns per-sample float arithmetic into a single indexed load.
//!
//! The key of a phasor is its two bytes reinterpreted as a native-endian
//! `u16`. Building a table costs one 65,536-element pass; rebuild it whenever
//! the transform's parameters change.

use num_complex::Complex32;

use crate::conversions::{convert, convert_to};
use crate::simd::rotate_complex;
use crate::{IqError, IqResult, Phasor, SampleFormat, Samples, SamplesMut, SamplesRef};

/// Number of entries in every lookup table.
pub const LOOKUP_TABLE_SIZE: usize = 1 << 16;

/// A 65,536-entry table indexed by 8-bit phasors.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    source: SampleFormat,
    table: Samples,
}

impl LookupTable {
    /// Build a table for `source` phasors from an explicit list of outputs.
    ///
    /// # Errors
    /// [`IqError::UnsupportedFormat`] if `source` is not an 8-bit format, and
    /// [`IqError::InvalidParameter`] if `table` is not exactly
    /// [`LOOKUP_TABLE_SIZE`] entries long.
    pub fn new(source: SampleFormat, table: Samples) -> IqResult<Self> {
        if !source.is_narrow() {
            return Err(IqError::UnsupportedFormat {
                operation: "LookupTable",
                format: source,
            });
        }
        if table.len() != LOOKUP_TABLE_SIZE {
            return Err(IqError::invalid_parameter(format!(
                "lookup table must have {LOOKUP_TABLE_SIZE} entries, got {}",
                table.len()
            )));
        }
        Ok(Self { source, table })
    }

    /// A table mapping every phasor to itself.
    ///
    /// # Errors
    /// [`IqError::UnsupportedFormat`] if `source` is not an 8-bit format.
    pub fn identity(source: SampleFormat) -> IqResult<Self> {
        let table = match source {
            SampleFormat::U8 => Samples::U8(
                (0..=u16::MAX).map(|key| key.to_ne_bytes()).collect(),
            ),
            SampleFormat::I8 => Samples::I8(
                (0..=u16::MAX)
                    .map(|key| key.to_ne_bytes().map(|b| b as i8))
                    .collect(),
            ),
            other => {
                return Err(IqError::UnsupportedFormat {
                    operation: "LookupTable::identity",
                    format: other,
                });
            }
        };
        Self::new(source, table)
    }

    /// A table that multiplies every phasor by `m`, staying in `source`'s
    /// format.
    ///
    /// Each entry is converted to complex, multiplied, and converted back, so
    /// results carry the usual 8-bit quantization.
    ///
    /// # Errors
    /// [`IqError::UnsupportedFormat`] if `source` is not an 8-bit format.
    pub fn multiplier(source: SampleFormat, m: Complex32) -> IqResult<Self> {
        let identity = Self::identity(source)?;
        let mut iq = convert_to(identity.table.as_ref(), SampleFormat::C64)?;
        rotate_complex(m, iq.as_typed_mut::<Complex32>()?);
        let mut table = Samples::new(source, LOOKUP_TABLE_SIZE);
        convert(table.as_mut(), iq.as_ref())?;
        Self::new(source, table)
    }

    /// Format of the phasors used as keys.
    pub const fn source_format(&self) -> SampleFormat {
        self.source
    }

    /// Format of the phasors the table produces.
    pub const fn output_format(&self) -> SampleFormat {
        self.table.format()
    }

    /// Replace every phasor of `src` with its table entry, writing into `dst`.
    ///
    /// `dst` may be the same storage `src` was copied from; the two views are
    /// distinct borrows.
    ///
    /// # Errors
    /// [`IqError::FormatMismatch`] if `src` is not the source format or `dst`
    /// is not the output format, and [`IqError::DestinationTooSmall`] if `dst`
    /// is shorter than `src`.
    pub fn lookup(&self, dst: SamplesMut<'_>, src: SamplesRef<'_>) -> IqResult<usize> {
        if src.format() != self.source {
            return Err(IqError::format_mismatch(self.source, src.format()));
        }
        if dst.format() != self.output_format() {
            return Err(IqError::format_mismatch(self.output_format(), dst.format()));
        }
        if dst.len() < src.len() {
            return Err(IqError::DestinationTooSmall {
                needed: src.len(),
                available: dst.len(),
            });
        }
        match src {
            SamplesRef::U8(keys) => self.apply(dst, keys.iter().map(|k| key_u8(*k))),
            SamplesRef::I8(keys) => self.apply(dst, keys.iter().map(|k| key_i8(*k))),
            // The source format was checked to be 8-bit above.
            other => Err(IqError::format_mismatch(self.source, other.format())),
        }
    }

    /// Rewrite an 8-bit buffer in place through the table.
    ///
    /// # Errors
    /// [`IqError::FormatMismatch`] unless the table maps a format to itself
    /// and `buf` is that format.
    pub fn lookup_in_place(&self, buf: SamplesMut<'_>) -> IqResult<usize> {
        if buf.format() != self.source || self.output_format() != self.source {
            return Err(IqError::format_mismatch(self.source, buf.format()));
        }
        match (buf, &self.table) {
            (SamplesMut::U8(iq), Samples::U8(table)) => {
                for v in iq.iter_mut() {
                    *v = table[usize::from(key_u8(*v))];
                }
                Ok(iq.len())
            }
            (SamplesMut::I8(iq), Samples::I8(table)) => {
                for v in iq.iter_mut() {
                    *v = table[usize::from(key_i8(*v))];
                }
                Ok(iq.len())
            }
            (buf, _) => Err(IqError::format_mismatch(self.source, buf.format())),
        }
    }

    fn apply(&self, dst: SamplesMut<'_>, keys: impl Iterator<Item = u16>) -> IqResult<usize> {
        match (&self.table, dst) {
            (Samples::U8(t), SamplesMut::U8(d)) => Ok(gather(t, d, keys)),
            (Samples::I8(t), SamplesMut::I8(d)) => Ok(gather(t, d, keys)),
            (Samples::I16(t), SamplesMut::I16(d)) => Ok(gather(t, d, keys)),
            (Samples::C64(t), SamplesMut::C64(d)) => Ok(gather(t, d, keys)),
            (t, d) => Err(IqError::format_mismatch(t.format(), d.format())),
        }
    }
}

fn gather<P: Phasor>(table: &[P], dst: &mut [P], keys: impl Iterator<Item = u16>) -> usize {
    let mut n = 0;
    for (d, key) in dst.iter_mut().zip(keys) {
        *d = table[usize::from(key)];
        n += 1;
    }
    n
}

#[inline]
const fn key_u8(v: [u8; 2]) -> u16 {
    u16::from_ne_bytes(v)
}

#[inline]
const fn key_i8(v: [i8; 2]) -> u16 {
    u16::from_ne_bytes([v[0] as u8, v[1] as u8])
}
