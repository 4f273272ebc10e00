//! Phasor encodings.
//!
//! Every buffer, reader and writer in this crate declares exactly one
//! [`SampleFormat`]. The set is closed: adding an encoding means touching
//! every `match` over it, which the compiler enforces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{IqError, IqResult};

/// Numeric encoding of an interleaved IQ phasor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Interleaved unsigned 8-bit components, centered on 127.5.
    U8,
    /// Interleaved signed 8-bit components.
    I8,
    /// Interleaved signed 16-bit components.
    I16,
    /// 32-bit float complex (`Complex32`).
    C64,
}

impl SampleFormat {
    /// All four formats, in declaration order.
    pub const ALL: [SampleFormat; 4] = [Self::U8, Self::I8, Self::I16, Self::C64];

    /// Size of one phasor in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 2,
            Self::I16 => 4,
            Self::C64 => 8,
        }
    }

    /// Stable numeric identifier used by drivers and on-wire headers.
    pub const fn id(self) -> u8 {
        match self {
            Self::C64 => 1,
            Self::U8 => 2,
            Self::I16 => 3,
            Self::I8 => 4,
        }
    }

    /// Inverse of [`SampleFormat::id`].
    ///
    /// # Errors
    /// Returns [`IqError::FormatUnknown`] for identifiers outside the set.
    pub fn from_id(id: u8) -> IqResult<Self> {
        match id {
            1 => Ok(Self::C64),
            2 => Ok(Self::U8),
            3 => Ok(Self::I16),
            4 => Ok(Self::I8),
            other => Err(IqError::FormatUnknown(format!("id {other}"))),
        }
    }

    /// Whether the format is one of the two 8-bit encodings that can be
    /// indexed through a [`crate::LookupTable`].
    pub const fn is_narrow(self) -> bool {
        matches!(self, Self::U8 | Self::I8)
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "interleaved uint8",
            Self::I8 => "interleaved int8",
            Self::I16 => "interleaved int16",
            Self::C64 => "complex64",
        };
        f.write_str(name)
    }
}

impl FromStr for SampleFormat {
    type Err = IqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "u8" | "uint8" => Ok(Self::U8),
            "i8" | "int8" => Ok(Self::I8),
            "i16" | "int16" => Ok(Self::I16),
            "c64" | "complex64" => Ok(Self::C64),
            _ => Err(IqError::FormatUnknown(s.to_string())),
        }
    }
}
