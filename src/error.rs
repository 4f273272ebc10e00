//! Error types and result utilities for IQ streaming operations.

use std::sync::Arc;

use thiserror::Error;

use crate::SampleFormat;

/// Convenience type alias for results that may contain an [`IqError`].
pub type IqResult<T> = Result<T, IqError>;

/// Error types that can occur while converting or streaming phasors.
///
/// Errors are `Clone` because terminal errors are sticky: once a pipe, ring
/// buffer or transform stage has failed, every later caller receives the same
/// value.
#[derive(Error, Debug, Clone)]
pub enum IqError {
    /// A buffer's format disagrees with the component's declared format.
    #[error("Sample format mismatch: expected {expected}, got {actual}")]
    FormatMismatch {
        /// Format declared by the component.
        expected: SampleFormat,
        /// Format of the buffer that was supplied.
        actual: SampleFormat,
    },

    /// A format name or identifier is not one of the four known encodings.
    #[error("Unknown sample format: {0}")]
    FormatUnknown(String),

    /// The operation does not handle the given format.
    #[error("{operation} does not support {format} samples")]
    UnsupportedFormat {
        /// Name of the operation that refused the format.
        operation: &'static str,
        /// Offending format.
        format: SampleFormat,
    },

    /// The destination buffer cannot hold the operation's output.
    #[error("Destination too small: need {needed} phasors, have {available}")]
    DestinationTooSmall {
        /// Phasors the operation would produce.
        needed: usize,
        /// Phasors the destination can hold.
        available: usize,
    },

    /// Default terminal state of a pipe, ring buffer or stage.
    #[error("pipe is closed")]
    PipeClosed,

    /// A bounded buffer received data faster than it was drained.
    #[error("Buffer overrun")]
    BufferOverrun,

    /// A non-blocking read found a bounded buffer empty.
    #[error("Buffer underrun")]
    BufferUnderrun,

    /// A writer accepted fewer phasors than it was offered.
    #[error("Short write")]
    ShortWrite,

    /// The destination is smaller than the requested minimum read.
    #[error("Short buffer")]
    ShortBuffer,

    /// The stream ended after a partial read.
    #[error("Unexpected end of stream")]
    UnexpectedEnd,

    /// The stream ended cleanly; no more phasors will be produced.
    #[error("End of stream")]
    EndOfStream,

    /// Compiled-in vector acceleration is not supported by this CPU.
    #[error("Hardware feature unsupported: {0}")]
    HardwareFeatureUnsupported(String),

    /// A parameter supplied to a constructor or operation is invalid.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// An I/O error from an underlying byte stream.
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// Caller-supplied terminal error attached with `close_with_error`.
    #[error("{0}")]
    Custom(Arc<dyn std::error::Error + Send + Sync>),
}

impl IqError {
    /// Create a format mismatch error.
    pub const fn format_mismatch(expected: SampleFormat, actual: SampleFormat) -> Self {
        Self::FormatMismatch { expected, actual }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(details: impl Into<String>) -> Self {
        Self::InvalidParameter(details.into())
    }

    /// Wrap an arbitrary error so it can be attached as a terminal error.
    pub fn custom<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(err))
    }

    /// Check whether this is the default closed condition.
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::PipeClosed)
    }

    /// Check whether the stream ended, cleanly or not.
    pub const fn is_end(&self) -> bool {
        matches!(self, Self::EndOfStream | Self::UnexpectedEnd)
    }

    /// Overruns and underruns leave a ring buffer usable; everything else is
    /// terminal for the component that reported it.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::BufferOverrun | Self::BufferUnderrun)
    }
}

impl From<std::io::Error> for IqError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
