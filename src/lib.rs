// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)]
// Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::large_stack_arrays)] // Helps avoid stack overflows
#![warn(clippy::box_collection)] // Warns on boxed `Vec`, `String`, etc.
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::identity_op)] // e.g., `x + 0`, `x * 1`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::let_unit_value)] // Avoids binding `()` to variables
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![warn(clippy::unwrap_used)] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![warn(clippy::missing_safety_doc)] // Docs for `unsafe` functions
#![warn(clippy::missing_const_for_fn)] // Suggests making eligible functions `const`
#![deny(missing_docs)] // Documentation is a must for release

//! # IqSamples
//!
//! Streaming, conversion and transformation of IQ phasors for software-defined
//! radio.
//!
//! A radio hands out a stream of phasors in one of four encodings
//! ([`SampleFormat`]). This crate moves those streams between threads
//! ([`pipe`], the buffered pipes and the ring buffer in [`streaming`]),
//! converts between encodings ([`conversions`]), and builds processing chains
//! out of small [`Reader`] stages: decimation, resampling, gain, frequency
//! shifting, summing and beam steering.
//!
//! ## Features
//!
//! - `simd`: vectorized complex arithmetic via the `wide` crate (default)
//! - `fft`: FFT-based resampling and convolution via `rustfft` (default)
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`IqResult`]. Terminal errors are sticky:
//! once a pipe or stage fails, every later call returns the same error.
//!
//! ```rust
//! use iq_samples::{IqError, IqResult, SampleFormat, Samples};
//! use iq_samples::conversions::convert;
//!
//! let src = Samples::new(SampleFormat::I8, 4);
//! let mut dst = Samples::new(SampleFormat::C64, 2);
//! let result: IqResult<usize> = convert(dst.as_mut(), src.as_ref());
//! assert!(matches!(result, Err(IqError::DestinationTooSmall { .. })));
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use iq_samples::{Reader, SampleFormat, Samples, Writer, pipe};
//! use num_complex::Complex32;
//! use std::thread;
//!
//! let (mut reader, mut writer) = pipe(2_048_000, SampleFormat::C64);
//! let producer = thread::spawn(move || {
//!     let burst = Samples::C64(vec![Complex32::new(1.0, 0.0); 1024]);
//!     writer.write(burst.as_ref())
//! });
//!
//! let mut buf = Samples::new(SampleFormat::C64, 1024);
//! let n = iq_samples::read_full(&mut reader, buf.as_mut()).unwrap();
//! assert_eq!(n, 1024);
//! assert_eq!(producer.join().unwrap().unwrap(), 1024);
//! ```
//!
//! ## Logging
//!
//! Lifecycle events (stage start and stop, overruns, the SIMD probe) are
//! emitted through `tracing`. The crate never installs a subscriber.

pub mod bytes;
pub mod conversions;
pub mod error;
pub mod format;
pub mod hardware;
pub mod io;
pub mod lifetime;
pub mod lookup;
pub mod pipe;
pub mod pool;
pub mod repr;
pub mod simd;
pub mod streaming;
pub mod traits;

pub use bytes::{ByteOrder, ByteReader, ByteWriter};
pub use error::{IqError, IqResult};
pub use format::SampleFormat;
pub use hardware::{HardwareInfo, Receiver, Sdr, Transmitter};
pub use io::{
    DEFAULT_BUFFER_LENGTH, MultiReader, MultiWriter, ReaderWithCloser, Readers, copy_stream,
    copy_stream_with_buffer, read_at_least, read_full,
};
pub use lifetime::Lifetime;
pub use lookup::{LOOKUP_TABLE_SIZE, LookupTable};
pub use pipe::{PipeCloser, PipeReader, PipeWriter, pipe, pipe_with_lifetime};
pub use pool::SamplesPool;
pub use repr::{Phasor, Samples, SamplesMut, SamplesRef};
pub use traits::{BoxReadCloser, BoxReader, Closer, ReadCloser, Reader, WriteCloser, Writer};
