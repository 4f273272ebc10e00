//! Streaming stages built on [`Reader`](crate::Reader) and
//! [`Writer`](crate::Writer).
//!
//! This module provides:
//! - Bounded buffering between a producer and a consumer ([`buf_pipe`],
//!   [`buf_pipe2`], [`RingBuffer`])
//! - The read-side transform engine ([`read_transformer`]) and the stages
//!   built on it: conversion, decimation, downsampling, resampling and
//!   convolution
//! - Per-phasor arithmetic readers: [`gain`], [`multiply`], [`shift_reader`]
//! - Combining coherent streams with [`add`], [`mix`] and [`Beamform`]
//! - Pacing ([`throttle`]), windowing ([`WindowWriter`]) and lazily started
//!   radio streams ([`StandbyReader`], [`StandbyWriter`])
//!
//! # Example
//!
//! ```rust,ignore
//! use iq_samples::streaming::{decimate_reader, gain, shift_reader};
//!
//! // Move a carrier 100 kHz above center to DC, attenuate, and keep every
//! // eighth phasor.
//! let shifted = shift_reader(radio_stream, 100e3)?;
//! let quiet = gain(shifted, 0.5);
//! let narrow = decimate_reader(quiet, 8)?;
//! ```
//!
//! Stages that run on a background thread return a
//! [`PipeReader`](crate::PipeReader). Dropping it closes the stage; errors
//! from upstream are passed through and become the stage's terminal error.
//! Those stages consume whole chunks only, so a finite stream's tail shorter
//! than one chunk is discarded when upstream ends.

pub mod add;
pub mod beamform;
pub mod buffers;
pub mod convert;
#[cfg(feature = "fft")]
pub mod convolution;
pub mod decimate;
pub mod downsample;
pub mod gain;
pub mod multiply;
#[cfg(feature = "fft")]
pub mod resample;
pub mod ring;
pub mod shift;
pub mod standby;
pub mod throttle;
pub mod transform;
pub mod window;

#[cfg(test)]
mod tests;

pub use add::{AddReader, add, mix};
pub use beamform::{Beamform, angles, angles_2d};
pub use buffers::{
    BufPipe2Reader, BufPipe2Writer, BufPipeConfig, BufPipeReader, BufPipeWriter, buf_pipe,
    buf_pipe_with_lifetime, buf_pipe2,
};
pub use convert::{ConvertWriter, convert_reader};
#[cfg(feature = "fft")]
pub use convolution::convolution_reader;
pub use decimate::{decimate_buffer, decimate_reader};
pub use downsample::{downsample_buffer, downsample_reader};
pub use gain::{Gain, gain, scale_buffer};
pub use multiply::{MultiplyReader, Multiplier, multiply};
#[cfg(feature = "fft")]
pub use resample::{copy_freq, resample_reader};
pub use ring::{RingBuffer, RingBufferOptions, RingBufferStats};
pub use shift::{ShiftReader, shift_reader};
pub use standby::{StandbyReader, StandbyWriter};
pub use throttle::{throttle, throttle_with_period};
pub use transform::{TransformConfig, read_transformer};
pub use window::{WindowWriter, blackman};
