//! Blackman windowing on the write side.

use std::collections::HashMap;
use std::f64::consts::TAU;

use num_complex::Complex32;

use crate::{IqError, IqResult, SampleFormat, SamplesRef, Writer};

/// Blackman window coefficients of `size` points.
pub fn blackman(size: usize) -> Vec<f32> {
    const A0: f64 = 0.42;
    const A1: f64 = 0.5;
    const A2: f64 = 0.08;
    let n = size as f64;
    (0..size)
        .map(|i| {
            let x = TAU * i as f64 / n;
            (A0 - A1 * x.cos() + A2 * (2.0 * x).cos()) as f32
        })
        .collect()
}

/// A writer that multiplies each written buffer by a Blackman window the
/// length of that buffer before forwarding it.
///
/// Windows are cached by length, so a producer writing fixed-size frames pays
/// for the coefficients once.
pub struct WindowWriter<W> {
    output: W,
    windows: HashMap<usize, Vec<f32>>,
    scratch: Vec<Complex32>,
}

impl<W: Writer> WindowWriter<W> {
    /// Window everything written to `output`.
    ///
    /// # Errors
    /// [`IqError::UnsupportedFormat`] unless `output` takes
    /// [`SampleFormat::C64`].
    pub fn new(output: W) -> IqResult<Self> {
        if output.sample_format() != SampleFormat::C64 {
            return Err(IqError::UnsupportedFormat {
                operation: "window",
                format: output.sample_format(),
            });
        }
        Ok(Self {
            output,
            windows: HashMap::new(),
            scratch: Vec::new(),
        })
    }

    /// Unwrap into the downstream writer.
    pub fn into_inner(self) -> W {
        self.output
    }
}

impl<W: Writer> Writer for WindowWriter<W> {
    fn write(&mut self, buf: SamplesRef<'_>) -> IqResult<usize> {
        if buf.format() != SampleFormat::C64 {
            return Err(IqError::format_mismatch(SampleFormat::C64, buf.format()));
        }
        let src = buf.into_typed::<Complex32>()?;
        let window = self
            .windows
            .entry(src.len())
            .or_insert_with(|| blackman(src.len()));

        self.scratch.clear();
        self.scratch
            .extend(src.iter().zip(window.iter()).map(|(v, w)| *v * *w));
        self.output.write(SamplesRef::C64(&self.scratch))
    }

    fn sample_format(&self) -> SampleFormat {
        SampleFormat::C64
    }

    fn sample_rate(&self) -> u32 {
        self.output.sample_rate()
    }
}
