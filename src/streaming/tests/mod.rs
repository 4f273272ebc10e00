//! Tests for streaming functionality.
//!
//! The sibling files exercise whole pipelines; the helpers here are shared
//! with the unit tests of each stage.

use num_complex::Complex32;

use crate::conversions::copy;
use crate::{IqError, IqResult, Reader, SampleFormat, Samples, SamplesMut, SamplesRef, Writer};

mod beamform_tests;
mod buffer_tests;
mod pipeline_tests;

/// A finite reader over an owned buffer.
pub(crate) struct SliceReader {
    data: Samples,
    pos: usize,
    sample_rate: u32,
}

impl SliceReader {
    pub(crate) fn new(data: Samples, sample_rate: u32) -> Self {
        Self {
            data,
            pos: 0,
            sample_rate,
        }
    }
}

impl Reader for SliceReader {
    fn read(&mut self, buf: SamplesMut<'_>) -> IqResult<usize> {
        if buf.format() != self.data.format() {
            return Err(IqError::format_mismatch(self.data.format(), buf.format()));
        }
        if self.pos >= self.data.len() {
            return Err(IqError::EndOfStream);
        }
        let n = copy(buf, self.data.slice(self.pos, self.data.len()))?;
        self.pos += n;
        Ok(n)
    }

    fn sample_format(&self) -> SampleFormat {
        self.data.format()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// A writer collecting everything it is given.
pub(crate) struct VecWriter {
    pub(crate) samples: Samples,
    sample_rate: u32,
}

impl VecWriter {
    pub(crate) fn new(format: SampleFormat, sample_rate: u32) -> Self {
        Self {
            samples: Samples::new(format, 0),
            sample_rate,
        }
    }
}

impl Writer for VecWriter {
    fn write(&mut self, buf: SamplesRef<'_>) -> IqResult<usize> {
        match (&mut self.samples, buf) {
            (Samples::U8(v), SamplesRef::U8(b)) => v.extend_from_slice(b),
            (Samples::I8(v), SamplesRef::I8(b)) => v.extend_from_slice(b),
            (Samples::I16(v), SamplesRef::I16(b)) => v.extend_from_slice(b),
            (Samples::C64(v), SamplesRef::C64(b)) => v.extend_from_slice(b),
            (v, b) => return Err(IqError::format_mismatch(v.format(), b.format())),
        }
        Ok(buf.len())
    }

    fn sample_format(&self) -> SampleFormat {
        self.samples.format()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// `len` phasors of a unit carrier at `freq` Hz.
pub(crate) fn cw(freq: f32, sample_rate: u32, len: usize) -> Vec<Complex32> {
    let step = std::f64::consts::TAU * f64::from(freq) / f64::from(sample_rate);
    (0..len)
        .map(|n| {
            let (sin, cos) = (step * n as f64).sin_cos();
            Complex32::new(cos as f32, sin as f32)
        })
        .collect()
}
