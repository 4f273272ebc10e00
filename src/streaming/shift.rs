//! Frequency translation.

use std::f64::consts::TAU;

use num_complex::Complex32;

use crate::{IqError, IqResult, Reader, SampleFormat, SamplesMut};

/// A reader that moves every frequency of a complex stream down by a fixed
/// offset.
///
/// A carrier at `+shift_hz` reads back at DC; a negative shift moves signals
/// up. The oscillator phase is tracked in turns, wrapped to `[0, 1)`, so it
/// stays precise over arbitrarily long streams.
pub struct ShiftReader<R> {
    input: R,
    step: f64,
    phase: f64,
}

/// Shift `input` by `shift_hz`.
///
/// # Errors
/// [`IqError::UnsupportedFormat`] unless `input` is [`SampleFormat::C64`].
pub fn shift_reader<R: Reader>(input: R, shift_hz: f64) -> IqResult<ShiftReader<R>> {
    if input.sample_format() != SampleFormat::C64 {
        return Err(IqError::UnsupportedFormat {
            operation: "shift",
            format: input.sample_format(),
        });
    }
    let step = shift_hz / f64::from(input.sample_rate().max(1));
    Ok(ShiftReader {
        input,
        step,
        phase: 0.0,
    })
}

impl<R> ShiftReader<R> {
    /// Current oscillator phase in turns.
    pub const fn phase(&self) -> f64 {
        self.phase
    }

    fn rotate(&mut self, iq: &mut [Complex32]) {
        for v in iq {
            let (sin, cos) = (-TAU * self.phase).sin_cos();
            *v *= Complex32::new(cos as f32, sin as f32);
            self.phase = (self.phase + self.step).rem_euclid(1.0);
        }
    }
}

impl<R: Reader> Reader for ShiftReader<R> {
    fn read(&mut self, mut buf: SamplesMut<'_>) -> IqResult<usize> {
        if buf.format() != SampleFormat::C64 {
            return Err(IqError::format_mismatch(SampleFormat::C64, buf.format()));
        }
        let n = self.input.read(buf.reborrow())?;
        let iq = buf.slice_mut(0, n).into_typed::<Complex32>()?;
        self.rotate(iq);
        Ok(n)
    }

    fn sample_format(&self) -> SampleFormat {
        SampleFormat::C64
    }

    fn sample_rate(&self) -> u32 {
        self.input.sample_rate()
    }
}
