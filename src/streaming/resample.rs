//! FFT-based resampling.
//!
//! Each window of one tenth of a second is transformed to the frequency
//! domain, its bins are copied into a window sized for the target rate
//! (truncating or zero-padding the high frequencies), and the result is
//! transformed back.

use std::sync::Arc;

use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

use crate::streaming::{TransformConfig, read_transformer};
use crate::{IqError, IqResult, PipeReader, Reader, SampleFormat};

/// Windows per second.
const WINDOWS_PER_SECOND: u32 = 10;

/// Copy the spectrum `input` into `out`, both in zero-first order
/// (`0, 1, .., n/2, -n/2, .., -1`).
///
/// The lowest `min(len) / 2` positive and negative bins are kept; every other
/// bin of `out` is zeroed.
pub fn copy_freq(out: &mut [Complex32], input: &[Complex32]) {
    let half = out.len().min(input.len()) / 2;
    out.fill(Complex32::new(0.0, 0.0));
    out[..half].copy_from_slice(&input[..half]);
    let (out_len, in_len) = (out.len(), input.len());
    out[out_len - half..].copy_from_slice(&input[in_len - half..]);
}

struct Resampler {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    in_freq: Vec<Complex32>,
    out_freq: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl Resampler {
    fn new(in_window: usize, out_window: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(in_window);
        let inverse = planner.plan_fft_inverse(out_window);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            forward,
            inverse,
            in_freq: vec![Complex32::new(0.0, 0.0); in_window],
            out_freq: vec![Complex32::new(0.0, 0.0); out_window],
            scratch: vec![Complex32::new(0.0, 0.0); scratch_len],
        }
    }

    /// Resample one window, returning the number of output phasors that
    /// correspond to `src`.
    fn process(&mut self, src: &[Complex32], dst: &mut [Complex32]) -> usize {
        let (in_window, out_window) = (self.in_freq.len(), self.out_freq.len());
        self.in_freq[..src.len()].copy_from_slice(src);
        self.in_freq[src.len()..].fill(Complex32::new(0.0, 0.0));

        self.forward
            .process_with_scratch(&mut self.in_freq, &mut self.scratch);
        copy_freq(&mut self.out_freq, &self.in_freq);
        self.inverse
            .process_with_scratch(&mut self.out_freq, &mut self.scratch);

        let scale = 1.0 / in_window as f32;
        for (o, v) in dst.iter_mut().zip(&self.out_freq) {
            *o = *v * scale;
        }
        src.len() * out_window / in_window
    }
}

/// Resample a complex stream to `output_sample_rate`.
///
/// Both rates must be at least ten phasors per second.
///
/// # Errors
/// - [`IqError::UnsupportedFormat`] unless `input` is [`SampleFormat::C64`].
/// - [`IqError::InvalidParameter`] for rates too low to form a window.
/// - Errors from [`read_transformer`].
pub fn resample_reader<R: Reader + 'static>(input: R, output_sample_rate: u32) -> IqResult<PipeReader> {
    if input.sample_format() != SampleFormat::C64 {
        return Err(IqError::UnsupportedFormat {
            operation: "resample",
            format: input.sample_format(),
        });
    }
    let in_window = (input.sample_rate() / WINDOWS_PER_SECOND) as usize;
    let out_window = (output_sample_rate / WINDOWS_PER_SECOND) as usize;
    if in_window == 0 || out_window == 0 {
        return Err(IqError::invalid_parameter(format!(
            "cannot resample {} to {output_sample_rate} phasors per second",
            input.sample_rate()
        )));
    }

    let mut resampler = Resampler::new(in_window, out_window);
    let config = TransformConfig {
        input_length: in_window,
        output_length: out_window,
        output_format: SampleFormat::C64,
        output_sample_rate,
    };
    read_transformer(input, config, move |src, dst| {
        Ok(resampler.process(src.into_typed()?, dst.into_typed()?))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Samples;
    use crate::io::read_full;
    use crate::streaming::tests::{SliceReader, cw};

    #[test]
    fn test_copy_freq_splits_at_nyquist() {
        let input: Vec<_> = (0..6).map(|i| Complex32::new(i as f32, 0.0)).collect();
        let mut out = vec![Complex32::new(9.0, 9.0); 10];
        copy_freq(&mut out, &input);
        let re: Vec<f32> = out.iter().map(|c| c.re).collect();
        assert_eq!(re, vec![0.0, 1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 3.0, 4.0, 5.0]);
        assert!(out.iter().all(|c| c.im == 0.0));
    }

    #[test]
    fn test_upsample_preserves_tone() {
        let input = SliceReader::new(Samples::C64(cw(100.0, 10_000, 2_000)), 10_000);
        let mut reader = resample_reader(input, 20_000).unwrap();
        assert_eq!(reader.sample_rate(), 20_000);

        let mut out = Samples::new(SampleFormat::C64, 4_000);
        read_full(&mut reader, out.as_mut()).unwrap();
        let expected = cw(100.0, 20_000, 4_000);
        for (got, want) in out.as_typed::<Complex32>().unwrap().iter().zip(&expected) {
            assert!((got - want).norm() < 1e-3, "{got} != {want}");
        }
    }

    #[test]
    fn test_rejects_integer_input() {
        let input = SliceReader::new(Samples::new(SampleFormat::I16, 10), 1_000);
        assert!(matches!(
            resample_reader(input, 500),
            Err(IqError::UnsupportedFormat { .. })
        ));
    }
}
