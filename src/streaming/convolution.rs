//! Frequency-domain filtering.

use num_complex::Complex32;
use rustfft::FftPlanner;

use crate::streaming::{TransformConfig, read_transformer};
use crate::{IqError, IqResult, PipeReader, Reader, SampleFormat};

/// Filter `input` window by window with a frequency-domain `filter`.
///
/// Each window of `filter.len()` phasors is transformed, multiplied bin by bin
/// with `filter` (zero-first order), and transformed back. Windows are
/// independent: there is no overlap, so the result is a circular convolution
/// per window.
///
/// # Errors
/// - [`IqError::UnsupportedFormat`] unless `input` is [`SampleFormat::C64`].
/// - [`IqError::InvalidParameter`] for an empty filter.
/// - Errors from [`read_transformer`].
pub fn convolution_reader<R: Reader + 'static>(input: R, filter: Vec<Complex32>) -> IqResult<PipeReader> {
    if input.sample_format() != SampleFormat::C64 {
        return Err(IqError::UnsupportedFormat {
            operation: "convolution",
            format: input.sample_format(),
        });
    }
    if filter.is_empty() {
        return Err(IqError::invalid_parameter("convolution filter is empty"));
    }

    let window = filter.len();
    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(window);
    let inverse = planner.plan_fft_inverse(window);
    let mut scratch = vec![
        Complex32::new(0.0, 0.0);
        forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len())
    ];
    let mut freq = vec![Complex32::new(0.0, 0.0); window];
    // Fold the inverse transform's normalisation into the filter.
    let filter: Vec<Complex32> = filter.iter().map(|f| *f / window as f32).collect();

    let config = TransformConfig {
        input_length: window,
        output_length: window,
        ..TransformConfig::passthrough(&input)
    };
    read_transformer(input, config, move |src, dst| {
        let src = src.into_typed::<Complex32>()?;
        let dst = dst.into_typed::<Complex32>()?;
        freq[..src.len()].copy_from_slice(src);
        freq[src.len()..].fill(Complex32::new(0.0, 0.0));

        forward.process_with_scratch(&mut freq, &mut scratch);
        for (bin, f) in freq.iter_mut().zip(&filter) {
            *bin *= *f;
        }
        inverse.process_with_scratch(&mut freq, &mut scratch);

        dst[..src.len()].copy_from_slice(&freq[..src.len()]);
        Ok(src.len())
    })
}
