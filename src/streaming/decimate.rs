//! Rate reduction by keeping every Nth phasor.

use crate::io::DEFAULT_BUFFER_LENGTH;
use crate::streaming::{TransformConfig, read_transformer};
use crate::{IqError, IqResult, PipeReader, Reader, SamplesMut, SamplesRef};

/// Copy `src[i * factor]` into `dst[i]` for every whole group of `factor`
/// phasors, returning `src.len() / factor`.
///
/// # Errors
/// - [`IqError::InvalidParameter`] for a zero factor.
/// - [`IqError::FormatMismatch`] if the formats differ.
/// - [`IqError::DestinationTooSmall`] if `dst` cannot hold the result.
pub fn decimate_buffer(mut dst: SamplesMut<'_>, src: SamplesRef<'_>, factor: usize) -> IqResult<usize> {
    if factor == 0 {
        return Err(IqError::invalid_parameter("decimation factor must be non-zero"));
    }
    if dst.format() != src.format() {
        return Err(IqError::format_mismatch(dst.format(), src.format()));
    }
    let n = src.len() / factor;
    if dst.len() < n {
        return Err(IqError::DestinationTooSmall {
            needed: n,
            available: dst.len(),
        });
    }

    // Phasors are fixed-size byte groups, so one loop serves all formats.
    let size = src.format().size();
    let from = src.as_bytes();
    let to = dst.as_bytes_mut();
    for (i, phasor) in to.chunks_exact_mut(size).take(n).enumerate() {
        let at = i * factor * size;
        phasor.copy_from_slice(&from[at..at + size]);
    }
    Ok(n)
}

/// Keep one phasor in every `factor`, dividing the sample rate by `factor`.
///
/// Chunks are read in whole multiples of `factor`, so the selected phase
/// stays fixed across chunk boundaries.
///
/// # Errors
/// [`IqError::InvalidParameter`] for a zero factor or one too large for a
/// sample rate, or errors from [`read_transformer`].
pub fn decimate_reader<R: Reader + 'static>(input: R, factor: usize) -> IqResult<PipeReader> {
    if factor == 0 {
        return Err(IqError::invalid_parameter("decimation factor must be non-zero"));
    }
    let divisor = u32::try_from(factor).map_err(|_| {
        IqError::invalid_parameter(format!("decimation factor {factor} exceeds the sample rate range"))
    })?;
    let input_length = (DEFAULT_BUFFER_LENGTH / factor).max(1) * factor;
    let config = TransformConfig {
        input_length,
        output_length: input_length / factor,
        output_format: input.sample_format(),
        output_sample_rate: input.sample_rate() / divisor,
    };
    read_transformer(input, config, move |src, dst| decimate_buffer(dst, src, factor))
}
