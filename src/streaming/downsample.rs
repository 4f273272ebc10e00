//! Rate reduction by averaging.
//!
//! Averaging `factor` oversampled phasors trades rate for resolution: every
//! factor of four gains roughly one effective bit. Output is always
//! [`SampleFormat::C64`], whatever the input format.
//!
//! | factor | rate from 3 Msps | ENOB from 8 bits |
//! |---|---|---|
//! | 4 | 750,000 | 9 |
//! | 16 | 187,500 | 10 |
//! | 64 | 46,875 | 11 |
//! | 256 | 11,718 | 12 |

use num_complex::Complex32;

use crate::conversions::convert;
use crate::io::DEFAULT_BUFFER_LENGTH;
use crate::streaming::{TransformConfig, read_transformer};
use crate::{IqError, IqResult, PipeReader, Reader, SampleFormat, SamplesMut, SamplesRef};

/// Write the mean of each whole group of `factor` phasors of `src` to `dst`,
/// returning `src.len() / factor`.
///
/// `scratch` holds one group converted to complex; it is grown as needed.
fn downsample_into(
    dst: &mut [Complex32],
    src: SamplesRef<'_>,
    factor: usize,
    scratch: &mut Vec<Complex32>,
) -> IqResult<usize> {
    let n = src.len() / factor;
    if dst.len() < n {
        return Err(IqError::DestinationTooSmall {
            needed: n,
            available: dst.len(),
        });
    }
    scratch.resize(factor, Complex32::new(0.0, 0.0));
    let scale = 1.0 / factor as f32;

    for (i, out) in dst[..n].iter_mut().enumerate() {
        let group = src.slice(i * factor, (i + 1) * factor);
        convert(scratch.as_mut_slice().into(), group)?;
        let sum: Complex32 = scratch.iter().sum();
        *out = sum * scale;
    }
    Ok(n)
}

/// Average each whole group of `factor` phasors of `src` into `dst`.
///
/// # Errors
/// - [`IqError::InvalidParameter`] for a zero factor.
/// - [`IqError::FormatMismatch`] unless `dst` is [`SampleFormat::C64`].
/// - [`IqError::DestinationTooSmall`] if `dst` cannot hold the result.
pub fn downsample_buffer(dst: SamplesMut<'_>, src: SamplesRef<'_>, factor: usize) -> IqResult<usize> {
    if factor == 0 {
        return Err(IqError::invalid_parameter("downsample factor must be non-zero"));
    }
    let format = dst.format();
    let SamplesMut::C64(dst) = dst else {
        return Err(IqError::format_mismatch(SampleFormat::C64, format));
    };
    downsample_into(dst, src, factor, &mut Vec::with_capacity(factor))
}

/// Average every `factor` phasors of `input`, dividing its rate by `factor`.
///
/// # Errors
/// [`IqError::InvalidParameter`] for a zero factor or one too large for a
/// sample rate, or errors from [`read_transformer`].
pub fn downsample_reader<R: Reader + 'static>(input: R, factor: usize) -> IqResult<PipeReader> {
    if factor == 0 {
        return Err(IqError::invalid_parameter("downsample factor must be non-zero"));
    }
    let divisor = u32::try_from(factor).map_err(|_| {
        IqError::invalid_parameter(format!("downsample factor {factor} exceeds the sample rate range"))
    })?;
    let input_length = (DEFAULT_BUFFER_LENGTH / factor).max(1) * factor;
    let config = TransformConfig {
        input_length,
        output_length: input_length / factor,
        output_format: SampleFormat::C64,
        output_sample_rate: input.sample_rate() / divisor,
    };
    let mut scratch = Vec::with_capacity(factor);
    read_transformer(input, config, move |src, dst| {
        let dst = dst.into_typed::<Complex32>()?;
        downsample_into(dst, src, factor, &mut scratch)
    })
}
