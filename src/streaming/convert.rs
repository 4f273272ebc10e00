//! Format conversion stages.

use crate::conversions::convert;
use crate::io::DEFAULT_BUFFER_LENGTH;
use crate::streaming::{TransformConfig, read_transformer};
use crate::{IqError, IqResult, PipeReader, Reader, SampleFormat, Samples, SamplesRef, Writer};

/// Re-encode every phasor of `input` as `format`.
///
/// # Errors
/// As [`read_transformer`].
pub fn convert_reader<R: Reader + 'static>(input: R, format: SampleFormat) -> IqResult<PipeReader> {
    let config = TransformConfig {
        output_format: format,
        ..TransformConfig::passthrough(&input)
    };
    read_transformer(input, config, |src, dst| convert(dst, src))
}

/// A writer accepting one format and forwarding another.
///
/// Writes are converted through a fixed scratch buffer, so arbitrarily large
/// writes are forwarded in several pieces.
pub struct ConvertWriter<W> {
    out: W,
    input_format: SampleFormat,
    scratch: Samples,
}

impl<W: Writer> ConvertWriter<W> {
    /// Accept `input_format` phasors and forward them to `out` in its own
    /// format.
    pub fn new(out: W, input_format: SampleFormat) -> Self {
        let scratch = Samples::new(out.sample_format(), DEFAULT_BUFFER_LENGTH);
        Self {
            out,
            input_format,
            scratch,
        }
    }

    /// Consume the adapter, returning the wrapped writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Writer> Writer for ConvertWriter<W> {
    fn write(&mut self, buf: SamplesRef<'_>) -> IqResult<usize> {
        if buf.format() != self.input_format {
            return Err(IqError::format_mismatch(self.input_format, buf.format()));
        }

        let step = self.scratch.len();
        let mut written = 0;
        for start in (0..buf.len()).step_by(step) {
            let end = (start + step).min(buf.len());
            let n = convert(self.scratch.as_mut(), buf.slice(start, end))?;
            let accepted = self.out.write(self.scratch.slice(0, n))?;
            written += accepted;
            if accepted != n {
                return Err(IqError::ShortWrite);
            }
        }
        Ok(written)
    }

    fn sample_format(&self) -> SampleFormat {
        self.input_format
    }

    fn sample_rate(&self) -> u32 {
        self.out.sample_rate()
    }
}
