//! The read-side transform engine.
//!
//! [`read_transformer`] pulls fixed-size chunks from an upstream [`Reader`],
//! runs a processing function over each chunk on a dedicated thread, and
//! publishes the result through an internal [`pipe`](crate::pipe). Most
//! streaming stages in this crate are thin wrappers around it.

use std::thread;

use serde::{Deserialize, Serialize};

use crate::io::{DEFAULT_BUFFER_LENGTH, fill};
use crate::{
    IqError, IqResult, PipeReader, PipeWriter, Reader, SampleFormat, Samples, SamplesMut,
    SamplesRef, Writer, pipe,
};

/// Shape of a transform stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Phasors read from upstream per chunk.
    pub input_length: usize,

    /// Capacity of the buffer handed to the processing function.
    pub output_length: usize,

    /// Format of the produced stream.
    pub output_format: SampleFormat,

    /// Rate of the produced stream.
    pub output_sample_rate: u32,
}

impl TransformConfig {
    /// A config that keeps `reader`'s format and rate, with the default
    /// chunk length on both sides.
    pub fn passthrough<R: Reader + ?Sized>(reader: &R) -> Self {
        Self {
            input_length: DEFAULT_BUFFER_LENGTH,
            output_length: DEFAULT_BUFFER_LENGTH,
            output_format: reader.sample_format(),
            output_sample_rate: reader.sample_rate(),
        }
    }
}

/// Run `process` over every chunk of `input`, exposing the results as a new
/// reader.
///
/// `process` receives the chunk read from upstream and the whole output
/// buffer, and returns how many output phasors it produced. Every chunk
/// holds exactly `input_length` phasors. A short read is not processed: the
/// upstream error that cut it short closes the stage, and the partial chunk
/// is discarded with it.
///
/// Any error, from upstream, from `process` or from downstream, is terminal:
/// the returned reader fails with it from then on. Dropping the returned
/// reader stops the background thread after its current chunk.
///
/// # Errors
/// [`IqError::InvalidParameter`] for a zero `input_length`, or an I/O error if
/// the thread cannot be spawned.
pub fn read_transformer<R, F>(input: R, config: TransformConfig, process: F) -> IqResult<PipeReader>
where
    R: Reader + 'static,
    F: FnMut(SamplesRef<'_>, SamplesMut<'_>) -> IqResult<usize> + Send + 'static,
{
    if config.input_length == 0 {
        return Err(IqError::invalid_parameter("transform input length must be non-zero"));
    }
    let (reader, writer) = pipe(config.output_sample_rate, config.output_format);

    thread::Builder::new()
        .name("iq-transform".to_owned())
        .spawn(move || run(input, config, process, writer))?;

    Ok(reader)
}

fn run<R, F>(mut input: R, config: TransformConfig, mut process: F, mut output: PipeWriter)
where
    R: Reader,
    F: FnMut(SamplesRef<'_>, SamplesMut<'_>) -> IqResult<usize>,
{
    tracing::debug!(
        from = %input.sample_format(),
        to = %config.output_format,
        rate = config.output_sample_rate,
        "transform stage started"
    );
    let mut inbuf = Samples::new(input.sample_format(), config.input_length);
    let mut outbuf = Samples::new(config.output_format, config.output_length);

    let err = loop {
        if let Some(err) = output.error() {
            break err;
        }
        // A chunk cut short by an upstream error is dropped with it.
        if let (_, Some(err)) = fill(&mut input, inbuf.as_mut(), config.input_length) {
            break err;
        }
        let produced = match process(inbuf.as_ref(), outbuf.as_mut()) {
            Ok(m) => m.min(outbuf.len()),
            Err(err) => break err,
        };
        if let Err(err) = output.write(outbuf.slice(0, produced)) {
            break err;
        }
    };

    tracing::debug!(%err, "transform stage stopped");
    output.close_with_error(err);
}
