//! Real-time pacing.
//!
//! Recorded streams can be read far faster than they were captured. A
//! throttled reader releases one window of phasors per clock tick, so a
//! second of phasors takes a second of wall time to come out.

use std::time::Duration;

use crossbeam::channel;

use crate::conversions::copy;
use crate::streaming::{TransformConfig, read_transformer};
use crate::{IqResult, PipeReader, Reader};

/// Windows released per period.
const WINDOWS_PER_PERIOD: u32 = 20;

/// Pace `input` to its declared sample rate.
///
/// # Errors
/// As [`throttle_with_period`].
pub fn throttle<R: Reader + 'static>(input: R) -> IqResult<PipeReader> {
    throttle_with_period(input, Duration::from_secs(1))
}

/// Pace `input` so that one second of phasors is released every `period`.
///
/// A period shorter than a second plays the stream back faster than real
/// time; a longer one slows it down.
///
/// # Errors
/// Errors from [`read_transformer`].
pub fn throttle_with_period<R: Reader + 'static>(input: R, period: Duration) -> IqResult<PipeReader> {
    let window = (input.sample_rate() / WINDOWS_PER_PERIOD).max(1) as usize;
    let clock = channel::tick(period / WINDOWS_PER_PERIOD);
    tracing::trace!(window, ?period, "throttling stream");

    let config = TransformConfig {
        input_length: window,
        output_length: window,
        ..TransformConfig::passthrough(&input)
    };
    read_transformer(input, config, move |src, dst| {
        // The ticker never disconnects while `clock` is alive.
        let _ = clock.recv();
        copy(dst, src)
    })
}
