//! The surface radio drivers implement.
//!
//! Drivers live outside this crate. They describe themselves with
//! [`HardwareInfo`] and hand out phasor streams through [`Receiver`] and
//! [`Transmitter`]; everything downstream only sees [`Reader`](crate::Reader)
//! and [`Writer`](crate::Writer).

use serde::{Deserialize, Serialize};

use crate::{BoxReadCloser, IqResult, SampleFormat, WriteCloser};

/// Identification of a connected radio.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareInfo {
    /// Person, company or group that built the radio.
    pub manufacturer: String,
    /// Product name.
    pub product: String,
    /// Identifier unique to this unit.
    pub serial: String,
}

/// Controls common to every radio.
pub trait Sdr: Send {
    /// Tune to `hz`.
    fn set_center_frequency(&mut self, hz: f64) -> IqResult<()>;

    /// Currently tuned frequency in Hz.
    fn center_frequency(&self) -> IqResult<f64>;

    /// Request `rate` phasors per second.
    fn set_sample_rate(&mut self, rate: u32) -> IqResult<()>;

    /// Configured phasors per second.
    fn sample_rate(&self) -> IqResult<u32>;

    /// Native phasor format of the device.
    fn sample_format(&self) -> SampleFormat;

    /// Identification of the device.
    fn hardware_info(&self) -> HardwareInfo;

    /// Release the device.
    fn close(&mut self) -> IqResult<()>;
}

/// A radio that can receive.
pub trait Receiver: Sdr {
    /// Begin streaming received phasors. The caller must keep reading, or the
    /// driver will start dropping data.
    fn start_rx(&mut self) -> IqResult<BoxReadCloser>;
}

/// A radio that can transmit.
pub trait Transmitter: Sdr {
    /// Begin transmitting whatever is written, which must arrive at the
    /// configured sample rate.
    fn start_tx(&mut self) -> IqResult<Box<dyn WriteCloser>>;
}
