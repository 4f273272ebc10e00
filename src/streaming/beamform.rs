//! Phased-array beam steering.
//!
//! Each antenna stream is rotated by a per-element phase factor and the
//! rotated streams are summed. The factors come from the array geometry, the
//! steering angle and the carrier wavelength; [`angles_2d`] computes them for
//! antennas on a plane and [`angles`] for a straight line.

use num_complex::Complex32;

use crate::streaming::{Multiplier, add, convert_reader, multiply};
use crate::{BoxReader, IqError, IqResult, Reader, SampleFormat, SamplesMut};

/// Speed of light in metres per second.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Wavelength in metres of a carrier at `frequency_hz`.
pub fn wavelength(frequency_hz: f64) -> f64 {
    SPEED_OF_LIGHT / frequency_hz
}

/// Phase factors steering a planar array towards `angle_deg`.
///
/// `frequency_hz` is the RF carrier (not an intermediate frequency), `center`
/// the reference point and `antennas` the element positions, all in metres.
/// An antenna sitting on the reference point gets exactly `1 + 0i`.
pub fn angles_2d(
    frequency_hz: f64,
    angle_deg: f64,
    center: [f64; 2],
    antennas: &[[f64; 2]],
) -> Vec<Complex32> {
    let lambda = wavelength(frequency_hz);
    let steer = angle_deg.to_radians();
    antennas
        .iter()
        .map(|antenna| {
            let (dx, dy) = (antenna[0] - center[0], antenna[1] - center[1]);
            let distance = dx.hypot(dy);
            if distance == 0.0 {
                return Complex32::new(1.0, 0.0);
            }
            // Bearing of the element from the reference point, then the path
            // difference along the steered direction.
            let bearing = (dy / distance).asin();
            let path = (bearing + steer).sin() * distance;
            let phase = std::f64::consts::TAU * path / lambda;
            Complex32::new(phase.cos() as f32, -phase.sin() as f32)
        })
        .collect()
}

/// Phase factors for a linear array with elements at `distances` metres
/// along one axis. The first element is the reference.
pub fn angles(frequency_hz: f64, angle_deg: f64, distances: &[f64]) -> Vec<Complex32> {
    let Some(&first) = distances.first() else {
        return Vec::new();
    };
    let antennas: Vec<[f64; 2]> = distances.iter().map(|d| [*d, 0.0]).collect();
    angles_2d(frequency_hz, angle_deg, [first, 0.0], &antennas)
}

/// Combined reader of a steerable antenna array.
pub struct Beamform {
    output: BoxReader,
    multipliers: Vec<Multiplier>,
}

impl Beamform {
    /// Steer coherent `readers` with one phase factor each.
    ///
    /// Streams are converted to [`SampleFormat::C64`] as needed.
    ///
    /// # Errors
    /// - [`IqError::InvalidParameter`] if `angles` and `readers` differ in
    ///   length, or for an empty or mismatched-rate array.
    /// - Errors from building the conversion stages.
    pub fn new(readers: Vec<BoxReader>, angles: &[Complex32]) -> IqResult<Self> {
        if readers.len() != angles.len() {
            return Err(IqError::invalid_parameter(format!(
                "{} phase angles for {} readers",
                angles.len(),
                readers.len()
            )));
        }
        let mut multipliers = Vec::with_capacity(readers.len());
        let mut rotated: Vec<BoxReader> = Vec::with_capacity(readers.len());
        for (reader, angle) in readers.into_iter().zip(angles) {
            let reader: BoxReader = if reader.sample_format() == SampleFormat::C64 {
                reader
            } else {
                Box::new(convert_reader(reader, SampleFormat::C64)?)
            };
            let stage = multiply(reader, *angle)?;
            multipliers.push(stage.multiplier());
            rotated.push(Box::new(stage));
        }
        Ok(Self {
            output: add(rotated)?,
            multipliers,
        })
    }

    /// Re-steer the array.
    ///
    /// # Errors
    /// [`IqError::InvalidParameter`] unless there is one angle per reader.
    pub fn set_phase_angles(&self, angles: &[Complex32]) -> IqResult<()> {
        if angles.len() != self.multipliers.len() {
            return Err(IqError::invalid_parameter(format!(
                "{} phase angles for {} readers",
                angles.len(),
                self.multipliers.len()
            )));
        }
        for (multiplier, angle) in self.multipliers.iter().zip(angles) {
            multiplier.set(*angle)?;
        }
        Ok(())
    }

    /// The phase factors currently applied.
    pub fn phase_angles(&self) -> Vec<Complex32> {
        self.multipliers.iter().map(Multiplier::get).collect()
    }
}

impl Reader for Beamform {
    fn read(&mut self, buf: SamplesMut<'_>) -> IqResult<usize> {
        self.output.read(buf)
    }

    fn sample_format(&self) -> SampleFormat {
        SampleFormat::C64
    }

    fn sample_rate(&self) -> u32 {
        self.output.sample_rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Samples;
    use crate::io::{DEFAULT_BUFFER_LENGTH, read_full};
    use crate::streaming::tests::{SliceReader, cw};
    use approx_eq::assert_approx_eq;

    /// Roughly a one metre wavelength.
    const ONE_METRE: f64 = 299.792e6;

    #[test]
    fn test_broadside_is_unit() {
        let rotations = angles(900e6, 0.0, &[0.0, 1.0]);
        for r in rotations {
            assert_approx_eq!(r.re as f64, 1.0, 1e-6);
            assert!(r.im.abs() < 1e-6);
        }
    }

    #[test]
    fn test_half_wavelength_is_opposite() {
        let rotations = angles_2d(ONE_METRE, 0.0, [0.0, 0.0], &[[0.0, 0.0], [0.0, 0.5]]);
        assert_eq!(rotations[0], Complex32::new(1.0, 0.0));
        assert_approx_eq!(rotations[1].re as f64, -1.0, 1e-3);
        assert!(rotations[1].im.abs() < 1e-3);

        let quarter = angles_2d(ONE_METRE, 0.0, [0.0, 0.0], &[[0.0, 0.75]]);
        // 270 degrees of path, conjugated.
        assert_approx_eq!(quarter[0].im as f64, 1.0, 1e-3);
    }

    #[test]
    fn test_steered_phase() {
        // 10 cm wavelength, 15 cm spacing, 40 degrees: 347.1 degrees of lag.
        let rotations = angles(2.997925e9, 40.0, &[0.0, 0.15]);
        let lag = (-rotations[1].arg() as f64).rem_euclid(std::f64::consts::TAU);
        assert_approx_eq!(lag.to_degrees(), 347.1, 1e-3);
    }

    #[test]
    fn test_empty_array() {
        assert!(angles(900e6, 0.0, &[]).is_empty());
        assert!(angles_2d(900e6, 0.0, [0.0, 10.0], &[]).is_empty());
    }

    fn tone() -> BoxReader {
        Box::new(SliceReader::new(Samples::C64(cw(50.0, 1_000, 256)), 1_000))
    }

    #[test]
    fn test_opposite_phases_cancel() {
        let one = Complex32::new(1.0, 0.0);
        let mut beam = Beamform::new(vec![tone(), tone()], &[one, -one]).unwrap();
        let mut out = Samples::new(SampleFormat::C64, 256);
        read_full(&mut beam, out.as_mut()).unwrap();
        assert!(out.as_typed::<Complex32>().unwrap().iter().all(|v| v.norm() < 1e-6));
    }

    #[test]
    fn test_resteer_and_integer_inputs() {
        // Integer inputs are widened in whole chunks.
        let len = DEFAULT_BUFFER_LENGTH;
        let a: BoxReader = Box::new(SliceReader::new(Samples::I16(vec![[16_384, 0]; len]), 1_000));
        let b: BoxReader = Box::new(SliceReader::new(Samples::I16(vec![[16_384, 0]; len]), 1_000));
        let one = Complex32::new(1.0, 0.0);
        let beam = Beamform::new(vec![a, b], &[one, -one]).unwrap();
        assert_eq!(beam.sample_format(), SampleFormat::C64);

        assert!(beam.set_phase_angles(&[one]).is_err());
        beam.set_phase_angles(&[one, one]).unwrap();
        assert_eq!(beam.phase_angles(), vec![one, one]);

        let mut beam = beam;
        let mut out = Samples::new(SampleFormat::C64, 8);
        read_full(&mut beam, out.as_mut()).unwrap();
        for v in out.as_typed::<Complex32>().unwrap() {
            assert_approx_eq!(v.re as f64, 1.0, 1e-3);
        }
    }

    #[test]
    fn test_angle_count_must_match() {
        assert!(Beamform::new(vec![tone(), tone()], &[Complex32::new(1.0, 0.0)]).is_err());
    }
}
