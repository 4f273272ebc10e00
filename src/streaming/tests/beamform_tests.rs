//! Steering an array of coherent streams.

use num_complex::Complex32;

use super::{SliceReader, cw};
use crate::io::read_full;
use crate::streaming::{Beamform, angles, angles_2d};
use crate::{BoxReader, Reader, SampleFormat, Samples};

#[test]
fn test_zero_baseline_is_unit() {
    let rotations = angles_2d(900e6, 0.0, [3.0, 4.0], &[[3.0, 4.0], [3.0, 4.0]]);
    assert_eq!(rotations, vec![Complex32::new(1.0, 0.0); 2]);
}

#[test]
fn test_steering_towards_source_adds_coherently() {
    // The second element sits half a wavelength off axis and sees the
    // carrier half a turn late; its factor of -1 lines it back up.
    let freq = 299.792e6;
    let tone = cw(10.0, 1_000, 512);
    let delayed: Vec<Complex32> = tone.iter().map(|v| -*v).collect();
    let readers: Vec<BoxReader> = vec![
        Box::new(SliceReader::new(Samples::C64(tone.clone()), 1_000)),
        Box::new(SliceReader::new(Samples::C64(delayed), 1_000)),
    ];

    let factors = angles_2d(freq, 0.0, [0.0, 0.0], &[[0.0, 0.0], [0.0, 0.5]]);
    let mut beam = Beamform::new(readers, &factors).unwrap();
    assert_eq!(beam.sample_rate(), 1_000);

    let mut out = Samples::new(SampleFormat::C64, 512);
    read_full(&mut beam, out.as_mut()).unwrap();
    for (got, want) in out.as_typed::<Complex32>().unwrap().iter().zip(&tone) {
        assert!((got - want * 2.0).norm() < 1e-2, "{got} vs {want}");
    }
}

#[test]
fn test_linear_array_matches_planar() {
    let linear = angles(2.4e9, 25.0, &[0.0, 0.0625, 0.125]);
    let planar = angles_2d(2.4e9, 25.0, [0.0, 0.0], &[[0.0, 0.0], [0.0625, 0.0], [0.125, 0.0]]);
    assert_eq!(linear, planar);
}
