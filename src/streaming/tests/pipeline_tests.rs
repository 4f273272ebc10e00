//! Chained stages and format checks across stage boundaries.

use num_complex::Complex32;

use super::{SliceReader, VecWriter, cw};
use crate::io::{DEFAULT_BUFFER_LENGTH, copy_stream, read_full};
use crate::streaming::{
    ConvertWriter, add, convert_reader, decimate_reader, downsample_reader, gain, multiply,
    shift_reader,
};
use crate::{BoxReader, IqError, Reader, SampleFormat, Samples, Writer};

#[test]
fn test_decimation_keeps_phase() {
    // Decimating by ten reads chunks of 32,760 phasors.
    let data: Vec<Complex32> = (0..32_760)
        .map(|i| Complex32::new((i % 10) as f32, 0.0))
        .collect();
    let input = SliceReader::new(Samples::C64(data), 8_000);
    let mut reader = decimate_reader(input, 10).unwrap();
    assert_eq!(reader.sample_rate(), 800);

    let mut out = Samples::new(SampleFormat::C64, 3_276);
    read_full(&mut reader, out.as_mut()).unwrap();
    assert!(
        out.as_typed::<Complex32>()
            .unwrap()
            .iter()
            .all(|v| *v == Complex32::new(0.0, 0.0))
    );
    assert!(matches!(
        reader.read(out.as_mut()),
        Err(IqError::EndOfStream)
    ));
}

#[test]
fn test_integer_radio_to_baseband_chain() {
    // An 8-bit capture of a carrier 2 kHz above center: widen, shift to DC,
    // attenuate, then average down.
    let tone = cw(2_000.0, 64_000, DEFAULT_BUFFER_LENGTH);
    let raw = crate::conversions::convert_to(Samples::C64(tone).as_ref(), SampleFormat::I8).unwrap();

    let input = SliceReader::new(raw, 64_000);
    let wide = convert_reader(input, SampleFormat::C64).unwrap();
    let baseband = shift_reader(wide, 2_000.0).unwrap();
    let quiet = gain(baseband, 0.5);
    let mut reader = downsample_reader(quiet, 16).unwrap();
    assert_eq!(reader.sample_rate(), 4_000);
    assert_eq!(reader.sample_format(), SampleFormat::C64);

    let mut out = Samples::new(SampleFormat::C64, 400);
    read_full(&mut reader, out.as_mut()).unwrap();
    for v in out.as_typed::<Complex32>().unwrap() {
        assert!((v - Complex32::new(0.5, 0.0)).norm() < 0.02, "{v}");
    }
}

#[test]
fn test_add_after_rotation() {
    let make = || -> BoxReader {
        Box::new(SliceReader::new(Samples::C64(cw(5.0, 100, 100)), 100))
    };
    let rotated: BoxReader = Box::new(multiply(make(), Complex32::new(0.0, 1.0)).unwrap());
    let mut sum = add(vec![make(), rotated]).unwrap();

    let mut out = Samples::new(SampleFormat::C64, 100);
    read_full(&mut sum, out.as_mut()).unwrap();
    let want = Complex32::new(1.0, 1.0);
    for (got, tone) in out.as_typed::<Complex32>().unwrap().iter().zip(cw(5.0, 100, 100)) {
        assert!((got - tone * want).norm() < 1e-5);
    }
}

#[test]
fn test_convert_writer_feeds_integer_sink() {
    let mut src = SliceReader::new(Samples::C64(vec![Complex32::new(0.5, -0.5); 100]), 1_000);
    let mut dst = ConvertWriter::new(VecWriter::new(SampleFormat::I16, 1_000), SampleFormat::C64);
    assert_eq!(copy_stream(&mut dst, &mut src).unwrap(), 100);

    let sink = dst.into_inner();
    assert_eq!(sink.samples, Samples::I16(vec![[16_384, -16_384]; 100]));
}

#[test]
fn test_format_mismatch_between_stages() {
    let mut reader = convert_reader(
        SliceReader::new(Samples::new(SampleFormat::U8, DEFAULT_BUFFER_LENGTH), 1_000),
        SampleFormat::I16,
    )
    .unwrap();
    let mut wrong = Samples::new(SampleFormat::U8, 16);
    assert!(matches!(
        reader.read(wrong.as_mut()),
        Err(IqError::FormatMismatch {
            expected: SampleFormat::I16,
            actual: SampleFormat::U8,
        })
    ));

    let mut sink = VecWriter::new(SampleFormat::C64, 1_000);
    assert!(matches!(
        sink.write(Samples::new(SampleFormat::I8, 1).as_ref()),
        Err(IqError::FormatMismatch { .. })
    ));

    let mut src = SliceReader::new(Samples::new(SampleFormat::I8, 4), 1_000);
    assert!(matches!(
        copy_stream(&mut sink, &mut src),
        Err(IqError::FormatMismatch { .. })
    ));
}
