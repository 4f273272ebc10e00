//! Pipes, buffered pipes and the ring buffer under concurrent use.

use std::thread;

use num_complex::Complex32;

use crate::io::read_full;
use crate::streaming::{BufPipeConfig, RingBuffer, RingBufferOptions, buf_pipe};
use crate::{IqError, Reader, SampleFormat, Samples, Writer, pipe};

#[test]
fn test_pipe_reconstructs_stream_in_order() {
    let marker = Complex32::new(20.0, 10.0);
    let (mut reader, mut writer) = pipe(1_000, SampleFormat::C64);

    let producer = thread::spawn(move || {
        for _ in 0..10 {
            let mut buf = Samples::new(SampleFormat::C64, 1024);
            buf.as_typed_mut::<Complex32>().unwrap()[10] = marker;
            writer.write(buf.as_ref()).unwrap();
        }
    });

    let mut out = Samples::new(SampleFormat::C64, 10 * 1024);
    assert_eq!(read_full(&mut reader, out.as_mut()).unwrap(), 10 * 1024);
    producer.join().unwrap();

    for (i, v) in out.as_typed::<Complex32>().unwrap().iter().enumerate() {
        if i % 1024 == 10 {
            assert_eq!(*v, marker, "index {i}");
        } else {
            assert_eq!(*v, Complex32::new(0.0, 0.0), "index {i}");
        }
    }
}

#[test]
fn test_pipe_reads_across_write_boundaries() {
    let (mut reader, mut writer) = pipe(1_000, SampleFormat::C64);
    let producer = thread::spawn(move || {
        for chunk in 0..4 {
            let buf = Samples::C64(vec![Complex32::new(chunk as f32, 0.0); 1024]);
            writer.write(buf.as_ref()).unwrap();
        }
    });

    // Reads of 700 never line up with the writes.
    let mut out = Samples::new(SampleFormat::C64, 4 * 1024);
    let mut got = 0;
    while got < out.len() {
        let end = (got + 700).min(out.len());
        got += reader.read(out.slice_mut(got, end)).unwrap();
    }
    producer.join().unwrap();

    for (i, v) in out.as_typed::<Complex32>().unwrap().iter().enumerate() {
        assert_eq!(v.re as usize, i / 1024);
    }
}

#[test]
fn test_close_unblocks_reader() {
    let (mut reader, writer) = pipe(1_000, SampleFormat::I8);
    let closer = writer.closer();
    let consumer = thread::spawn(move || {
        let mut buf = Samples::new(SampleFormat::I8, 8);
        reader.read(buf.as_mut())
    });
    closer.close_with_error(IqError::invalid_parameter("radio unplugged"));
    assert!(matches!(
        consumer.join().unwrap(),
        Err(IqError::InvalidParameter(_))
    ));
    drop(writer);
}

#[test]
fn test_ring_buffer_overrun_then_underrun() {
    let options = RingBufferOptions {
        slots: 4,
        slot_length: 1024,
        block_reads: false,
    };
    let ring = RingBuffer::new(1_000, SampleFormat::C64, options).unwrap();
    let mut writer = ring.clone();
    for v in 1..=4 {
        // Leading phasor `v`, trailing phasor `-v`, zeros between.
        let mut buf = Samples::new(SampleFormat::C64, 1024);
        let iq = buf.as_typed_mut::<Complex32>().unwrap();
        iq[0] = Complex32::new(v as f32, 0.0);
        iq[1023] = Complex32::new(-v as f32, 0.0);
        assert_eq!(writer.write(buf.as_ref()).unwrap(), 1024);
    }

    let mut reader = ring;
    let mut buf = Samples::new(SampleFormat::C64, 1024);
    for want in 2..=4 {
        assert_eq!(reader.read(buf.as_mut()).unwrap(), 1024);
        let iq = buf.as_typed::<Complex32>().unwrap();
        assert_eq!(iq[0], Complex32::new(want as f32, 0.0));
        assert_eq!(iq[1023], Complex32::new(-want as f32, 0.0));
        assert!(iq[1..1023].iter().all(|v| v.norm() == 0.0));
    }
    assert!(matches!(
        reader.read(buf.as_mut()),
        Err(IqError::BufferUnderrun)
    ));
    let stats = reader.stats();
    assert_eq!((stats.overruns, stats.underruns, stats.pending), (1, 1, 0));
}

#[test]
fn test_ring_buffer_keeps_short_slot_length() {
    let options = RingBufferOptions {
        slots: 4,
        slot_length: 1024,
        block_reads: false,
    };
    let mut ring = RingBuffer::new(1_000, SampleFormat::I16, options).unwrap();
    ring.write(Samples::I16(vec![[7, -7]; 1024]).as_ref()).unwrap();
    ring.write(Samples::I16(vec![[9, -9]; 100]).as_ref()).unwrap();

    let mut buf = Samples::new(SampleFormat::I16, 1024);
    assert_eq!(ring.read(buf.as_mut()).unwrap(), 1024);
    assert_eq!(ring.read(buf.as_mut()).unwrap(), 100);
    let iq = buf.as_typed::<[i16; 2]>().unwrap();
    assert!(iq[..100].iter().all(|v| *v == [9, -9]));
    // The rest of the caller's buffer still holds the previous slot.
    assert_eq!(iq[100], [7, -7]);
}

#[test]
fn test_ring_buffer_between_threads() {
    let options = RingBufferOptions {
        slots: 64,
        slot_length: 16,
        block_reads: true,
    };
    let ring = RingBuffer::new(1_000, SampleFormat::C64, options).unwrap();
    let producer_ring = ring.clone();
    let producer = thread::spawn(move || {
        for i in 0..32 {
            let chunk = Samples::C64(vec![Complex32::new(i as f32, 0.0); 16]);
            producer_ring.write_slot(chunk.as_ref()).unwrap();
        }
        producer_ring.close();
    });

    let mut buf = Samples::new(SampleFormat::C64, 16);
    let mut seen = Vec::new();
    loop {
        match ring.read_slot(buf.as_mut()) {
            Ok(n) => {
                assert_eq!(n, 16);
                seen.push(buf.as_typed::<Complex32>().unwrap()[0].re as i32);
            }
            Err(err) => {
                assert!(err.is_closed());
                break;
            }
        }
    }
    producer.join().unwrap();
    // The buffer never filled, so nothing was dropped, though the close may
    // cut the tail short.
    assert!(seen.windows(2).all(|w| w[1] == w[0] + 1));
    assert_eq!(ring.stats().overruns, 0);
}

#[test]
fn test_buffered_pipe_decouples_producer() {
    let config = BufPipeConfig {
        capacity: 8,
        blocking: false,
    };
    let (mut reader, mut writer) = buf_pipe(config, 1_000, SampleFormat::U8).unwrap();

    // All eight writes return before anything is read.
    for v in 0..8u8 {
        writer.write(Samples::U8(vec![[v, v]; 4]).as_ref()).unwrap();
    }
    writer.close();

    let mut out = Samples::new(SampleFormat::U8, 32);
    read_full(&mut reader, out.as_mut()).unwrap();
    let out = out.as_typed::<[u8; 2]>().unwrap();
    for (i, v) in out.iter().enumerate() {
        assert_eq!(v[0] as usize, i / 4);
    }
}
