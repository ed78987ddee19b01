//! madflow 性能基准测试.
//!
//! 覆盖采样缩放与整条解码管线.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use madflow::codec::{OutputFormat, SampleScaler};
use madflow::core::{Endian, SampleWidth};
use madflow::format::io::{IoContext, MemoryBackend};
use madflow::format::sinks::raw::RawPcmSink;
use madflow::format::BufferedSource;
use madflow::pipeline::{PipelineConfig, decode_mp3};

/// 生成一帧 28 位定点正弦采样
fn make_fixed_samples(n: usize) -> Vec<i32> {
    (0..n)
        .map(|i| {
            let t = i as f64 / 44100.0;
            ((t * 440.0 * 2.0 * std::f64::consts::PI).sin() * f64::from(1 << 28)) as i32
        })
        .collect()
}

fn bench_scale_fixed(c: &mut Criterion) {
    let samples = make_fixed_samples(1152);
    for (name, width, endian) in [
        ("scale_fixed_1152_s16le", SampleWidth::S16, Endian::Little),
        ("scale_fixed_1152_s24be", SampleWidth::S24, Endian::Big),
    ] {
        let scaler = SampleScaler::new(OutputFormat::new(width, endian));
        let bps = width.bytes_per_sample();
        let mut out = vec![0u8; samples.len() * bps];
        c.bench_function(name, |b| {
            b.iter(|| {
                for (i, &s) in samples.iter().enumerate() {
                    scaler.write_sample(&mut out[i * bps..], scaler.scale_fixed(black_box(s)));
                }
                black_box(&out);
            });
        });
    }
}

fn bench_decode_silence(c: &mut Criterion) {
    let mut data = Vec::new();
    for _ in 0..100 {
        let mut frame = vec![0u8; 417];
        frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x04]);
        data.extend(frame);
    }
    c.bench_function("decode_100_frames_to_s16", |b| {
        b.iter(|| {
            let mut source = BufferedSource::new(Box::new(MemoryBackend::from_data(data.clone())));
            let mut sink = RawPcmSink::new(IoContext::new(Box::new(MemoryBackend::new())));
            let report = decode_mp3(&mut source, &mut sink, &PipelineConfig::default());
            black_box(report.map(|r| r.frames_written).unwrap_or(0));
        });
    });
}

criterion_group!(benches, bench_scale_fixed, bench_decode_silence);
criterion_main!(benches);
