//! Reader throughput benchmarks
//!
//! Measures pull-reading a synthetic transformation's output with varying:
//! - Output sizes (100, 1 000, 10 000 elements)
//! - Scheduling modes (single-threaded fully buffered, multi-threaded ring)
//! - Ring sizes (32, 256, 2048) in multi-threaded mode
//!
//! Run benchmarks: `cargo bench --bench reader_throughput`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use xslpull::{
    EventWrite, ReaderSettings, Transform, TransformArgs, TransformError, XmlInput, XslReader,
};

/// An engine that fabricates `count` small records, no parsing involved.
struct SyntheticTransform {
    count: usize,
}

impl Transform for SyntheticTransform {
    fn transform(
        &self,
        _input: XmlInput,
        _args: &TransformArgs,
        output: &mut dyn EventWrite,
    ) -> Result<(), TransformError> {
        output.start_element("", "records", "")?;
        for i in 0..self.count {
            output.start_element("", "record", "")?;
            output.start_attribute("", "id", "")?;
            output.write_string(&i.to_string())?;
            output.end_attribute()?;
            output.write_string("payload")?;
            output.end_element()?;
        }
        output.end_element()?;
        Ok(())
    }
}

fn drain(reader: &mut XslReader) -> usize {
    let mut nodes = 0;
    while reader.read().unwrap() {
        nodes += 1;
    }
    nodes
}

fn bench_scheduling_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduling_mode");
    for count in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("single_thread", count), &count, |b, &count| {
            b.iter(|| {
                let mut reader = XslReader::with_settings(
                    SyntheticTransform { count },
                    ReaderSettings {
                        multi_thread: false,
                        ..ReaderSettings::default()
                    },
                );
                reader.start_transform("", TransformArgs::new()).unwrap();
                drain(&mut reader)
            });
        });
        group.bench_with_input(BenchmarkId::new("multi_thread", count), &count, |b, &count| {
            b.iter(|| {
                let mut reader =
                    XslReader::with_settings(SyntheticTransform { count }, ReaderSettings::default());
                reader.start_transform("", TransformArgs::new()).unwrap();
                drain(&mut reader)
            });
        });
    }
    group.finish();
}

fn bench_ring_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_size");
    let count = 10_000usize;
    group.throughput(Throughput::Elements(count as u64));
    for ring in [32usize, 256, 2_048] {
        group.bench_with_input(BenchmarkId::from_parameter(ring), &ring, |b, &ring| {
            b.iter(|| {
                let mut reader = XslReader::with_settings(
                    SyntheticTransform { count },
                    ReaderSettings {
                        multi_thread: true,
                        initial_buffer_size: ring,
                    },
                );
                reader.start_transform("", TransformArgs::new()).unwrap();
                drain(&mut reader)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scheduling_modes, bench_ring_sizes);
criterion_main!(benches);
