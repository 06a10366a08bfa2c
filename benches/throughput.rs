use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use codec_stream::{BufferLength, Converter, FilterOptions, Format, WriteSink};
use std::io;
use std::time::Duration;

fn create_test_data(n: usize) -> Vec<u8> {
    // Mostly repetitive, with a counter so blocks differ.
    let mut data = Vec::with_capacity(n + 16);
    let mut i = 0u64;
    while data.len() < n {
        data.extend_from_slice(b"sensor reading ");
        data.extend_from_slice(&i.to_le_bytes());
        i += 1;
    }
    data.truncate(n);
    data
}

fn bench_encode(c: &mut Criterion) {
    let data = create_test_data(4 * 1024 * 1024);
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.measurement_time(Duration::from_secs(10));

    for format in Format::all() {
        for length in [BufferLength::Auto, BufferLength::Bytes(4096)] {
            let options = FilterOptions::new()
                .input_buffer_length(length)
                .output_buffer_length(length);
            let converter = Converter::with_options(format.encoder(), options).unwrap();
            group.bench_with_input(
                BenchmarkId::new(format.name(), format!("{length:?}")),
                &data,
                |b, data| {
                    b.iter(|| {
                        let mut sink = converter.start_chunked(WriteSink::new(io::sink())).unwrap();
                        for chunk in data.chunks(64 * 1024) {
                            sink.add(chunk).unwrap();
                        }
                        sink.close().unwrap();
                        sink.get_ref().position()
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let data = create_test_data(4 * 1024 * 1024);
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.measurement_time(Duration::from_secs(10));

    for format in Format::all() {
        let encoded = Converter::new(format.encoder()).convert(&data).unwrap();
        let converter = Converter::new(format.decoder());
        group.bench_with_input(
            BenchmarkId::from_parameter(format.name()),
            &encoded,
            |b, encoded| b.iter(|| converter.convert(encoded).unwrap().len()),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
