use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use qrstream::RingBuffer;

// Bounded histories evict on every push once full
fn bench_push_evicting(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer_push");

    for capacity in [5, 72, 721].iter() {
        group.throughput(Throughput::Elements(1024));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("capacity_{}", capacity)),
            capacity,
            |b, &capacity| {
                let mut buffer: RingBuffer<f64> = RingBuffer::new(capacity);

                b.iter(|| {
                    for i in 0..1024 {
                        black_box(buffer.push(black_box(i as f64)));
                    }
                });
            },
        );
    }

    group.finish();
}

// Window sums are recomputed from the buffer on every sample
fn bench_iter_sum(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer_iter_sum");

    for capacity in [30, 43, 120].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("window_{}", capacity)),
            capacity,
            |b, &capacity| {
                let mut buffer: RingBuffer<f64> = RingBuffer::new(capacity);
                for i in 0..capacity {
                    buffer.push(i as f64);
                }

                b.iter(|| black_box(buffer.iter().sum::<f64>()));
            },
        );
    }

    group.finish();
}

fn bench_candidate_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer_candidate_search");

    let mut buffer: RingBuffer<(usize, f64)> = RingBuffer::new(501);
    for i in 0..501 {
        buffer.push((i * 2, (i % 17) as f64));
    }

    group.bench_function("max_by_value", |b| {
        b.iter(|| {
            black_box(
                buffer
                    .iter()
                    .filter(|&(i, _)| i > black_box(100))
                    .fold(None, |best: Option<(usize, f64)>, c| match best {
                        Some((_, v)) if v >= c.1 => best,
                        _ => Some(c),
                    }),
            )
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_push_evicting,
    bench_iter_sum,
    bench_candidate_search
);
criterion_main!(benches);
