use criterion::{criterion_group, criterion_main, Criterion};
use fhe_math::{
    ntt::NttOperator,
    zq::{primes::generate_prime, Modulus},
};
use rand::thread_rng;

pub fn ntt_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("ntt");
    group.sample_size(50);
    let mut rng = thread_rng();

    for vector_size in [1024usize, 4096] {
        for bits in [40usize, 60] {
            let p = generate_prime(bits, 2 * vector_size as u64, 1 << bits).unwrap();
            let q = Modulus::new(p).unwrap();
            let op = NttOperator::new(&q, vector_size).unwrap();
            let mut a = q.random_vec(vector_size, &mut rng);

            group.bench_function(format!("forward/{vector_size}/{bits}"), |b| {
                b.iter(|| op.forward(&mut a));
            });

            group.bench_function(format!("backward/{vector_size}/{bits}"), |b| {
                b.iter(|| op.backward(&mut a));
            });
        }
    }

    group.finish();
}

criterion_group!(ntt, ntt_benchmark);
criterion_main!(ntt);
