use criterion::{criterion_group, criterion_main, Criterion};
use fhe_math::{
    rq::{Context, Poly, Representation},
    zq::primes::generate_primes,
};
use rand::thread_rng;
use std::sync::Arc;

pub fn rq_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("rq");
    group.sample_size(50);
    let mut rng = thread_rng();

    for degree in [1024usize, 4096] {
        let moduli = generate_primes(50, 2 * degree as u64, 1 << 50, 4).unwrap();
        let ctx = Arc::new(Context::new(&moduli, degree).unwrap());
        let p = Poly::random(&ctx, Representation::Ntt, &mut rng);
        let mut q = Poly::random(&ctx, Representation::Ntt, &mut rng);

        group.bench_function(format!("mul/{degree}/{}", moduli.len()), |b| {
            b.iter(|| q *= &p);
        });

        group.bench_function(format!("change_representation/{degree}/{}", moduli.len()), |b| {
            b.iter(|| {
                q.change_representation(Representation::PowerBasis);
                q.change_representation(Representation::Ntt);
            });
        });

        group.bench_function(format!("mod_switch_down_next/{degree}/{}", moduli.len()), |b| {
            let mut r = p.clone();
            r.change_representation(Representation::PowerBasis);
            b.iter(|| {
                let mut s = r.clone();
                s.mod_switch_down_next().unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(rq, rq_benchmark);
criterion_main!(rq);
