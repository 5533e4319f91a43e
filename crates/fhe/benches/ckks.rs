use criterion::{criterion_group, criterion_main, Criterion};
use fhe::ckks::{
    eval_sum, mul, Ciphertext, CkksParametersBuilder, Encoding, EvaluationKey, Plaintext,
    SecretKey,
};
use fhe::mckks::{DecryptionShare, EvaluationKeyCrp, EvaluationKeyShare, RelinearizationKeyShare};
use fhe_traits::{FheEncoder, FheEncrypter};
use rand::thread_rng;
use std::time::Duration;

pub fn ckks_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("ckks");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));
    let mut rng = thread_rng();

    for degree in [1024usize, 4096] {
        let par = CkksParametersBuilder::new()
            .set_degree(degree)
            .set_multiplicative_depth(4)
            .build_arc()
            .unwrap();
        let sk = SecretKey::random(&par, &mut rng);
        let ek = EvaluationKey::new(&sk, &mut rng).unwrap();
        let values = (0..par.slots()).map(|i| i as f64).collect::<Vec<_>>();
        let pt = Plaintext::try_encode(&values, Encoding::new(), &par).unwrap();
        let ct: Ciphertext = sk.try_encrypt(&pt, &mut rng).unwrap();

        group.bench_function(format!("mul/{degree}"), |b| {
            b.iter(|| mul(&ct, &ct, &ek).unwrap());
        });

        group.bench_function(format!("eval_sum/{degree}"), |b| {
            b.iter(|| eval_sum(&ct, &ek).unwrap());
        });

        group.bench_function(format!("decryption_share/{degree}"), |b| {
            b.iter(|| DecryptionShare::new_main(&sk, &ct, &mut rng).unwrap());
        });

        let crp = EvaluationKeyCrp::new(&par, &mut rng).unwrap();
        let joint = EvaluationKeyShare::new(&sk, &crp, &mut rng).unwrap();
        group.bench_function(format!("relinearization_key_share/{degree}"), |b| {
            b.iter(|| RelinearizationKeyShare::new(&sk, &joint, &mut rng).unwrap());
        });
    }

    group.finish();
}

criterion_group!(ckks, ckks_benchmark);
criterion_main!(ckks);
