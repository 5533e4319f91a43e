#![crate_name = "fhe_util"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Utilities for the fhe.rs library.

use num_bigint_dig::{prime::probably_prime, BigUint};
use num_traits::ToPrimitive;
use rand::{CryptoRng, Rng, RngCore};
use rand_distr::{Distribution, Normal};

/// Returns whether the modulus p is prime; this function is 100% accurate.
pub fn is_prime(p: u64) -> bool {
    probably_prime(&BigUint::from(p), 0)
}

/// Sample a vector of independent centered binomial distributions of a given
/// variance. Returns an error if the variance is not between 1 and 16.
pub fn sample_vec_cbd<R: RngCore + CryptoRng>(
    vector_size: usize,
    variance: usize,
    rng: &mut R,
) -> Result<Vec<i64>, &'static str> {
    if !(1..=16).contains(&variance) {
        return Err("The variance should be between 1 and 16");
    }

    let mut out = Vec::with_capacity(vector_size);

    let number_bits = 4 * variance;
    let mask_add = (u64::MAX >> (64 - 2 * variance)) as u128;
    let mask_sub = mask_add << (2 * variance);

    let mut current_pool = 0u128;
    let mut current_pool_nbits = 0;

    for _ in 0..vector_size {
        if current_pool_nbits < number_bits {
            current_pool |= (rng.next_u64() as u128) << current_pool_nbits;
            current_pool_nbits += 64;
        }
        debug_assert!(current_pool_nbits >= number_bits);
        out.push(
            ((current_pool & mask_add).count_ones() as i64)
                - ((current_pool & mask_sub).count_ones() as i64),
        );
        current_pool >>= number_bits;
        current_pool_nbits -= number_bits;
    }

    Ok(out)
}

/// Sample a vector of coefficients uniformly in {-1, 0, 1}.
pub fn sample_vec_ternary<R: RngCore + CryptoRng>(vector_size: usize, rng: &mut R) -> Vec<i64> {
    (0..vector_size).map(|_| rng.gen_range(-1i64..=1)).collect()
}

/// Sample a vector of rounded normal values of standard deviation `std_dev`.
///
/// Returns an error if the standard deviation is not a positive finite number.
pub fn sample_vec_normal<R: RngCore + CryptoRng>(
    vector_size: usize,
    std_dev: f64,
    rng: &mut R,
) -> Result<Vec<i64>, &'static str> {
    if !std_dev.is_finite() || std_dev <= 0.0 {
        return Err("The standard deviation should be a positive number");
    }
    let normal = Normal::new(0.0, std_dev).map_err(|_| "Invalid normal distribution")?;
    Ok((0..vector_size)
        .map(|_| normal.sample(rng).round() as i64)
        .collect())
}

/// Sample a vector of integers uniformly in [0, bound).
///
/// Returns an error if the bound is 0.
pub fn sample_vec_uniform<R: RngCore + CryptoRng>(
    vector_size: usize,
    bound: u64,
    rng: &mut R,
) -> Result<Vec<u64>, &'static str> {
    if bound == 0 {
        return Err("The bound should be positive");
    }
    Ok((0..vector_size).map(|_| rng.gen_range(0..bound)).collect())
}

/// Compute the sample variance of a list of values.
///
/// Returns 0 when fewer than two values are provided.
pub fn variance<T: ToPrimitive>(values: &[T]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let values = values
        .iter()
        .filter_map(|v| v.to_f64())
        .collect::<Vec<_>>();
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0)
}
