//! Generation of NTT-friendly primes.

use fhe_util::is_prime;

/// Returns the largest prime of exactly `num_bits` bits that is congruent to
/// 1 modulo `modulo` and strictly smaller than `upper_bound`.
///
/// Returns None if `num_bits` is not between 10 and 62, if `modulo` is zero,
/// or if no such prime exists.
pub fn generate_prime(num_bits: usize, modulo: u64, upper_bound: u64) -> Option<u64> {
    if !(10..=62).contains(&num_bits) || modulo == 0 {
        return None;
    }

    let lower = 1u64 << (num_bits - 1);
    let upper = upper_bound.min(1u64 << num_bits);
    if upper < lower + 2 {
        return None;
    }

    let mut candidate = ((upper - 2) / modulo) * modulo + 1;
    while candidate >= lower {
        if is_prime(candidate) {
            return Some(candidate);
        }
        candidate = candidate.checked_sub(modulo)?;
    }

    None
}

/// Generates `count` distinct primes of `num_bits` bits congruent to 1 modulo
/// `modulo`, in decreasing order, all strictly smaller than `upper_bound`.
pub fn generate_primes(
    num_bits: usize,
    modulo: u64,
    upper_bound: u64,
    count: usize,
) -> Option<Vec<u64>> {
    let mut primes = Vec::with_capacity(count);
    let mut bound = upper_bound;
    for _ in 0..count {
        let p = generate_prime(num_bits, modulo, bound)?;
        primes.push(p);
        bound = p;
    }
    Some(primes)
}

#[cfg(test)]
mod tests {
    use super::{generate_prime, generate_primes};
    use fhe_util::is_prime;

    #[test]
    fn prime_generation() {
        assert!(generate_prime(2, 2, 1 << 2).is_none());
        assert!(generate_prime(63, 2, 1 << 62).is_none());
        assert!(generate_prime(20, 0, 1 << 20).is_none());

        for n in [8, 1024, 2048] {
            let modulo = 2 * n as u64;
            for bits in [20, 40, 60, 62] {
                let p = generate_prime(bits, modulo, 1 << bits).unwrap();
                assert!(is_prime(p));
                assert_eq!(p % modulo, 1);
                assert_eq!(64 - p.leading_zeros() as usize, bits);

                let q = generate_prime(bits, modulo, p).unwrap();
                assert!(q < p);
                assert_eq!(q % modulo, 1);
            }
        }

        assert_eq!(generate_prime(60, 2048, 1 << 60), Some(1152921504606830593));
    }

    #[test]
    fn prime_chain() {
        let primes = generate_primes(40, 2048, 1 << 40, 8).unwrap();
        assert_eq!(primes.len(), 8);
        assert!(primes.windows(2).all(|w| w[0] > w[1]));
        assert!(primes.iter().all(|p| is_prime(*p) && p % 2048 == 1));
    }
}
