use crate::zq::Modulus;
use itertools::Itertools;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::iter::successors;

/// Number-Theoretic Transform operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NttOperator {
    p: Modulus,
    size: usize,
    omegas: Box<[u64]>,
    zetas_inv: Box<[u64]>,
    size_inv: u64,
}

impl NttOperator {
    /// Create an NTT operator given a modulus for a specific size.
    ///
    /// Aborts if the size is not a power of 2 that is >= 8.
    /// Returns None if the modulus does not support the NTT for this specific
    /// size.
    pub fn new(p: &Modulus, size: usize) -> Option<Self> {
        if !super::supports_ntt(p.p, size) {
            None
        } else {
            let size_inv = p.inv(size as u64)?;

            let omega = Self::primitive_root(size, p)?;
            let omega_inv = p.inv(omega)?;

            let powers = successors(Some(1u64), |n| Some(p.mul(*n, omega)))
                .take(size)
                .collect_vec();
            let powers_inv = successors(Some(omega_inv), |n| Some(p.mul(*n, omega_inv)))
                .take(size)
                .collect_vec();

            let mut omegas = Vec::with_capacity(size);
            let mut zetas_inv = Vec::with_capacity(size);
            for i in 0..size {
                let j = i.reverse_bits() >> (size.leading_zeros() + 1);
                omegas.push(powers[j]);
                zetas_inv.push(powers_inv[j]);
            }

            Some(Self {
                p: p.clone(),
                size,
                omegas: omegas.into_boxed_slice(),
                zetas_inv: zetas_inv.into_boxed_slice(),
                size_inv,
            })
        }
    }

    /// Compute the forward NTT in place.
    /// Aborts if a is not of the size handled by the operator.
    pub fn forward(&self, a: &mut [u64]) {
        assert_eq!(a.len(), self.size);

        let mut l = self.size >> 1;
        let mut m = 1;
        let mut k = 1;
        while l > 0 {
            for i in 0..m {
                let omega = self.omegas[k];
                k += 1;

                let s = 2 * i * l;
                for j in s..(s + l) {
                    self.butterfly(a, j, j + l, omega);
                }
            }
            l >>= 1;
            m <<= 1;
        }
    }

    /// Compute the backward NTT in place.
    /// Aborts if a is not of the size handled by the operator.
    pub fn backward(&self, a: &mut [u64]) {
        assert_eq!(a.len(), self.size);

        let mut k = 0;
        let mut m = self.size >> 1;
        let mut l = 1;
        while m > 0 {
            for i in 0..m {
                let zeta_inv = self.zetas_inv[k];
                k += 1;

                let s = 2 * i * l;
                for j in s..(s + l) {
                    self.inv_butterfly(a, j, j + l, zeta_inv);
                }
            }
            l <<= 1;
            m >>= 1;
        }

        a.iter_mut()
            .for_each(|ai| *ai = self.p.mul(*ai, self.size_inv));
    }

    /// NTT Butterfly.
    fn butterfly(&self, a: &mut [u64], x: usize, y: usize, w: u64) {
        let t = self.p.mul(a[y], w);
        a[y] = self.p.sub(a[x], t);
        a[x] = self.p.add(a[x], t);
    }

    /// Inverse NTT butterfly.
    fn inv_butterfly(&self, a: &mut [u64], x: usize, y: usize, z: u64) {
        let t = a[x];
        a[x] = self.p.add(a[y], t);
        a[y] = self.p.mul(self.p.sub(t, a[y]), z);
    }

    /// Returns a 2n-th primitive root modulo p.
    ///
    /// The search is seeded so that the same root is found for a given modulus
    /// and size.
    fn primitive_root(n: usize, p: &Modulus) -> Option<u64> {
        let lambda = (p.p - 1) / (2 * n as u64);

        let mut rng: ChaCha8Rng = SeedableRng::seed_from_u64(0);
        for _ in 0..100 {
            let mut root = rng.gen_range(0..p.p);
            root = p.pow(root, lambda);
            if Self::is_primitive_root(root, 2 * n, p) {
                return Some(root);
            }
        }

        None
    }

    /// Returns whether a is a n-th primitive root of unity, where n is a
    /// power of two.
    fn is_primitive_root(a: u64, n: usize, p: &Modulus) -> bool {
        (p.pow(a, n as u64) == 1) && (p.pow(a, (n / 2) as u64) != 1)
    }
}
