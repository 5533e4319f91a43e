//! Ring operations for moduli up to 62 bits.

pub mod primes;

use crate::{Error, Result};
use rand::{distributions::Uniform, CryptoRng, Rng, RngCore};

/// Structure encapsulating an integer modulus up to 62 bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modulus {
    pub(crate) p: u64,
}

impl Modulus {
    /// Create a modulus from an integer of at most 62 bits.
    pub fn new(p: u64) -> Result<Self> {
        if p < 2 || (p >> 62) != 0 {
            Err(Error::InvalidModulus(p))
        } else {
            Ok(Self { p })
        }
    }

    /// Returns the value of the modulus.
    pub const fn modulus(&self) -> u64 {
        self.p
    }

    /// Modular addition of a and b.
    ///
    /// Aborts if a >= p or b >= p in debug mode.
    pub const fn add(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1(a + b, self.p)
    }

    /// Modular subtraction of a and b.
    ///
    /// Aborts if a >= p or b >= p in debug mode.
    pub const fn sub(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1(a + self.p - b, self.p)
    }

    /// Modular negation of a.
    ///
    /// Aborts if a >= p in debug mode.
    pub const fn neg(&self, a: u64) -> u64 {
        debug_assert!(a < self.p);
        Self::reduce1(self.p - a, self.p)
    }

    /// Modular multiplication of a and b.
    ///
    /// Aborts if a >= p or b >= p in debug mode.
    pub const fn mul(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        self.reduce_u128((a as u128) * (b as u128))
    }

    /// Reduce a modulo p.
    pub const fn reduce(&self, a: u64) -> u64 {
        a % self.p
    }

    /// Reduce a 128-bit integer modulo p.
    pub const fn reduce_u128(&self, a: u128) -> u64 {
        (a % (self.p as u128)) as u64
    }

    /// Reduce a signed integer modulo p, in [0, p).
    pub const fn reduce_i64(&self, a: i64) -> u64 {
        a.rem_euclid(self.p as i64) as u64
    }

    /// Returns the representative of a in (-p/2, p/2].
    ///
    /// Aborts if a >= p in debug mode.
    pub const fn center(&self, a: u64) -> i64 {
        debug_assert!(a < self.p);
        if a > self.p >> 1 {
            a as i64 - self.p as i64
        } else {
            a as i64
        }
    }

    /// Modular exponentiation of a to the power n.
    ///
    /// Aborts if a >= p in debug mode.
    pub fn pow(&self, a: u64, n: u64) -> u64 {
        debug_assert!(a < self.p);
        let mut result = 1 % self.p;
        let mut base = a;
        let mut exponent = n;
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = self.mul(result, base);
            }
            base = self.mul(base, base);
            exponent >>= 1;
        }
        result
    }

    /// Modular inversion of a; returns None if a is not invertible.
    ///
    /// The modulus must be prime.
    pub fn inv(&self, a: u64) -> Option<u64> {
        let a = self.reduce(a);
        if a == 0 {
            None
        } else {
            let r = self.pow(a, self.p - 2);
            debug_assert_eq!(self.mul(a, r), 1);
            Some(r)
        }
    }

    /// Modular addition of vectors in place.
    ///
    /// Aborts if a and b differ in size.
    pub fn add_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        a.iter_mut().zip(b).for_each(|(ai, bi)| *ai = self.add(*ai, *bi));
    }

    /// Modular subtraction of vectors in place.
    ///
    /// Aborts if a and b differ in size.
    pub fn sub_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        a.iter_mut().zip(b).for_each(|(ai, bi)| *ai = self.sub(*ai, *bi));
    }

    /// Modular multiplication of vectors in place.
    ///
    /// Aborts if a and b differ in size.
    pub fn mul_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        a.iter_mut().zip(b).for_each(|(ai, bi)| *ai = self.mul(*ai, *bi));
    }

    /// Modular scalar multiplication of a vector in place.
    pub fn scalar_mul_vec(&self, a: &mut [u64], b: u64) {
        let b = self.reduce(b);
        a.iter_mut().for_each(|ai| *ai = self.mul(*ai, b));
    }

    /// Modular negation of a vector in place.
    pub fn neg_vec(&self, a: &mut [u64]) {
        a.iter_mut().for_each(|ai| *ai = self.neg(*ai));
    }

    /// Reduce a vector of signed integers modulo p.
    pub fn reduce_vec_i64(&self, a: &[i64]) -> Vec<u64> {
        a.iter().map(|ai| self.reduce_i64(*ai)).collect()
    }

    /// Center a vector of elements of [0, p).
    pub fn center_vec(&self, a: &[u64]) -> Vec<i64> {
        a.iter().map(|ai| self.center(*ai)).collect()
    }

    /// Sample a vector of uniformly random values modulo p.
    pub fn random_vec<R: RngCore + CryptoRng>(&self, size: usize, rng: &mut R) -> Vec<u64> {
        rng.sample_iter(Uniform::new(0, self.p)).take(size).collect()
    }

    /// Return x mod p in constant time for x < 2 * p.
    pub(crate) const fn reduce1(x: u64, p: u64) -> u64 {
        debug_assert!(x < 2 * p);
        if x >= p {
            x - p
        } else {
            x
        }
    }
}
