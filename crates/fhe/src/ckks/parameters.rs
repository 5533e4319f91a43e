//! Create parameters for the CKKS encryption scheme

use crate::{Error, ParametersError, Result};
use fhe_math::{rq::Context, zq::primes::generate_prime};
use fhe_traits::FheParameters;
use itertools::Itertools;
use num_traits::ToPrimitive;
use std::f64::consts::PI;
use std::fmt::Debug;
use std::sync::Arc;

/// Parameters for the CKKS encryption scheme.
///
/// The ciphertext modulus is a chain `q_0, q_1, ..., q_L` of NTT-friendly
/// primes: `q_0` holds the plaintext after the last rescaling and every other
/// prime is consumed by one rescaling. Key switching additionally uses a
/// special prime `P` which never appears in a ciphertext.
#[derive(PartialEq)]
pub struct CkksParameters {
    /// Number of coefficients in a polynomial.
    polynomial_degree: usize,

    /// Ciphertext moduli `q_0, ..., q_L`.
    pub(crate) moduli: Box<[u64]>,

    /// Bit sizes of the ciphertext moduli.
    moduli_sizes: Box<[usize]>,

    /// Special modulus used during key switching.
    pub(crate) special_modulus: u64,

    /// Default scaling factor of fresh plaintexts.
    pub(crate) scale: f64,

    /// Error variance
    pub(crate) variance: usize,

    /// Standard deviation of the smudging noise, as a power of two.
    pub(crate) smudging_bits: usize,

    /// Ciphertext contexts, indexed by level.
    pub(crate) ctx: Vec<Arc<Context>>,

    /// Key switching contexts (ciphertext moduli and special modulus),
    /// indexed by level.
    pub(crate) key_ctx: Vec<Arc<Context>>,

    /// Powers of 5 modulo 2 * degree, one per slot.
    pub(crate) rotation_group: Box<[usize]>,

    /// cos(pi * k / degree) for k in [0, 2 * degree).
    pub(crate) cos_table: Box<[f64]>,
}

impl Debug for CkksParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CkksParameters")
            .field("polynomial_degree", &self.polynomial_degree)
            .field("moduli", &self.moduli)
            .field("special_modulus", &self.special_modulus)
            .field("scale", &self.scale)
            .field("variance", &self.variance)
            .field("smudging_bits", &self.smudging_bits)
            .finish()
    }
}

impl FheParameters for CkksParameters {}

impl CkksParameters {
    /// Returns the underlying polynomial degree
    pub const fn degree(&self) -> usize {
        self.polynomial_degree
    }

    /// Returns the number of real slots in a plaintext.
    pub const fn slots(&self) -> usize {
        self.polynomial_degree / 2
    }

    /// Returns a reference to the ciphertext moduli
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Returns a reference to the ciphertext moduli sizes
    pub fn moduli_sizes(&self) -> &[usize] {
        &self.moduli_sizes
    }

    /// Returns the special modulus used for key switching.
    pub const fn special_modulus(&self) -> u64 {
        self.special_modulus
    }

    /// Returns the default scaling factor.
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// Returns the error variance.
    pub const fn variance(&self) -> usize {
        self.variance
    }

    /// Returns the smudging noise standard deviation, as a power of two.
    pub const fn smudging_bits(&self) -> usize {
        self.smudging_bits
    }

    /// Returns the maximum level allowed by these parameters.
    pub fn max_level(&self) -> usize {
        self.moduli.len() - 1
    }

    /// Returns the context corresponding to the level.
    pub fn ctx_at_level(&self, level: usize) -> Result<&Arc<Context>> {
        self.ctx
            .get(level)
            .ok_or_else(|| Error::DefaultError(format!("No context at level {level}")))
    }

    /// Returns the key switching context corresponding to the level.
    pub fn key_ctx_at_level(&self, level: usize) -> Result<&Arc<Context>> {
        self.key_ctx
            .get(level)
            .ok_or_else(|| Error::DefaultError(format!("No key context at level {level}")))
    }

    /// Returns the level of a given ciphertext context.
    pub fn level_of_ctx(&self, ctx: &Arc<Context>) -> Result<usize> {
        let level = self
            .moduli
            .len()
            .checked_sub(ctx.moduli().len())
            .ok_or(Error::MathError(fhe_math::Error::InvalidContext))?;
        if self.ctx.get(level) == Some(ctx) {
            Ok(level)
        } else {
            Err(Error::MathError(fhe_math::Error::InvalidContext))
        }
    }

    /// Returns the Galois element rotating the slots by `steps` to the left.
    pub fn rotation_element(&self, steps: usize) -> usize {
        self.rotation_group[steps % self.slots()]
    }

    /// Returns the Galois elements needed to sum all the slots.
    pub fn summation_elements(&self) -> Vec<usize> {
        (0..self.slots().trailing_zeros())
            .map(|t| self.rotation_element(1 << t))
            .collect()
    }

    /// Returns default parameters for tests, with a given multiplicative
    /// depth and degree.
    pub fn default_arc(depth: usize, degree: usize) -> Result<Arc<Self>> {
        CkksParametersBuilder::new()
            .set_degree(degree)
            .set_multiplicative_depth(depth)
            .build_arc()
    }

    /// Encodes real values into the coefficients of a plaintext polynomial
    /// scaled by `scale`.
    pub(crate) fn encode_slots(&self, values: &[f64], scale: f64) -> Result<Vec<i64>> {
        if values.len() > self.slots() {
            return Err(Error::TooManyValues(values.len(), self.slots()));
        }
        let two_n = 2 * self.polynomial_degree;
        let factor = 2.0 * scale / self.polynomial_degree as f64;
        let bound = (self.moduli[0] / 2) as f64;
        (0..self.polynomial_degree)
            .map(|i| {
                let v = values
                    .iter()
                    .zip(self.rotation_group.iter())
                    .map(|(z, g)| z * self.cos_table[(g * i) % two_n])
                    .sum::<f64>()
                    * factor;
                let v = v.round();
                if v.abs() >= bound {
                    return Err(Error::EncodingOverflow(v, scale));
                }
                v.to_i64().ok_or(Error::EncodingOverflow(v, scale))
            })
            .collect()
    }

    /// Decodes the slots of a plaintext polynomial given by its centered
    /// coefficients.
    pub(crate) fn decode_slots(&self, coefficients: &[i64], scale: f64) -> Vec<f64> {
        let two_n = 2 * self.polynomial_degree;
        self.rotation_group
            .iter()
            .map(|g| {
                coefficients
                    .iter()
                    .enumerate()
                    .map(|(i, m)| *m as f64 * self.cos_table[(g * i) % two_n])
                    .sum::<f64>()
                    / scale
            })
            .collect()
    }
}

/// Builder for parameters for the CKKS encryption scheme.
#[derive(Debug)]
pub struct CkksParametersBuilder {
    degree: usize,
    first_mod_size: usize,
    scaling_mod_size: usize,
    multiplicative_depth: usize,
    special_mod_size: usize,
    moduli_sizes: Vec<usize>,
    moduli: Vec<u64>,
    special_modulus: Option<u64>,
    variance: usize,
    smudging_bits: usize,
}

impl CkksParametersBuilder {
    /// Creates a new instance of the builder
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            degree: Default::default(),
            first_mod_size: 60,
            scaling_mod_size: 40,
            multiplicative_depth: 1,
            special_mod_size: 61,
            moduli_sizes: Default::default(),
            moduli: Default::default(),
            special_modulus: None,
            variance: 10,
            smudging_bits: 20,
        }
    }

    /// Sets the polynomial degree. Returns an error if the degree is not
    /// a power of two larger or equal to 8.
    pub fn set_degree(&mut self, degree: usize) -> &mut Self {
        self.degree = degree;
        self
    }

    /// Sets the size of the first modulus, which bounds the size of the
    /// decrypted values.
    pub fn set_first_mod_size(&mut self, size: usize) -> &mut Self {
        self.first_mod_size = size;
        self
    }

    /// Sets the size of the rescaling moduli; the scale is `2^size`.
    pub fn set_scaling_mod_size(&mut self, size: usize) -> &mut Self {
        self.scaling_mod_size = size;
        self
    }

    /// Sets the number of rescaling moduli.
    pub fn set_multiplicative_depth(&mut self, depth: usize) -> &mut Self {
        self.multiplicative_depth = depth;
        self
    }

    /// Sets the size of the special key switching modulus.
    pub fn set_special_mod_size(&mut self, size: usize) -> &mut Self {
        self.special_mod_size = size;
        self
    }

    /// Sets the sizes of the ciphertext moduli, first modulus included. This
    /// overrides the first modulus size, the scaling modulus size (taken from
    /// the second modulus) and the multiplicative depth.
    pub fn set_moduli_sizes(&mut self, sizes: &[usize]) -> &mut Self {
        if let Some((first, rest)) = sizes.split_first() {
            self.first_mod_size = *first;
            if let Some(scaling) = rest.first() {
                self.scaling_mod_size = *scaling;
            }
            self.multiplicative_depth = rest.len();
        }
        self.moduli_sizes = sizes.to_owned();
        self
    }

    /// Sets the ciphertext moduli to use, overriding the generated ones.
    pub fn set_moduli(&mut self, moduli: &[u64]) -> &mut Self {
        self.moduli = moduli.to_owned();
        self
    }

    /// Sets the special modulus to use, overriding the generated one.
    pub fn set_special_modulus(&mut self, modulus: u64) -> &mut Self {
        self.special_modulus = Some(modulus);
        self
    }

    /// Sets the error variance. Returns an error if the variance is not
    /// between one and sixteen.
    pub fn set_variance(&mut self, variance: usize) -> &mut Self {
        self.variance = variance;
        self
    }

    /// Sets the standard deviation of the smudging noise added to partial
    /// decryptions, as a power of two.
    pub fn set_smudging_bits(&mut self, bits: usize) -> &mut Self {
        self.smudging_bits = bits;
        self
    }

    /// Generate `count` primes of `num_bits` bits supporting the NTT, skipping
    /// the primes in `used`.
    fn generate_moduli(
        &self,
        num_bits: usize,
        count: usize,
        used: &mut Vec<u64>,
    ) -> Result<Vec<u64>> {
        let mut primes = Vec::with_capacity(count);
        let mut upper_bound = 1u64 << num_bits;
        while primes.len() < count {
            let p = generate_prime(num_bits, 2 * self.degree as u64, upper_bound)
                .ok_or(ParametersError::NotEnoughPrimes(num_bits, self.degree))?;
            upper_bound = p;
            if !used.contains(&p) {
                used.push(p);
                primes.push(p);
            }
        }
        Ok(primes)
    }

    /// Build a new `CkksParameters` inside an `Arc`.
    pub fn build_arc(&self) -> Result<Arc<CkksParameters>> {
        self.build().map(Arc::new)
    }

    /// Build a new `CkksParameters`.
    pub fn build(&self) -> Result<CkksParameters> {
        if self.degree < 8 || !self.degree.is_power_of_two() {
            return Err(ParametersError::InvalidDegree(self.degree).into());
        }
        if !(1..=16).contains(&self.variance) {
            return Err(ParametersError::InvalidVariance(self.variance).into());
        }
        for size in [
            self.first_mod_size,
            self.scaling_mod_size,
            self.special_mod_size,
        ]
        .iter()
        .chain(self.moduli_sizes.iter())
        {
            if !(10..=62).contains(size) {
                return Err(ParametersError::InvalidModulusSize(*size, 10, 62).into());
            }
        }
        if self.scaling_mod_size >= self.first_mod_size {
            return Err(ParametersError::InvalidScalingModulusSize(
                self.scaling_mod_size,
                self.first_mod_size,
            )
            .into());
        }
        if self.smudging_bits >= self.scaling_mod_size {
            return Err(
                ParametersError::InvalidSmudgingBits(self.smudging_bits, self.scaling_mod_size)
                    .into(),
            );
        }

        let mut used = Vec::new();
        let moduli = if !self.moduli.is_empty() {
            used.extend_from_slice(&self.moduli);
            self.moduli.clone()
        } else if !self.moduli_sizes.is_empty() {
            let mut moduli = Vec::with_capacity(self.moduli_sizes.len());
            for size in &self.moduli_sizes {
                moduli.extend(self.generate_moduli(*size, 1, &mut used)?);
            }
            moduli
        } else {
            let mut moduli = self.generate_moduli(self.first_mod_size, 1, &mut used)?;
            moduli.extend(self.generate_moduli(
                self.scaling_mod_size,
                self.multiplicative_depth,
                &mut used,
            )?);
            moduli
        };
        let special_modulus = match self.special_modulus {
            Some(p) if moduli.contains(&p) => {
                return Err(ParametersError::InvalidModuli(
                    "The special modulus must differ from the ciphertext moduli".to_string(),
                )
                .into())
            }
            Some(p) => p,
            None => self.generate_moduli(self.special_mod_size, 1, &mut used)?[0],
        };

        let moduli_sizes = moduli
            .iter()
            .map(|m| 64 - m.leading_zeros() as usize)
            .collect_vec();

        let ctx0 = Context::new_arc(&moduli, self.degree)?;
        let ctx = Context::chain(&ctx0);
        let key_ctx = (0..moduli.len())
            .map(|level| {
                let mut key_moduli = moduli[..moduli.len() - level].to_vec();
                key_moduli.push(special_modulus);
                Context::new_arc(&key_moduli, self.degree)
            })
            .collect::<fhe_math::Result<Vec<_>>>()?;

        let two_n = 2 * self.degree;
        let rotation_group = std::iter::successors(Some(1usize), |g| Some((g * 5) % two_n))
            .take(self.degree / 2)
            .collect_vec();
        let cos_table = (0..two_n)
            .map(|k| (PI * k as f64 / self.degree as f64).cos())
            .collect_vec();

        Ok(CkksParameters {
            polynomial_degree: self.degree,
            moduli: moduli.into_boxed_slice(),
            moduli_sizes: moduli_sizes.into_boxed_slice(),
            special_modulus,
            scale: 2f64.powi(self.scaling_mod_size as i32),
            variance: self.variance,
            smudging_bits: self.smudging_bits,
            ctx,
            key_ctx,
            rotation_group: rotation_group.into_boxed_slice(),
            cos_table: cos_table.into_boxed_slice(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CkksParameters, CkksParametersBuilder};
    use crate::{Error, ParametersError};
    use itertools::Itertools;
    use std::error::Error as StdError;

    #[test]
    fn builder() -> Result<(), Box<dyn StdError>> {
        let params = CkksParametersBuilder::new()
            .set_degree(1024)
            .set_multiplicative_depth(3)
            .build()?;

        assert_eq!(params.degree(), 1024);
        assert_eq!(params.slots(), 512);
        assert_eq!(params.moduli().len(), 4);
        assert_eq!(params.moduli_sizes(), &[60, 40, 40, 40]);
        assert_eq!(params.max_level(), 3);
        assert_eq!(params.scale(), (1u64 << 40) as f64);
        assert_eq!(64 - params.special_modulus().leading_zeros(), 61);
        for q in params.moduli().iter().chain([params.special_modulus()].iter()) {
            assert_eq!(q % 2048, 1);
        }

        for level in 0..=params.max_level() {
            let ctx = params.ctx_at_level(level)?;
            assert_eq!(ctx.moduli().len(), 4 - level);
            assert_eq!(params.level_of_ctx(ctx)?, level);
            let key_ctx = params.key_ctx_at_level(level)?;
            assert_eq!(key_ctx.moduli().len(), 5 - level);
            assert_eq!(key_ctx.moduli().last(), Some(&params.special_modulus()));
            assert_eq!(key_ctx.next_context(), Some(ctx));
        }
        assert!(params.ctx_at_level(4).is_err());
        Ok(())
    }

    #[test]
    fn builder_errors() {
        assert_eq!(
            CkksParametersBuilder::new().set_degree(1000).build().err(),
            Some(Error::ParametersError(ParametersError::InvalidDegree(1000)))
        );
        assert_eq!(
            CkksParametersBuilder::new()
                .set_degree(16)
                .set_scaling_mod_size(60)
                .build()
                .err(),
            Some(Error::ParametersError(
                ParametersError::InvalidScalingModulusSize(60, 60)
            ))
        );
        assert_eq!(
            CkksParametersBuilder::new()
                .set_degree(16)
                .set_smudging_bits(45)
                .build()
                .err(),
            Some(Error::ParametersError(ParametersError::InvalidSmudgingBits(
                45, 40
            )))
        );
        assert_eq!(
            CkksParametersBuilder::new()
                .set_degree(16)
                .set_variance(0)
                .build()
                .err(),
            Some(Error::ParametersError(ParametersError::InvalidVariance(0)))
        );
        assert_eq!(
            CkksParametersBuilder::new()
                .set_degree(16)
                .set_first_mod_size(63)
                .build()
                .err(),
            Some(Error::ParametersError(ParametersError::InvalidModulusSize(
                63, 10, 62
            )))
        );
    }

    #[test]
    fn moduli_sizes() -> Result<(), Box<dyn StdError>> {
        let params = CkksParametersBuilder::new()
            .set_degree(16)
            .set_moduli_sizes(&[50, 30, 30, 30])
            .build()?;
        assert_eq!(params.moduli_sizes(), &[50, 30, 30, 30]);
        assert_eq!(params.max_level(), 3);
        assert_eq!(params.scale(), (1u64 << 30) as f64);
        assert!(params.moduli().iter().all_unique());
        assert!(CkksParametersBuilder::new()
            .set_degree(16)
            .set_moduli_sizes(&[50, 30, 70])
            .build()
            .is_err());
        Ok(())
    }

    #[test]
    fn explicit_moduli() -> Result<(), Box<dyn StdError>> {
        let reference = CkksParameters::default_arc(2, 16)?;
        let params = CkksParametersBuilder::new()
            .set_degree(16)
            .set_moduli(reference.moduli())
            .set_special_modulus(reference.special_modulus())
            .build()?;
        assert_eq!(params.moduli(), reference.moduli());
        assert!(CkksParametersBuilder::new()
            .set_degree(16)
            .set_moduli(reference.moduli())
            .set_special_modulus(reference.moduli()[0])
            .build()
            .is_err());
        Ok(())
    }

    #[test]
    fn rotation_group() -> Result<(), Box<dyn StdError>> {
        let params = CkksParameters::default_arc(1, 16)?;
        assert_eq!(params.rotation_element(0), 1);
        assert_eq!(params.rotation_element(1), 5);
        assert_eq!(params.rotation_element(2), 25);
        assert_eq!(params.rotation_element(3), 125 % 32);
        assert_eq!(params.rotation_element(8), 1);
        assert_eq!(params.summation_elements(), vec![5, 25, 625 % 32]);
        Ok(())
    }

    #[test]
    fn encode_decode_slots() -> Result<(), Box<dyn StdError>> {
        let params = CkksParameters::default_arc(1, 64)?;
        let values = (0..params.slots())
            .map(|i| i as f64 - 12.5)
            .collect::<Vec<_>>();
        let coefficients = params.encode_slots(&values, params.scale())?;
        let decoded = params.decode_slots(&coefficients, params.scale());
        for (v, d) in values.iter().zip(decoded.iter()) {
            assert!((v - d).abs() < 1e-6);
        }

        assert!(params
            .encode_slots(&vec![0.0; params.slots() + 1], params.scale())
            .is_err());
        assert!(params.encode_slots(&[1e12], params.scale()).is_err());
        assert!(params.encode_slots(&[f64::NAN], params.scale()).is_err());
        Ok(())
    }
}
