//! Ciphertext type in the CKKS encryption scheme.

use crate::ckks::CkksParameters;
use crate::{Error, Result};
use fhe_math::rq::{Poly, Representation};
use fhe_traits::{FheCiphertext, FheParametrized};
use std::sync::Arc;

/// Relative difference tolerated between the scales of two ciphertexts which
/// are added together.
pub(crate) const SCALE_TOLERANCE: f64 = 1e-3;

/// Returns whether two scales are equal up to [`SCALE_TOLERANCE`].
pub(crate) fn scales_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= SCALE_TOLERANCE * a.abs().max(b.abs())
}

/// A ciphertext encrypting a plaintext.
#[derive(Debug, Clone, PartialEq)]
pub struct Ciphertext {
    /// The parameters of the underlying CKKS encryption scheme.
    pub(crate) par: Arc<CkksParameters>,

    /// The ciphertext elements.
    pub c: Vec<Poly>,

    /// The ciphertext level
    pub level: usize,

    /// The scaling factor of the encrypted values
    pub scale: f64,
}

impl Ciphertext {
    /// Create a ciphertext from a vector of polynomials.
    /// A ciphertext must contain at least two polynomials, and all polynomials
    /// must be in Ntt representation and with the same context.
    pub fn new(c: Vec<Poly>, scale: f64, par: &Arc<CkksParameters>) -> Result<Self> {
        if c.len() < 2 {
            return Err(Error::TooFewValues(c.len(), 2));
        }

        let ctx = c[0].ctx();
        let level = par.level_of_ctx(ctx)?;

        // Check that all polynomials have the expected representation and context.
        for ci in c.iter() {
            if ci.representation() != &Representation::Ntt {
                return Err(Error::MathError(fhe_math::Error::IncorrectRepresentation(
                    *ci.representation(),
                    Representation::Ntt,
                )));
            }
            if ci.ctx() != ctx {
                return Err(Error::MathError(fhe_math::Error::InvalidContext));
            }
        }

        Ok(Self {
            par: par.clone(),
            c,
            level,
            scale,
        })
    }

    /// Generate the zero ciphertext at a given level and scale.
    pub fn zero(par: &Arc<CkksParameters>, level: usize, scale: f64) -> Result<Self> {
        let ctx = par.ctx_at_level(level)?;
        Ok(Self {
            par: par.clone(),
            c: vec![
                Poly::zero(ctx, Representation::Ntt),
                Poly::zero(ctx, Representation::Ntt),
            ],
            level,
            scale,
        })
    }

    /// Returns the parameters of the ciphertext.
    pub fn parameters(&self) -> &Arc<CkksParameters> {
        &self.par
    }

    /// Returns the number of rescalings left before the ciphertext reaches
    /// the last level.
    pub fn levels_left(&self) -> usize {
        self.par.max_level() - self.level
    }

    /// Drop moduli until the ciphertext is at the given level, keeping the
    /// scale unchanged.
    pub fn mod_drop_to_level(&mut self, level: usize) -> Result<()> {
        if level < self.level {
            return Err(Error::DefaultError(format!(
                "Cannot raise a ciphertext from level {} to level {}",
                self.level, level
            )));
        }
        if level == self.level {
            return Ok(());
        }
        let ctx = self.par.ctx_at_level(level)?;
        for ci in self.c.iter_mut() {
            ci.mod_drop_to(ctx)?;
        }
        self.level = level;
        Ok(())
    }

    /// Divide the ciphertext by its last modulus, which moves it to the next
    /// level and divides its scale accordingly.
    pub fn rescale(&mut self) -> Result<()> {
        if self.level >= self.par.max_level() {
            return Err(Error::InsufficientLevels {
                required: 1,
                available: 0,
            });
        }
        let q_last = self.par.moduli[self.par.max_level() - self.level];
        for ci in self.c.iter_mut() {
            ci.change_representation(Representation::PowerBasis);
            ci.mod_switch_down_next()?;
            ci.change_representation(Representation::Ntt);
        }
        self.level += 1;
        self.scale /= q_last as f64;
        Ok(())
    }
}

impl FheCiphertext for Ciphertext {}

impl FheParametrized for Ciphertext {
    type Parameters = CkksParameters;
}

#[cfg(test)]
mod tests {
    use super::{scales_match, Ciphertext};
    use crate::ckks::{CkksParameters, Encoding, Plaintext, SecretKey};
    use fhe_math::rq::{Poly, Representation};
    use fhe_traits::{FheDecoder, FheDecrypter, FheEncoder, FheEncrypter};
    use rand::thread_rng;
    use std::error::Error;

    #[test]
    fn constructor() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(2, 16)?;
        let ctx = params.ctx_at_level(1)?;
        let p = Poly::random(ctx, Representation::Ntt, &mut rng);
        let ct = Ciphertext::new(vec![p.clone(), p.clone()], params.scale(), &params)?;
        assert_eq!(ct.level, 1);
        assert_eq!(ct.levels_left(), 1);

        assert!(Ciphertext::new(vec![p.clone()], params.scale(), &params).is_err());

        let mut q = p.clone();
        q.change_representation(Representation::PowerBasis);
        assert!(Ciphertext::new(vec![p.clone(), q], params.scale(), &params).is_err());

        let r = Poly::random(params.ctx_at_level(0)?, Representation::Ntt, &mut rng);
        assert!(Ciphertext::new(vec![p, r], params.scale(), &params).is_err());
        Ok(())
    }

    #[test]
    fn mod_drop_and_rescale() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(2, 64)?;
        let sk = SecretKey::random(&params, &mut rng);
        let values = vec![1.5, -2.0, 3.25];
        let pt = Plaintext::try_encode(&values, Encoding::new(), &params)?;
        let ct: Ciphertext = sk.try_encrypt(&pt, &mut rng)?;

        let mut dropped = ct.clone();
        dropped.mod_drop_to_level(2)?;
        assert_eq!(dropped.level, 2);
        assert_eq!(dropped.scale, ct.scale);
        assert!(dropped.mod_drop_to_level(1).is_err());
        let decoded = Vec::<f64>::try_decode(&sk.try_decrypt(&dropped)?, None)?;
        for (v, d) in values.iter().zip(decoded.iter()) {
            assert!((v - d).abs() < 1e-6);
        }

        let mut rescaled = ct.clone();
        rescaled.rescale()?;
        assert_eq!(rescaled.level, 1);
        assert!(rescaled.scale < 2.0);
        rescaled.rescale()?;
        assert!(rescaled.rescale().is_err());
        Ok(())
    }

    #[test]
    fn scale_tolerance() {
        assert!(scales_match(1e12, 1e12 * (1.0 + 1e-5)));
        assert!(!scales_match(1e12, 2e12));
    }
}
