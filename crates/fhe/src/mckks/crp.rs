use std::sync::Arc;

use crate::ckks::CkksParameters;
use crate::Result;
use fhe_math::rq::{Poly, Representation};
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A polynomial sampled from a random _common reference string_.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CommonRandomPoly {
    pub(crate) poly: Poly,
}

impl CommonRandomPoly {
    /// Generate a new random CRP in the ciphertext context at level 0.
    pub fn new<R: RngCore + CryptoRng>(par: &Arc<CkksParameters>, rng: &mut R) -> Result<Self> {
        let ctx = par.ctx_at_level(0)?;
        Ok(Self {
            poly: Poly::random(ctx, Representation::Ntt, rng),
        })
    }

    /// Generate a new CRP from a shared deterministic seed.
    pub fn new_deterministic(
        par: &Arc<CkksParameters>,
        seed: <ChaCha8Rng as SeedableRng>::Seed,
    ) -> Result<Self> {
        let mut rng = ChaCha8Rng::from_seed(seed);
        Self::new(par, &mut rng)
    }

    /// Generate a new random CRP vector in the key switching context.
    ///
    /// The size of the vector is equal to the number of ciphertext moduli, as
    /// required for the key switching key generation protocol.
    pub fn new_vec<R: RngCore + CryptoRng>(
        par: &Arc<CkksParameters>,
        rng: &mut R,
    ) -> Result<Vec<Self>> {
        let ctx = par.key_ctx_at_level(0)?;
        Ok((0..par.moduli().len())
            .map(|_| Self {
                poly: Poly::random(ctx, Representation::Ntt, rng),
            })
            .collect())
    }

    /// Returns the underlying polynomial.
    pub fn poly(&self) -> &Poly {
        &self.poly
    }
}

#[cfg(test)]
mod tests {
    use super::CommonRandomPoly;
    use crate::ckks::CkksParameters;
    use rand::thread_rng;
    use std::error::Error;

    #[test]
    fn deterministic() -> Result<(), Box<dyn Error>> {
        let params = CkksParameters::default_arc(2, 16)?;
        let a = CommonRandomPoly::new_deterministic(&params, [7; 32])?;
        let b = CommonRandomPoly::new_deterministic(&params, [7; 32])?;
        let c = CommonRandomPoly::new_deterministic(&params, [8; 32])?;
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.poly().ctx(), params.ctx_at_level(0)?);

        let v = CommonRandomPoly::new_vec(&params, &mut thread_rng())?;
        assert_eq!(v.len(), 3);
        assert!(v.iter().all(|crp| crp.poly().ctx() == params.key_ctx_at_level(0).unwrap()));
        Ok(())
    }
}
