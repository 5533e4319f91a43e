//! Secret keys for the CKKS encryption scheme

use crate::ckks::{Ciphertext, CkksParameters, Plaintext};
use crate::{Error, Result};
use fhe_math::rq::{traits::TryConvertFrom, Context, Poly, Representation};
use fhe_traits::{FheDecrypter, FheEncrypter, FheParametrized};
use fhe_util::sample_vec_ternary;
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Secret key for the CKKS encryption scheme.
#[derive(Debug, PartialEq, Clone)]
pub struct SecretKey {
    /// The CKKS parameters
    pub(crate) par: Arc<CkksParameters>,
    /// The secret key coefficients
    pub coeffs: Box<[i64]>,
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        self.coeffs.zeroize();
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for SecretKey {}

impl SecretKey {
    /// Bound on the absolute value of the secret key coefficients.
    pub const BOUND: u64 = 1;

    /// Generate a random [`SecretKey`] with ternary coefficients.
    pub fn random<R: RngCore + CryptoRng>(par: &Arc<CkksParameters>, rng: &mut R) -> Self {
        Self::new(sample_vec_ternary(par.degree(), rng), par)
    }

    /// Generate a [`SecretKey`] from its coefficients.
    pub fn new(coeffs: Vec<i64>, par: &Arc<CkksParameters>) -> Self {
        Self {
            par: par.clone(),
            coeffs: coeffs.into_boxed_slice(),
        }
    }

    /// Returns the parameters of the secret key.
    pub fn parameters(&self) -> &Arc<CkksParameters> {
        &self.par
    }

    /// Returns the secret key as a polynomial in the given context and
    /// representation.
    pub(crate) fn poly_in(
        &self,
        ctx: &Arc<Context>,
        representation: Representation,
    ) -> Result<Zeroizing<Poly>> {
        let mut s = Zeroizing::new(Poly::try_convert_from(
            self.coeffs.as_ref(),
            ctx,
            Representation::PowerBasis,
        )?);
        s.change_representation(representation);
        Ok(s)
    }

    /// Computes c_0 + c_1 * s + ... + c_k * s^k for the polynomials of a
    /// ciphertext.
    pub(crate) fn dot_product(&self, c: &[Poly]) -> Result<Poly> {
        let s = self.poly_in(c[0].ctx(), Representation::Ntt)?;
        let mut si = s.clone();
        let mut m = c[0].clone();
        for (i, ci) in c.iter().enumerate().skip(1) {
            let mut cis = Zeroizing::new(ci.clone());
            *cis.as_mut() *= si.as_ref();
            m += cis.as_ref();
            if i + 1 < c.len() {
                *si.as_mut() *= s.as_ref();
            }
        }
        Ok(m)
    }
}

impl FheParametrized for SecretKey {
    type Parameters = CkksParameters;
}

impl FheEncrypter<Plaintext, Ciphertext> for SecretKey {
    type Error = Error;

    fn try_encrypt<R: RngCore + CryptoRng>(
        &self,
        pt: &Plaintext,
        rng: &mut R,
    ) -> Result<Ciphertext> {
        if self.par != pt.par {
            return Err(Error::incompatible_parameters());
        }
        let ctx = pt.to_poly().ctx();
        let s = self.poly_in(ctx, Representation::Ntt)?;

        let a = Poly::random(ctx, Representation::Ntt, rng);
        let a_s = Zeroizing::new(&a * s.as_ref());

        let mut b = Poly::small(ctx, Representation::Ntt, self.par.variance, rng)?;
        b -= a_s.as_ref();
        b += pt.to_poly();

        Ok(Ciphertext {
            par: self.par.clone(),
            c: vec![b, a],
            level: pt.level,
            scale: pt.scale,
        })
    }
}

impl FheDecrypter<Plaintext, Ciphertext> for SecretKey {
    type Error = Error;

    fn try_decrypt(&self, ct: &Ciphertext) -> Result<Plaintext> {
        if self.par != ct.par {
            return Err(Error::incompatible_parameters());
        }
        Ok(Plaintext {
            par: self.par.clone(),
            poly_ntt: self.dot_product(&ct.c)?,
            level: ct.level,
            scale: ct.scale,
        })
    }
}
