//! Public keys for the CKKS encryption scheme

use crate::ckks::{Ciphertext, CkksParameters, Plaintext, SecretKey};
use crate::{Error, Result};
use fhe_math::rq::{traits::TryConvertFrom, Context, Poly, Representation};
use fhe_traits::{FheEncrypter, FheParametrized};
use fhe_util::sample_vec_ternary;
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Public key for the CKKS encryption scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicKey {
    /// The CKKS parameters
    pub(crate) par: Arc<CkksParameters>,
    /// The public key, stored as an encryption of zero at level 0.
    pub(crate) c: Ciphertext,
}

impl PublicKey {
    /// Generate a new [`PublicKey`] from a [`SecretKey`].
    pub fn new<R: RngCore + CryptoRng>(sk: &SecretKey, rng: &mut R) -> Result<Self> {
        let zero = Plaintext {
            par: sk.par.clone(),
            poly_ntt: Poly::zero(sk.par.ctx_at_level(0)?, Representation::Ntt),
            level: 0,
            scale: 1.0,
        };
        let c: Ciphertext = sk.try_encrypt(&zero, rng)?;
        Ok(Self {
            par: sk.par.clone(),
            c,
        })
    }

    /// Returns the parameters of the public key.
    pub fn parameters(&self) -> &Arc<CkksParameters> {
        &self.par
    }

    /// Sample a ternary polynomial in the given context.
    fn ternary_poly<R: RngCore + CryptoRng>(
        ctx: &Arc<Context>,
        rng: &mut R,
    ) -> Result<Zeroizing<Poly>> {
        let coeffs = Zeroizing::new(sample_vec_ternary(ctx.degree(), rng));
        let mut u = Zeroizing::new(Poly::try_convert_from(
            coeffs.as_slice(),
            ctx,
            Representation::PowerBasis,
        )?);
        u.change_representation(Representation::Ntt);
        Ok(u)
    }
}

impl FheParametrized for PublicKey {
    type Parameters = CkksParameters;
}

impl FheEncrypter<Plaintext, Ciphertext> for PublicKey {
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

        let mut b = self.c.c[0].clone();
        let mut a = self.c.c[1].clone();
        b.mod_drop_to(ctx)?;
        a.mod_drop_to(ctx)?;

        let u = Self::ternary_poly(ctx, rng)?;
        let e0 = Zeroizing::new(Poly::small(
            ctx,
            Representation::Ntt,
            self.par.variance,
            rng,
        )?);
        let e1 = Zeroizing::new(Poly::small(
            ctx,
            Representation::Ntt,
            self.par.variance,
            rng,
        )?);

        let mut c0 = &b * u.as_ref();
        c0 += e0.as_ref();
        c0 += pt.to_poly();
        let mut c1 = &a * u.as_ref();
        c1 += e1.as_ref();

        Ok(Ciphertext {
            par: self.par.clone(),
            c: vec![c0, c1],
            level: pt.level,
            scale: pt.scale,
        })
    }
}
