//! Key-switching keys for the CKKS encryption scheme

use crate::ckks::{CkksParameters, SecretKey};
use crate::{Error, Result};
use fhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use itertools::izip;
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Key switching key for the CKKS encryption scheme.
///
/// The key uses the hybrid RNS decomposition: there is one pair of
/// polynomials per ciphertext modulus `q_j`, defined over the ciphertext
/// moduli extended with the special modulus `P`. The pair encrypts
/// `P * s_from` under `s_to` on the rows of `q_j` only.
#[derive(Debug, PartialEq, Clone)]
pub struct KeySwitchingKey {
    /// The CKKS parameters
    pub(crate) par: Arc<CkksParameters>,
    /// The first components of the key, one per ciphertext modulus.
    pub(crate) c0: Box<[Poly]>,
    /// The second components of the key, one per ciphertext modulus.
    pub(crate) c1: Box<[Poly]>,
}

impl KeySwitchingKey {
    /// Generate a [`KeySwitchingKey`] to switch from the polynomial `from` to
    /// the secret key `to`. The polynomial `from` must be defined in the key
    /// switching context at level 0.
    pub fn new<R: RngCore + CryptoRng>(to: &SecretKey, from: &Poly, rng: &mut R) -> Result<Self> {
        let c1 = Self::common_random_polys(&to.par, rng)?;
        Self::new_with_random_polys(to, from, c1, rng)
    }

    /// Sample the uniformly random second components of a key.
    pub(crate) fn common_random_polys<R: RngCore + CryptoRng>(
        par: &Arc<CkksParameters>,
        rng: &mut R,
    ) -> Result<Vec<Poly>> {
        let ctx = par.key_ctx_at_level(0)?;
        Ok((0..par.moduli.len())
            .map(|_| Poly::random(ctx, Representation::Ntt, rng))
            .collect())
    }

    /// Generate a [`KeySwitchingKey`] given its second components.
    ///
    /// Keys generated by several parties on the same second components add
    /// up to a key switching from the sum of the `from` polynomials to the
    /// sum of the secret keys.
    pub(crate) fn new_with_random_polys<R: RngCore + CryptoRng>(
        to: &SecretKey,
        from: &Poly,
        c1: Vec<Poly>,
        rng: &mut R,
    ) -> Result<Self> {
        let par = to.par.clone();
        let ctx = par.key_ctx_at_level(0)?;
        if from.ctx() != ctx {
            return Err(Error::MathError(fhe_math::Error::InvalidContext));
        }
        if c1.len() != par.moduli.len() {
            return Err(Error::DefaultError(format!(
                "Expected {} random polynomials, got {}",
                par.moduli.len(),
                c1.len()
            )));
        }

        let s = to.poly_in(ctx, Representation::Ntt)?;
        let mut from = Zeroizing::new(from.clone());
        from.change_representation(Representation::Ntt);

        let c0 = c1
            .iter()
            .enumerate()
            .map(|(j, a)| -> Result<Poly> {
                let mut c0 = -(a * s.as_ref());
                let e = Zeroizing::new(Poly::small(
                    ctx,
                    Representation::Ntt,
                    par.variance,
                    rng,
                )?);
                c0 += e.as_ref();

                let qj = &ctx.moduli_operators()[j];
                let p_mod_qj = qj.reduce(par.special_modulus);
                {
                    let mut coefficients = c0.coefficients_mut();
                    coefficients
                        .row_mut(j)
                        .zip_mut_with(&from.coefficients().row(j), |c, f| {
                            *c = qj.add(*c, qj.mul(p_mod_qj, *f))
                        });
                }
                Ok(c0)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            par,
            c0: c0.into_boxed_slice(),
            c1: c1.into_boxed_slice(),
        })
    }

    /// Adds the first components of another key generated on the same
    /// second components.
    pub(crate) fn add_share(&mut self, other: &KeySwitchingKey) -> Result<()> {
        if self.par != other.par {
            return Err(Error::incompatible_parameters());
        }
        if self.c1 != other.c1 {
            return Err(Error::DefaultError(
                "Key switching keys do not share their random components".to_string(),
            ));
        }
        for (c0, other_c0) in self.c0.iter_mut().zip(other.c0.iter()) {
            *c0 += other_c0;
        }
        Ok(())
    }

    /// Key switch a polynomial of a ciphertext.
    ///
    /// Returns the pair (d0, d1) such that d0 + d1 * s_to approximates
    /// d * s_from, in the context of `d` and in Ntt representation.
    pub(crate) fn key_switch(&self, d: &Poly) -> Result<(Poly, Poly)> {
        let level = self.par.level_of_ctx(d.ctx())?;
        let key_ctx = self.par.key_ctx_at_level(level)?;

        let mut d = d.clone();
        d.change_representation(Representation::PowerBasis);

        let mut d0 = Poly::zero(key_ctx, Representation::Ntt);
        let mut d1 = Poly::zero(key_ctx, Representation::Ntt);
        for (row, c0, c1) in izip!(d.coefficients().outer_iter(), self.c0.iter(), self.c1.iter())
        {
            let digit = row.to_vec();
            let mut digit =
                Poly::try_convert_from(digit.as_slice(), key_ctx, Representation::PowerBasis)?;
            digit.change_representation(Representation::Ntt);
            d0 += &(&digit * &c0.restrict_to(key_ctx)?);
            d1 += &(&digit * &c1.restrict_to(key_ctx)?);
        }

        for di in [&mut d0, &mut d1] {
            di.change_representation(Representation::PowerBasis);
            di.mod_switch_down_next()?;
            di.change_representation(Representation::Ntt);
        }
        Ok((d0, d1))
    }
}

#[cfg(test)]
mod tests {
    use super::KeySwitchingKey;
    use crate::ckks::{CkksParameters, SecretKey};
    use fhe_math::rq::{Poly, Representation};
    use rand::thread_rng;
    use std::error::Error;

    #[test]
    fn key_switch() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(3, 64)?;
        let sk_to = SecretKey::random(&params, &mut rng);
        let sk_from = SecretKey::random(&params, &mut rng);
        let from = sk_from.poly_in(params.key_ctx_at_level(0)?, Representation::PowerBasis)?;
        let ksk = KeySwitchingKey::new(&sk_to, &from, &mut rng)?;
        assert_eq!(ksk.c0.len(), params.moduli().len());

        for level in 0..=params.max_level() {
            let ctx = params.ctx_at_level(level)?;
            let d = Poly::random(ctx, Representation::Ntt, &mut rng);
            let (d0, d1) = ksk.key_switch(&d)?;
            assert_eq!(d0.ctx(), ctx);

            // d0 + d1 * s_to - d * s_from is small.
            let s_to = sk_to.poly_in(ctx, Representation::Ntt)?;
            let s_from = sk_from.poly_in(ctx, Representation::Ntt)?;
            let mut diff = &d0 + &(&d1 * s_to.as_ref());
            diff -= &(&d * s_from.as_ref());
            diff.change_representation(Representation::PowerBasis);
            for (row, qi) in diff.coefficients().outer_iter().zip(ctx.moduli_operators()) {
                assert!(row.iter().all(|c| qi.center(*c).unsigned_abs() < 1 << 20));
            }
        }
        Ok(())
    }

    #[test]
    fn add_share() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(1, 16)?;
        let sk = SecretKey::random(&params, &mut rng);
        let from = sk.poly_in(params.key_ctx_at_level(0)?, Representation::Ntt)?;
        let mut a = KeySwitchingKey::new(&sk, &from, &mut rng)?;
        let b = KeySwitchingKey::new(&sk, &from, &mut rng)?;
        assert!(a.add_share(&b).is_err());

        let c1 = a.c1.to_vec();
        let c = KeySwitchingKey::new_with_random_polys(&sk, &from, c1, &mut rng)?;
        let before = a.c0.clone();
        a.add_share(&c)?;
        assert_eq!(a.c1, c.c1);
        assert_ne!(a.c0, before);
        Ok(())
    }
}
