//! Joint generation of the relinearization and Galois keys.
//!
//! Key generation runs in two phases. In the round phase, every party
//! extends a joint key switching key `s -> s` and joint Galois keys
//! `sigma_g(s) -> s`, all built on the same random components. In the
//! finalization phase, every party multiplies the joint key `s -> s` by its
//! own secret key share; the sum of these products is a key switching key
//! `s^2 -> s`, i.e. a relinearization key.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ckks::{
    CkksParameters, EvaluationKey, GaloisKey, KeySwitchingKey, RelinearizationKey, SecretKey,
};
use crate::{Error, Result};
use fhe_math::rq::{Poly, Representation};
use itertools::izip;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use super::{Aggregate, CommonRandomPoly};

/// The common random polynomials of the joint evaluation keys.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EvaluationKeyCrp {
    pub(crate) relinearization: Vec<CommonRandomPoly>,
    pub(crate) galois: BTreeMap<usize, Vec<CommonRandomPoly>>,
}

impl EvaluationKeyCrp {
    /// Sample the common random polynomials for a key supporting
    /// multiplications and the summation of all the slots.
    pub fn new<R: RngCore + CryptoRng>(par: &Arc<CkksParameters>, rng: &mut R) -> Result<Self> {
        let relinearization = CommonRandomPoly::new_vec(par, rng)?;
        let galois = par
            .summation_elements()
            .into_iter()
            .map(|element| -> Result<(usize, Vec<CommonRandomPoly>)> {
                Ok((element, CommonRandomPoly::new_vec(par, rng)?))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            relinearization,
            galois,
        })
    }
}

fn to_polys(crp: &[CommonRandomPoly]) -> Vec<Poly> {
    crp.iter().map(|c| c.poly.clone()).collect()
}

fn to_crp(polys: &[Poly]) -> Vec<CommonRandomPoly> {
    polys
        .iter()
        .map(|poly| CommonRandomPoly { poly: poly.clone() })
        .collect()
}

/// A party's share of the joint evaluation keys in the round phase.
///
/// Shares generated on the same [`EvaluationKeyCrp`] add up; the running sum
/// is itself an [`EvaluationKeyShare`], from which the next party reads the
/// common random polynomials.
#[derive(Debug, PartialEq, Clone)]
pub struct EvaluationKeyShare {
    pub(crate) par: Arc<CkksParameters>,
    /// Key switching key from `s` to `s`.
    pub(crate) relinearization: KeySwitchingKey,
    /// Key switching keys from `sigma_g(s)` to `s`, indexed by `g`.
    pub(crate) galois: BTreeMap<usize, KeySwitchingKey>,
}

impl EvaluationKeyShare {
    /// Participate in a new evaluation key generation protocol.
    ///
    /// 1. *Private input*: CKKS secret key share
    /// 2. *Public input*: common random polynomials
    pub fn new<R: RngCore + CryptoRng>(
        sk_share: &SecretKey,
        crp: &EvaluationKeyCrp,
        rng: &mut R,
    ) -> Result<Self> {
        let par = sk_share.parameters().clone();
        let s = sk_share.poly_in(par.key_ctx_at_level(0)?, Representation::Ntt)?;
        let relinearization = KeySwitchingKey::new_with_random_polys(
            sk_share,
            &s,
            to_polys(&crp.relinearization),
            rng,
        )?;

        let mut galois = BTreeMap::new();
        for (element, crp) in &crp.galois {
            let from = GaloisKey::substituted_secret(sk_share, *element)?;
            let ksk =
                KeySwitchingKey::new_with_random_polys(sk_share, &from, to_polys(crp), rng)?;
            galois.insert(*element, ksk);
        }

        Ok(Self {
            par,
            relinearization,
            galois,
        })
    }

    /// Returns the common random polynomials of the share, on top of which
    /// the next party builds its own share.
    pub fn crp(&self) -> EvaluationKeyCrp {
        EvaluationKeyCrp {
            relinearization: to_crp(&self.relinearization.c1),
            galois: self
                .galois
                .iter()
                .map(|(element, ksk)| (*element, to_crp(&ksk.c1)))
                .collect(),
        }
    }

    /// Add another share generated on the same common random polynomials.
    pub fn add_share(&mut self, other: &EvaluationKeyShare) -> Result<()> {
        if self.par != other.par {
            return Err(Error::incompatible_parameters());
        }
        if self.galois.len() != other.galois.len() {
            return Err(Error::MissingKey(
                "Evaluation key shares hold different Galois keys".to_string(),
            ));
        }
        self.relinearization.add_share(&other.relinearization)?;
        for (element, ksk) in self.galois.iter_mut() {
            let other_ksk = other
                .galois
                .get(element)
                .ok_or_else(|| Error::MissingKey(format!("Galois key for element {element}")))?;
            ksk.add_share(other_ksk)?;
        }
        Ok(())
    }

    /// Turn the joint Galois keys into an [`EvaluationKey`], given the
    /// relinearization key produced by the finalization phase.
    pub fn finalize(&self, relinearization_key: RelinearizationKey) -> Result<EvaluationKey> {
        let galois_keys = self
            .galois
            .iter()
            .map(|(element, ksk)| GaloisKey {
                element: *element,
                ksk: ksk.clone(),
            })
            .collect::<Vec<_>>();
        EvaluationKey::from_keys(relinearization_key, galois_keys)
    }
}

impl Aggregate<EvaluationKeyShare> for EvaluationKeyShare {
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = EvaluationKeyShare>,
    {
        let mut shares = iter.into_iter();
        let mut key = shares.next().ok_or(Error::TooFewValues(0, 1))?;
        for sh in shares {
            key.add_share(&sh)?;
        }
        Ok(key)
    }
}

/// A party's share of the relinearization key in the finalization phase.
///
/// Given the joint key switching key `(K0, a)` from `s` to `s`, the share of
/// party `i` is `(s_i * K0 + e, s_i * a + e')`. Shares are combined by
/// addition, which is associative and commutative.
#[derive(Debug, PartialEq, Clone)]
pub struct RelinearizationKeyShare {
    pub(crate) par: Arc<CkksParameters>,
    pub(crate) c0: Box<[Poly]>,
    pub(crate) c1: Box<[Poly]>,
}

impl RelinearizationKeyShare {
    /// Participate in the finalization of the relinearization key.
    ///
    /// 1. *Private input*: CKKS secret key share
    /// 2. *Public input*: the joint evaluation key share after all rounds
    pub fn new<R: RngCore + CryptoRng>(
        sk_share: &SecretKey,
        joint: &EvaluationKeyShare,
        rng: &mut R,
    ) -> Result<Self> {
        if sk_share.parameters() != &joint.par {
            return Err(Error::incompatible_parameters());
        }
        let par = joint.par.clone();
        let ctx = par.key_ctx_at_level(0)?;
        let s = sk_share.poly_in(ctx, Representation::Ntt)?;

        let mut c0 = Vec::with_capacity(joint.relinearization.c0.len());
        let mut c1 = Vec::with_capacity(joint.relinearization.c1.len());
        for (k0, a) in izip!(
            joint.relinearization.c0.iter(),
            joint.relinearization.c1.iter()
        ) {
            let e0 = Zeroizing::new(Poly::small(ctx, Representation::Ntt, par.variance(), rng)?);
            let e1 = Zeroizing::new(Poly::small(ctx, Representation::Ntt, par.variance(), rng)?);
            let mut h0 = k0 * s.as_ref();
            h0 += e0.as_ref();
            let mut h1 = a * s.as_ref();
            h1 += e1.as_ref();
            c0.push(h0);
            c1.push(h1);
        }

        Ok(Self {
            par,
            c0: c0.into_boxed_slice(),
            c1: c1.into_boxed_slice(),
        })
    }

    /// Combine two shares.
    pub fn combine(&self, other: &RelinearizationKeyShare) -> Result<Self> {
        if self.par != other.par || self.c0.len() != other.c0.len() {
            return Err(Error::incompatible_parameters());
        }
        let c0 = izip!(self.c0.iter(), other.c0.iter())
            .map(|(a, b)| a + b)
            .collect::<Vec<_>>();
        let c1 = izip!(self.c1.iter(), other.c1.iter())
            .map(|(a, b)| a + b)
            .collect::<Vec<_>>();
        Ok(Self {
            par: self.par.clone(),
            c0: c0.into_boxed_slice(),
            c1: c1.into_boxed_slice(),
        })
    }
}

impl Aggregate<RelinearizationKeyShare> for RelinearizationKeyShare {
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = RelinearizationKeyShare>,
    {
        let mut shares = iter.into_iter();
        let first = shares.next().ok_or(Error::TooFewValues(0, 1))?;
        shares.try_fold(first, |acc, sh| acc.combine(&sh))
    }
}

impl Aggregate<RelinearizationKeyShare> for RelinearizationKey {
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = RelinearizationKeyShare>,
    {
        let share = RelinearizationKeyShare::from_shares(iter)?;
        Ok(RelinearizationKey {
            ksk: KeySwitchingKey {
                par: share.par,
                c0: share.c0,
                c1: share.c1,
            },
        })
    }
}
