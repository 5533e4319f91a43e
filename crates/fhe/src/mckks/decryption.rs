use std::sync::Arc;

use crate::ckks::{Ciphertext, CkksParameters, Plaintext, SecretKey};
use crate::{Error, Result};
use fhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use fhe_util::sample_vec_normal;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use super::Aggregate;

/// The role of a [`DecryptionShare`] in the decryption protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionShareKind {
    /// The share of the lead party, which carries the first ciphertext
    /// component `c0`.
    Lead,
    /// The share of any other party.
    Main,
}

/// A party's share in the decryption protocol.
///
/// The share of a party holding `s_i` is `c1 * s_i + e`, to which the lead
/// party adds `c0`. The noise `e` is sampled with a standard deviation of
/// `2^smudging_bits` so that the shares hide the secret key shares. Use the
/// [`Aggregate`] impl to combine the shares of all parties into a
/// [`Plaintext`].
#[derive(Debug, PartialEq, Clone)]
pub struct DecryptionShare {
    pub(crate) par: Arc<CkksParameters>,
    pub(crate) kind: DecryptionShareKind,
    pub(crate) share: Poly,
    pub(crate) level: usize,
    pub(crate) scale: f64,
}

impl DecryptionShare {
    /// Generate the lead party's share.
    pub fn new_lead<R: RngCore + CryptoRng>(
        sk_share: &SecretKey,
        ct: &Ciphertext,
        rng: &mut R,
    ) -> Result<Self> {
        Self::new(sk_share, ct, DecryptionShareKind::Lead, rng)
    }

    /// Generate the share of a party other than the lead.
    pub fn new_main<R: RngCore + CryptoRng>(
        sk_share: &SecretKey,
        ct: &Ciphertext,
        rng: &mut R,
    ) -> Result<Self> {
        Self::new(sk_share, ct, DecryptionShareKind::Main, rng)
    }

    fn new<R: RngCore + CryptoRng>(
        sk_share: &SecretKey,
        ct: &Ciphertext,
        kind: DecryptionShareKind,
        rng: &mut R,
    ) -> Result<Self> {
        if sk_share.parameters() != ct.parameters() {
            return Err(Error::incompatible_parameters());
        }
        if ct.c.len() != 2 {
            return Err(Error::TooManyValues(ct.c.len(), 2));
        }
        let par = ct.parameters().clone();
        let ctx = ct.c[0].ctx();
        let s = sk_share.poly_in(ctx, Representation::Ntt)?;

        let noise = Zeroizing::new(
            sample_vec_normal(
                par.degree(),
                2f64.powi(par.smudging_bits() as i32),
                rng,
            )
            .map_err(Error::decryption_share)?,
        );
        let mut smudging = Zeroizing::new(Poly::try_convert_from(
            noise.as_slice(),
            ctx,
            Representation::PowerBasis,
        )?);
        smudging.change_representation(Representation::Ntt);

        let mut share = &ct.c[1] * s.as_ref();
        share += smudging.as_ref();
        if kind == DecryptionShareKind::Lead {
            share += &ct.c[0];
        }

        Ok(Self {
            par,
            kind,
            share,
            level: ct.level,
            scale: ct.scale,
        })
    }

    /// Returns the role of the share.
    pub const fn kind(&self) -> DecryptionShareKind {
        self.kind
    }

    /// Returns whether the share is the lead party's share.
    pub fn is_lead(&self) -> bool {
        self.kind == DecryptionShareKind::Lead
    }
}

impl Aggregate<DecryptionShare> for Plaintext {
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = DecryptionShare>,
    {
        let mut shares = iter.into_iter();
        let first = shares.next().ok_or(Error::TooFewValues(0, 1))?;
        let mut leads = usize::from(first.is_lead());
        let mut sum = first.share;
        for sh in shares {
            if sh.par != first.par || sh.level != first.level || sh.scale != first.scale {
                return Err(Error::decryption_share(
                    "shares were computed on different ciphertexts",
                ));
            }
            leads += usize::from(sh.is_lead());
            sum += &sh.share;
        }
        if leads != 1 {
            return Err(Error::decryption_share(format!(
                "expected exactly one lead share, got {leads}"
            )));
        }

        Ok(Plaintext {
            par: first.par,
            poly_ntt: sum,
            level: first.level,
            scale: first.scale,
        })
    }
}
