//! Relinearization keys for the CKKS encryption scheme

use crate::ckks::{Ciphertext, CkksParameters, KeySwitchingKey, SecretKey};
use crate::{Error, Result};
use fhe_math::rq::Representation;
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Relinearization key for the CKKS encryption scheme.
/// A relinearization key is a special type of key switching key,
/// which switch from `s^2` to `s` where `s` is the secret key.
#[derive(Debug, PartialEq, Clone)]
pub struct RelinearizationKey {
    pub(crate) ksk: KeySwitchingKey,
}

impl RelinearizationKey {
    /// Generate a [`RelinearizationKey`] from a [`SecretKey`].
    pub fn new<R: RngCore + CryptoRng>(sk: &SecretKey, rng: &mut R) -> Result<Self> {
        let ctx = sk.par.key_ctx_at_level(0)?;
        let s = sk.poly_in(ctx, Representation::Ntt)?;
        let s2 = Zeroizing::new(s.as_ref() * s.as_ref());
        let ksk = KeySwitchingKey::new(sk, &s2, rng)?;
        Ok(Self { ksk })
    }

    /// Returns the parameters of the key.
    pub fn parameters(&self) -> &Arc<CkksParameters> {
        &self.ksk.par
    }

    /// Relinearize an "extended" ciphertext (c0, c1, c2) into a [`Ciphertext`]
    pub fn relinearizes(&self, ct: &mut Ciphertext) -> Result<()> {
        if ct.c.len() != 3 {
            return Err(Error::DefaultError(
                "Only supports relinearization of ciphertext with 3 parts".to_string(),
            ));
        }
        if ct.par != self.ksk.par {
            return Err(Error::incompatible_parameters());
        }

        let (c0, c1) = self.ksk.key_switch(&ct.c[2])?;
        ct.c[0] += &c0;
        ct.c[1] += &c1;
        ct.c.truncate(2);
        Ok(())
    }
}
