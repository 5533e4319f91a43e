//! Galois keys for the CKKS encryption scheme

use crate::ckks::{Ciphertext, CkksParameters, KeySwitchingKey, SecretKey};
use crate::{Error, Result};
use fhe_math::rq::{Poly, Representation};
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Galois key for the CKKS encryption scheme.
/// A Galois key is a special type of key switching key,
/// which switch from `s(x^i)` to `s(x)` where `s(x)` is the secret key.
#[derive(Debug, PartialEq, Clone)]
pub struct GaloisKey {
    pub(crate) element: usize,
    pub(crate) ksk: KeySwitchingKey,
}

impl GaloisKey {
    /// Generate a [`GaloisKey`] from a [`SecretKey`].
    pub fn new<R: RngCore + CryptoRng>(
        sk: &SecretKey,
        element: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let from = Self::substituted_secret(sk, element)?;
        let ksk = KeySwitchingKey::new(sk, &from, rng)?;
        Ok(Self { element, ksk })
    }

    /// Returns `s(x^element)` in the key switching context at level 0.
    pub(crate) fn substituted_secret(
        sk: &SecretKey,
        element: usize,
    ) -> Result<Zeroizing<Poly>> {
        let ctx = sk.par.key_ctx_at_level(0)?;
        let s = sk.poly_in(ctx, Representation::PowerBasis)?;
        let mut from = Zeroizing::new(s.substitute(element)?);
        from.change_representation(Representation::Ntt);
        Ok(from)
    }

    /// Returns the Galois element of the key.
    pub const fn element(&self) -> usize {
        self.element
    }

    /// Returns the parameters of the key.
    pub fn parameters(&self) -> &Arc<CkksParameters> {
        &self.ksk.par
    }

    /// Relinearize a [`Ciphertext`] using the [`GaloisKey`]
    pub fn relinearize(&self, ct: &Ciphertext) -> Result<Ciphertext> {
        if ct.c.len() != 2 {
            return Err(Error::TooManyValues(ct.c.len(), 2));
        }
        if ct.par != self.ksk.par {
            return Err(Error::incompatible_parameters());
        }

        let mut c0 = ct.c[0].clone();
        c0.change_representation(Representation::PowerBasis);
        let mut c0 = c0.substitute(self.element)?;
        c0.change_representation(Representation::Ntt);

        let mut c1 = ct.c[1].clone();
        c1.change_representation(Representation::PowerBasis);
        let mut c1 = c1.substitute(self.element)?;
        c1.change_representation(Representation::Ntt);

        let (k0, k1) = self.ksk.key_switch(&c1)?;
        c0 += &k0;

        Ciphertext::new(vec![c0, k1], ct.scale, &ct.par)
    }
}

#[cfg(test)]
mod tests {
    use super::GaloisKey;
    use crate::ckks::{Ciphertext, CkksParameters, Encoding, Plaintext, SecretKey};
    use fhe_traits::{FheDecoder, FheDecrypter, FheEncoder, FheEncrypter};
    use rand::thread_rng;
    use std::error::Error;

    #[test]
    fn rotation() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(2, 64)?;
        let sk = SecretKey::random(&params, &mut rng);
        let slots = params.slots();
        let values = (0..slots).map(|i| i as f64).collect::<Vec<_>>();
        let pt = Plaintext::try_encode(&values, Encoding::new(), &params)?;
        let ct: Ciphertext = sk.try_encrypt(&pt, &mut rng)?;

        for steps in [1, 2, 5, slots - 1] {
            let gk = GaloisKey::new(&sk, params.rotation_element(steps), &mut rng)?;
            assert_eq!(gk.element(), params.rotation_element(steps));
            let rotated = gk.relinearize(&ct)?;
            let decoded = Vec::<f64>::try_decode(&sk.try_decrypt(&rotated)?, None)?;
            for (i, d) in decoded.iter().enumerate() {
                assert!((values[(i + steps) % slots] - d).abs() < 1e-4);
            }
        }
        Ok(())
    }
}
