use std::sync::Arc;

use crate::ckks::{Ciphertext, CkksParameters, PublicKey, SecretKey};
use crate::{Error, Result};
use fhe_math::rq::{Poly, Representation};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use super::{Aggregate, CommonRandomPoly};

/// A party's share in the public key generation protocol.
///
/// The share is `p0_i = -a * s_i + e_i` for the common random polynomial
/// `a`. Shares can either be aggregated all at once with the [`Aggregate`]
/// impl, or folded one after the other into a running [`PublicKey`] with
/// [`PublicKey::add_share`].
#[derive(Debug, PartialEq, Clone)]
pub struct PublicKeyShare {
    pub(crate) par: Arc<CkksParameters>,
    pub(crate) crp: CommonRandomPoly,
    pub(crate) p0_share: Poly,
}

impl PublicKeyShare {
    /// Participate in a new public key generation protocol.
    ///
    /// 1. *Private input*: CKKS secret key share
    /// 2. *Public input*: common random polynomial
    pub fn new<R: RngCore + CryptoRng>(
        sk_share: &SecretKey,
        crp: CommonRandomPoly,
        rng: &mut R,
    ) -> Result<Self> {
        let par = sk_share.parameters().clone();
        let ctx = par.ctx_at_level(0)?;
        if crp.poly.ctx() != ctx {
            return Err(Error::MathError(fhe_math::Error::InvalidContext));
        }

        let s = sk_share.poly_in(ctx, Representation::Ntt)?;
        let e = Zeroizing::new(Poly::small(ctx, Representation::Ntt, par.variance(), rng)?);

        let mut p0_share = -&crp.poly;
        p0_share *= s.as_ref();
        p0_share += e.as_ref();

        Ok(Self { par, crp, p0_share })
    }

    /// Returns the common random polynomial of the share.
    pub fn crp(&self) -> &CommonRandomPoly {
        &self.crp
    }
}

impl Aggregate<PublicKeyShare> for PublicKey {
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = PublicKeyShare>,
    {
        let mut shares = iter.into_iter();
        let share = shares.next().ok_or(Error::TooFewValues(0, 1))?;
        let mut pk = PublicKey {
            c: Ciphertext::new(
                vec![share.p0_share.clone(), share.crp.poly.clone()],
                1.0,
                &share.par,
            )?,
            par: share.par,
        };
        for sh in shares {
            pk.add_share(&sh)?;
        }
        Ok(pk)
    }
}

impl PublicKey {
    /// Returns the common random polynomial of the key, on top of which the
    /// next party builds its share.
    pub fn crp(&self) -> CommonRandomPoly {
        CommonRandomPoly {
            poly: self.c.c[1].clone(),
        }
    }

    /// Fold a [`PublicKeyShare`] into the key. The share must have been
    /// generated on the common random polynomial of the key.
    pub fn add_share(&mut self, share: &PublicKeyShare) -> Result<()> {
        if self.par != share.par {
            return Err(Error::incompatible_parameters());
        }
        if self.c.c[1] != share.crp.poly {
            return Err(Error::DefaultError(
                "The public key share was not generated on the key's common random polynomial"
                    .to_string(),
            ));
        }
        self.c.c[0] += &share.p0_share;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PublicKeyShare;
    use crate::ckks::{Ciphertext, CkksParameters, Encoding, Plaintext, PublicKey, SecretKey};
    use crate::mckks::{Aggregate, AggregateIter, CommonRandomPoly};
    use fhe_traits::{FheDecoder, FheDecrypter, FheEncoder, FheEncrypter};
    use rand::thread_rng;
    use std::error::Error;

    const NUM_PARTIES: usize = 5;

    #[test]
    fn protocol_creates_valid_pk() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(2, 64)?;
        let sk_shares = (0..NUM_PARTIES)
            .map(|_| SecretKey::random(&params, &mut rng))
            .collect::<Vec<_>>();

        // The joint secret key, only assembled for testing.
        let mut coeffs = vec![0i64; params.degree()];
        for sk in &sk_shares {
            coeffs
                .iter_mut()
                .zip(sk.coeffs.iter())
                .for_each(|(c, s)| *c += s);
        }
        let sk = SecretKey::new(coeffs, &params);

        let crp = CommonRandomPoly::new(&params, &mut rng)?;
        let pk: PublicKey = sk_shares
            .iter()
            .map(|sk_share| PublicKeyShare::new(sk_share, crp.clone(), &mut rng))
            .collect::<crate::Result<Vec<_>>>()?
            .into_iter()
            .aggregate()?;

        // Chaining the shares gives the same key.
        let mut chained = PublicKey::from_shares([PublicKeyShare::new(
            &sk_shares[0],
            crp.clone(),
            &mut rng,
        )?])?;
        for sk_share in sk_shares.iter().skip(1) {
            let share = PublicKeyShare::new(sk_share, chained.crp(), &mut rng)?;
            chained.add_share(&share)?;
        }
        assert_eq!(chained.crp(), pk.crp());

        let values = vec![6.0, -2.0, 5.5];
        for key in [&pk, &chained] {
            let pt = Plaintext::try_encode(&values, Encoding::new(), &params)?;
            let ct: Ciphertext = key.try_encrypt(&pt, &mut rng)?;
            let decoded = Vec::<f64>::try_decode(&sk.try_decrypt(&ct)?, None)?;
            for (v, d) in values.iter().zip(decoded.iter()) {
                assert!((v - d).abs() < 1e-6);
            }
        }
        Ok(())
    }

    #[test]
    fn mismatched_crp() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(1, 16)?;
        let sk = SecretKey::random(&params, &mut rng);
        let a = PublicKeyShare::new(&sk, CommonRandomPoly::new(&params, &mut rng)?, &mut rng)?;
        let b = PublicKeyShare::new(&sk, CommonRandomPoly::new(&params, &mut rng)?, &mut rng)?;
        assert_ne!(a, b);
        let mut pk = PublicKey::from_shares([a])?;
        assert!(pk.add_share(&b).is_err());
        assert!(PublicKey::from_shares(Vec::<PublicKeyShare>::new()).is_err());
        Ok(())
    }
}
