use std::sync::Arc;

use fhe::ckks::{
    add, eval_chebyshev_function, eval_sum, Ciphertext, CkksParameters, CkksParametersBuilder,
    Encoding, EvaluationKey, Plaintext, PublicKey, RelinearizationKey, SecretKey,
};
use fhe::mckks::{
    Aggregate, CommonRandomPoly, DecryptionShare, EvaluationKeyCrp, EvaluationKeyShare,
    PublicKeyShare, RelinearizationKeyShare,
};
use fhe::secret_sharing::{SecretSharer, ShamirSecretSharing};
use fhe_traits::{FheDecoder, FheEncoder, FheEncrypter};
use ndarray::Array2;
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::ThresholdEngine;
use crate::{CkksConfig, Error, Result};

impl From<fhe::Error> for Error {
    fn from(error: fhe::Error) -> Self {
        match error {
            fhe::Error::InconsistentShares(reason) => Error::InconsistentShares(reason),
            error => Error::Engine(Box::new(error)),
        }
    }
}

/// A Shamir share of a CKKS secret key, with one row of residues per
/// ciphertext modulus and one column per coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct CkksShare(Array2<u64>);

impl CkksShare {
    /// Returns the residues of the share.
    pub fn residues(&self) -> &Array2<u64> {
        &self.0
    }
}

impl Zeroize for CkksShare {
    fn zeroize(&mut self) {
        self.0.iter_mut().for_each(|v| v.zeroize());
    }
}

impl Drop for CkksShare {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for CkksShare {}

/// A [`ThresholdEngine`] running the multiparty CKKS scheme of the `fhe`
/// crate.
#[derive(Debug, Clone)]
pub struct CkksEngine {
    par: Arc<CkksParameters>,
}

impl CkksEngine {
    /// Create an engine on the given parameters.
    pub fn new(par: &Arc<CkksParameters>) -> Self {
        Self { par: par.clone() }
    }

    /// Create an engine from its configuration, generating the moduli from
    /// their sizes.
    pub fn from_config(config: &CkksConfig) -> Result<Self> {
        let mut builder = CkksParametersBuilder::new();
        builder
            .set_degree(config.degree)
            .set_moduli_sizes(&config.moduli_sizes);
        if let Some(bits) = config.smudging_bits {
            builder.set_smudging_bits(bits);
        }
        Ok(Self {
            par: builder.build_arc()?,
        })
    }

    /// Returns the parameters of the engine.
    pub fn parameters(&self) -> &Arc<CkksParameters> {
        &self.par
    }

    fn sharing(&self, parties: usize, threshold: usize) -> Result<ShamirSecretSharing> {
        Ok(ShamirSecretSharing::new(parties, threshold, self.par.clone())?
            .with_coefficient_bound(SecretKey::BOUND))
    }
}

impl ThresholdEngine for CkksEngine {
    type SecretKey = SecretKey;
    type PublicKey = PublicKey;
    type RoundKey = EvaluationKeyShare;
    type EvalKeyIncrement = RelinearizationKeyShare;
    type EvalKey = EvaluationKey;
    type Ciphertext = Ciphertext;
    type DecryptionShare = DecryptionShare;
    type Share = CkksShare;

    fn generate_joint_key_increment<R: RngCore + CryptoRng>(
        &self,
        prior: Option<&PublicKey>,
        rng: &mut R,
    ) -> Result<(SecretKey, PublicKey)> {
        let sk = SecretKey::random(&self.par, rng);
        let pk = match prior {
            Some(prior) => {
                let share = PublicKeyShare::new(&sk, prior.crp(), rng)?;
                let mut pk = prior.clone();
                pk.add_share(&share)?;
                pk
            }
            None => {
                let crp = CommonRandomPoly::new(&self.par, rng)?;
                PublicKey::from_shares([PublicKeyShare::new(&sk, crp, rng)?])?
            }
        };
        Ok((sk, pk))
    }

    fn generate_eval_key_increment<R: RngCore + CryptoRng>(
        &self,
        secret_key: &SecretKey,
        prior: Option<&EvaluationKeyShare>,
        rng: &mut R,
    ) -> Result<EvaluationKeyShare> {
        let crp = match prior {
            Some(prior) => prior.crp(),
            None => EvaluationKeyCrp::new(&self.par, rng)?,
        };
        Ok(EvaluationKeyShare::new(secret_key, &crp, rng)?)
    }

    fn combine_round_keys(
        &self,
        mut accumulated: EvaluationKeyShare,
        increment: &EvaluationKeyShare,
    ) -> Result<EvaluationKeyShare> {
        accumulated.add_share(increment)?;
        Ok(accumulated)
    }

    fn finalize_eval_key_increment<R: RngCore + CryptoRng>(
        &self,
        secret_key: &SecretKey,
        joint: &EvaluationKeyShare,
        rng: &mut R,
    ) -> Result<RelinearizationKeyShare> {
        Ok(RelinearizationKeyShare::new(secret_key, joint, rng)?)
    }

    fn combine_eval_key_increments(
        &self,
        a: &RelinearizationKeyShare,
        b: &RelinearizationKeyShare,
    ) -> Result<RelinearizationKeyShare> {
        Ok(a.combine(b)?)
    }

    fn finalize_eval_keys(
        &self,
        joint: &EvaluationKeyShare,
        combined: RelinearizationKeyShare,
    ) -> Result<EvaluationKey> {
        let rk = RelinearizationKey::from_shares([combined])?;
        Ok(joint.finalize(rk)?)
    }

    fn encrypt<R: RngCore + CryptoRng>(
        &self,
        public_key: &PublicKey,
        values: &[f64],
        rng: &mut R,
    ) -> Result<Ciphertext> {
        let pt = Zeroizing::new(Plaintext::try_encode(values, Encoding::new(), &self.par)?);
        let ct: Ciphertext = public_key.try_encrypt(&pt, rng)?;
        Ok(ct)
    }

    fn eval_add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        Ok(add(a, b)?)
    }

    fn eval_sum(&self, ct: &Ciphertext, eval_key: &EvaluationKey) -> Result<Ciphertext> {
        Ok(eval_sum(ct, eval_key)?)
    }

    fn eval_polynomial_approx<F: Fn(f64) -> f64>(
        &self,
        ct: &Ciphertext,
        f: F,
        lower: f64,
        upper: f64,
        degree: usize,
        eval_key: &EvaluationKey,
    ) -> Result<Ciphertext> {
        Ok(eval_chebyshev_function(
            f, ct, lower, upper, degree, eval_key,
        )?)
    }

    fn partial_decrypt_lead<R: RngCore + CryptoRng>(
        &self,
        secret_key: &SecretKey,
        ct: &Ciphertext,
        rng: &mut R,
    ) -> Result<DecryptionShare> {
        Ok(DecryptionShare::new_lead(secret_key, ct, rng)?)
    }

    fn partial_decrypt_main<R: RngCore + CryptoRng>(
        &self,
        secret_key: &SecretKey,
        ct: &Ciphertext,
        rng: &mut R,
    ) -> Result<DecryptionShare> {
        Ok(DecryptionShare::new_main(secret_key, ct, rng)?)
    }

    fn fuse_partials(&self, shares: Vec<DecryptionShare>) -> Result<Vec<f64>> {
        let pt = Zeroizing::new(Plaintext::from_shares(shares)?);
        Ok(Vec::<f64>::try_decode(&pt, None)?)
    }

    fn split_secret(
        &self,
        secret_key: &SecretKey,
        parties: usize,
        threshold: usize,
    ) -> Result<Vec<CkksShare>> {
        let shares = self.sharing(parties, threshold)?.split(&secret_key.coeffs)?;
        Ok(shares.into_iter().map(CkksShare).collect())
    }

    fn reconstruct_secret(
        &self,
        shares: &[(usize, &CkksShare)],
        parties: usize,
        threshold: usize,
    ) -> Result<SecretKey> {
        let residues = shares
            .iter()
            .map(|(id, share)| (*id, &share.0))
            .collect::<Vec<_>>();
        let coeffs = self.sharing(parties, threshold)?.reconstruct(&residues)?;
        Ok(SecretKey::new(coeffs, &self.par))
    }
}
