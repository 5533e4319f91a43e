//! The FHE engine behind the threshold protocol.
//!
//! The protocol only manipulates the engine's keys, ciphertexts and shares
//! through the [`ThresholdEngine`] trait. [`CkksEngine`] implements it with
//! the CKKS scheme of the `fhe` crate.

mod ckks;

pub use ckks::{CkksEngine, CkksShare};

use rand::{CryptoRng, RngCore};
use zeroize::ZeroizeOnDrop;

use crate::Result;

/// Operations of a multiparty FHE scheme with an additive joint secret key
/// `s = s_1 + ... + s_N`.
///
/// Key generation is chained: each party builds its increment on top of the
/// keys accumulated by the previous parties. The evaluation keys are
/// completed by a finalization phase in which every party contributes an
/// increment; these increments combine associatively and commutatively.
pub trait ThresholdEngine: Send + Sync {
    /// A party's secret key.
    type SecretKey: ZeroizeOnDrop + Send + Sync;
    /// A (joint) public key.
    type PublicKey: Clone + Send + Sync;
    /// The evaluation keys accumulated during the ceremony rounds.
    type RoundKey: Clone + Send + Sync;
    /// A party's contribution to the finalized evaluation keys.
    type EvalKeyIncrement: Clone + Send + Sync;
    /// The finalized evaluation keys, for multiplication and summation.
    type EvalKey: Send + Sync;
    /// A ciphertext.
    type Ciphertext: Clone + Send + Sync;
    /// A party's share of a decryption.
    type DecryptionShare: Clone + Send + Sync;
    /// A share of a secret key.
    type Share: Clone + ZeroizeOnDrop + Send + Sync;

    /// Generate a secret key and extend the public key of the previous
    /// parties with it; the first party starts from no key.
    fn generate_joint_key_increment<R: RngCore + CryptoRng>(
        &self,
        prior: Option<&Self::PublicKey>,
        rng: &mut R,
    ) -> Result<(Self::SecretKey, Self::PublicKey)>;

    /// Generate a party's round increment of the evaluation keys, on top of
    /// the keys accumulated by the previous parties.
    fn generate_eval_key_increment<R: RngCore + CryptoRng>(
        &self,
        secret_key: &Self::SecretKey,
        prior: Option<&Self::RoundKey>,
        rng: &mut R,
    ) -> Result<Self::RoundKey>;

    /// Fold a round increment into the accumulated evaluation keys.
    fn combine_round_keys(
        &self,
        accumulated: Self::RoundKey,
        increment: &Self::RoundKey,
    ) -> Result<Self::RoundKey>;

    /// Generate a party's finalization increment from the round keys of all
    /// the parties.
    fn finalize_eval_key_increment<R: RngCore + CryptoRng>(
        &self,
        secret_key: &Self::SecretKey,
        joint: &Self::RoundKey,
        rng: &mut R,
    ) -> Result<Self::EvalKeyIncrement>;

    /// Combine two finalization increments. The combination is associative
    /// and commutative.
    fn combine_eval_key_increments(
        &self,
        a: &Self::EvalKeyIncrement,
        b: &Self::EvalKeyIncrement,
    ) -> Result<Self::EvalKeyIncrement>;

    /// Assemble the evaluation keys from the round keys and the combination
    /// of all the finalization increments.
    fn finalize_eval_keys(
        &self,
        joint: &Self::RoundKey,
        combined: Self::EvalKeyIncrement,
    ) -> Result<Self::EvalKey>;

    /// Encode and encrypt values under a public key.
    fn encrypt<R: RngCore + CryptoRng>(
        &self,
        public_key: &Self::PublicKey,
        values: &[f64],
        rng: &mut R,
    ) -> Result<Self::Ciphertext>;

    /// Add two ciphertexts.
    fn eval_add(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Sum all the encrypted values; every slot of the result holds the sum.
    fn eval_sum(&self, ct: &Self::Ciphertext, eval_key: &Self::EvalKey)
        -> Result<Self::Ciphertext>;

    /// Evaluate a polynomial approximation of degree `degree` of `f` on
    /// `[lower, upper]`.
    fn eval_polynomial_approx<F: Fn(f64) -> f64>(
        &self,
        ct: &Self::Ciphertext,
        f: F,
        lower: f64,
        upper: f64,
        degree: usize,
        eval_key: &Self::EvalKey,
    ) -> Result<Self::Ciphertext>;

    /// Compute the lead party's decryption share.
    fn partial_decrypt_lead<R: RngCore + CryptoRng>(
        &self,
        secret_key: &Self::SecretKey,
        ct: &Self::Ciphertext,
        rng: &mut R,
    ) -> Result<Self::DecryptionShare>;

    /// Compute the decryption share of a party other than the lead.
    fn partial_decrypt_main<R: RngCore + CryptoRng>(
        &self,
        secret_key: &Self::SecretKey,
        ct: &Self::Ciphertext,
        rng: &mut R,
    ) -> Result<Self::DecryptionShare>;

    /// Fuse the decryption shares of all the parties, the lead's included,
    /// and decode the values.
    fn fuse_partials(&self, shares: Vec<Self::DecryptionShare>) -> Result<Vec<f64>>;

    /// Split a secret key into `parties` shares, any `threshold` of which
    /// reconstruct it. The share of party `k` is at index `k - 1`.
    fn split_secret(
        &self,
        secret_key: &Self::SecretKey,
        parties: usize,
        threshold: usize,
    ) -> Result<Vec<Self::Share>>;

    /// Reconstruct a secret key from at least `threshold` shares, given with
    /// the identifiers of their parties.
    fn reconstruct_secret(
        &self,
        shares: &[(usize, &Self::Share)],
        parties: usize,
        threshold: usize,
    ) -> Result<Self::SecretKey>;
}
