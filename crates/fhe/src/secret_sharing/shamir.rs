//! Shamir Secret Sharing of polynomial coefficients.
//!
//! Every coefficient is shared modulo every ciphertext modulus `q_j` with an
//! independent random polynomial of degree `threshold - 1` over `Z_{q_j}`;
//! party `k` receives the evaluations at `x = k`.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::ckks::CkksParameters;
use crate::secret_sharing::traits::SecretSharer;
use crate::{Error, Result};
use fhe_math::zq::Modulus;
use ndarray::Array2;
use num_bigint_old::BigInt;
use num_traits::ToPrimitive;
use shamir_secret_sharing::ShamirSecretSharing as SSS;
use zeroize::Zeroizing;

/// Shamir Secret Sharing implementation for threshold CKKS operations.
#[derive(Debug, Clone)]
pub struct ShamirSecretSharing {
    /// Number of parties
    pub n: usize,
    /// Threshold for reconstruction
    pub threshold: usize,
    /// CKKS parameters
    pub params: Arc<CkksParameters>,
    /// Bound on the absolute value of the reconstructed coefficients
    coefficient_bound: Option<u64>,
}

impl ShamirSecretSharing {
    /// Create a new Shamir Secret Sharing instance.
    ///
    /// Returns an error unless `1 <= threshold <= n`.
    pub fn new(n: usize, threshold: usize, params: Arc<CkksParameters>) -> Result<Self> {
        if threshold == 0 || threshold > n {
            return Err(Error::invalid_threshold(threshold, n));
        }
        Ok(Self {
            n,
            threshold,
            params,
            coefficient_bound: None,
        })
    }

    /// Reject reconstructed coefficients larger than `bound` in absolute value.
    pub fn with_coefficient_bound(self, bound: u64) -> Self {
        Self {
            coefficient_bound: Some(bound),
            ..self
        }
    }

    fn moduli(&self) -> Result<&[Modulus]> {
        Ok(self.params.ctx_at_level(0)?.moduli_operators())
    }

    /// The sharing of one coefficient modulo `q`.
    fn sss(&self, q: &Modulus) -> SSS {
        SSS {
            threshold: self.threshold,
            // The crate requires more shares than the threshold; the shares
            // past the `n`-th are dropped.
            share_amount: self.n.max(self.threshold + 1),
            prime: BigInt::from(q.modulus()),
        }
    }

    fn residue(value: &BigInt, q: &Modulus) -> Result<u64> {
        let p = BigInt::from(q.modulus());
        ((value % &p + &p) % &p)
            .to_u64()
            .ok_or_else(|| Error::secret_sharing("share does not fit in a residue"))
    }
}

impl SecretSharer for ShamirSecretSharing {
    fn split(&self, coeffs: &[i64]) -> Result<Vec<Array2<u64>>> {
        let degree = self.params.degree();
        if coeffs.len() > degree {
            return Err(Error::TooManyValues(coeffs.len(), degree));
        }
        let moduli = self.moduli()?;
        let mut shares = vec![Array2::<u64>::zeros((moduli.len(), degree)); self.n];

        for (j, q) in moduli.iter().enumerate() {
            let sss = self.sss(q);
            for i in 0..degree {
                let secret = q.reduce_i64(coeffs.get(i).copied().unwrap_or(0));
                let c_shares = sss.split(BigInt::from(secret));
                for (share, (_, c_share)) in shares.iter_mut().zip(c_shares.iter()) {
                    share[[j, i]] = Self::residue(c_share, q)?;
                }
            }
        }
        Ok(shares)
    }

    fn reconstruct(&self, shares: &[(usize, &Array2<u64>)]) -> Result<Vec<i64>> {
        if shares.len() < self.threshold {
            return Err(Error::insufficient_shares(shares.len(), self.threshold));
        }
        let moduli = self.moduli()?;
        let degree = self.params.degree();
        let mut ids = BTreeSet::new();
        for (id, share) in shares {
            if *id == 0 || *id > self.n {
                return Err(Error::invalid_party_id(*id, self.n));
            }
            if !ids.insert(*id) {
                return Err(Error::secret_sharing(format!("duplicate share for party {id}")));
            }
            if share.dim() != (moduli.len(), degree) {
                return Err(Error::secret_sharing(format!(
                    "share of party {id} has shape {:?}, expected {:?}",
                    share.dim(),
                    (moduli.len(), degree)
                )));
            }
        }

        let (base, extra) = shares.split_at(self.threshold);
        let mut residues = Zeroizing::new(vec![vec![0u64; degree]; moduli.len()]);

        for (j, q) in moduli.iter().enumerate() {
            let sss = self.sss(q);
            let recover = |points: &[(usize, BigInt)]| Self::residue(&sss.recover(points), q);
            for i in 0..degree {
                let points = base
                    .iter()
                    .map(|(id, share)| (*id, BigInt::from(share[[j, i]])))
                    .collect::<Vec<_>>();
                residues[j][i] = recover(&points)?;

                // An extra share replacing a point of the quorum must give
                // back the same secret.
                for (id, share) in extra {
                    let mut swapped = points[1..].to_vec();
                    swapped.push((*id, BigInt::from(share[[j, i]])));
                    if recover(&swapped)? != residues[j][i] {
                        return Err(Error::InconsistentShares(format!(
                            "share of party {id} does not lie on the interpolated polynomial"
                        )));
                    }
                }
            }
        }

        (0..degree)
            .map(|i| {
                let c = moduli[0].center(residues[0][i]);
                for (j, q) in moduli.iter().enumerate().skip(1) {
                    if q.center(residues[j][i]) != c {
                        return Err(Error::InconsistentShares(format!(
                            "coefficient {i} differs across moduli"
                        )));
                    }
                }
                if let Some(bound) = self.coefficient_bound {
                    if c.unsigned_abs() > bound {
                        return Err(Error::InconsistentShares(format!(
                            "coefficient {i} exceeds the bound {bound}"
                        )));
                    }
                }
                Ok(c)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ShamirSecretSharing;
    use crate::ckks::{CkksParameters, SecretKey};
    use crate::secret_sharing::SecretSharer;
    use crate::Error;
    use fhe_util::variance;
    use proptest::prelude::*;
    use rand::seq::SliceRandom;
    use rand::thread_rng;
    use std::error::Error as StdError;

    #[test]
    fn split_and_reconstruct() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(2, 16)?;
        let sk = SecretKey::random(&params, &mut rng);
        let sss = ShamirSecretSharing::new(5, 3, params.clone())?
            .with_coefficient_bound(SecretKey::BOUND);
        let shares = sss.split(&sk.coeffs)?;
        assert_eq!(shares.len(), 5);
        assert_eq!(shares[0].dim(), (3, 16));

        for subset in [[1, 2, 3], [5, 2, 4], [3, 4, 5]] {
            let selected = subset
                .iter()
                .map(|id| (*id, &shares[id - 1]))
                .collect::<Vec<_>>();
            assert_eq!(sss.reconstruct(&selected)?, sk.coeffs.to_vec());
        }
        let all = (1..=5).map(|id| (id, &shares[id - 1])).collect::<Vec<_>>();
        assert_eq!(sss.reconstruct(&all)?, sk.coeffs.to_vec());
        Ok(())
    }

    #[test]
    fn errors() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(1, 16)?;
        assert!(ShamirSecretSharing::new(3, 0, params.clone()).is_err());
        assert!(ShamirSecretSharing::new(3, 4, params.clone()).is_err());

        let sk = SecretKey::random(&params, &mut rng);
        let sss = ShamirSecretSharing::new(5, 3, params.clone())?
            .with_coefficient_bound(SecretKey::BOUND);
        let mut shares = sss.split(&sk.coeffs)?;

        let two = [(1, &shares[0]), (2, &shares[1])];
        assert_eq!(sss.reconstruct(&two), Err(Error::TooFewValues(2, 3)));
        assert!(sss
            .reconstruct(&[(1, &shares[0]), (2, &shares[1]), (6, &shares[2])])
            .is_err());
        assert!(sss
            .reconstruct(&[(1, &shares[0]), (1, &shares[0]), (2, &shares[1])])
            .is_err());

        // Corrupt one share.
        shares[3][[0, 5]] = params.moduli()[0] - 1 - shares[3][[0, 5]];
        let with_corrupted = [
            (1, &shares[0]),
            (2, &shares[1]),
            (3, &shares[2]),
            (4, &shares[3]),
        ];
        assert!(matches!(
            sss.reconstruct(&with_corrupted),
            Err(Error::InconsistentShares(_))
        ));
        let only_corrupted = [(2, &shares[1]), (3, &shares[2]), (4, &shares[3])];
        assert!(matches!(
            sss.reconstruct(&only_corrupted),
            Err(Error::InconsistentShares(_))
        ));
        Ok(())
    }

    #[test]
    fn every_share_needed() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(1, 16)?;
        let sk = SecretKey::random(&params, &mut rng);
        for n in [1, 4] {
            let sss = ShamirSecretSharing::new(n, n, params.clone())?
                .with_coefficient_bound(SecretKey::BOUND);
            let shares = sss.split(&sk.coeffs)?;
            assert_eq!(shares.len(), n);
            let all = (1..=n).map(|id| (id, &shares[id - 1])).collect::<Vec<_>>();
            assert_eq!(sss.reconstruct(&all)?, sk.coeffs.to_vec());
        }
        Ok(())
    }

    #[test]
    fn lone_share_hides_the_secret() -> Result<(), Box<dyn StdError>> {
        let params = CkksParameters::default_arc(1, 1024)?;
        let sss = ShamirSecretSharing::new(3, 2, params.clone())?;
        let q = params.moduli()[0] as f64;

        // The share of a party is uniform whatever the secret.
        let zeros = vec![0i64; params.degree()];
        let ones = vec![1i64; params.degree()];
        for secret in [zeros, ones] {
            let shares = sss.split(&secret)?;
            let normalized = shares[0]
                .row(0)
                .iter()
                .map(|v| *v as f64 / q)
                .collect::<Vec<_>>();
            let mean = normalized.iter().sum::<f64>() / normalized.len() as f64;
            assert!((mean - 0.5).abs() < 0.05);
            assert!((variance(&normalized) - 1.0 / 12.0).abs() < 0.02);
        }
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]
        #[test]
        fn round_trip(n in 1usize..8, t_seed in 0usize..8) {
            let mut rng = thread_rng();
            let threshold = t_seed % n + 1;
            let params = CkksParameters::default_arc(1, 8).unwrap();
            let sk = SecretKey::random(&params, &mut rng);
            let sss = ShamirSecretSharing::new(n, threshold, params).unwrap();
            let shares = sss.split(&sk.coeffs).unwrap();

            let mut ids = (1..=n).collect::<Vec<_>>();
            ids.shuffle(&mut rng);
            let selected = ids
                .iter()
                .take(threshold)
                .map(|id| (*id, &shares[id - 1]))
                .collect::<Vec<_>>();
            prop_assert_eq!(sss.reconstruct(&selected).unwrap(), sk.coeffs.to_vec());
        }
    }
}
