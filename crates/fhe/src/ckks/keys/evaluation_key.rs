//! Evaluation keys for the CKKS encryption scheme

use crate::ckks::{CkksParameters, GaloisKey, RelinearizationKey, SecretKey};
use crate::{Error, Result};
use rand::{CryptoRng, RngCore};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Evaluation key for the CKKS encryption scheme.
///
/// It holds the relinearization key used by multiplications and the Galois
/// keys needed to sum all the slots of a ciphertext.
#[derive(Debug, PartialEq, Clone)]
pub struct EvaluationKey {
    pub(crate) par: Arc<CkksParameters>,
    pub(crate) relinearization_key: RelinearizationKey,
    pub(crate) galois_keys: BTreeMap<usize, GaloisKey>,
}

impl EvaluationKey {
    /// Generate an [`EvaluationKey`] supporting multiplications and slot
    /// summation from a [`SecretKey`].
    pub fn new<R: RngCore + CryptoRng>(sk: &SecretKey, rng: &mut R) -> Result<Self> {
        let relinearization_key = RelinearizationKey::new(sk, rng)?;
        let galois_keys = sk
            .par
            .summation_elements()
            .into_iter()
            .map(|element| GaloisKey::new(sk, element, rng))
            .collect::<Result<Vec<_>>>()?;
        Self::from_keys(relinearization_key, galois_keys)
    }

    /// Assemble an [`EvaluationKey`] from a relinearization key and Galois
    /// keys defined on the same parameters.
    pub fn from_keys<I>(relinearization_key: RelinearizationKey, galois_keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = GaloisKey>,
    {
        let par = relinearization_key.parameters().clone();
        let mut keys = BTreeMap::new();
        for key in galois_keys {
            if key.parameters() != &par {
                return Err(Error::incompatible_parameters());
            }
            keys.insert(key.element, key);
        }
        Ok(Self {
            par,
            relinearization_key,
            galois_keys: keys,
        })
    }

    /// Returns the parameters of the key.
    pub fn parameters(&self) -> &Arc<CkksParameters> {
        &self.par
    }

    /// Returns the relinearization key.
    pub fn relinearization_key(&self) -> &RelinearizationKey {
        &self.relinearization_key
    }

    /// Returns the Galois key for a given element.
    pub fn galois_key(&self, element: usize) -> Result<&GaloisKey> {
        self.galois_keys
            .get(&element)
            .ok_or_else(|| Error::MissingKey(format!("Galois key for element {element}")))
    }

    /// Returns whether the key supports summing all the slots.
    pub fn supports_slot_sum(&self) -> bool {
        self.par
            .summation_elements()
            .iter()
            .all(|element| self.galois_keys.contains_key(element))
    }
}
