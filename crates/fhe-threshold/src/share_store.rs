//! Threshold sharing of secret keys.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::engine::ThresholdEngine;
use crate::{Error, PartyId, Result, ThresholdConfig};

/// The shares of one secret key, indexed by the party holding them.
pub type ShareSet<S> = BTreeMap<PartyId, S>;

/// Splits secret keys into shares and reconstructs them.
///
/// The store keeps no state besides the engine: every [`ShareSet`] is held
/// by whoever needs it for recovery.
#[derive(Debug)]
pub struct ShareStore<E: ThresholdEngine> {
    engine: Arc<E>,
}

impl<E: ThresholdEngine> Clone for ShareStore<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<E: ThresholdEngine> ShareStore<E> {
    /// Create a store on top of an engine.
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }

    /// Split a secret key into `parties` shares so that any `threshold` of
    /// them reconstruct it, while fewer reveal nothing.
    ///
    /// Fresh randomness is drawn on every call.
    pub fn split(
        &self,
        secret_key: &E::SecretKey,
        parties: usize,
        threshold: usize,
    ) -> Result<ShareSet<E::Share>> {
        let config = ThresholdConfig::new(parties, threshold)?;
        let shares = self.engine.split_secret(secret_key, parties, threshold)?;
        if shares.len() != parties {
            return Err(Error::engine(format!(
                "expected {parties} shares, the engine produced {}",
                shares.len()
            )));
        }
        Ok(config.party_ids().zip(shares).collect())
    }

    /// Reconstruct a secret key from the shares of at least `threshold`
    /// parties.
    ///
    /// Fails with [`Error::InsufficientShares`] when fewer shares are given,
    /// and with [`Error::InconsistentShares`] when the shares do not come
    /// from a single sharing.
    pub fn reconstruct<'a, I>(
        &self,
        shares: I,
        parties: usize,
        threshold: usize,
    ) -> Result<E::SecretKey>
    where
        I: IntoIterator<Item = (&'a PartyId, &'a E::Share)>,
        E::Share: 'a,
    {
        let config = ThresholdConfig::new(parties, threshold)?;
        let mut seen = BTreeSet::new();
        let mut selected = Vec::new();
        for (id, share) in shares {
            let id = config.check_party(*id)?;
            if !seen.insert(id) {
                return Err(Error::DuplicateParty(id));
            }
            selected.push((id.get(), share));
        }
        if selected.len() < threshold {
            return Err(Error::InsufficientShares {
                provided: selected.len(),
                required: threshold,
            });
        }
        self.engine
            .reconstruct_secret(&selected, parties, threshold)
    }
}
