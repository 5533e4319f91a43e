//! Fault-tolerant threshold decryption.
//!
//! Every party of the ceremony contributes a partial decryption: the lead
//! party a lead partial, the others a main partial. When a party does not
//! respond, the coordinator reconstructs its secret key from the shares held
//! by the responding parties and computes the missing partial in its stead.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::engine::ThresholdEngine;
use crate::{Error, Party, PartyId, Result, ShareSet, ShareStore, ThresholdConfig};

/// A party's partial decryption of a ciphertext.
#[derive(Debug, Clone)]
pub enum PartialDecryption<S> {
    /// The partial of the lead party, which seeds the fusion.
    Lead {
        /// The party which produced the partial.
        party: PartyId,
        /// The decryption share.
        share: S,
    },
    /// The partial of any other party.
    Main {
        /// The party which produced the partial.
        party: PartyId,
        /// The decryption share.
        share: S,
    },
}

impl<S> PartialDecryption<S> {
    /// Returns the party which produced the partial.
    pub const fn party(&self) -> PartyId {
        match self {
            Self::Lead { party, .. } | Self::Main { party, .. } => *party,
        }
    }

    /// Returns whether this is the lead partial.
    pub const fn is_lead(&self) -> bool {
        matches!(self, Self::Lead { .. })
    }

    fn into_share(self) -> S {
        match self {
            Self::Lead { share, .. } | Self::Main { share, .. } => share,
        }
    }
}

/// The state of a [`DecryptionCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Partial decryptions are being submitted or recovered.
    CollectingPartials,
    /// The partial decryptions are being fused.
    Fusing,
    /// The plaintext was recovered; the partials are consumed.
    Done,
}

/// The outcome of the comparison of a decrypted value against a threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    /// Whether the value exceeds the threshold by more than the margin.
    pub above: bool,
    /// The decrypted value.
    pub recovered: f64,
}

impl Verdict {
    /// Compare a decrypted value against `threshold`. The value is above when
    /// it exceeds the threshold by more than `margin`, which absorbs the
    /// overshoot of the approximation around the threshold.
    pub fn new(recovered: f64, threshold: f64, margin: f64) -> Self {
        Self {
            above: recovered - threshold > margin,
            recovered,
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.above { "True" } else { "False" })
    }
}

/// Collects the partial decryptions of one ciphertext, substitutes the
/// partials of missing parties, and fuses them into the plaintext values.
pub struct DecryptionCoordinator<E: ThresholdEngine> {
    engine: Arc<E>,
    config: ThresholdConfig,
    lead: PartyId,
    ciphertext: E::Ciphertext,
    shares: BTreeMap<PartyId, ShareSet<E::Share>>,
    partials: BTreeMap<PartyId, PartialDecryption<E::DecryptionShare>>,
    state: CoordinatorState,
}

impl<E: ThresholdEngine> DecryptionCoordinator<E> {
    /// Create a coordinator for the decryption of `ciphertext` by the parties
    /// of `config`. Party [`PartyId::LEAD`] leads the decryption.
    pub fn new(engine: Arc<E>, config: ThresholdConfig, ciphertext: E::Ciphertext) -> Self {
        Self {
            engine,
            config,
            lead: PartyId::LEAD,
            ciphertext,
            shares: BTreeMap::new(),
            partials: BTreeMap::new(),
            state: CoordinatorState::CollectingPartials,
        }
    }

    /// Register the shares of the secret key of `owner`, so that its partial
    /// can be recovered if it does not respond.
    pub fn with_shares(mut self, owner: PartyId, shares: ShareSet<E::Share>) -> Self {
        self.shares.insert(owner, shares);
        self
    }

    /// Returns the state of the coordinator.
    pub const fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Returns the ciphertext being decrypted.
    pub fn ciphertext(&self) -> &E::Ciphertext {
        &self.ciphertext
    }

    /// Compute the lead partial decryption of `party`.
    pub fn partial_decrypt_lead<R: RngCore + CryptoRng>(
        &self,
        party: &Party<E>,
        rng: &mut R,
    ) -> Result<PartialDecryption<E::DecryptionShare>> {
        Ok(PartialDecryption::Lead {
            party: party.id(),
            share: self
                .engine
                .partial_decrypt_lead(party.secret_key(), &self.ciphertext, rng)?,
        })
    }

    /// Compute the main partial decryption of `party`.
    pub fn partial_decrypt_main<R: RngCore + CryptoRng>(
        &self,
        party: &Party<E>,
        rng: &mut R,
    ) -> Result<PartialDecryption<E::DecryptionShare>> {
        Ok(PartialDecryption::Main {
            party: party.id(),
            share: self
                .engine
                .partial_decrypt_main(party.secret_key(), &self.ciphertext, rng)?,
        })
    }

    fn partial_decrypt<R: RngCore + CryptoRng>(
        &self,
        party: &Party<E>,
        rng: &mut R,
    ) -> Result<PartialDecryption<E::DecryptionShare>> {
        if party.id() == self.lead {
            self.partial_decrypt_lead(party, rng)
        } else {
            self.partial_decrypt_main(party, rng)
        }
    }

    /// Submit a partial decryption.
    pub fn submit(&mut self, partial: PartialDecryption<E::DecryptionShare>) -> Result<()> {
        if self.state != CoordinatorState::CollectingPartials {
            return Err(Error::AlreadyFused);
        }
        let party = self.config.check_party(partial.party())?;
        if self.partials.contains_key(&party) {
            return Err(Error::DuplicateParty(party));
        }
        // Only the lead submits the lead partial.
        match (partial.is_lead(), party == self.lead) {
            (true, false) => return Err(Error::DuplicateLeadPartial(party)),
            (false, true) => return Err(Error::MainPartialFromLead(party)),
            _ => {}
        }
        debug!(party = %party, lead = partial.is_lead(), "Partial decryption submitted");
        self.partials.insert(party, partial);
        Ok(())
    }

    /// Returns the parties whose partial decryption is missing.
    pub fn missing(&self) -> Vec<PartyId> {
        self.config
            .party_ids()
            .filter(|party| !self.partials.contains_key(party))
            .collect()
    }

    /// Compute the partial decryptions of the missing parties from their
    /// secret keys, reconstructed from the shares held by the parties which
    /// responded. Returns the recovered parties.
    ///
    /// Fails with [`Error::QuorumNotMet`] when fewer than `T` responding
    /// parties hold a share of a missing key, and with
    /// [`Error::UnrecoverableParty`] when the key of a missing party was never
    /// shared.
    pub fn recover_missing<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> Result<Vec<PartyId>> {
        if self.state != CoordinatorState::CollectingPartials {
            return Err(Error::AlreadyFused);
        }
        let missing = self.missing();
        if missing.is_empty() {
            return Ok(missing);
        }

        let responding = self.partials.keys().copied().collect::<BTreeSet<_>>();
        let threshold = self.config.threshold();
        if responding.len() < threshold {
            return Err(Error::QuorumNotMet {
                available: responding.len(),
                required: threshold,
            });
        }
        if let Some(party) = missing.iter().find(|party| !self.shares.contains_key(*party)) {
            return Err(Error::UnrecoverableParty(*party));
        }

        let store = ShareStore::new(self.engine.clone());
        for party in &missing {
            let available = self.shares[party]
                .iter()
                .filter(|(holder, _)| responding.contains(*holder))
                .collect::<Vec<_>>();
            warn!(
                party = %party,
                available = available.len(),
                required = threshold,
                "Party did not respond, recovering its key"
            );
            if available.len() < threshold {
                return Err(Error::QuorumNotMet {
                    available: available.len(),
                    required: threshold,
                });
            }

            let substitute = store
                .reconstruct(available, self.config.parties(), threshold)
                .map_err(|e| match e {
                    Error::InsufficientShares { provided, required } => Error::QuorumNotMet {
                        available: provided,
                        required,
                    },
                    e => e,
                })?;
            let share = if *party == self.lead {
                self.engine
                    .partial_decrypt_lead(&substitute, &self.ciphertext, rng)
                    .map(|share| PartialDecryption::Lead {
                        party: *party,
                        share,
                    })
            } else {
                self.engine
                    .partial_decrypt_main(&substitute, &self.ciphertext, rng)
                    .map(|share| PartialDecryption::Main {
                        party: *party,
                        share,
                    })
            }?;
            drop(substitute);
            self.submit(share)?;
            info!(party = %party, "Recovered partial decryption");
        }
        Ok(missing)
    }

    /// Fuse the partial decryptions into the plaintext values.
    ///
    /// Every party must be represented exactly once, and one of the partials
    /// must be the lead partial.
    pub fn finish(&mut self) -> Result<Vec<f64>> {
        if self.state != CoordinatorState::CollectingPartials {
            return Err(Error::AlreadyFused);
        }
        if !self.partials.values().any(PartialDecryption::is_lead) {
            return Err(Error::MissingLeadPartial);
        }
        if self.partials.len() < self.config.threshold() {
            return Err(Error::QuorumNotMet {
                available: self.partials.len(),
                required: self.config.threshold(),
            });
        }
        if let Some(party) = self.missing().first() {
            return Err(Error::MissingPartial(*party));
        }

        self.state = CoordinatorState::Fusing;
        let shares = std::mem::take(&mut self.partials)
            .into_values()
            .map(PartialDecryption::into_share)
            .collect::<Vec<_>>();
        let values = self.engine.fuse_partials(shares)?;
        self.state = CoordinatorState::Done;
        info!(parties = self.config.parties(), "Partial decryptions fused");
        Ok(values)
    }

    /// Decrypt with the parties in `responding`, which compute their partials
    /// in parallel, recover the partials of the other parties, and fuse.
    pub fn decrypt<'a, I, R>(&mut self, responding: I, rng: &mut R) -> Result<Vec<f64>>
    where
        I: IntoIterator<Item = &'a Party<E>>,
        R: RngCore + CryptoRng,
        E: 'a,
    {
        let parties = responding.into_iter().collect::<Vec<_>>();
        let seeds = parties
            .iter()
            .map(|_| {
                let mut seed = <ChaCha20Rng as SeedableRng>::Seed::default();
                rng.fill_bytes(&mut seed);
                seed
            })
            .collect::<Vec<_>>();

        let partials = parties
            .par_iter()
            .zip(seeds.into_par_iter())
            .map(|(party, seed)| {
                let mut rng = ChaCha20Rng::from_seed(seed);
                self.partial_decrypt(party, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;
        for partial in partials {
            self.submit(partial)?;
        }
        self.recover_missing(rng)?;
        self.finish()
    }
}

impl<E: ThresholdEngine> Debug for DecryptionCoordinator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionCoordinator")
            .field("config", &self.config)
            .field("lead", &self.lead)
            .field("state", &self.state)
            .field("shared", &self.shares.keys().collect::<Vec<_>>())
            .field("partials", &self.partials.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
