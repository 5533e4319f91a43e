//! The sequential key generation ceremony.
//!
//! Party `i` runs round `i`: it generates its secret key, extends the joint
//! public key left by party `i - 1`, and extends the joint evaluation keys
//! the same way. Once every party has contributed, a finalization phase
//! turns the joint evaluation keys into a relinearization key for the joint
//! secret; the per-party finalization increments are independent and are
//! computed in parallel.

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use tracing::{error, info};

use crate::engine::ThresholdEngine;
use crate::{Error, Party, PartyId, Result, ShareSet, ShareStore, ThresholdConfig};

/// The state of a [`KeyCeremony`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyState {
    /// Waiting for the contribution of the given party.
    AwaitingRound(usize),
    /// Every party contributed; the evaluation keys are not finalized yet.
    AwaitingFinalization,
    /// The joint keys are final.
    KeysFinalized,
}

/// The state threaded through the rounds of a [`KeyCeremony`].
pub struct CeremonyContext<E: ThresholdEngine> {
    state: CeremonyState,
    public_key: Option<E::PublicKey>,
    round_key: Option<E::RoundKey>,
    eval_key: Option<E::EvalKey>,
    parties: BTreeMap<PartyId, Party<E>>,
    lead_shares: Option<ShareSet<E::Share>>,
}

impl<E: ThresholdEngine> CeremonyContext<E> {
    /// Returns the state of the ceremony.
    pub const fn state(&self) -> CeremonyState {
        self.state
    }

    /// Returns the joint public key of the parties which already
    /// contributed.
    pub fn public_key(&self) -> Option<&E::PublicKey> {
        self.public_key.as_ref()
    }

    /// Returns the finalized evaluation keys.
    pub fn eval_key(&self) -> Option<&E::EvalKey> {
        self.eval_key.as_ref()
    }

    /// Returns the parties which already contributed.
    pub fn parties(&self) -> impl Iterator<Item = &Party<E>> {
        self.parties.values()
    }

    /// Returns the shares of the lead key, once it has been shared.
    pub fn lead_shares(&self) -> Option<&ShareSet<E::Share>> {
        self.lead_shares.as_ref()
    }

    fn round(&self) -> usize {
        match self.state {
            CeremonyState::AwaitingRound(round) => round,
            _ => self.parties.len() + 1,
        }
    }

    /// Consume a finalized ceremony into its keys.
    pub fn into_outcome(self) -> Result<CeremonyOutcome<E>> {
        let round = self.round();
        match (self.state, self.public_key, self.eval_key) {
            (CeremonyState::KeysFinalized, Some(public_key), Some(eval_key)) => {
                Ok(CeremonyOutcome {
                    public_key: Arc::new(public_key),
                    eval_key: Arc::new(eval_key),
                    parties: self.parties,
                    lead_shares: self.lead_shares,
                })
            }
            _ => Err(Error::CeremonyRoundFailed {
                round,
                reason: "the keys are not finalized".to_string(),
            }),
        }
    }
}

impl<E: ThresholdEngine> Debug for CeremonyContext<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CeremonyContext")
            .field("state", &self.state)
            .field("parties", &self.parties.keys().collect::<Vec<_>>())
            .field("lead_shares", &self.lead_shares.is_some())
            .finish_non_exhaustive()
    }
}

/// The keys produced by a [`KeyCeremony`].
pub struct CeremonyOutcome<E: ThresholdEngine> {
    /// The joint public key.
    pub public_key: Arc<E::PublicKey>,
    /// The joint evaluation keys.
    pub eval_key: Arc<E::EvalKey>,
    /// The key material of every party.
    pub parties: BTreeMap<PartyId, Party<E>>,
    /// The shares of the lead key, when it was shared.
    pub lead_shares: Option<ShareSet<E::Share>>,
}

/// Drives the rounds of the joint key generation.
#[derive(Debug)]
pub struct KeyCeremony<E: ThresholdEngine> {
    engine: Arc<E>,
    config: ThresholdConfig,
    share_lead_key: bool,
}

impl<E: ThresholdEngine> KeyCeremony<E> {
    /// Create a ceremony between the parties of `config`. When
    /// `share_lead_key` is set, the key of the lead party is split among all
    /// the parties right after the first round.
    pub fn new(engine: Arc<E>, config: ThresholdConfig, share_lead_key: bool) -> Self {
        Self {
            engine,
            config,
            share_lead_key,
        }
    }

    /// Start a new ceremony, waiting for the first party.
    pub fn start(&self) -> CeremonyContext<E> {
        info!(
            parties = self.config.parties(),
            threshold = self.config.threshold(),
            "Starting key ceremony"
        );
        CeremonyContext {
            state: CeremonyState::AwaitingRound(1),
            public_key: None,
            round_key: None,
            eval_key: None,
            parties: BTreeMap::new(),
            lead_shares: None,
        }
    }

    /// Run the round of `party`, which must be the party the ceremony is
    /// waiting for.
    pub fn round<R: RngCore + CryptoRng>(
        &self,
        ctx: CeremonyContext<E>,
        party: PartyId,
        rng: &mut R,
    ) -> Result<CeremonyContext<E>> {
        let round = ctx.round();
        if ctx.state != CeremonyState::AwaitingRound(party.get()) {
            let reason = match ctx.state {
                CeremonyState::AwaitingRound(expected) => {
                    format!("expected party {expected}, got party {party}")
                }
                _ => format!("all parties already contributed, got party {party}"),
            };
            error!(round, party = %party, reason = %reason, "Ceremony round rejected");
            return Err(Error::CeremonyRoundFailed { round, reason });
        }

        self.contribute(ctx, party, rng).map_err(|e| {
            error!(round, party = %party, error = %e, "Ceremony round failed");
            Error::round_failed(round, &e)
        })
    }

    fn contribute<R: RngCore + CryptoRng>(
        &self,
        mut ctx: CeremonyContext<E>,
        party: PartyId,
        rng: &mut R,
    ) -> Result<CeremonyContext<E>> {
        let round = party.get();
        let (secret_key, public_key) = self
            .engine
            .generate_joint_key_increment(ctx.public_key.as_ref(), rng)?;
        let increment =
            self.engine
                .generate_eval_key_increment(&secret_key, ctx.round_key.as_ref(), rng)?;
        let round_key = match ctx.round_key.take() {
            Some(accumulated) => self.engine.combine_round_keys(accumulated, &increment)?,
            None => increment,
        };

        if round == 1 && self.share_lead_key {
            let shares = ShareStore::new(self.engine.clone()).split(
                &secret_key,
                self.config.parties(),
                self.config.threshold(),
            )?;
            info!(
                party = %party,
                shares = shares.len(),
                threshold = self.config.threshold(),
                "Shared the lead key"
            );
            ctx.lead_shares = Some(shares);
        }

        ctx.parties.insert(
            party,
            Party {
                id: party,
                secret_key,
                public_key: public_key.clone(),
            },
        );
        ctx.public_key = Some(public_key);
        ctx.round_key = Some(round_key);
        ctx.state = if round == self.config.parties() {
            CeremonyState::AwaitingFinalization
        } else {
            CeremonyState::AwaitingRound(round + 1)
        };
        info!(round, party = %party, "Ceremony round completed");
        Ok(ctx)
    }

    /// Finalize the evaluation keys once every party contributed.
    ///
    /// Every party derives its finalization increment with its own RNG,
    /// seeded from `rng`; the increments are then combined by a balanced
    /// parallel reduction.
    pub fn finalize<R: RngCore + CryptoRng>(
        &self,
        mut ctx: CeremonyContext<E>,
        rng: &mut R,
    ) -> Result<CeremonyContext<E>> {
        let round = ctx.round();
        let joint = match (ctx.state, ctx.round_key.as_ref()) {
            (CeremonyState::AwaitingFinalization, Some(joint)) => joint,
            _ => {
                let reason = format!("cannot finalize in state {:?}", ctx.state);
                error!(round, reason = %reason, "Ceremony finalization rejected");
                return Err(Error::CeremonyRoundFailed { round, reason });
            }
        };

        let parties = ctx.parties.values().collect::<Vec<_>>();
        let seeds = parties
            .iter()
            .map(|_| {
                let mut seed = <ChaCha20Rng as SeedableRng>::Seed::default();
                rng.fill_bytes(&mut seed);
                seed
            })
            .collect::<Vec<_>>();

        let eval_key = parties
            .par_iter()
            .zip(seeds.into_par_iter())
            .map(|(party, seed)| {
                let mut rng = ChaCha20Rng::from_seed(seed);
                self.engine
                    .finalize_eval_key_increment(party.secret_key(), joint, &mut rng)
            })
            .try_reduce_with(|a, b| self.engine.combine_eval_key_increments(&a, &b))
            .ok_or_else(|| Error::CeremonyRoundFailed {
                round,
                reason: "no party contributed".to_string(),
            })
            .and_then(|combined| combined)
            .and_then(|combined| self.engine.finalize_eval_keys(joint, combined))
            .map_err(|e| {
                error!(round, error = %e, "Ceremony finalization failed");
                Error::round_failed(round, &e)
            })?;

        ctx.eval_key = Some(eval_key);
        ctx.state = CeremonyState::KeysFinalized;
        info!(parties = ctx.parties.len(), "Ceremony keys finalized");
        Ok(ctx)
    }

    /// Run every round in order, then the finalization.
    pub fn run<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<CeremonyOutcome<E>> {
        let ctx = self
            .config
            .party_ids()
            .try_fold(self.start(), |ctx, party| self.round(ctx, party, rng))?;
        self.finalize(ctx, rng)?.into_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::{CeremonyState, KeyCeremony};
    use crate::engine::{CkksEngine, ThresholdEngine};
    use crate::{Error, PartyId, ShareStore, ThresholdConfig};
    use fhe::ckks::CkksParameters;
    use rand::thread_rng;
    use std::error::Error as StdError;
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn ceremony(
        parties: usize,
        threshold: usize,
        share_lead_key: bool,
    ) -> Result<KeyCeremony<CkksEngine>, Box<dyn StdError>> {
        let params = CkksParameters::default_arc(2, 32)?;
        Ok(KeyCeremony::new(
            Arc::new(CkksEngine::new(&params)),
            ThresholdConfig::new(parties, threshold)?,
            share_lead_key,
        ))
    }

    #[test]
    #[traced_test]
    fn rounds() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let ceremony = ceremony(3, 2, true)?;
        let mut ctx = ceremony.start();
        assert_eq!(ctx.state(), CeremonyState::AwaitingRound(1));
        assert!(ctx.public_key().is_none());

        for id in 1..=3 {
            ctx = ceremony.round(ctx, PartyId::new(id), &mut rng)?;
            assert_eq!(ctx.parties().count(), id);
            assert_eq!(
                ctx.parties().last().map(|p| p.public_key()),
                ctx.public_key()
            );
        }
        assert_eq!(ctx.state(), CeremonyState::AwaitingFinalization);
        assert!(ctx.eval_key().is_none());
        assert_eq!(ctx.lead_shares().map(|s| s.len()), Some(3));

        let ctx = ceremony.finalize(ctx, &mut rng)?;
        assert_eq!(ctx.state(), CeremonyState::KeysFinalized);
        assert!(ctx.eval_key().is_some_and(|ek| ek.supports_slot_sum()));

        let outcome = ctx.into_outcome()?;
        assert_eq!(outcome.parties.len(), 3);

        // The shares rebuild the lead key.
        let shares = outcome.lead_shares.ok_or("missing lead shares")?;
        let store = ShareStore::new(ceremony.engine.clone());
        let lead = &outcome.parties[&PartyId::LEAD];
        let subset = shares.iter().skip(1);
        assert_eq!(&store.reconstruct(subset, 3, 2)?, lead.secret_key());

        assert!(logs_contain("Ceremony round completed"));
        assert!(logs_contain("Shared the lead key"));
        assert!(logs_contain("Ceremony keys finalized"));
        Ok(())
    }

    #[test]
    #[traced_test]
    fn out_of_order_rounds() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let ceremony = ceremony(2, 1, false)?;

        let ctx = ceremony.start();
        assert!(matches!(
            ceremony.round(ctx, PartyId::new(2), &mut rng),
            Err(Error::CeremonyRoundFailed { round: 1, .. })
        ));
        assert!(logs_contain("Ceremony round rejected"));

        let ctx = ceremony.round(ceremony.start(), PartyId::new(1), &mut rng)?;
        assert!(ctx.lead_shares().is_none());
        let ctx = ceremony.finalize(ctx, &mut rng);
        assert!(matches!(ctx, Err(Error::CeremonyRoundFailed { round: 2, .. })));

        let ctx = ceremony.round(ceremony.start(), PartyId::new(1), &mut rng)?;
        let ctx = ceremony.round(ctx, PartyId::new(2), &mut rng)?;
        assert!(ceremony.start().into_outcome().is_err());
        let ctx = ceremony.finalize(ctx, &mut rng)?;
        assert!(matches!(
            ceremony.round(ctx, PartyId::new(3), &mut rng),
            Err(Error::CeremonyRoundFailed { round: 3, .. })
        ));
        Ok(())
    }

    #[test]
    fn run_produces_working_keys() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let ceremony = ceremony(4, 3, true)?;
        let outcome = ceremony.run(&mut rng)?;
        assert_eq!(
            outcome.parties.keys().map(|id| id.get()).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );

        let engine = &ceremony.engine;
        let ct = engine.encrypt(&outcome.public_key, &[3.0, 4.0], &mut rng)?;
        let ct = engine.eval_sum(&ct, &outcome.eval_key)?;
        let mut shares = Vec::new();
        for (id, party) in &outcome.parties {
            shares.push(if *id == PartyId::LEAD {
                engine.partial_decrypt_lead(party.secret_key(), &ct, &mut rng)?
            } else {
                engine.partial_decrypt_main(party.secret_key(), &ct, &mut rng)?
            });
        }
        let values = engine.fuse_partials(shares)?;
        assert!(values.iter().all(|v| (v - 7.0).abs() < 1e-3));
        Ok(())
    }
}
