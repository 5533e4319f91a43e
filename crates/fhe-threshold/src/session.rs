//! A complete run of the protocol, from the key ceremony to the verdict.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug};
use std::sync::Arc;

use rand::{CryptoRng, RngCore};
use tracing::info;

use crate::engine::{CkksEngine, ThresholdEngine};
use crate::{
    AggregationSession, DecryptionCoordinator, Error, KeyCeremony, Party, PartyId, Result,
    SessionConfig, ShareSet, ThresholdEvaluator, Verdict,
};

/// The joint keys of a committee, and the configuration of the comparisons
/// it runs.
pub struct ThresholdSession<E: ThresholdEngine> {
    engine: Arc<E>,
    config: SessionConfig,
    public_key: Arc<E::PublicKey>,
    eval_key: Arc<E::EvalKey>,
    parties: BTreeMap<PartyId, Party<E>>,
    lead_shares: Option<ShareSet<E::Share>>,
}

impl ThresholdSession<CkksEngine> {
    /// Build the CKKS engine described by the configuration and run the key
    /// ceremony.
    pub fn from_config<R: RngCore + CryptoRng>(
        config: SessionConfig,
        rng: &mut R,
    ) -> Result<Self> {
        config.validate()?;
        let engine = Arc::new(CkksEngine::from_config(&config.ckks)?);
        Self::setup(engine, config, rng)
    }
}

impl<E: ThresholdEngine> ThresholdSession<E> {
    /// Validate the configuration and run the key ceremony.
    pub fn setup<R: RngCore + CryptoRng>(
        engine: Arc<E>,
        config: SessionConfig,
        rng: &mut R,
    ) -> Result<Self> {
        config.validate()?;
        let outcome =
            KeyCeremony::new(engine.clone(), config.committee, config.share_lead_key).run(rng)?;
        Ok(Self {
            engine,
            config,
            public_key: outcome.public_key,
            eval_key: outcome.eval_key,
            parties: outcome.parties,
            lead_shares: outcome.lead_shares,
        })
    }

    /// Returns the configuration of the session.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the engine.
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Returns the joint public key.
    pub fn public_key(&self) -> &Arc<E::PublicKey> {
        &self.public_key
    }

    /// Returns the joint evaluation keys.
    pub fn eval_key(&self) -> &Arc<E::EvalKey> {
        &self.eval_key
    }

    /// Returns the key material of a party.
    pub fn party(&self, id: PartyId) -> Option<&Party<E>> {
        self.parties.get(&id)
    }

    /// Returns the key material of all the parties.
    pub fn parties(&self) -> impl Iterator<Item = &Party<E>> {
        self.parties.values()
    }

    /// An aggregation session on the joint keys.
    pub fn aggregation(&self) -> AggregationSession<E> {
        let session = AggregationSession::new(
            self.engine.clone(),
            self.public_key.clone(),
            self.eval_key.clone(),
        );
        match self.config.noise_bound {
            Some(bound) => session.with_uniform_noise(bound),
            None => session,
        }
    }

    /// An evaluator on the joint evaluation keys.
    pub fn evaluator(&self) -> ThresholdEvaluator<E> {
        ThresholdEvaluator::new(self.engine.clone(), self.eval_key.clone())
    }

    /// A coordinator for the decryption of `ct`, able to recover the lead
    /// partial when its key was shared.
    pub fn coordinator(&self, ct: E::Ciphertext) -> DecryptionCoordinator<E> {
        let coordinator =
            DecryptionCoordinator::new(self.engine.clone(), self.config.committee, ct);
        match &self.lead_shares {
            Some(shares) => coordinator.with_shares(PartyId::LEAD, shares.clone()),
            None => coordinator,
        }
    }

    /// Aggregate the contributions of the `available` parties, compare the
    /// aggregate against the configured threshold, and decrypt the first
    /// value of the comparison with the available parties.
    pub fn run<R: RngCore + CryptoRng>(
        &self,
        contributions: &BTreeMap<PartyId, Vec<f64>>,
        available: &BTreeSet<PartyId>,
        rng: &mut R,
    ) -> Result<Verdict> {
        for party in available {
            self.config.committee.check_party(*party)?;
        }
        let aggregation = self.aggregation();
        let ciphertexts = contributions
            .iter()
            .filter(|(party, _)| available.contains(*party))
            .map(|(party, values)| -> Result<_> {
                Ok((*party, aggregation.encode_and_encrypt(values, rng)?))
            })
            .collect::<Result<Vec<_>>>()?;
        let aggregate = aggregation.combine(&ciphertexts, available)?;
        info!(responding = available.len(), "Aggregated contributions");

        let comparison = &self.config.comparison;
        let result = self.evaluator().evaluate_threshold(
            &aggregate,
            comparison.threshold,
            comparison.domain,
            comparison.degree,
        )?;

        let values = self
            .coordinator(result)
            .decrypt(self.parties().filter(|p| available.contains(&p.id())), rng)?;
        let recovered = *values
            .first()
            .ok_or_else(|| Error::engine("the decryption produced no value"))?;
        let verdict = Verdict::new(recovered, comparison.threshold, comparison.margin);
        info!(
            recovered,
            threshold = comparison.threshold,
            above = verdict.above,
            "Comparison decrypted"
        );
        Ok(verdict)
    }
}

impl<E: ThresholdEngine> Debug for ThresholdSession<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThresholdSession")
            .field("config", &self.config)
            .field("parties", &self.parties.keys().collect::<Vec<_>>())
            .field("lead_shares", &self.lead_shares.is_some())
            .finish_non_exhaustive()
    }
}
