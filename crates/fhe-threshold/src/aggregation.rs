//! Encryption and homomorphic summation of the parties' contributions.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use fhe_util::sample_vec_uniform;
use rand::{CryptoRng, RngCore};
use tracing::debug;
use zeroize::Zeroizing;

use crate::engine::ThresholdEngine;
use crate::{Error, PartyId, Result};

/// Encrypts contributions under the joint public key and sums the
/// ciphertexts of the parties which responded.
pub struct AggregationSession<E: ThresholdEngine> {
    engine: Arc<E>,
    public_key: Arc<E::PublicKey>,
    eval_key: Arc<E::EvalKey>,
    noise_bound: Option<u64>,
}

impl<E: ThresholdEngine> AggregationSession<E> {
    /// Create a session on the joint keys.
    pub fn new(engine: Arc<E>, public_key: Arc<E::PublicKey>, eval_key: Arc<E::EvalKey>) -> Self {
        Self {
            engine,
            public_key,
            eval_key,
            noise_bound: None,
        }
    }

    /// Mask every contribution with integer noise uniform in
    /// `[0, bound)` before encryption.
    pub fn with_uniform_noise(self, bound: u64) -> Self {
        Self {
            noise_bound: Some(bound),
            ..self
        }
    }

    /// Encode a contribution into the slots of a plaintext and encrypt it
    /// under the joint public key. The plaintext is erased right after
    /// encryption.
    pub fn encode_and_encrypt<R: RngCore + CryptoRng>(
        &self,
        value: &[f64],
        rng: &mut R,
    ) -> Result<E::Ciphertext> {
        let mut masked = Zeroizing::new(value.to_vec());
        if let Some(bound) = self.noise_bound {
            let noise = Zeroizing::new(
                sample_vec_uniform(masked.len(), bound, rng).map_err(Error::invalid_config)?,
            );
            masked
                .iter_mut()
                .zip(noise.iter())
                .for_each(|(v, n)| *v += *n as f64);
        }
        self.engine.encrypt(&self.public_key, &masked, rng)
    }

    /// Sum the ciphertexts of the parties in `responding`; the ciphertexts
    /// of the other parties are ignored.
    ///
    /// The sum runs in increasing party order, whatever the order of
    /// `ciphertexts`.
    pub fn combine(
        &self,
        ciphertexts: &[(PartyId, E::Ciphertext)],
        responding: &BTreeSet<PartyId>,
    ) -> Result<E::Ciphertext> {
        if responding.is_empty() {
            return Err(Error::EmptyRespondingSet);
        }
        let mut submitted = BTreeMap::new();
        for (party, ct) in ciphertexts {
            if submitted.insert(*party, ct).is_some() {
                return Err(Error::DuplicateParty(*party));
            }
        }

        let mut selected = responding.iter().map(|party| {
            submitted
                .get(party)
                .copied()
                .ok_or(Error::MissingContribution(*party))
        });
        let first = selected.next().ok_or(Error::EmptyRespondingSet)??;
        let sum = selected.try_fold(first.clone(), |acc, ct| self.engine.eval_add(&acc, ct?))?;
        debug!(
            responding = responding.len(),
            submitted = submitted.len(),
            "Combined contributions"
        );
        Ok(sum)
    }

    /// Sum all the slots of a ciphertext; every slot of the result holds the
    /// total.
    pub fn sum_slots(&self, ct: &E::Ciphertext) -> Result<E::Ciphertext> {
        self.engine.eval_sum(ct, &self.eval_key)
    }
}

#[cfg(test)]
mod tests {
    use super::AggregationSession;
    use crate::engine::{CkksEngine, ThresholdEngine};
    use crate::{Error, KeyCeremony, PartyId, ThresholdConfig};
    use fhe::ckks::{Ciphertext, CkksParameters};
    use rand::thread_rng;
    use std::collections::BTreeSet;
    use std::error::Error as StdError;
    use std::sync::Arc;

    struct Fixture {
        engine: Arc<CkksEngine>,
        session: AggregationSession<CkksEngine>,
        outcome: crate::CeremonyOutcome<CkksEngine>,
    }

    fn fixture(parties: usize) -> Result<Fixture, Box<dyn StdError>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(1, 32)?;
        let engine = Arc::new(CkksEngine::new(&params));
        let outcome = KeyCeremony::new(
            engine.clone(),
            ThresholdConfig::new(parties, parties)?,
            false,
        )
        .run(&mut rng)?;
        let session = AggregationSession::new(
            engine.clone(),
            outcome.public_key.clone(),
            outcome.eval_key.clone(),
        );
        Ok(Fixture {
            engine,
            session,
            outcome,
        })
    }

    fn decrypt(fixture: &Fixture, ct: &Ciphertext) -> Result<Vec<f64>, Box<dyn StdError>> {
        let mut rng = thread_rng();
        let mut shares = Vec::new();
        for (id, party) in &fixture.outcome.parties {
            shares.push(if *id == PartyId::LEAD {
                fixture
                    .engine
                    .partial_decrypt_lead(party.secret_key(), ct, &mut rng)?
            } else {
                fixture
                    .engine
                    .partial_decrypt_main(party.secret_key(), ct, &mut rng)?
            });
        }
        Ok(fixture.engine.fuse_partials(shares)?)
    }

    #[test]
    fn combine_responding() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let fixture = fixture(3)?;
        let ciphertexts = [(1, 6.0), (2, 2.0), (3, 5.0)]
            .iter()
            .map(|(id, v)| -> crate::Result<_> {
                Ok((
                    PartyId::new(*id),
                    fixture.session.encode_and_encrypt(&[*v], &mut rng)?,
                ))
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let all = (1..=3).map(PartyId::new).collect::<BTreeSet<_>>();
        let sum = fixture.session.combine(&ciphertexts, &all)?;
        assert!((decrypt(&fixture, &sum)?[0] - 13.0).abs() < 1e-3);

        let two: BTreeSet<_> = [PartyId::new(1), PartyId::new(3)].into_iter().collect();
        let sum = fixture.session.combine(&ciphertexts, &two)?;
        assert!((decrypt(&fixture, &sum)?[0] - 11.0).abs() < 1e-3);

        // A single responding party gives its own contribution.
        let one: BTreeSet<_> = [PartyId::new(2)].into_iter().collect();
        let sum = fixture.session.combine(&ciphertexts, &one)?;
        assert!((decrypt(&fixture, &sum)?[0] - 2.0).abs() < 1e-3);
        Ok(())
    }

    #[test]
    fn combine_errors() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let fixture = fixture(2)?;
        let ct = fixture.session.encode_and_encrypt(&[1.0], &mut rng)?;
        let all = (1..=2).map(PartyId::new).collect::<BTreeSet<_>>();

        assert!(matches!(
            fixture.session.combine(&[(PartyId::new(1), ct.clone())], &BTreeSet::new()),
            Err(Error::EmptyRespondingSet)
        ));
        assert!(matches!(
            fixture.session.combine(&[(PartyId::new(1), ct.clone())], &all),
            Err(Error::MissingContribution(p)) if p == PartyId::new(2)
        ));
        assert!(matches!(
            fixture.session.combine(
                &[(PartyId::new(1), ct.clone()), (PartyId::new(1), ct)],
                &all
            ),
            Err(Error::DuplicateParty(p)) if p == PartyId::new(1)
        ));
        Ok(())
    }

    #[test]
    fn sum_slots_and_noise() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let fixture = fixture(2)?;
        let ct = fixture.session.encode_and_encrypt(&[1.0, 2.0, 3.5], &mut rng)?;
        let total = fixture.session.sum_slots(&ct)?;
        assert!(decrypt(&fixture, &total)?
            .iter()
            .all(|v| (v - 6.5).abs() < 1e-3));

        let noisy = AggregationSession::new(
            fixture.engine.clone(),
            fixture.outcome.public_key.clone(),
            fixture.outcome.eval_key.clone(),
        )
        .with_uniform_noise(4);
        let ct = noisy.encode_and_encrypt(&[10.0; 16], &mut rng)?;
        let values = decrypt(&fixture, &ct)?;
        for v in values.iter().take(16) {
            let noise = v - 10.0;
            assert!(noise > -1e-3 && noise < 3.0 + 1e-3);
            assert!((noise - noise.round()).abs() < 1e-3);
        }
        Ok(())
    }
}
