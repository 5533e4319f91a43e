//! Homomorphic comparison against a threshold.

use std::sync::Arc;

use tracing::debug;

use crate::engine::ThresholdEngine;
use crate::{Domain, Error, Result};

/// Evaluates `max(threshold, x)` on encrypted values through a polynomial
/// approximation.
///
/// Values outside of the approximation domain give meaningless results;
/// this is not detected, since the values are encrypted.
pub struct ThresholdEvaluator<E: ThresholdEngine> {
    engine: Arc<E>,
    eval_key: Arc<E::EvalKey>,
}

impl<E: ThresholdEngine> ThresholdEvaluator<E> {
    /// Create an evaluator using the joint evaluation keys.
    pub fn new(engine: Arc<E>, eval_key: Arc<E::EvalKey>) -> Self {
        Self { engine, eval_key }
    }

    /// Approximate `max(threshold, x)` on `domain` by a polynomial of degree
    /// `degree`, and evaluate it on `ct`.
    ///
    /// Higher degrees are more accurate but consume more levels.
    pub fn evaluate_threshold(
        &self,
        ct: &E::Ciphertext,
        threshold: f64,
        domain: Domain,
        degree: usize,
    ) -> Result<E::Ciphertext> {
        domain.validate()?;
        if degree == 0 {
            return Err(Error::InvalidDegree(degree));
        }
        debug!(
            threshold,
            lower = domain.lower,
            upper = domain.upper,
            degree,
            "Evaluating threshold comparison"
        );
        self.engine.eval_polynomial_approx(
            ct,
            |x| x.max(threshold),
            domain.lower,
            domain.upper,
            degree,
            &self.eval_key,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ThresholdEvaluator;
    use crate::engine::{CkksEngine, ThresholdEngine};
    use crate::{Domain, Error, KeyCeremony, PartyId, ThresholdConfig};
    use fhe::ckks::CkksParameters;
    use rand::thread_rng;
    use std::error::Error as StdError;
    use std::sync::Arc;

    #[test]
    fn evaluate_threshold() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let params = CkksParameters::default_arc(5, 64)?;
        let engine = Arc::new(CkksEngine::new(&params));
        let outcome =
            KeyCeremony::new(engine.clone(), ThresholdConfig::new(2, 2)?, false).run(&mut rng)?;
        let evaluator = ThresholdEvaluator::new(engine.clone(), outcome.eval_key.clone());

        let values = [1.0, 3.0, 9.0];
        let ct = engine.encrypt(&outcome.public_key, &values, &mut rng)?;
        let result = evaluator.evaluate_threshold(&ct, 5.0, Domain::new(0.0, 10.0), 8)?;

        let lead = &outcome.parties[&PartyId::new(1)];
        let main = &outcome.parties[&PartyId::new(2)];
        let shares = vec![
            engine.partial_decrypt_lead(lead.secret_key(), &result, &mut rng)?,
            engine.partial_decrypt_main(main.secret_key(), &result, &mut rng)?,
        ];
        let decrypted = engine.fuse_partials(shares)?;
        for (v, d) in values.iter().zip(decrypted.iter()) {
            assert!((v.max(5.0) - d).abs() < 0.5);
        }

        assert!(matches!(
            evaluator.evaluate_threshold(&ct, 5.0, Domain::new(10.0, 0.0), 8),
            Err(Error::InvalidDomain { .. })
        ));
        assert!(matches!(
            evaluator.evaluate_threshold(&ct, 5.0, Domain::new(f64::NAN, 10.0), 8),
            Err(Error::InvalidDomain { .. })
        ));
        assert!(matches!(
            evaluator.evaluate_threshold(&ct, 5.0, Domain::new(0.0, 10.0), 0),
            Err(Error::InvalidDegree(0))
        ));
        // Degree 16 needs six levels.
        assert!(matches!(
            evaluator.evaluate_threshold(&ct, 5.0, Domain::new(0.0, 10.0), 16),
            Err(Error::Engine(_))
        ));
        Ok(())
    }
}
