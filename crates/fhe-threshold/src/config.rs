//! Configuration of a threshold session.
//!
//! Every configuration type deserializes with `serde`; [`ThresholdConfig`]
//! is validated during deserialization, the others by
//! [`SessionConfig::validate`].

use fhe::ckks::chebyshev_depth;
use serde::{Deserialize, Serialize};

use crate::{Error, PartyId, Result};

/// The number of parties `N` and the threshold `T`, with `1 <= T <= N`.
///
/// Any `T` parties can recover the shared key of a missing party; fewer
/// cannot learn anything about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholdConfig", into = "RawThresholdConfig")]
pub struct ThresholdConfig {
    parties: usize,
    threshold: usize,
}

#[derive(Serialize, Deserialize)]
struct RawThresholdConfig {
    parties: usize,
    threshold: usize,
}

impl TryFrom<RawThresholdConfig> for ThresholdConfig {
    type Error = Error;

    fn try_from(raw: RawThresholdConfig) -> Result<Self> {
        Self::new(raw.parties, raw.threshold)
    }
}

impl From<ThresholdConfig> for RawThresholdConfig {
    fn from(config: ThresholdConfig) -> Self {
        Self {
            parties: config.parties,
            threshold: config.threshold,
        }
    }
}

impl ThresholdConfig {
    /// Create a configuration for `parties` parties and threshold
    /// `threshold`. Returns an error unless `1 <= threshold <= parties`.
    pub fn new(parties: usize, threshold: usize) -> Result<Self> {
        if threshold == 0 || threshold > parties {
            return Err(Error::InvalidThreshold { threshold, parties });
        }
        Ok(Self { parties, threshold })
    }

    /// Returns the number of parties.
    pub const fn parties(&self) -> usize {
        self.parties
    }

    /// Returns the threshold.
    pub const fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns the identifiers of all the parties, in increasing order.
    pub fn party_ids(&self) -> impl Iterator<Item = PartyId> {
        (1..=self.parties).map(PartyId::new)
    }

    /// Returns the identifier if it designates one of the parties.
    pub fn check_party(&self, id: PartyId) -> Result<PartyId> {
        if id.get() == 0 || id.get() > self.parties {
            return Err(Error::UnknownParty(id.get()));
        }
        Ok(id)
    }
}

/// A closed interval `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
}

impl Domain {
    /// Create the interval `[lower, upper]`.
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Returns an error unless the bounds are finite and `lower < upper`.
    pub fn validate(&self) -> Result<()> {
        if !self.lower.is_finite() || !self.upper.is_finite() || self.lower >= self.upper {
            return Err(Error::InvalidDomain {
                lower: self.lower,
                upper: self.upper,
            });
        }
        Ok(())
    }
}

fn default_margin() -> f64 {
    1.0
}

fn default_share_lead_key() -> bool {
    true
}

/// The homomorphic comparison of the aggregate against a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// The value the aggregate is compared to.
    pub threshold: f64,
    /// The interval on which `max(threshold, x)` is approximated.
    pub domain: Domain,
    /// The degree of the approximation.
    pub degree: usize,
    /// How far above the threshold the recovered value must be for the
    /// aggregate to be reported above it.
    ///
    /// Aggregates in `(threshold, threshold + margin]` are reported below the
    /// threshold. A zero margin removes this band, at the cost of reporting
    /// the overshoot of the approximation near the threshold as above it.
    #[serde(default = "default_margin")]
    pub margin: f64,
}

impl ComparisonConfig {
    /// Validate the comparison parameters.
    pub fn validate(&self) -> Result<()> {
        self.domain.validate()?;
        if self.degree == 0 {
            return Err(Error::InvalidDegree(self.degree));
        }
        if !self.threshold.is_finite() {
            return Err(Error::invalid_config(format!(
                "threshold value {} is not finite",
                self.threshold
            )));
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(Error::invalid_config(format!(
                "margin {} must be a non-negative number",
                self.margin
            )));
        }
        Ok(())
    }
}

/// Parameters of the CKKS engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CkksConfig {
    /// The polynomial degree.
    pub degree: usize,
    /// The bit sizes of the ciphertext moduli. The first modulus holds the
    /// decrypted values, every following one supports one multiplication.
    pub moduli_sizes: Vec<usize>,
    /// The standard deviation of the smudging noise, as a power of two.
    #[serde(default)]
    pub smudging_bits: Option<usize>,
}

impl CkksConfig {
    /// Returns the number of multiplications supported by the parameters.
    pub fn depth(&self) -> usize {
        self.moduli_sizes.len().saturating_sub(1)
    }
}

/// The configuration of a [`crate::ThresholdSession`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// The parties and the threshold.
    pub committee: ThresholdConfig,
    /// Whether the lead key is shared during the ceremony, which lets a
    /// quorum decrypt without the lead.
    #[serde(default = "default_share_lead_key")]
    pub share_lead_key: bool,
    /// The threshold comparison.
    pub comparison: ComparisonConfig,
    /// The engine parameters.
    pub ckks: CkksConfig,
    /// When set, every contribution is masked with integer noise uniform in
    /// `[0, noise_bound)` before encryption.
    #[serde(default)]
    pub noise_bound: Option<u64>,
}

impl SessionConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.comparison.validate()?;
        let required = chebyshev_depth(self.comparison.degree);
        if self.ckks.depth() < required {
            return Err(Error::invalid_config(format!(
                "an approximation of degree {} requires {} multiplications, the parameters support {}",
                self.comparison.degree,
                required,
                self.ckks.depth()
            )));
        }
        if self.noise_bound == Some(0) {
            return Err(Error::invalid_config("the noise bound must be positive"));
        }
        Ok(())
    }
}
