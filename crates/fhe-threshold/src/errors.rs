use crate::PartyId;
use thiserror::Error;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Indicates that the threshold is not between 1 and the number of parties.
    #[error("Invalid threshold: {threshold} must be between 1 and {parties}")]
    InvalidThreshold {
        /// The requested threshold.
        threshold: usize,
        /// The number of parties.
        parties: usize,
    },

    /// Indicates that a key ceremony round could not produce a valid
    /// increment. The ceremony must restart from the first round.
    #[error("Ceremony round {round} failed: {reason}")]
    CeremonyRoundFailed {
        /// The round that failed.
        round: usize,
        /// Why the round failed.
        reason: String,
    },

    /// Indicates that too few shares were provided for a reconstruction.
    #[error("Insufficient shares: {provided} provided, {required} required")]
    InsufficientShares {
        /// Number of shares provided.
        provided: usize,
        /// Number of shares required.
        required: usize,
    },

    /// Indicates that the shares do not lie on a single polynomial.
    #[error("Inconsistent shares: {0}")]
    InconsistentShares(String),

    /// Indicates that fewer than `T` parties are available for decryption.
    #[error("Quorum not met: {available} parties available, {required} required")]
    QuorumNotMet {
        /// Number of parties available.
        available: usize,
        /// Number of parties required.
        required: usize,
    },

    /// Indicates a party identifier outside of `1..=N`.
    #[error("Unknown party {0}")]
    UnknownParty(usize),

    /// Indicates that a party submitted twice.
    #[error("Duplicate submission from party {0}")]
    DuplicateParty(PartyId),

    /// Indicates that no party responded.
    #[error("The responding set is empty")]
    EmptyRespondingSet,

    /// Indicates that a responding party did not submit a contribution.
    #[error("Missing contribution from party {0}")]
    MissingContribution(PartyId),

    /// Indicates that an evaluation domain is not a finite, non-empty interval.
    #[error("Invalid domain [{lower}, {upper}]")]
    InvalidDomain {
        /// Lower bound of the domain.
        lower: f64,
        /// Upper bound of the domain.
        upper: f64,
    },

    /// Indicates an invalid approximation degree.
    #[error("Invalid approximation degree {0}")]
    InvalidDegree(usize),

    /// Indicates that no lead partial decryption was provided.
    #[error("Missing lead partial decryption")]
    MissingLeadPartial,

    /// Indicates that a lead partial decryption came from a party other than
    /// the lead.
    #[error("Duplicate lead partial decryption from party {0}")]
    DuplicateLeadPartial(PartyId),

    /// Indicates that the lead party submitted a main partial decryption.
    #[error("The lead party {0} submitted a main partial decryption")]
    MainPartialFromLead(PartyId),

    /// Indicates that a party is not represented in a fusion.
    #[error("Missing partial decryption of party {0}")]
    MissingPartial(PartyId),

    /// Indicates that a missing party's key was never shared.
    #[error("The key of party {0} was not shared and cannot be recovered")]
    UnrecoverableParty(PartyId),

    /// Indicates that the partial decryptions were already fused.
    #[error("The decryption was already fused")]
    AlreadyFused,

    /// Indicates an invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Indicates an error of the underlying FHE engine.
    #[error("Engine error: {0}")]
    Engine(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Create an engine error.
    pub fn engine<E: Into<Box<dyn std::error::Error + Send + Sync>>>(error: E) -> Self {
        Self::Engine(error.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a ceremony round failure from the error that caused it.
    pub fn round_failed(round: usize, cause: &Error) -> Self {
        Self::CeremonyRoundFailed {
            round,
            reason: cause.to_string(),
        }
    }

    /// Returns whether the error aborts the whole protocol, as opposed to a
    /// single reconstruction or decryption attempt.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::InsufficientShares { .. } | Self::InconsistentShares(_)
        )
    }
}
