use thiserror::Error;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// Indicates that an error in the underlying mathematical library was
    /// encountered.
    #[error("{0}")]
    MathError(#[from] fhe_math::Error),

    /// Indicates that too many values were provided.
    #[error("Too many values provided: {0} exceeds limit {1}")]
    TooManyValues(usize, usize),

    /// Indicates that too few values were provided.
    #[error("Too few values provided: {0} is below limit {1}")]
    TooFewValues(usize, usize),

    /// Indicates that an input is invalid.
    #[error("{0}")]
    UnspecifiedInput(String),

    /// Indicates that a value cannot be encoded at the requested scale.
    #[error("Encoding overflow: {0} cannot be encoded at scale {1}")]
    EncodingOverflow(f64, f64),

    /// Indicates that two ciphertexts have incompatible scales.
    #[error("Scale mismatch: {0} and {1}")]
    ScaleMismatch(f64, f64),

    /// Indicates that the ciphertext does not have enough levels left.
    #[error("Not enough levels: {required} required, {available} available")]
    InsufficientLevels {
        /// Number of levels the operation consumes.
        required: usize,
        /// Number of levels left in the ciphertext.
        available: usize,
    },

    /// Indicates that an evaluation key is missing.
    #[error("Missing key: {0}")]
    MissingKey(String),

    /// Indicates that secret shares do not lie on a single polynomial.
    #[error("Inconsistent shares: {0}")]
    InconsistentShares(String),

    /// Indicates that the parameters are invalid.
    #[error("{0}")]
    ParametersError(ParametersError),

    /// Indicates a default error
    #[error("{0}")]
    DefaultError(String),
}

/// Separate enum to indicate parameters-related errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParametersError {
    /// Indicates that the degree is invalid.
    #[error("Invalid degree: {0} is not a power of 2 larger or equal to 8")]
    InvalidDegree(usize),

    /// Indicates that the moduli sizes are invalid.
    #[error("Invalid modulus size: {0}, expected an integer between {1} and {2}")]
    InvalidModulusSize(usize, usize, usize),

    /// Indicates that there exists not enough primes.
    #[error("Not enough primes of size {0} for polynomials of degree {1}")]
    NotEnoughPrimes(usize, usize),

    /// Indicates that the scaling moduli leave no room for the plaintext.
    #[error("The scaling modulus size {0} must be smaller than the first modulus size {1}")]
    InvalidScalingModulusSize(usize, usize),

    /// Indicates that the smudging noise would overwhelm the plaintext.
    #[error("Invalid smudging bits: {0} must be smaller than {1}")]
    InvalidSmudgingBits(usize, usize),

    /// Indicates that the variance is invalid.
    #[error("Invalid variance: {0} is not between 1 and 16")]
    InvalidVariance(usize),

    /// Indicates that the explicitly provided moduli are invalid.
    #[error("{0}")]
    InvalidModuli(String),
}

impl From<ParametersError> for Error {
    fn from(e: ParametersError) -> Self {
        Self::ParametersError(e)
    }
}

impl Error {
    /// Create an insufficient shares error.
    pub fn insufficient_shares(provided: usize, required: usize) -> Self {
        Self::TooFewValues(provided, required)
    }

    /// Create an invalid party ID error.
    pub fn invalid_party_id(party_id: usize, max_party_id: usize) -> Self {
        Self::UnspecifiedInput(format!(
            "Invalid party ID: {}, must be between 1 and {}",
            party_id, max_party_id
        ))
    }

    /// Create a threshold error.
    pub fn invalid_threshold(threshold: usize, parties: usize) -> Self {
        Self::UnspecifiedInput(format!(
            "Threshold {} must be between 1 and the number of parties {}",
            threshold, parties
        ))
    }

    /// Create a secret sharing error.
    pub fn secret_sharing<S: Into<String>>(msg: S) -> Self {
        Self::UnspecifiedInput(format!("Secret sharing error: {}", msg.into()))
    }

    /// Create a decryption share error.
    pub fn decryption_share<S: Into<String>>(msg: S) -> Self {
        Self::UnspecifiedInput(format!(
            "Decryption share computation failed: {}",
            msg.into()
        ))
    }

    /// Create an error for objects built on different parameters.
    pub fn incompatible_parameters() -> Self {
        Self::DefaultError("Incompatible CKKS parameters".to_string())
    }
}
