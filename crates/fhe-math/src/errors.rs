use thiserror::Error;

use crate::rq::Representation;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Indicates an invalid modulus
    #[error("Invalid modulus: modulus {0} should be between 2 and (1 << 62) - 1.")]
    InvalidModulus(u64),

    /// Indicates that the context is not the one expected.
    #[error("Invalid context provided.")]
    InvalidContext,

    /// Indicates that the representation is not the one expected.
    #[error("Incorrect representation: got {0:?}, expected {1:?}.")]
    IncorrectRepresentation(Representation, Representation),

    /// Indicates that a value does not fit the expected shape.
    #[error("Invalid size: expected {expected}, got {got}.")]
    InvalidSize {
        /// The expected size.
        expected: usize,
        /// The size that was provided.
        got: usize,
    },

    /// Indicates a default error
    #[error("{0}")]
    Default(String),
}

#[cfg(test)]
mod tests {
    use crate::{rq::Representation, Error};

    #[test]
    fn error_strings() {
        assert_eq!(
            Error::InvalidModulus(0).to_string(),
            "Invalid modulus: modulus 0 should be between 2 and (1 << 62) - 1."
        );
        assert_eq!(
            Error::IncorrectRepresentation(Representation::Ntt, Representation::PowerBasis)
                .to_string(),
            "Incorrect representation: got Ntt, expected PowerBasis."
        );
        assert_eq!(
            Error::InvalidSize {
                expected: 8,
                got: 4
            }
            .to_string(),
            "Invalid size: expected 8, got 4."
        );
        assert_eq!(Error::Default("test".to_string()).to_string(), "test");
    }
}
