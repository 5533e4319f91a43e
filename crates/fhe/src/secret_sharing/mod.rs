//! Secret sharing of secret key polynomials.
//!
//! A secret key is shared coefficient by coefficient, independently modulo
//! every ciphertext modulus, so that a quorum of parties can rebuild the key
//! of a party which dropped out.

/// Shamir Secret Sharing over the ciphertext moduli.
pub mod shamir;
/// Traits for secret sharing operations.
pub mod traits;

pub use shamir::ShamirSecretSharing;
pub use traits::SecretSharer;
