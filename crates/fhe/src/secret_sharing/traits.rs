//! Traits for secret sharing operations.

use crate::Result;
use ndarray::Array2;

/// Trait for splitting polynomial coefficients into secret shares and
/// rebuilding them.
pub trait SecretSharer {
    /// Split the coefficients of a polynomial into one share per party.
    ///
    /// The share of party `k` (at index `k - 1`) holds one row per modulus
    /// and one column per coefficient.
    ///
    /// Fresh randomness is drawn on every call.
    fn split(&self, coeffs: &[i64]) -> Result<Vec<Array2<u64>>>;

    /// Reconstruct the coefficients of a polynomial from shares indexed by
    /// party id.
    fn reconstruct(&self, shares: &[(usize, &Array2<u64>)]) -> Result<Vec<i64>>;
}
