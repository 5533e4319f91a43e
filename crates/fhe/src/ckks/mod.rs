//! The CKKS encryption scheme, over the real numbers.
//!
//! Values are encoded into the `n / 2` slots of a plaintext, multiplied by a
//! scaling factor. Every multiplication is followed by a rescaling that
//! consumes one of the ciphertext moduli.

pub(crate) mod ciphertext;
mod keys;
mod ops;
mod parameters;
mod plaintext;

pub use ciphertext::Ciphertext;
pub use keys::{
    EvaluationKey, GaloisKey, KeySwitchingKey, PublicKey, RelinearizationKey, SecretKey,
};
pub use ops::{
    add, add_const, align_levels, chebyshev_coefficients, chebyshev_depth, eval_chebyshev_function,
    eval_chebyshev_series, eval_sum, mul, mul_const_to_scale, mul_integer, rotate, sub,
};
pub use parameters::{CkksParameters, CkksParametersBuilder};
pub use plaintext::{Encoding, Plaintext};
