//! The Multiparty CKKS scheme, with a chained key generation where every
//! party extends the keys produced by the previous ones.
//!
//! The joint secret key is the sum `s = s_1 + ... + s_N` of the parties'
//! secret keys; it is never assembled.

mod crp;
mod decryption;
mod eval_key_gen;
mod public_key_gen;

pub use crp::CommonRandomPoly;
pub use decryption::{DecryptionShare, DecryptionShareKind};
pub use eval_key_gen::{EvaluationKeyCrp, EvaluationKeyShare, RelinearizationKeyShare};
pub use public_key_gen::PublicKeyShare;

use crate::Result;

/// Aggregate shares in an MPC protocol.
pub trait Aggregate<S>: Sized {
    /// Aggregate shares in an MPC protocol.
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = S>;
}

/// Aggregate shares from an iterator.
pub trait AggregateIter<S>: Iterator<Item = S> + Sized {
    /// Aggregate the shares produced by the iterator.
    fn aggregate<A>(self) -> Result<A>
    where
        A: Aggregate<S>,
    {
        A::from_shares(self)
    }
}

impl<S, I: Iterator<Item = S>> AggregateIter<S> for I {}
