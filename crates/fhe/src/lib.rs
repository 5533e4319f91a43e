#![crate_name = "fhe"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Approximate homomorphic encryption over the reals (CKKS), with the
//! multiparty and secret sharing extensions used for threshold decryption.

mod errors;

pub mod ckks;
pub mod mckks;
pub mod secret_sharing;

pub use errors::{Error, ParametersError, Result};
