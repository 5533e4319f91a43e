#![crate_name = "fhe_threshold"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Orchestration of a threshold CKKS protocol between `N` parties.
//!
//! The parties run a sequential [`KeyCeremony`] to build a joint public key
//! and joint evaluation keys, encrypt private contributions which an
//! [`AggregationSession`] sums homomorphically, compare the aggregate against
//! a threshold with a [`ThresholdEvaluator`], and decrypt the result with a
//! [`DecryptionCoordinator`]. When a party does not respond, its secret key
//! can be recovered from the shares held by a quorum of `T` parties, see
//! [`ShareStore`].
//!
//! The protocol is generic over a [`ThresholdEngine`]; [`CkksEngine`]
//! implements it with the `fhe` crate.

mod errors;

mod aggregation;
mod ceremony;
mod config;
mod decryption;
pub mod engine;
mod evaluator;
mod party;
mod session;
mod share_store;

pub use aggregation::AggregationSession;
pub use ceremony::{CeremonyContext, CeremonyOutcome, CeremonyState, KeyCeremony};
pub use config::{CkksConfig, ComparisonConfig, Domain, SessionConfig, ThresholdConfig};
pub use decryption::{CoordinatorState, DecryptionCoordinator, PartialDecryption, Verdict};
pub use engine::{CkksEngine, CkksShare, ThresholdEngine};
pub use errors::{Error, Result};
pub use evaluator::ThresholdEvaluator;
pub use party::{Party, PartyId};
pub use session::ThresholdSession;
pub use share_store::{ShareSet, ShareStore};
