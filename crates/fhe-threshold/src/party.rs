//! Party identifiers and per-party key material.

use std::fmt::{self, Debug, Display};

use serde::{Deserialize, Serialize};

use crate::engine::ThresholdEngine;

/// Identifier of a party, between 1 and the number of parties.
///
/// The identifier is also the evaluation point of the party's secret shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(usize);

impl PartyId {
    /// The party leading the decryption, whose key is shared during the
    /// ceremony.
    pub const LEAD: PartyId = PartyId(1);

    /// Create a party identifier. The identifier is checked against the
    /// number of parties by [`crate::ThresholdConfig::check_party`].
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the identifier as an integer.
    pub const fn get(&self) -> usize {
        self.0
    }
}

impl Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<PartyId> for usize {
    fn from(id: PartyId) -> usize {
        id.0
    }
}

/// The key material of a party after its ceremony round.
///
/// The secret key never leaves the party; it is erased when the party is
/// dropped.
pub struct Party<E: ThresholdEngine> {
    pub(crate) id: PartyId,
    pub(crate) secret_key: E::SecretKey,
    pub(crate) public_key: E::PublicKey,
}

impl<E: ThresholdEngine> Party<E> {
    /// Returns the identifier of the party.
    pub const fn id(&self) -> PartyId {
        self.id
    }

    /// Returns the joint public key as it was after the party's round.
    pub fn public_key(&self) -> &E::PublicKey {
        &self.public_key
    }

    pub(crate) fn secret_key(&self) -> &E::SecretKey {
        &self.secret_key
    }
}

impl<E: ThresholdEngine> Debug for Party<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Party")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
