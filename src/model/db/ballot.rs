use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core ballot data, as stored in the database.
///
/// Ballots are append-only: once inserted they are never updated or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotCore {
    /// Foreign Key election ID.
    pub election_id: Id,
    /// Foreign Key candidate ID; the candidate belongs to `election_id`.
    pub candidate_id: Id,
    /// The voter who cast this ballot.
    pub voter_id: Id,
    /// When the ballot was accepted.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl BallotCore {
    pub fn new(election_id: Id, candidate_id: Id, voter_id: Id, cast_at: DateTime<Utc>) -> Self {
        Self {
            election_id,
            candidate_id,
            voter_id,
            cast_at,
        }
    }
}

/// A ballot not yet in the ledger.
pub type NewBallot = BallotCore;

/// A ballot from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub ballot: BallotCore,
}

impl Deref for Ballot {
    type Target = BallotCore;

    fn deref(&self) -> &Self::Target {
        &self.ballot
    }
}
