use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::ballot::Ballot};

/// A voter's choice, as submitted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoteRequest {
    pub candidate_id: ApiId,
}

/// An API-friendly view of an accepted ballot.
///
/// Omits the voter ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotDescription {
    pub id: ApiId,
    pub election_id: ApiId,
    pub candidate_id: ApiId,
    pub cast_at: DateTime<Utc>,
}

impl From<Ballot> for BallotDescription {
    fn from(ballot: Ballot) -> Self {
        Self {
            id: ballot.id.into(),
            election_id: ballot.election_id.into(),
            candidate_id: ballot.candidate_id.into(),
            cast_at: ballot.cast_at,
        }
    }
}

/// Whether a voter has voted in an election, and for whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteStatus {
    pub voted: bool,
    pub candidate_id: Option<ApiId>,
}

impl From<Option<Ballot>> for VoteStatus {
    fn from(ballot: Option<Ballot>) -> Self {
        Self {
            voted: ballot.is_some(),
            candidate_id: ballot.map(|ballot| ballot.candidate_id.into()),
        }
    }
}
