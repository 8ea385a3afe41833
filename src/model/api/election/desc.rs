use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::election::Election};

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    /// Election unique ID.
    pub id: ApiId,
    pub title: String,
    pub description: Option<String>,
    /// Positions being contested.
    pub positions: Vec<String>,
    /// Voting opens at this time.
    pub start_date: DateTime<Utc>,
    /// Voting closes at this time.
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    /// Whether votes would be accepted right now.
    pub is_open: bool,
    pub created_by: ApiId,
    pub created_at: DateTime<Utc>,
}

impl ElectionDescription {
    /// Describe an election as of the given instant.
    pub fn at(election: Election, now: DateTime<Utc>) -> Self {
        let is_open = election.is_open(now);
        let core = election.election;
        Self {
            id: election.id.into(),
            title: core.title,
            description: core.description,
            positions: core.positions,
            start_date: core.start_date,
            end_date: core.end_date,
            is_active: core.is_active,
            is_open,
            created_by: core.created_by.into(),
            created_at: core.created_at,
        }
    }
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        Self::at(election, Utc::now())
    }
}
