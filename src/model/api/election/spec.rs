use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    db::election::{ElectionCore, NewElection},
    mongodb::Id,
};

/// An election specification, as submitted by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    /// Election title.
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Positions being contested.
    pub positions: Vec<String>,
    /// Voting opens at this time.
    pub start_date: DateTime<Utc>,
    /// Voting closes at this time.
    pub end_date: DateTime<Utc>,
    /// New elections are inactive unless stated otherwise.
    #[serde(default)]
    pub is_active: bool,
}

impl ElectionSpec {
    /// Convert this spec into an unvalidated election owned by `created_by`.
    pub fn into_new_election(self, created_by: Id, now: DateTime<Utc>) -> NewElection {
        NewElection {
            title: self.title,
            description: self.description,
            positions: self.positions,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
            created_by,
            created_at: now,
        }
    }
}

/// A partial update to an election. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElectionPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub positions: Option<Vec<String>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl ElectionPatch {
    /// Merge this patch into an election. The result still needs validating.
    pub fn apply_to(self, election: &mut ElectionCore) {
        if let Some(title) = self.title {
            election.title = title;
        }
        if let Some(description) = self.description {
            election.description = Some(description);
        }
        if let Some(positions) = self.positions {
            election.positions = positions;
        }
        if let Some(start_date) = self.start_date {
            election.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            election.end_date = end_date;
        }
        if let Some(is_active) = self.is_active {
            election.is_active = is_active;
        }
    }
}
