use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::candidate::{Candidate, CandidateCore, NewCandidate},
    mongodb::Id,
};

/// A candidate specification. The election comes from the request path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    /// Must be one of the election's positions.
    pub position: String,
    pub department: String,
    #[serde(default)]
    pub bio: Option<String>,
    /// Photo URL.
    #[serde(default)]
    pub photo: Option<String>,
}

impl CandidateSpec {
    pub fn into_new_candidate(self, election_id: Id, now: DateTime<Utc>) -> NewCandidate {
        NewCandidate {
            election_id,
            name: self.name,
            position: self.position,
            department: self.department,
            bio: self.bio,
            photo: self.photo,
            created_at: now,
        }
    }
}

/// A partial update to a candidate. The owning election cannot change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidatePatch {
    pub name: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
}

impl CandidatePatch {
    pub fn apply_to(self, candidate: &mut CandidateCore) {
        if let Some(name) = self.name {
            candidate.name = name;
        }
        if let Some(position) = self.position {
            candidate.position = position;
        }
        if let Some(department) = self.department {
            candidate.department = department;
        }
        if let Some(bio) = self.bio {
            candidate.bio = Some(bio);
        }
        if let Some(photo) = self.photo {
            candidate.photo = Some(photo);
        }
    }
}

/// An API-friendly candidate description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub election_id: ApiId,
    pub name: String,
    pub position: String,
    pub department: String,
    pub bio: Option<String>,
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        let core = candidate.candidate;
        Self {
            id: candidate.id.into(),
            election_id: core.election_id.into(),
            name: core.name,
            position: core.position,
            department: core.department,
            bio: core.bio,
            photo: core.photo,
            created_at: core.created_at,
        }
    }
}
