use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{db::election::ElectionCore, mongodb::Id};

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_BIO_LEN: usize = 500;

/// Core candidate data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    /// Foreign Key election ID. Fixed for the candidate's lifetime.
    pub election_id: Id,
    pub name: String,
    /// One of the owning election's positions.
    pub position: String,
    pub department: String,
    pub bio: Option<String>,
    /// Photo URL, shown alongside results.
    pub photo: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl CandidateCore {
    /// Check the field constraints, including that the election contests
    /// this candidate's position.
    pub fn validate(&self, election: &ElectionCore) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("candidate name is required"));
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(Error::validation(format!(
                "candidate name cannot exceed {MAX_NAME_LEN} characters"
            )));
        }
        if self.department.trim().is_empty() {
            return Err(Error::validation("candidate department is required"));
        }
        if let Some(ref bio) = self.bio {
            if bio.chars().count() > MAX_BIO_LEN {
                return Err(Error::validation(format!(
                    "candidate bio cannot exceed {MAX_BIO_LEN} characters"
                )));
            }
        }
        if !election.has_position(&self.position) {
            return Err(Error::validation(format!(
                "'{}' is not a position in election '{}'",
                self.position, election.title
            )));
        }
        Ok(())
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}
