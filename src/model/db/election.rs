use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{api::auth::Requester, mongodb::Id};

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    /// Election title.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Positions being contested, in display order.
    pub positions: Vec<String>,
    /// Voting opens at this time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_date: DateTime<Utc>,
    /// Voting closes at this time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_date: DateTime<Utc>,
    /// Manual switch; an inactive election never accepts votes.
    pub is_active: bool,
    /// The user who created the election.
    pub created_by: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ElectionCore {
    /// Is voting open at the given instant?
    ///
    /// Both ends of the window are inclusive.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date
    }

    /// May the given requester modify, toggle or delete this election?
    pub fn may_be_managed_by(&self, requester: &Requester) -> bool {
        requester.is_admin() || self.created_by == requester.id
    }

    /// Does this election contest the named position?
    pub fn has_position(&self, position: &str) -> bool {
        self.positions.iter().any(|p| p == position)
    }

    /// Check the field constraints that every stored election satisfies.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("election title is required"));
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(Error::validation(format!(
                "election title cannot exceed {MAX_TITLE_LEN} characters"
            )));
        }
        if let Some(ref description) = self.description {
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(Error::validation(format!(
                    "election description cannot exceed {MAX_DESCRIPTION_LEN} characters"
                )));
            }
        }
        if self.positions.is_empty() {
            return Err(Error::validation("at least one position is required"));
        }
        if self.positions.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::validation("position names cannot be blank"));
        }
        if self.end_date <= self.start_date {
            return Err(Error::validation("end date must be after start date"));
        }
        Ok(())
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}


#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::api::auth::Rights;

    #[test]
    fn open_only_when_active_and_inside_window() {
        let election = ElectionCore::current_example(Id::new());
        let now = Utc::now();
        assert!(election.is_open(now));
        assert!(election.is_open(election.start_date));
        assert!(election.is_open(election.end_date));
        assert!(!election.is_open(election.start_date - Duration::seconds(1)));
        assert!(!election.is_open(election.end_date + Duration::seconds(1)));

        let inactive = ElectionCore::inactive_example(Id::new());
        assert!(!inactive.is_open(now));

        let future = ElectionCore::future_example(Id::new());
        assert!(!future.is_open(now));
    }

    #[test]
    fn validation_rejects_malformed_elections() {
        let valid = ElectionCore::current_example(Id::new());
        assert!(valid.validate().is_ok());

        let no_positions = ElectionCore {
            positions: vec![],
            ..valid.clone()
        };
        assert!(matches!(no_positions.validate(), Err(Error::Validation(_))));

        let blank_position = ElectionCore {
            positions: vec!["President".to_string(), "  ".to_string()],
            ..valid.clone()
        };
        assert!(matches!(blank_position.validate(), Err(Error::Validation(_))));

        let backwards = ElectionCore {
            end_date: valid.start_date,
            ..valid.clone()
        };
        assert!(matches!(backwards.validate(), Err(Error::Validation(_))));

        let long_title = ElectionCore {
            title: "x".repeat(MAX_TITLE_LEN + 1),
            ..valid.clone()
        };
        assert!(matches!(long_title.validate(), Err(Error::Validation(_))));

        let untitled = ElectionCore {
            title: " ".to_string(),
            ..valid
        };
        assert!(matches!(untitled.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn managed_by_creator_or_admin_only() {
        let creator = Id::new();
        let election = ElectionCore::current_example(creator);

        assert!(election.may_be_managed_by(&Requester::new(creator, Rights::Voter)));
        assert!(election.may_be_managed_by(&Requester::new(Id::new(), Rights::Admin)));
        assert!(!election.may_be_managed_by(&Requester::new(Id::new(), Rights::Voter)));
    }
}
