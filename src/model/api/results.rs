use serde::{Deserialize, Serialize};

use crate::model::api::id::ApiId;

/// One row of an election's results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate_id: ApiId,
    pub candidate_name: String,
    pub candidate_photo: Option<String>,
    pub votes: u64,
    /// Share of the total, rounded to the nearest whole percent. Rounded
    /// independently per row, so a column may not sum to exactly 100.
    pub percentage: u64,
}

/// Ranked results for an election, most votes first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub results: Vec<CandidateResult>,
    pub total_votes: u64,
}
