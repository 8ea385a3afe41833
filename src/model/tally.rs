//! Turning the ballot ledger into ranked results.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::{
    api::results::{CandidateResult, ElectionResults},
    db::candidate::Candidate,
    mongodb::Id,
    store::{CandidateVotes, Store},
};

/// `round(100 * votes / total)`, halves rounding up, in exact integer arithmetic.
/// Zero when nothing has been cast.
pub fn percentage(votes: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let (votes, total) = (u128::from(votes), u128::from(total));
    // Cannot exceed 100 since votes <= total.
    ((200 * votes + total) / (2 * total)) as u64
}

/// Rank per-candidate counts against the election's candidates.
///
/// Ballots naming a candidate that is not in `candidates` are dropped, so
/// `total_votes` is always the sum of the listed rows. Rows are sorted by
/// votes descending, ties broken by candidate ID ascending. Candidates with
/// no ballots are listed (with zero votes) only if `include_unvoted` is set.
pub fn rank(
    counts: impl IntoIterator<Item = CandidateVotes>,
    candidates: &[Candidate],
    include_unvoted: bool,
) -> ElectionResults {
    let by_id: HashMap<Id, &Candidate> = candidates.iter().map(|c| (c.id, c)).collect();

    let mut votes: HashMap<Id, u64> = HashMap::new();
    for count in counts {
        if by_id.contains_key(&count.candidate_id) {
            *votes.entry(count.candidate_id).or_default() += count.votes;
        } else {
            warn!(
                "Dropping {} ballots for unknown candidate {}",
                count.votes, count.candidate_id
            );
        }
    }
    if include_unvoted {
        for candidate in candidates {
            votes.entry(candidate.id).or_default();
        }
    }

    let mut rows: Vec<(Id, u64)> = votes.into_iter().collect();
    rows.sort_by(|(a_id, a_votes), (b_id, b_votes)| b_votes.cmp(a_votes).then(a_id.cmp(b_id)));

    let total_votes: u64 = rows.iter().map(|(_, votes)| votes).sum();
    let results = rows
        .into_iter()
        .map(|(id, votes)| {
            let candidate = by_id[&id];
            CandidateResult {
                candidate_id: id.into(),
                candidate_name: candidate.name.clone(),
                candidate_photo: candidate.photo.clone(),
                votes,
                percentage: percentage(votes, total_votes),
            }
        })
        .collect();

    ElectionResults {
        results,
        total_votes,
    }
}

/// Compute the current results of an election from the ledger.
pub async fn tally(
    store: &dyn Store,
    election_id: Id,
    include_unvoted: bool,
) -> Result<ElectionResults> {
    if store.find_election(election_id).await?.is_none() {
        return Err(Error::not_found(format!("Election {election_id}")));
    }
    let counts = store.votes_per_candidate(election_id).await?;
    let candidates = store.candidates(Some(election_id)).await?;
    let results = rank(counts, &candidates, include_unvoted);
    debug!(
        "Tallied election {election_id}: {} ballots across {} candidates",
        results.total_votes,
        results.results.len()
    );
    Ok(results)
}
