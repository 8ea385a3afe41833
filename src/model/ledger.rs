//! The ballot ledger: casting votes and checking whether a voter has voted.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    db::ballot::{Ballot, NewBallot},
    mongodb::Id,
    registry,
    store::Store,
};

/// Record a voter's ballot.
///
/// Checks, in order: the election exists (`NotFound`), is open at `now`
/// (`ElectionClosed`), and contests the candidate (`InvalidCandidate`).
/// The ballot is then inserted only if the voter has none in this election
/// (`DuplicateVote`). The store repeats the election and candidate checks and
/// makes the duplicate check in the same step as the insert, so concurrent
/// casts by one voter cannot both succeed and a candidate deleted meanwhile
/// never receives a ballot.
pub async fn cast_vote(
    store: &dyn Store,
    election_id: Id,
    voter_id: Id,
    candidate_id: Id,
    now: DateTime<Utc>,
) -> Result<Ballot> {
    registry::open_election(store, election_id, now).await?;
    if !registry::candidate_belongs_to(store, candidate_id, election_id).await? {
        return Err(Error::InvalidCandidate(format!(
            "{candidate_id} is not standing in election {election_id}"
        )));
    }

    let ballot = store
        .insert_ballot(NewBallot::new(election_id, candidate_id, voter_id, now))
        .await?;
    info!("Ballot {} cast in election {election_id}", ballot.id);
    Ok(ballot)
}

/// The ballot a voter cast in an election, if any.
pub async fn has_voted(store: &dyn Store, election_id: Id, voter_id: Id) -> Result<Option<Ballot>> {
    store.find_ballot(election_id, voter_id).await
}
