//! Storage access for elections, candidates and the ballot ledger.
//!
//! Everything above this module talks to a [`Store`] trait object handed to
//! it explicitly; nothing reaches for a global connection.

use std::ops::Deref;
use std::sync::Arc;

use rocket::{
    request::{self, FromRequest, Request},
    State,
};
use serde::Deserialize;

use crate::error::Result;
use crate::model::{
    api::{candidate::CandidatePatch, election::ElectionPatch},
    db::{
        ballot::{Ballot, NewBallot},
        candidate::{Candidate, NewCandidate},
        election::{Election, NewElection},
    },
    mongodb::Id,
};

#[cfg(test)]
mod interleaved;
mod memory;
mod mongo;

#[cfg(test)]
pub use interleaved::{InterleavedStore, Interruption};
pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// The number of ballots cast for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CandidateVotes {
    #[serde(rename = "_id")]
    pub candidate_id: Id,
    pub votes: u64,
}

/// Persistence operations the registry, ledger and tally engine rely on.
#[rocket::async_trait]
pub trait Store: Send + Sync {
    /// Insert a new election, returning it with its assigned ID.
    async fn insert_election(&self, election: NewElection) -> Result<Election>;

    async fn find_election(&self, id: Id) -> Result<Option<Election>>;

    /// All elections, oldest first.
    async fn all_elections(&self) -> Result<Vec<Election>>;

    /// Apply a validated patch to the fields it names, leaving every other
    /// field as stored. Returns the updated election, or `None` if it is gone.
    async fn update_election(&self, id: Id, patch: &ElectionPatch) -> Result<Option<Election>>;

    /// Atomically flip the active flag, returning the updated election.
    async fn toggle_election_active(&self, id: Id) -> Result<Option<Election>>;

    /// Remove an election together with its candidates.
    ///
    /// Fails with `NotFound` if there is no such election, and with
    /// `Conflict` if any ballot has been cast in it.
    async fn delete_election(&self, id: Id) -> Result<()>;

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate>;

    async fn find_candidate(&self, id: Id) -> Result<Option<Candidate>>;

    /// Candidates of one election, or of every election if `None`.
    async fn candidates(&self, election_id: Option<Id>) -> Result<Vec<Candidate>>;

    /// Apply a validated patch to the fields it names. Returns the updated
    /// candidate, or `None` if it is gone.
    async fn update_candidate(&self, id: Id, patch: &CandidatePatch) -> Result<Option<Candidate>>;

    /// Remove a candidate. Fails with `NotFound` if there is no such
    /// candidate, and with `Conflict` if any ballot names them.
    async fn delete_candidate(&self, id: Id) -> Result<()>;

    /// Append a ballot unless one already exists for its
    /// `(election_id, voter_id)` pair, in which case fail with
    /// `DuplicateVote`.
    ///
    /// The election must exist (`NotFound`) and the candidate must stand in
    /// it (`InvalidCandidate`) at the moment of insertion. These checks and
    /// the insert are a single atomic step with respect to concurrent casts
    /// and deletions.
    async fn insert_ballot(&self, ballot: NewBallot) -> Result<Ballot>;

    /// The ballot a voter cast in an election, if any.
    async fn find_ballot(&self, election_id: Id, voter_id: Id) -> Result<Option<Ballot>>;

    /// Total ballots cast in an election.
    async fn count_ballots(&self, election_id: Id) -> Result<u64>;

    /// Ballots in an election grouped by candidate, in no particular order.
    /// Candidates without ballots do not appear.
    async fn votes_per_candidate(&self, election_id: Id) -> Result<Vec<CandidateVotes>>;
}

/// A shared handle on whichever [`Store`] the server was configured with.
/// This becomes managed state.
#[derive(Clone)]
pub struct Storage(Arc<dyn Store>);

impl Storage {
    pub fn new(store: impl Store + 'static) -> Self {
        Self(Arc::new(store))
    }

    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        Self::new(MemoryStore::default())
    }
}

impl Deref for Storage {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Storage {
    type Error = ();

    /// Get the storage handle from the managed state.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        req.guard::<&State<Storage>>()
            .await
            .map(|storage| storage.inner().clone())
    }
}
