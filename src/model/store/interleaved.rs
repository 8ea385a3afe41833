use std::sync::Mutex;

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

use super::{CandidateVotes, MemoryStore, Store};

/// A write that lands between a caller's reads and its own write.
#[derive(Debug, Clone, Copy)]
pub enum Interruption {
    DeleteCandidate(Id),
    DeleteElection(Id),
    ToggleElection(Id),
}

/// A [`MemoryStore`] that performs an [`Interruption`] immediately before the
/// next ballot insert or patch reaches it, as a concurrent request would.
#[derive(Debug, Default)]
pub struct InterleavedStore {
    inner: MemoryStore,
    pending: Mutex<Option<Interruption>>,
}

impl InterleavedStore {
    /// Arm an interruption for the next ballot insert or update.
    pub fn interrupt_next_write(&self, interruption: Interruption) {
        *self.pending.lock().unwrap() = Some(interruption);
    }

    async fn interrupt(&self) {
        let pending = self.pending.lock().unwrap().take();
        match pending {
            Some(Interruption::DeleteCandidate(id)) => self.inner.delete_candidate(id).await.unwrap(),
            Some(Interruption::DeleteElection(id)) => self.inner.delete_election(id).await.unwrap(),
            Some(Interruption::ToggleElection(id)) => {
                self.inner.toggle_election_active(id).await.unwrap().unwrap();
            }
            None => {}
        }
    }
}

#[rocket::async_trait]
impl Store for InterleavedStore {
    async fn insert_election(&self, election: NewElection) -> Result<Election> {
        self.inner.insert_election(election).await
    }

    async fn find_election(&self, id: Id) -> Result<Option<Election>> {
        self.inner.find_election(id).await
    }

    async fn all_elections(&self) -> Result<Vec<Election>> {
        self.inner.all_elections().await
    }

    async fn update_election(&self, id: Id, patch: &ElectionPatch) -> Result<Option<Election>> {
        self.interrupt().await;
        self.inner.update_election(id, patch).await
    }

    async fn toggle_election_active(&self, id: Id) -> Result<Option<Election>> {
        self.inner.toggle_election_active(id).await
    }

    async fn delete_election(&self, id: Id) -> Result<()> {
        self.inner.delete_election(id).await
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        self.inner.insert_candidate(candidate).await
    }

    async fn find_candidate(&self, id: Id) -> Result<Option<Candidate>> {
        self.inner.find_candidate(id).await
    }

    async fn candidates(&self, election_id: Option<Id>) -> Result<Vec<Candidate>> {
        self.inner.candidates(election_id).await
    }

    async fn update_candidate(&self, id: Id, patch: &CandidatePatch) -> Result<Option<Candidate>> {
        self.interrupt().await;
        self.inner.update_candidate(id, patch).await
    }

    async fn delete_candidate(&self, id: Id) -> Result<()> {
        self.inner.delete_candidate(id).await
    }

    async fn insert_ballot(&self, ballot: NewBallot) -> Result<Ballot> {
        self.interrupt().await;
        self.inner.insert_ballot(ballot).await
    }

    async fn find_ballot(&self, election_id: Id, voter_id: Id) -> Result<Option<Ballot>> {
        self.inner.find_ballot(election_id, voter_id).await
    }

    async fn count_ballots(&self, election_id: Id) -> Result<u64> {
        self.inner.count_ballots(election_id).await
    }

    async fn votes_per_candidate(&self, election_id: Id) -> Result<Vec<CandidateVotes>> {
        self.inner.votes_per_candidate(election_id).await
    }
}
