use std::collections::{btree_map::Entry, BTreeMap, HashMap};

use rocket::tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::model::{
    api::{candidate::CandidatePatch, election::ElectionPatch},
    db::{
        ballot::{Ballot, NewBallot},
        candidate::{Candidate, NewCandidate},
        election::{Election, NewElection},
    },
    mongodb::Id,
};

use super::{CandidateVotes, Store};

/// A [`Store`] kept entirely in process memory.
///
/// Used for tests and for running the server without a database. Every
/// operation takes the single lock, so compound operations are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    elections: BTreeMap<Id, Election>,
    candidates: BTreeMap<Id, Candidate>,
    /// Keyed by `(election_id, voter_id)`: the uniqueness constraint.
    ballots: BTreeMap<(Id, Id), Ballot>,
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn insert_election(&self, election: NewElection) -> Result<Election> {
        let election = Election {
            id: Id::new(),
            election,
        };
        self.state
            .write()
            .await
            .elections
            .insert(election.id, election.clone());
        Ok(election)
    }

    async fn find_election(&self, id: Id) -> Result<Option<Election>> {
        Ok(self.state.read().await.elections.get(&id).cloned())
    }

    async fn all_elections(&self) -> Result<Vec<Election>> {
        Ok(self.state.read().await.elections.values().cloned().collect())
    }

    async fn update_election(&self, id: Id, patch: &ElectionPatch) -> Result<Option<Election>> {
        let mut state = self.state.write().await;
        Ok(state.elections.get_mut(&id).map(|election| {
            patch.clone().apply_to(election);
            election.clone()
        }))
    }

    async fn toggle_election_active(&self, id: Id) -> Result<Option<Election>> {
        let mut state = self.state.write().await;
        Ok(state.elections.get_mut(&id).map(|election| {
            election.is_active = !election.is_active;
            election.clone()
        }))
    }

    async fn delete_election(&self, id: Id) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.elections.contains_key(&id) {
            return Err(Error::not_found(format!("Election {id}")));
        }
        if state.ballots.keys().any(|(election_id, _)| *election_id == id) {
            return Err(Error::Conflict(format!(
                "Election {id} has ballots and cannot be deleted"
            )));
        }
        state.elections.remove(&id);
        state
            .candidates
            .retain(|_, candidate| candidate.election_id != id);
        Ok(())
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let candidate = Candidate {
            id: Id::new(),
            candidate,
        };
        self.state
            .write()
            .await
            .candidates
            .insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    async fn find_candidate(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.state.read().await.candidates.get(&id).cloned())
    }

    async fn candidates(&self, election_id: Option<Id>) -> Result<Vec<Candidate>> {
        Ok(self
            .state
            .read()
            .await
            .candidates
            .values()
            .filter(|candidate| election_id.map_or(true, |id| candidate.election_id == id))
            .cloned()
            .collect())
    }

    async fn update_candidate(&self, id: Id, patch: &CandidatePatch) -> Result<Option<Candidate>> {
        let mut state = self.state.write().await;
        Ok(state.candidates.get_mut(&id).map(|candidate| {
            patch.clone().apply_to(candidate);
            candidate.clone()
        }))
    }

    async fn delete_candidate(&self, id: Id) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.candidates.contains_key(&id) {
            return Err(Error::not_found(format!("Candidate {id}")));
        }
        if state.ballots.values().any(|ballot| ballot.candidate_id == id) {
            return Err(Error::Conflict(format!(
                "Candidate {id} has ballots and cannot be deleted"
            )));
        }
        state.candidates.remove(&id);
        Ok(())
    }

    async fn insert_ballot(&self, ballot: NewBallot) -> Result<Ballot> {
        let mut state = self.state.write().await;
        if !state.elections.contains_key(&ballot.election_id) {
            return Err(Error::not_found(format!("Election {}", ballot.election_id)));
        }
        let stands = state
            .candidates
            .get(&ballot.candidate_id)
            .map_or(false, |candidate| candidate.election_id == ballot.election_id);
        if !stands {
            return Err(Error::InvalidCandidate(format!(
                "{} is not standing in election {}",
                ballot.candidate_id, ballot.election_id
            )));
        }
        match state.ballots.entry((ballot.election_id, ballot.voter_id)) {
            Entry::Occupied(_) => Err(Error::DuplicateVote(ballot.election_id.to_string())),
            Entry::Vacant(slot) => {
                let ballot = Ballot {
                    id: Id::new(),
                    ballot,
                };
                Ok(slot.insert(ballot).clone())
            }
        }
    }

    async fn find_ballot(&self, election_id: Id, voter_id: Id) -> Result<Option<Ballot>> {
        Ok(self
            .state
            .read()
            .await
            .ballots
            .get(&(election_id, voter_id))
            .cloned())
    }

    async fn count_ballots(&self, election_id: Id) -> Result<u64> {
        let state = self.state.read().await;
        let count = state
            .ballots
            .keys()
            .filter(|(id, _)| *id == election_id)
            .count();
        Ok(count as u64)
    }

    async fn votes_per_candidate(&self, election_id: Id) -> Result<Vec<CandidateVotes>> {
        let state = self.state.read().await;
        let mut counts: HashMap<Id, u64> = HashMap::new();
        for ballot in state.ballots.values() {
            if ballot.election_id == election_id {
                *counts.entry(ballot.candidate_id).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(candidate_id, votes)| CandidateVotes {
                candidate_id,
                votes,
            })
            .collect())
    }
}
