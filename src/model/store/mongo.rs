use std::time::Duration;

use mongodb::{
    bson::{doc, from_document, Bson, DateTime as BsonDateTime, Document},
    error::{Error as DbError, TRANSIENT_TRANSACTION_ERROR},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, Database,
};
use rocket::{futures::TryStreamExt, tokio::time::sleep};

use crate::error::{Error, Result};
use crate::model::{
    api::{candidate::CandidatePatch, election::ElectionPatch},
    db::{
        ballot::{Ballot, NewBallot},
        candidate::{Candidate, NewCandidate},
        election::{Election, NewElection},
    },
    mongodb::{ensure_indexes_exist, is_duplicate_key_error, Coll, Id},
};

use super::{CandidateVotes, Store};

/// A [`Store`] backed by MongoDB.
///
/// One-ballot-per-voter is enforced by the unique `(election_id, voter_id)`
/// index created in [`ensure_indexes_exist`]. Ballot inserts and deletions
/// run in transactions, so the deployment must be a replica set.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    elections: Coll<Election>,
    new_elections: Coll<NewElection>,
    candidates: Coll<Candidate>,
    new_candidates: Coll<NewCandidate>,
    ballots: Coll<Ballot>,
    new_ballots: Coll<NewBallot>,
}

impl MongoStore {
    /// Connect to the database and make sure the required indexes exist.
    pub async fn connect(db_uri: &str, db_name: &str) -> std::result::Result<Self, DbError> {
        let client = Client::with_uri_str(db_uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        Ok(Self::new(client, &db))
    }

    /// Wrap an existing connection. Indexes are assumed to exist.
    pub fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            elections: Coll::from_db(db),
            new_elections: Coll::from_db(db),
            candidates: Coll::from_db(db),
            new_candidates: Coll::from_db(db),
            ballots: Coll::from_db(db),
            new_ballots: Coll::from_db(db),
        }
    }

    /// One attempt at [`Store::insert_ballot`], as a single transaction.
    ///
    /// Bumping `ballot_count` on the candidate makes this transaction
    /// write-conflict with any concurrent deletion of the candidate or its
    /// election, so a ballot can never outlive the candidate it names.
    async fn try_insert_ballot(&self, ballot: &NewBallot) -> Result<Ballot> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let election = self
            .elections
            .find_one_with_session(ballot.election_id.as_doc(), None, &mut session)
            .await?;
        if election.is_none() {
            session.abort_transaction().await?;
            return Err(Error::not_found(format!("Election {}", ballot.election_id)));
        }

        let standing = doc! {
            "_id": ballot.candidate_id,
            "election_id": ballot.election_id,
        };
        let result = self
            .candidates
            .update_one_with_session(
                standing,
                doc! {"$inc": {"ballot_count": 1}},
                None,
                &mut session,
            )
            .await?;
        if result.matched_count == 0 {
            session.abort_transaction().await?;
            return Err(Error::InvalidCandidate(format!(
                "{} is not standing in election {}",
                ballot.candidate_id, ballot.election_id
            )));
        }

        // The unique index is the only arbiter of one ballot per voter.
        let inserted = match self
            .new_ballots
            .insert_one_with_session(ballot, None, &mut session)
            .await
        {
            Ok(result) => result,
            Err(e) if is_duplicate_key_error(&e) => {
                session.abort_transaction().await?;
                return Err(Error::DuplicateVote(ballot.election_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let id = inserted_id(inserted.inserted_id)?;

        session.commit_transaction().await?;
        Ok(Ballot {
            id,
            ballot: ballot.clone(),
        })
    }
}

/// Upper bound on attempts at a ballot transaction that keeps hitting
/// write conflicts.
const BALLOT_ATTEMPTS: u64 = 16;

fn after_update() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

/// `$set` contents for the fields an election patch names.
fn election_changes(patch: &ElectionPatch) -> Document {
    let mut set = Document::new();
    if let Some(title) = &patch.title {
        set.insert("title", title.as_str());
    }
    if let Some(description) = &patch.description {
        set.insert("description", description.as_str());
    }
    if let Some(positions) = &patch.positions {
        set.insert("positions", positions.clone());
    }
    if let Some(start_date) = patch.start_date {
        set.insert("start_date", BsonDateTime::from_chrono(start_date));
    }
    if let Some(end_date) = patch.end_date {
        set.insert("end_date", BsonDateTime::from_chrono(end_date));
    }
    if let Some(is_active) = patch.is_active {
        set.insert("is_active", is_active);
    }
    set
}

/// `$set` contents for the fields a candidate patch names.
fn candidate_changes(patch: &CandidatePatch) -> Document {
    let fields = [
        ("name", &patch.name),
        ("position", &patch.position),
        ("department", &patch.department),
        ("bio", &patch.bio),
        ("photo", &patch.photo),
    ];
    fields
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(|value| (key.to_string(), Bson::from(value)))
        })
        .collect()
}

/// Pull the ID out of an insert result.
fn inserted_id(id: mongodb::bson::Bson) -> Result<Id> {
    id.as_object_id()
        .map(Id::from)
        .ok_or_else(|| Error::Internal(format!("Unexpected inserted ID {id}")))
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn insert_election(&self, election: NewElection) -> Result<Election> {
        let result = self.new_elections.insert_one(&election, None).await?;
        let id = inserted_id(result.inserted_id)?;
        Ok(Election { id, election })
    }

    async fn find_election(&self, id: Id) -> Result<Option<Election>> {
        Ok(self.elections.find_one(id.as_doc(), None).await?)
    }

    async fn all_elections(&self) -> Result<Vec<Election>> {
        let oldest_first = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let elections = self
            .elections
            .find(None, oldest_first)
            .await?
            .try_collect()
            .await?;
        Ok(elections)
    }

    async fn update_election(&self, id: Id, patch: &ElectionPatch) -> Result<Option<Election>> {
        let set = election_changes(patch);
        if set.is_empty() {
            return self.find_election(id).await;
        }
        Ok(self
            .elections
            .find_one_and_update(id.as_doc(), doc! {"$set": set}, after_update())
            .await?)
    }

    async fn toggle_election_active(&self, id: Id) -> Result<Option<Election>> {
        // An update pipeline, so the flip happens inside the database.
        let flip = vec![doc! {
            "$set": {
                "is_active": { "$not": ["$is_active"] },
            }
        }];
        Ok(self
            .elections
            .find_one_and_update(id.as_doc(), flip, after_update())
            .await?)
    }

    async fn delete_election(&self, id: Id) -> Result<()> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let ballots = self
            .ballots
            .count_documents_with_session(doc! {"election_id": id}, None, &mut session)
            .await?;
        if ballots > 0 {
            session.abort_transaction().await?;
            return Err(Error::Conflict(format!(
                "Election {id} has {ballots} ballots and cannot be deleted"
            )));
        }

        let result = self
            .elections
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?;
        if result.deleted_count == 0 {
            session.abort_transaction().await?;
            return Err(Error::not_found(format!("Election {id}")));
        }
        self.candidates
            .delete_many_with_session(doc! {"election_id": id}, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        Ok(())
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let result = self.new_candidates.insert_one(&candidate, None).await?;
        let id = inserted_id(result.inserted_id)?;
        Ok(Candidate { id, candidate })
    }

    async fn find_candidate(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.candidates.find_one(id.as_doc(), None).await?)
    }

    async fn candidates(&self, election_id: Option<Id>) -> Result<Vec<Candidate>> {
        let filter = election_id.map(|id| doc! {"election_id": id});
        let oldest_first = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let candidates = self
            .candidates
            .find(filter, oldest_first)
            .await?
            .try_collect()
            .await?;
        Ok(candidates)
    }

    async fn update_candidate(&self, id: Id, patch: &CandidatePatch) -> Result<Option<Candidate>> {
        let set = candidate_changes(patch);
        if set.is_empty() {
            return self.find_candidate(id).await;
        }
        Ok(self
            .candidates
            .find_one_and_update(id.as_doc(), doc! {"$set": set}, after_update())
            .await?)
    }

    async fn delete_candidate(&self, id: Id) -> Result<()> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let ballots = self
            .ballots
            .count_documents_with_session(doc! {"candidate_id": id}, None, &mut session)
            .await?;
        if ballots > 0 {
            session.abort_transaction().await?;
            return Err(Error::Conflict(format!(
                "Candidate {id} has {ballots} ballots and cannot be deleted"
            )));
        }

        let result = self
            .candidates
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?;
        if result.deleted_count == 0 {
            session.abort_transaction().await?;
            return Err(Error::not_found(format!("Candidate {id}")));
        }

        session.commit_transaction().await?;
        Ok(())
    }

    async fn insert_ballot(&self, ballot: NewBallot) -> Result<Ballot> {
        let mut attempt = 1;
        loop {
            match self.try_insert_ballot(&ballot).await {
                Err(Error::Db(e))
                    if e.contains_label(TRANSIENT_TRANSACTION_ERROR) && attempt < BALLOT_ATTEMPTS =>
                {
                    debug!("Retrying ballot transaction (attempt {attempt}): {e}");
                    sleep(Duration::from_millis(5 * attempt)).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn find_ballot(&self, election_id: Id, voter_id: Id) -> Result<Option<Ballot>> {
        let filter = doc! {
            "election_id": election_id,
            "voter_id": voter_id,
        };
        Ok(self.ballots.find_one(filter, None).await?)
    }

    async fn count_ballots(&self, election_id: Id) -> Result<u64> {
        Ok(self
            .ballots
            .count_documents(doc! {"election_id": election_id}, None)
            .await?)
    }

    async fn votes_per_candidate(&self, election_id: Id) -> Result<Vec<CandidateVotes>> {
        let pipeline = [
            doc! { "$match": { "election_id": election_id } },
            doc! { "$group": { "_id": "$candidate_id", "votes": { "$sum": 1 } } },
        ];
        let groups: Vec<_> = self
            .ballots
            .aggregate(pipeline, None)
            .await?
            .try_collect()
            .await?;
        groups
            .into_iter()
            .map(|group| {
                from_document::<CandidateVotes>(group)
                    .map_err(|e| Error::Internal(format!("Malformed vote count: {e}")))
            })
            .collect()
    }
}
