//! Election and candidate management, and the voting-window rules.
//!
//! Every mutating operation checks in the same order: the target exists
//! (`NotFound`), the requester may manage it (`Unauthorized`), then the
//! merged data is valid (`Validation`) or the operation is allowed
//! (`Conflict`).

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::Requester,
        candidate::{CandidatePatch, CandidateSpec},
        election::{ElectionPatch, ElectionSpec},
    },
    db::{candidate::Candidate, election::Election},
    mongodb::Id,
    store::Store,
};

/// Fetch an election, failing with `NotFound` if it does not exist.
pub async fn get_election(store: &dyn Store, id: Id) -> Result<Election> {
    store
        .find_election(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {id}")))
}

pub async fn list_elections(store: &dyn Store) -> Result<Vec<Election>> {
    store.all_elections().await
}

/// Fetch an election that is accepting votes at `now`.
pub async fn open_election(store: &dyn Store, id: Id, now: DateTime<Utc>) -> Result<Election> {
    let election = get_election(store, id).await?;
    if !election.is_open(now) {
        return Err(Error::ElectionClosed(id.to_string()));
    }
    Ok(election)
}

/// Does the candidate exist and stand in the given election?
pub async fn candidate_belongs_to(
    store: &dyn Store,
    candidate_id: Id,
    election_id: Id,
) -> Result<bool> {
    Ok(store
        .find_candidate(candidate_id)
        .await?
        .map_or(false, |candidate| candidate.election_id == election_id))
}

fn ensure_may_manage(election: &Election, requester: &Requester) -> Result<()> {
    if election.may_be_managed_by(requester) {
        Ok(())
    } else {
        Err(Error::unauthorized(format!(
            "user {} may not manage election {}",
            requester.id, election.id
        )))
    }
}

pub async fn create_election(
    store: &dyn Store,
    spec: ElectionSpec,
    requester: &Requester,
    now: DateTime<Utc>,
) -> Result<Election> {
    if !requester.is_admin() {
        return Err(Error::unauthorized("admin rights required to create elections"));
    }
    let election = spec.into_new_election(requester.id, now);
    election.validate()?;
    let election = store.insert_election(election).await?;
    info!("Election {} '{}' created by {}", election.id, election.title, requester.id);
    Ok(election)
}

pub async fn update_election(
    store: &dyn Store,
    id: Id,
    patch: ElectionPatch,
    requester: &Requester,
) -> Result<Election> {
    let election = get_election(store, id).await?;
    ensure_may_manage(&election, requester)?;
    let mut merged = election.election;
    patch.clone().apply_to(&mut merged);
    merged.validate()?;
    let election = store
        .update_election(id, &patch)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {id}")))?;
    info!("Election {id} updated by {}", requester.id);
    Ok(election)
}

/// Flip an election's active flag.
pub async fn toggle_election_status(
    store: &dyn Store,
    id: Id,
    requester: &Requester,
) -> Result<Election> {
    let election = get_election(store, id).await?;
    ensure_may_manage(&election, requester)?;
    let election = store
        .toggle_election_active(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {id}")))?;
    info!(
        "Election {id} {} by {}",
        if election.is_active { "activated" } else { "deactivated" },
        requester.id
    );
    Ok(election)
}

/// Delete an election and its candidates. Elections with ballots are kept.
pub async fn delete_election(store: &dyn Store, id: Id, requester: &Requester) -> Result<()> {
    let election = get_election(store, id).await?;
    ensure_may_manage(&election, requester)?;
    store.delete_election(id).await?;
    info!("Election {id} deleted by {}", requester.id);
    Ok(())
}

pub async fn get_candidate(store: &dyn Store, id: Id) -> Result<Candidate> {
    store
        .find_candidate(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {id}")))
}

/// Candidates of one election, which must exist, or of all elections.
pub async fn list_candidates(store: &dyn Store, election_id: Option<Id>) -> Result<Vec<Candidate>> {
    if let Some(election_id) = election_id {
        get_election(store, election_id).await?;
    }
    store.candidates(election_id).await
}

pub async fn create_candidate(
    store: &dyn Store,
    election_id: Id,
    spec: CandidateSpec,
    requester: &Requester,
    now: DateTime<Utc>,
) -> Result<Candidate> {
    let election = get_election(store, election_id).await?;
    ensure_may_manage(&election, requester)?;
    let candidate = spec.into_new_candidate(election_id, now);
    candidate.validate(&election)?;
    let candidate = store.insert_candidate(candidate).await?;
    info!(
        "Candidate {} '{}' added to election {election_id} by {}",
        candidate.id, candidate.name, requester.id
    );
    Ok(candidate)
}

pub async fn update_candidate(
    store: &dyn Store,
    id: Id,
    patch: CandidatePatch,
    requester: &Requester,
) -> Result<Candidate> {
    let candidate = get_candidate(store, id).await?;
    let election = get_election(store, candidate.election_id).await?;
    ensure_may_manage(&election, requester)?;
    let mut merged = candidate.candidate;
    patch.clone().apply_to(&mut merged);
    merged.validate(&election)?;
    let candidate = store
        .update_candidate(id, &patch)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {id}")))?;
    info!("Candidate {id} updated by {}", requester.id);
    Ok(candidate)
}

/// Delete a candidate nobody has voted for.
pub async fn delete_candidate(store: &dyn Store, id: Id, requester: &Requester) -> Result<()> {
    let candidate = get_candidate(store, id).await?;
    let election = get_election(store, candidate.election_id).await?;
    ensure_may_manage(&election, requester)?;
    store.delete_candidate(id).await?;
    info!("Candidate {id} deleted by {}", requester.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::{
        api::auth::Rights,
        db::{ballot::NewBallot, candidate::CandidateCore, election::ElectionCore},
        store::{InterleavedStore, Interruption, MemoryStore},
    };

    fn admin() -> Requester {
        Requester::new(Id::new(), Rights::Admin)
    }

    fn voter() -> Requester {
        Requester::new(Id::new(), Rights::Voter)
    }

    #[rocket::async_test]
    async fn only_admins_create_elections() {
        let store = MemoryStore::default();
        let spec = ElectionSpec::current_example();

        let denied = create_election(&store, spec.clone(), &voter(), Utc::now()).await;
        assert!(matches!(denied, Err(Error::Unauthorized(_))));

        let admin = admin();
        let election = create_election(&store, spec, &admin, Utc::now())
            .await
            .unwrap();
        assert_eq!(election.created_by, admin.id);
        assert_eq!(get_election(&store, election.id).await.unwrap(), election);
    }

    #[rocket::async_test]
    async fn invalid_elections_are_not_stored() {
        let store = MemoryStore::default();
        let spec = ElectionSpec {
            positions: vec![],
            ..ElectionSpec::current_example()
        };
        let result = create_election(&store, spec, &admin(), Utc::now()).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(list_elections(&store).await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn strangers_cannot_manage_elections() {
        let store = MemoryStore::default();
        let creator = voter();
        let election = store
            .insert_election(ElectionCore::current_example(creator.id))
            .await
            .unwrap();
        let stranger = voter();

        let patch = ElectionPatch {
            title: Some("Hijacked".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_election(&store, election.id, patch.clone(), &stranger).await,
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            toggle_election_status(&store, election.id, &stranger).await,
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            delete_election(&store, election.id, &stranger).await,
            Err(Error::Unauthorized(_))
        ));
        assert_eq!(get_election(&store, election.id).await.unwrap(), election);

        let updated = update_election(&store, election.id, patch, &creator)
            .await
            .unwrap();
        assert_eq!(updated.title, "Hijacked");
    }

    #[rocket::async_test]
    async fn missing_election_is_reported_before_rights() {
        let store = MemoryStore::default();
        assert!(matches!(
            toggle_election_status(&store, Id::new(), &voter()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            delete_election(&store, Id::new(), &voter()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[rocket::async_test]
    async fn updates_are_validated_after_merging() {
        let store = MemoryStore::default();
        let election = store
            .insert_election(ElectionCore::current_example(Id::new()))
            .await
            .unwrap();
        let patch = ElectionPatch {
            end_date: Some(election.start_date - Duration::days(1)),
            ..Default::default()
        };
        let result = update_election(&store, election.id, patch, &admin()).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(get_election(&store, election.id).await.unwrap(), election);
    }

    #[rocket::async_test]
    async fn updates_leave_unpatched_fields_to_concurrent_writers() {
        let store = InterleavedStore::default();
        let creator = voter();
        let election = store
            .insert_election(ElectionCore::current_example(creator.id))
            .await
            .unwrap();
        assert!(election.is_active);

        store.interrupt_next_write(Interruption::ToggleElection(election.id));
        let patch = ElectionPatch {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        let updated = update_election(&store, election.id, patch, &creator)
            .await
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert!(!updated.is_active);
        assert_eq!(get_election(&store, election.id).await.unwrap(), updated);
    }

    #[rocket::async_test]
    async fn candidate_updated_after_deletion_is_not_found() {
        let store = InterleavedStore::default();
        let creator = voter();
        let election = store
            .insert_election(ElectionCore::current_example(creator.id))
            .await
            .unwrap();
        let candidate = store
            .insert_candidate(CandidateCore::example1(election.id))
            .await
            .unwrap();

        store.interrupt_next_write(Interruption::DeleteCandidate(candidate.id));
        let patch = CandidatePatch {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let result = update_candidate(&store, candidate.id, patch, &creator).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(store.candidates(None).await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn toggling_flips_the_active_flag() {
        let store = MemoryStore::default();
        let creator = voter();
        let election = store
            .insert_election(ElectionCore::current_example(creator.id))
            .await
            .unwrap();

        let off = toggle_election_status(&store, election.id, &creator)
            .await
            .unwrap();
        assert!(!off.is_active);
        let on = toggle_election_status(&store, election.id, &admin())
            .await
            .unwrap();
        assert!(on.is_active);
    }

    #[rocket::async_test]
    async fn open_election_checks_window_and_flag() {
        let store = MemoryStore::default();
        let now = Utc::now();
        let open = store
            .insert_election(ElectionCore::current_example(Id::new()))
            .await
            .unwrap();
        let inactive = store
            .insert_election(ElectionCore::inactive_example(Id::new()))
            .await
            .unwrap();
        let future = store
            .insert_election(ElectionCore::future_example(Id::new()))
            .await
            .unwrap();

        assert_eq!(open_election(&store, open.id, now).await.unwrap(), open);
        assert!(matches!(
            open_election(&store, inactive.id, now).await,
            Err(Error::ElectionClosed(_))
        ));
        assert!(matches!(
            open_election(&store, future.id, now).await,
            Err(Error::ElectionClosed(_))
        ));
        assert!(matches!(
            open_election(&store, open.id, open.end_date + Duration::seconds(1)).await,
            Err(Error::ElectionClosed(_))
        ));
        assert!(matches!(
            open_election(&store, Id::new(), now).await,
            Err(Error::NotFound(_))
        ));
    }

    #[rocket::async_test]
    async fn candidates_belong_to_one_election() {
        let store = MemoryStore::default();
        let creator = voter();
        let election = store
            .insert_election(ElectionCore::current_example(creator.id))
            .await
            .unwrap();
        let other = store
            .insert_election(ElectionCore::current_example(creator.id))
            .await
            .unwrap();
        let candidate = create_candidate(
            &store,
            election.id,
            CandidateSpec::example1(),
            &creator,
            Utc::now(),
        )
        .await
        .unwrap();

        assert!(candidate_belongs_to(&store, candidate.id, election.id).await.unwrap());
        assert!(!candidate_belongs_to(&store, candidate.id, other.id).await.unwrap());
        assert!(!candidate_belongs_to(&store, Id::new(), election.id).await.unwrap());

        assert_eq!(
            list_candidates(&store, Some(election.id)).await.unwrap(),
            vec![candidate.clone()]
        );
        assert!(list_candidates(&store, Some(other.id)).await.unwrap().is_empty());
        assert!(matches!(
            list_candidates(&store, Some(Id::new())).await,
            Err(Error::NotFound(_))
        ));
    }

    #[rocket::async_test]
    async fn candidate_positions_must_be_contested() {
        let store = MemoryStore::default();
        let creator = voter();
        let election = store
            .insert_election(ElectionCore::current_example(creator.id))
            .await
            .unwrap();
        let spec = CandidateSpec {
            position: "Dean".to_string(),
            ..CandidateSpec::example1()
        };
        let result = create_candidate(&store, election.id, spec, &creator, Utc::now()).await;
        assert!(matches!(result, Err(Error::Validation(_))));

        let stranger = create_candidate(
            &store,
            election.id,
            CandidateSpec::example1(),
            &voter(),
            Utc::now(),
        )
        .await;
        assert!(matches!(stranger, Err(Error::Unauthorized(_))));
    }

    #[rocket::async_test]
    async fn candidate_updates_keep_the_election() {
        let store = MemoryStore::default();
        let creator = voter();
        let election = store
            .insert_election(ElectionCore::current_example(creator.id))
            .await
            .unwrap();
        let candidate = store
            .insert_candidate(CandidateCore::example1(election.id))
            .await
            .unwrap();

        let patch = CandidatePatch {
            position: Some("Treasurer".to_string()),
            ..Default::default()
        };
        let updated = update_candidate(&store, candidate.id, patch, &creator)
            .await
            .unwrap();
        assert_eq!(updated.position, "Treasurer");
        assert_eq!(updated.election_id, election.id);
        assert_eq!(get_candidate(&store, candidate.id).await.unwrap(), updated);
    }

    #[rocket::async_test]
    async fn ballots_block_deletion() {
        let store = MemoryStore::default();
        let creator = voter();
        let election = store
            .insert_election(ElectionCore::current_example(creator.id))
            .await
            .unwrap();
        let voted = store
            .insert_candidate(CandidateCore::example1(election.id))
            .await
            .unwrap();
        let unvoted = store
            .insert_candidate(CandidateCore::example2(election.id))
            .await
            .unwrap();
        store
            .insert_ballot(NewBallot::new(election.id, voted.id, Id::new(), Utc::now()))
            .await
            .unwrap();

        assert!(matches!(
            delete_candidate(&store, voted.id, &creator).await,
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            delete_election(&store, election.id, &creator).await,
            Err(Error::Conflict(_))
        ));
        delete_candidate(&store, unvoted.id, &creator).await.unwrap();
        assert!(matches!(
            get_candidate(&store, unvoted.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[rocket::async_test]
    async fn deleting_an_election_removes_its_candidates() {
        let store = MemoryStore::default();
        let admin = admin();
        let election = store
            .insert_election(ElectionCore::current_example(Id::new()))
            .await
            .unwrap();
        let candidate = store
            .insert_candidate(CandidateCore::example1(election.id))
            .await
            .unwrap();

        delete_election(&store, election.id, &admin).await.unwrap();
        assert!(matches!(
            get_election(&store, election.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            get_candidate(&store, candidate.id).await,
            Err(Error::NotFound(_))
        ));
    }
}
