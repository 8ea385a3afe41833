use chrono::Utc;
use rocket::{http::Status, response::status, serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        auth::{AuthToken, Voter},
        candidate::{CandidateDescription, CandidatePatch, CandidateSpec},
    },
    db::candidate::Candidate,
    mongodb::Id,
    registry,
    store::Storage,
};

pub fn routes() -> Vec<Route> {
    routes![
        candidates,
        election_candidates,
        candidate,
        create_candidate,
        modify_candidate,
        delete_candidate,
    ]
}

fn describe(candidates: Vec<Candidate>) -> Json<Vec<CandidateDescription>> {
    Json(candidates.into_iter().map(Into::into).collect())
}

#[get("/candidates")]
async fn candidates(storage: Storage) -> Result<Json<Vec<CandidateDescription>>> {
    let candidates = registry::list_candidates(&*storage, None).await?;
    Ok(describe(candidates))
}

#[get("/elections/<election_id>/candidates")]
async fn election_candidates(
    election_id: Id,
    storage: Storage,
) -> Result<Json<Vec<CandidateDescription>>> {
    let candidates = registry::list_candidates(&*storage, Some(election_id)).await?;
    Ok(describe(candidates))
}

#[get("/candidates/<candidate_id>")]
async fn candidate(candidate_id: Id, storage: Storage) -> Result<Json<CandidateDescription>> {
    let candidate = registry::get_candidate(&*storage, candidate_id).await?;
    Ok(Json(candidate.into()))
}

#[post("/elections/<election_id>/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    token: AuthToken<Voter>,
    election_id: Id,
    spec: Json<CandidateSpec>,
    storage: Storage,
) -> Result<status::Custom<Json<CandidateDescription>>> {
    let candidate = registry::create_candidate(
        &*storage,
        election_id,
        spec.into_inner(),
        &token.requester(),
        Utc::now(),
    )
    .await?;
    Ok(status::Custom(Status::Created, Json(candidate.into())))
}

#[put("/candidates/<candidate_id>", data = "<patch>", format = "json")]
async fn modify_candidate(
    token: AuthToken<Voter>,
    candidate_id: Id,
    patch: Json<CandidatePatch>,
    storage: Storage,
) -> Result<Json<CandidateDescription>> {
    let candidate = registry::update_candidate(
        &*storage,
        candidate_id,
        patch.into_inner(),
        &token.requester(),
    )
    .await?;
    Ok(Json(candidate.into()))
}

#[delete("/candidates/<candidate_id>")]
async fn delete_candidate(
    token: AuthToken<Voter>,
    candidate_id: Id,
    storage: Storage,
) -> Result<Status> {
    registry::delete_candidate(&*storage, candidate_id, &token.requester()).await?;
    Ok(Status::NoContent)
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use crate::model::{
        api::auth::Rights,
        db::{
            ballot::NewBallot,
            candidate::CandidateCore,
            election::{Election, ElectionCore},
        },
        store::Store,
    };

    use super::*;

    async fn insert_election(storage: &Storage, created_by: Id) -> Election {
        storage
            .insert_election(ElectionCore::current_example(created_by))
            .await
            .unwrap()
    }

    #[backend_test]
    async fn creator_adds_candidates(client: Client, storage: Storage) {
        let creator = AuthToken::<Voter>::new(Id::new(), Rights::Voter);
        let election = insert_election(&storage, *creator.id).await;

        let response = client
            .post(uri!(create_candidate(election.id)))
            .header(ContentType::JSON)
            .header(creator.example_header())
            .body(serde_json::to_string(&CandidateSpec::example1()).unwrap())
            .dispatch()
            .await;

        assert_eq!(Status::Created, response.status());
        let created: CandidateDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(created.name, CandidateSpec::example1().name);
        assert_eq!(*created.election_id, election.id);

        let response = client
            .get(uri!(election_candidates(election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let listed: Vec<CandidateDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
    }

    #[backend_test]
    async fn strangers_cannot_add_candidates(client: Client, storage: Storage) {
        let election = insert_election(&storage, Id::new()).await;

        let response = client
            .post(uri!(create_candidate(election.id)))
            .header(ContentType::JSON)
            .header(AuthToken::<Voter>::new(Id::new(), Rights::Voter).example_header())
            .body(serde_json::to_string(&CandidateSpec::example2()).unwrap())
            .dispatch()
            .await;

        assert_eq!(Status::Unauthorized, response.status());
        assert!(storage.candidates(None).await.unwrap().is_empty());
    }

    #[backend_test]
    async fn uncontested_positions_are_rejected(client: Client, storage: Storage) {
        let election = insert_election(&storage, Id::new()).await;
        let spec = CandidateSpec {
            position: "Vice-Chancellor".to_string(),
            ..CandidateSpec::example1()
        };

        let response = client
            .post(uri!(create_candidate(election.id)))
            .header(ContentType::JSON)
            .header(AuthToken::<Voter>::new(Id::new(), Rights::Admin).example_header())
            .body(serde_json::to_string(&spec).unwrap())
            .dispatch()
            .await;

        assert_eq!(Status::UnprocessableEntity, response.status());
    }

    #[backend_test]
    async fn lists_candidates_across_elections(client: Client, storage: Storage) {
        let first = insert_election(&storage, Id::new()).await;
        let second = insert_election(&storage, Id::new()).await;
        for election_id in [first.id, second.id] {
            storage
                .insert_candidate(CandidateCore::example3(election_id))
                .await
                .unwrap();
        }

        let response = client.get(uri!(candidates)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let listed: Vec<CandidateDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(listed.len(), 2);

        let response = client
            .get(uri!(election_candidates(Id::new())))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn modify_keeps_other_fields(client: Client, storage: Storage) {
        let election = insert_election(&storage, Id::new()).await;
        let candidate = storage
            .insert_candidate(CandidateCore::example1(election.id))
            .await
            .unwrap();
        let patch = CandidatePatch {
            bio: Some("Now with a manifesto.".to_string()),
            ..Default::default()
        };

        let response = client
            .put(uri!(modify_candidate(candidate.id)))
            .header(ContentType::JSON)
            .header(AuthToken::<Voter>::new(Id::new(), Rights::Admin).example_header())
            .body(serde_json::to_string(&patch).unwrap())
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        let updated: CandidateDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(updated.bio.as_deref(), Some("Now with a manifesto."));
        assert_eq!(updated.name, candidate.name);
        assert_eq!(updated.photo, candidate.photo);
    }

    #[backend_test]
    async fn voted_candidates_cannot_be_deleted(client: Client, storage: Storage) {
        let creator = AuthToken::<Voter>::new(Id::new(), Rights::Voter);
        let election = insert_election(&storage, *creator.id).await;
        let voted = storage
            .insert_candidate(CandidateCore::example1(election.id))
            .await
            .unwrap();
        storage
            .insert_ballot(NewBallot::new(election.id, voted.id, Id::new(), Utc::now()))
            .await
            .unwrap();

        let response = client
            .delete(uri!(delete_candidate(voted.id)))
            .header(creator.example_header())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());

        let response = client.get(uri!(candidate(voted.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
    }

    #[backend_test]
    async fn unvoted_candidates_are_deleted(client: Client, storage: Storage) {
        let election = insert_election(&storage, Id::new()).await;
        let candidate = storage
            .insert_candidate(CandidateCore::example2(election.id))
            .await
            .unwrap();

        let response = client
            .delete(uri!(delete_candidate(candidate.id)))
            .header(AuthToken::<Voter>::new(Id::new(), Rights::Admin).example_header())
            .dispatch()
            .await;
        assert_eq!(Status::NoContent, response.status());

        let response = client.get(uri!(candidate(candidate.id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }
}
