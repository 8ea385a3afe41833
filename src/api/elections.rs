use chrono::Utc;
use rocket::{http::Status, response::status, serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        auth::{Admin, AuthToken, Voter},
        election::{ElectionDescription, ElectionPatch, ElectionSpec},
    },
    mongodb::Id,
    registry,
    store::Storage,
};

pub fn routes() -> Vec<Route> {
    routes![
        elections,
        election,
        create_election,
        modify_election,
        delete_election,
        toggle_election_status,
    ]
}

#[get("/elections")]
async fn elections(storage: Storage) -> Result<Json<Vec<ElectionDescription>>> {
    let now = Utc::now();
    let elections = registry::list_elections(&*storage).await?;
    Ok(Json(
        elections
            .into_iter()
            .map(|election| ElectionDescription::at(election, now))
            .collect(),
    ))
}

#[get("/elections/<election_id>")]
async fn election(election_id: Id, storage: Storage) -> Result<Json<ElectionDescription>> {
    let election = registry::get_election(&*storage, election_id).await?;
    Ok(Json(election.into()))
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    storage: Storage,
) -> Result<status::Custom<Json<ElectionDescription>>> {
    let election = registry::create_election(
        &*storage,
        spec.into_inner(),
        &token.requester(),
        Utc::now(),
    )
    .await?;
    Ok(status::Custom(Status::Created, Json(election.into())))
}

#[put("/elections/<election_id>", data = "<patch>", format = "json")]
async fn modify_election(
    token: AuthToken<Voter>,
    election_id: Id,
    patch: Json<ElectionPatch>,
    storage: Storage,
) -> Result<Json<ElectionDescription>> {
    let election =
        registry::update_election(&*storage, election_id, patch.into_inner(), &token.requester())
            .await?;
    Ok(Json(election.into()))
}

#[delete("/elections/<election_id>")]
async fn delete_election(
    token: AuthToken<Voter>,
    election_id: Id,
    storage: Storage,
) -> Result<Status> {
    registry::delete_election(&*storage, election_id, &token.requester()).await?;
    Ok(Status::NoContent)
}

#[put("/elections/<election_id>/status")]
async fn toggle_election_status(
    token: AuthToken<Voter>,
    election_id: Id,
    storage: Storage,
) -> Result<Json<ElectionDescription>> {
    let election =
        registry::toggle_election_status(&*storage, election_id, &token.requester()).await?;
    Ok(Json(election.into()))
}
