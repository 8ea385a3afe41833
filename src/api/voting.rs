use chrono::Utc;
use rocket::{http::Status, response::status, serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        auth::{AuthToken, Voter},
        results::ElectionResults,
        vote::{BallotDescription, VoteRequest, VoteStatus},
    },
    ledger,
    mongodb::Id,
    store::Storage,
    tally,
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, has_voted, election_results]
}

#[post("/elections/<election_id>/vote", data = "<vote>", format = "json")]
async fn cast_vote(
    token: AuthToken<Voter>,
    election_id: Id,
    vote: Json<VoteRequest>,
    storage: Storage,
) -> Result<status::Custom<Json<BallotDescription>>> {
    let ballot = ledger::cast_vote(
        &*storage,
        election_id,
        *token.id,
        *vote.candidate_id,
        Utc::now(),
    )
    .await?;
    Ok(status::Custom(Status::Created, Json(ballot.into())))
}

#[get("/elections/<election_id>/has_voted")]
async fn has_voted(
    token: AuthToken<Voter>,
    election_id: Id,
    storage: Storage,
) -> Result<Json<VoteStatus>> {
    let ballot = ledger::has_voted(&*storage, election_id, *token.id).await?;
    Ok(Json(ballot.into()))
}

#[get("/elections/<election_id>/results?<include_unvoted>")]
async fn election_results(
    election_id: Id,
    include_unvoted: Option<bool>,
    storage: Storage,
) -> Result<Json<ElectionResults>> {
    let results = tally::tally(&*storage, election_id, include_unvoted.unwrap_or(false)).await?;
    Ok(Json(results))
}
