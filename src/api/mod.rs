use rocket::{
    http::Status,
    response::status,
    serde::json::Json,
    Catcher, Request, Route,
};

use crate::error::{kind_of_status, ErrorBody};
use crate::logging::RequestId;

mod candidates;
mod elections;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(elections::routes());
    routes.extend(candidates::routes());
    routes.extend(voting::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![json_error]
}

/// Answer requests that never reached a handler with the same JSON error
/// body as handler errors.
#[catch(default)]
fn json_error(status: Status, req: &Request<'_>) -> status::Custom<Json<ErrorBody>> {
    debug!("req{} caught with {status}", RequestId::of(req));
    let body = ErrorBody {
        error: kind_of_status(status),
        message: status.reason().unwrap_or("Request failed").to_string(),
    };
    status::Custom(status, Json(body))
}
