use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, TokenData, Validation};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{api::id::ApiId, mongodb::Id};

use super::user::{Requester, Rights, User};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";
const BEARER_PREFIX: &str = "Bearer ";

/// An authentication token representing a specific user with specific rights.
///
/// Tokens are issued by the campus identity provider, which shares our
/// `jwt_secret`; this service only ever verifies them.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken<U> {
    #[serde(rename = "sub")]
    pub id: ApiId,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

impl<U> AuthToken<U> {
    /// Create a token for the given user ID and rights.
    pub fn new(id: Id, rights: Rights) -> Self {
        Self {
            id: id.into(),
            rights,
            phantom: PhantomData,
        }
    }

    /// Does this token permit the given rights?
    pub fn permits(&self, target: Rights) -> bool {
        self.rights >= target
    }

    /// The identity this token vouches for.
    pub fn requester(&self) -> Requester {
        Requester::new(*self.id, self.rights)
    }

    /// Verify and decode a signed token.
    pub fn decode(token: &str, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<U>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Signing, as the identity provider does it.
#[cfg(test)]
impl<U> AuthToken<U> {
    /// Sign this token, valid for an hour.
    pub fn encode(self, config: &Config) -> Result<String> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + chrono::Duration::hours(1),
        };
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(config.jwt_secret()),
        )?;
        Ok(token)
    }

    /// Sign this token and wrap it in a cookie.
    pub fn into_cookie(self, config: &Config) -> Result<rocket::http::Cookie<'static>> {
        let token = self.encode(config)?;
        Ok(rocket::http::Cookie::build(AUTH_TOKEN_COOKIE, token)
            .http_only(true)
            .same_site(rocket::http::SameSite::Strict)
            .finish())
    }

    /// An `Authorization` header carrying this token, signed with the example config.
    pub fn example_header(self) -> rocket::http::Header<'static> {
        let token = self.encode(&Config::example()).unwrap();
        rocket::http::Header::new("Authorization", format!("{BEARER_PREFIX}{token}"))
    }
}

/// Token claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// Find the raw token, preferring the cookie over the `Authorization` header.
fn raw_token(req: &Request<'_>) -> Option<String> {
    if let Some(cookie) = req.cookies().get(AUTH_TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }
    req.headers()
        .get_one("Authorization")
        .and_then(|header| header.strip_prefix(BEARER_PREFIX))
        .map(|token| token.trim().to_string())
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: User + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the request and verify that it has sufficient rights for this
    /// user type.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.rocket().state::<Config>() {
            Some(config) => config,
            None => {
                return Outcome::Failure((
                    Status::InternalServerError,
                    Error::Internal("Config is not managed".to_string()),
                ))
            }
        };

        let raw = match raw_token(req) {
            Some(raw) => raw,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized("no authentication token"),
                ))
            }
        };

        let token: Self = match Self::decode(&raw, config) {
            Ok(token) => token,
            Err(e) => {
                debug!("Rejected authentication token: {e}");
                return Outcome::Failure((Status::Unauthorized, e));
            }
        };

        if !token.permits(U::RIGHTS) {
            return Outcome::Failure((
                Status::Unauthorized,
                Error::unauthorized(format!("{} rights required", U::RIGHTS)),
            ));
        }

        Outcome::Success(token)
    }
}
