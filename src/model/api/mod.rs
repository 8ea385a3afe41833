//! Types exchanged with API clients.

pub mod auth;
pub mod candidate;
pub mod election;
pub mod id;
pub mod results;
pub mod vote;

pub use id::ApiId;
