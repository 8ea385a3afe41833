use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Different privilege levels, as carried in an authentication token.
///
/// Ordered, so that a higher level also permits everything a lower one does.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rights {
    Voter,
    Admin,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}

/// A kind of user that a route may require, having defined rights.
pub trait User {
    /// The minimum rights needed to act as this user type.
    const RIGHTS: Rights;
}

/// Any signed-in user; every user may vote.
#[derive(Debug)]
pub struct Voter;

/// An election administrator.
#[derive(Debug)]
pub struct Admin;

impl User for Voter {
    const RIGHTS: Rights = Rights::Voter;
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;
}

/// The verified identity behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: Id,
    pub rights: Rights,
}

impl Requester {
    pub fn new(id: Id, rights: Rights) -> Self {
        Self { id, rights }
    }

    /// Does this requester hold the elevated role?
    pub fn is_admin(&self) -> bool {
        self.rights >= Rights::Admin
    }
}
