#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, StorageFairing};
use crate::logging::LoggerFairing;
use crate::model::store::Storage;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

/// Build the server. Configuration and storage are loaded from the figment
/// when the server ignites.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", api::catchers())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(StorageFairing)
}

/// Build the server around a ready-made config and storage handle.
pub fn rocket_for(config: Config, storage: Storage) -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", api::catchers())
        .attach(LoggerFairing)
        .manage(config)
        .manage(storage)
}

/// Storage for a single test: in memory, unless `CAMPUS_VOTE_TEST_DB_URI`
/// points at a MongoDB replica set, in which case a fresh randomly named
/// database is returned too so it can be dropped afterwards.
#[cfg(test)]
pub(crate) async fn test_storage() -> (Storage, Option<mongodb::Database>) {
    use crate::model::{mongodb::ensure_indexes_exist, store::MongoStore};

    let Ok(db_uri) = std::env::var("CAMPUS_VOTE_TEST_DB_URI") else {
        return (Storage::memory(), None);
    };
    let random: u32 = rand::random();
    let db_name = format!("test{random}");
    info!("Using database {db_name}");

    let client = mongodb::Client::with_uri_str(&db_uri).await.unwrap();
    let db = client.database(&db_name);
    ensure_indexes_exist(&db).await.unwrap();
    (Storage::new(MongoStore::new(client, &db)), Some(db))
}
