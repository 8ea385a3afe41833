pub mod api;
pub mod db;
pub mod ledger;
pub mod mongodb;
pub mod registry;
pub mod store;
pub mod tally;
