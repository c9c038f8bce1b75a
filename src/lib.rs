#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod notify;

pub use config::Config;

use config::{ConfigFairing, DatabaseFairing, MessagingFairing};
use logging::LoggerFairing;

/// Construct the server, with all configuration and connections established
/// by fairings at ignition.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(MessagingFairing)
}

/// Construct a server around an existing database connection, bypassing the
/// database and messaging fairings. Messages go to a [`notify::RecordingNotifier`],
/// which is also managed so tests can inspect it.
#[cfg(test)]
pub(crate) async fn rocket_for_db(db_client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db = db_client.database(db_name);
    model::mongodb::ensure_indexes_exist(&db)
        .await
        .expect("Failed to create test indexes");
    let recorder = notify::RecordingNotifier::new();
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .manage(db_client)
        .manage(db)
        .manage(recorder.notifier())
        .manage(recorder)
}

/// The URI of the test database, configured via `ROCKET_DB_URI` or `Rocket.toml`.
///
/// Panics if there is none: database tests must never pass without a database.
#[cfg(test)]
pub(crate) fn test_db_uri() -> String {
    rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("Database tests need `db_uri`; set ROCKET_DB_URI to a replica set")
}

/// Connect to the test database server.
#[cfg(test)]
pub(crate) async fn db_client(db_uri: &str) -> mongodb::Client {
    mongodb::Client::with_uri_str(db_uri)
        .await
        .expect("Failed to connect to test database")
}

/// A fresh database name, so that concurrently running tests never collide.
#[cfg(test)]
pub(crate) fn database() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}
