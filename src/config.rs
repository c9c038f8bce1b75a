//! Server settings, read from `Rocket.toml` and `ROCKET_*` environment
//! variables, and the fairings that turn them into managed state at ignition.
//!
//! Settings are split by concern so that each fairing only fails on the
//! values it actually needs.

use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_sns::config::{Credentials, Region};
use chrono::Duration;
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::error::Result;
use crate::model::{
    api::admin::AdminCredentials,
    db::admin::ensure_admin_exists,
    mongodb::{ensure_indexes_exist, Coll},
};
use crate::notify::{Notifier, SesMailer};

/// Settings any route may read from managed state.
#[derive(Deserialize)]
pub struct Config {
    /// Public host the site is served from; ballot links point here.
    hostname: String,
    /// Lifetime of an admin session, in seconds.
    auth_ttl: u32,
    jwt_secret: String,
}

impl Config {
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Key for signing admin session tokens.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// Where the data lives, and who can sign in to a fresh deployment.
#[derive(Deserialize)]
struct StoreSettings {
    db_uri: String,
    db_name: String,
    bootstrap_admin_email: String,
    bootstrap_admin_password: String,
}

/// Credentials and addresses for sending ballot links.
#[derive(Deserialize)]
struct MessagingSettings {
    aws_region: String,
    aws_access_key_id: String,
    aws_secret_access_key: String,
    /// Sender address of ballot link emails. Must be verified with SES.
    mail_from: String,
}

/// Read one group of settings, printing what is wrong with them if that fails.
fn load<T: DeserializeOwned>(rocket: &Rocket<Build>, group: &str) -> Option<T> {
    match rocket.figment().extract::<T>() {
        Ok(settings) => Some(settings),
        Err(e) => {
            error!("Invalid {group} settings");
            rocket::config::pretty_print_error(e);
            None
        }
    }
}

/// Places [`Config`] into managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        match load::<Config>(&rocket, "application") {
            Some(config) => Ok(rocket.manage(config)),
            None => Err(rocket),
        }
    }
}

/// Connects to MongoDB, prepares the database, and places both the
/// `Client` (for transactions) and the `Database` into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(settings) = load::<StoreSettings>(&rocket, "database") else {
            return Err(rocket);
        };
        match open_store(settings).await {
            Ok((client, db)) => {
                info!("Database '{}' ready", db.name());
                Ok(rocket.manage(client).manage(db))
            }
            Err(e) => {
                error!("Database setup failed: {e}");
                Err(rocket)
            }
        }
    }
}

/// Connect, create indexes, and make sure some admin can sign in.
async fn open_store(settings: StoreSettings) -> Result<(MongoClient, Database)> {
    let client = MongoClient::with_uri_str(&settings.db_uri).await?;
    let db = client.database(&settings.db_name);
    ensure_indexes_exist(&db).await?;
    let bootstrap = AdminCredentials {
        email: settings.bootstrap_admin_email,
        password: settings.bootstrap_admin_password,
    };
    ensure_admin_exists(&Coll::from_db(&db), bootstrap).await?;
    Ok((client, db))
}

/// Builds the SES mailer and SNS texter and places a [`Notifier`] into
/// managed state.
pub struct MessagingFairing;

#[rocket::async_trait]
impl Fairing for MessagingFairing {
    fn info(&self) -> Info {
        Info {
            name: "AWS messaging",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(settings) = load::<MessagingSettings>(&rocket, "messaging") else {
            return Err(rocket);
        };
        let credentials = Credentials::new(
            settings.aws_access_key_id,
            settings.aws_secret_access_key,
            None,
            None,
            "rocket config",
        );
        let sdk_config = SdkConfig::builder()
            .region(Region::new(settings.aws_region))
            .credentials_provider(SharedCredentialsProvider::new(credentials))
            .behavior_version(BehaviorVersion::latest())
            .build();

        let mailer = SesMailer::new(aws_sdk_sesv2::Client::new(&sdk_config), settings.mail_from);
        let texter = aws_sdk_sns::Client::new(&sdk_config);
        info!("Ballot links will be sent through SES and SNS");
        Ok(rocket.manage(Notifier::new(mailer, texter)))
    }
}
