use std::ops::{Deref, DerefMut};

use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    api::admin::AdminCredentials,
    common::RecordStatus,
    mongodb::{Coll, Id},
};

/// Stored admin account. Admins sign in with their email address.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub email: String,
    pub password_hash: String,
    pub status: RecordStatus,
}

impl AdminCore {
    /// Check whether the given password is correct.
    ///
    /// A malformed stored hash never matches.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

/// An admin from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub admin: AdminCore,
}

impl Admin {
    /// Filter matching every admin who has not been removed.
    pub fn filter_active() -> Document {
        doc! { "status": RecordStatus::Active }
    }

    /// Filter matching the given admin, unless removed.
    pub fn filter_active_id(id: Id) -> Document {
        doc! {
            "_id": id,
            "status": RecordStatus::Active,
        }
    }

    /// Filter matching the admin signing in with `email`, unless removed.
    pub fn filter_active_email(email: &str) -> Document {
        doc! {
            "email": email,
            "status": RecordStatus::Active,
        }
    }
}

impl Deref for Admin {
    type Target = AdminCore;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.admin
    }
}

/// Create the bootstrap admin from configured credentials, unless some
/// admin can already sign in.
pub async fn ensure_admin_exists(admins: &Coll<NewAdmin>, credentials: AdminCredentials) -> Result<()> {
    if admins.count_documents(Admin::filter_active(), None).await? > 0 {
        return Ok(());
    }

    let admin = NewAdmin::try_from(credentials)?;
    admins.insert_one(&admin, None).await?;
    warn!("Created bootstrap admin '{}'; change its password", admin.email);
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl AdminCore {
        /// The stored form of [`AdminCredentials::example1`].
        pub fn example() -> Self {
            AdminCredentials::example1().try_into().unwrap()
        }

        /// The stored form of [`AdminCredentials::example2`].
        pub fn example2() -> Self {
            AdminCredentials::example2().try_into().unwrap()
        }
    }
}
