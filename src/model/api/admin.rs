use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{
    api::{id::ApiId, voter::is_plausible_email},
    common::{RecordStatus, VotingError},
    db::admin::{Admin, NewAdmin},
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// An admin's email and plaintext password, as typed in.
/// Only ever hashed into a [`NewAdmin`] or checked against one.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

impl AdminCredentials {
    /// The email in the form admins are stored and looked up by.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

impl TryFrom<AdminCredentials> for NewAdmin {
    type Error = Error;

    /// Validate the credentials and hash the password with a fresh salt.
    fn try_from(cred: AdminCredentials) -> Result<Self, Self::Error> {
        let email = cred.normalized_email();
        if !is_plausible_email(&email) {
            return Err(VotingError::ValidationFailed(format!("'{email}' is not an email address")).into());
        }
        if cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(VotingError::ValidationFailed(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            ))
            .into());
        }

        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(cred.password.as_bytes(), &salt, &Config::default())?;
        Ok(Self {
            email,
            password_hash,
            status: RecordStatus::Active,
        })
    }
}

/// An admin as listed to other admins. Never includes the hash.
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AdminDescription {
    pub id: ApiId,
    pub email: String,
}

impl From<Admin> for AdminDescription {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id.into(),
            email: admin.admin.email,
        }
    }
}
