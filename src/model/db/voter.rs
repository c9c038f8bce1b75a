use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, NaiveTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, to_bson, Bson},
    Client, Database,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{eligibility, Phone, RecordStatus, VoterToken, VotingError},
    db::poll::Poll,
    mongodb::{errors::is_duplicate_key_error, Coll, Id},
};

/// How far a voter's ballot link email has got.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// Not sent yet.
    #[default]
    Pending,
    Sent,
    /// The last attempt was refused by the mail service.
    Failed,
}

impl From<Delivery> for Bson {
    fn from(delivery: Delivery) -> Self {
        to_bson(&delivery).expect("Serialisation is infallible")
    }
}

/// Core voter data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    pub poll_id: Id,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<Phone>,
    pub is_voted: bool,
    pub link_delivery: Delivery,
    pub status: RecordStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A voter, keyed by their ballot token.
///
/// Voters are the only records whose ID is not generated by the database:
/// the token is created up front so that it can be handed out as a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub token: VoterToken,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Voter {
    /// A new voter in the given poll, with a fresh token, who has not voted.
    pub fn new(
        poll_id: Id,
        email: String,
        first_name: String,
        last_name: String,
        phone_number: Option<Phone>,
    ) -> Self {
        Self {
            token: VoterToken::random(),
            voter: VoterCore {
                poll_id,
                email,
                first_name,
                last_name,
                phone_number,
                is_voted: false,
                link_delivery: Delivery::default(),
                status: RecordStatus::Active,
                created_at: Utc::now(),
            },
        }
    }
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}

/// Register a batch of voters with a poll: all of them, or none.
///
/// Refused while the poll is active. Any email that appears twice in the batch,
/// or that already belongs to a voter, fails the whole batch.
pub async fn import_voters(
    db_client: &Client,
    db: &Database,
    poll: &Poll,
    new_voters: Vec<Voter>,
    now: NaiveTime,
) -> Result<Vec<Voter>> {
    eligibility::can_add_voter(&poll.window, now)?;

    // Reject duplicates within the batch before touching the database.
    let mut emails = HashSet::new();
    for voter in &new_voters {
        if !emails.insert(voter.email.as_str()) {
            return Err(VotingError::DuplicateVoter(voter.email.clone()).into());
        }
    }
    if new_voters.is_empty() {
        return Ok(new_voters);
    }
    let emails: Vec<&str> = new_voters.iter().map(|v| v.email.as_str()).collect();
    let voters = Coll::<Voter>::from_db(db);

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    // Check the batch against voters already registered, in any poll.
    let existing = voters
        .find_one_with_session(doc! { "email": { "$in": emails.as_slice() } }, None, &mut session)
        .await?;
    if let Some(existing) = existing {
        session.abort_transaction().await?;
        return Err(VotingError::DuplicateVoter(existing.voter.email).into());
    }

    // Insert the whole batch.
    if let Err(e) = voters
        .insert_many_with_session(&new_voters, None, &mut session)
        .await
    {
        if !is_duplicate_key_error(&e) {
            return Err(e.into());
        }
        // A concurrent import got there first.
        debug!("Voter import for poll {} raced another import", poll.id);
        session.abort_transaction().await.ok();
        let email = voters
            .find_one(doc! { "email": { "$in": emails.as_slice() } }, None)
            .await?
            .map(|v| v.voter.email)
            .unwrap_or_else(|| emails[0].to_string());
        return Err(Error::Voting(VotingError::DuplicateVoter(email)));
    }

    session.commit_transaction().await?;
    info!(
        "Registered {} voter(s) with poll {}",
        new_voters.len(),
        poll.id
    );
    Ok(new_voters)
}

/// Record how the latest attempt to send a voter their ballot link went.
///
/// A single-field update outside any transaction, so it may interleave
/// freely with votes being cast.
pub async fn record_delivery(voters: &Coll<Voter>, token: &VoterToken, delivery: Delivery) -> Result<()> {
    let update = doc! {
        "$set": {
            "link_delivery": delivery,
        }
    };
    voters.update_one(token.as_doc(), update, None).await?;
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Voter {
        pub fn example(poll_id: Id) -> Self {
            Self::numbered(poll_id, 1)
        }

        /// A distinct voter per `n`.
        pub fn numbered(poll_id: Id, n: u32) -> Self {
            Self::new(
                poll_id,
                format!("voter{n}@example.com"),
                format!("Voter{n}"),
                "Example".to_string(),
                Some(Phone::example()),
            )
        }
    }
}
