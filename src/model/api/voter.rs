use serde::{Deserialize, Serialize};

use crate::model::{
    api::{candidate::CandidateDescription, poll::PollDescription},
    common::{Phone, VoterToken, VotingError},
    db::voter::{Delivery, Voter},
    mongodb::Id,
};
use crate::Config;

/// A voter as submitted by an admin, either directly or as a row of an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterSpec {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<Phone>,
}

impl VoterSpec {
    /// Check the fields make sense, normalising whitespace.
    pub fn validated(self) -> Result<Self, VotingError> {
        let email = self.email.trim().to_string();
        if !is_plausible_email(&email) {
            return Err(VotingError::MalformedInput(format!(
                "'{email}' is not an email address"
            )));
        }
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(VotingError::MalformedInput(format!(
                "voter {email} needs a first and last name"
            )));
        }
        Ok(Self {
            email,
            first_name,
            last_name,
            phone_number: self.phone_number,
        })
    }

    /// A new voter for the given poll, with a fresh ballot token.
    pub fn into_voter(self, poll_id: Id) -> Voter {
        Voter::new(
            poll_id,
            self.email,
            self.first_name,
            self.last_name,
            self.phone_number,
        )
    }
}

/// One `@`, something either side, a dot in the domain, and no whitespace.
pub(crate) fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// The link a voter follows to reach their ballot.
pub fn ballot_link(config: &Config, poll_id: Id, token: &VoterToken) -> String {
    format!(
        "https://{}/polls/{}/voters/{}",
        config.hostname(),
        poll_id,
        token
    )
}

/// A voter, as seen by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterDescription {
    pub token: VoterToken,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<Phone>,
    pub is_voted: bool,
    pub link_delivery: Delivery,
    pub ballot_link: String,
}

impl VoterDescription {
    pub fn new(voter: Voter, config: &Config) -> Self {
        let ballot_link = ballot_link(config, voter.poll_id, &voter.token);
        Self {
            token: voter.token,
            email: voter.voter.email,
            first_name: voter.voter.first_name,
            last_name: voter.voter.last_name,
            phone_number: voter.voter.phone_number,
            is_voted: voter.voter.is_voted,
            link_delivery: voter.voter.link_delivery,
            ballot_link,
        }
    }
}

/// What a voter sees when they open their ballot link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotView {
    pub poll: PollDescription,
    pub first_name: String,
    pub last_name: String,
    pub is_voted: bool,
    pub candidates: Vec<CandidateDescription>,
}
