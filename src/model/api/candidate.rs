use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::VotingError,
    db::candidate::{Candidate, NewCandidate},
    mongodb::Id,
};

/// A candidate as submitted by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl CandidateSpec {
    /// The candidate this spec describes, standing in the given poll.
    pub fn into_candidate(self, poll_id: Id) -> Result<NewCandidate, VotingError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(VotingError::ValidationFailed(
                "Candidate name must not be empty".to_string(),
            ));
        }
        Ok(NewCandidate {
            name,
            image: self.image.filter(|i| !i.trim().is_empty()),
            poll_id,
        })
    }
}

/// An API-friendly candidate description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub name: String,
    pub image: Option<String>,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id.into(),
            name: candidate.candidate.name,
            image: candidate.candidate.image,
        }
    }
}
