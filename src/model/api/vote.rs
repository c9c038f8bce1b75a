use serde::{Deserialize, Serialize};

use crate::model::api::id::ApiId;

/// A voter's choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub candidate: ApiId,
}

/// What became of a vote submission.
///
/// Voting twice is not an error from the voter's point of view: they are
/// simply told their vote is already in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VoteOutcome {
    Recorded,
    AlreadyVoted,
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::{json, serde_json};

    use super::*;

    #[test]
    fn outcome_wire_format() {
        assert_eq!(
            serde_json::to_value(VoteOutcome::Recorded).unwrap(),
            json!({"outcome": "recorded"})
        );
        assert_eq!(
            serde_json::to_value(VoteOutcome::AlreadyVoted).unwrap(),
            json!({"outcome": "already_voted"})
        );
    }
}
