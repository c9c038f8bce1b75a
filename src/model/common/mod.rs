//! Types and rules shared between the DB and API representations.
//!
//! Nothing in here touches the database or reads the clock.

mod activity;
pub mod eligibility;
mod phone;
mod status;
mod tally;
mod token;

pub use activity::{is_active, PollWindow};
pub use phone::Phone;
pub use status::RecordStatus;
pub use tally::Tally;
pub use token::{InvalidToken, VoterToken};

use thiserror::Error;

/// Violations of the election rules. These are always recoverable: the
/// request is refused and the caller is told why.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VotingError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("This poll has started. Voters can't be added or removed while it is active")]
    PollActive,
    #[error("This poll is not currently accepting votes")]
    PollInactive,
    #[error("This voter has already voted in this poll")]
    AlreadyVoted,
    #[error("Candidate '{0}' does not stand in this poll")]
    CandidateNotFound(String),
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("A voter with email '{0}' already exists")]
    DuplicateVoter(String),
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
