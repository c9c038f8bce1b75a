use std::{
    ops::{Deref, DerefMut},
    time::Duration,
};

use chrono::{DateTime, NaiveTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime},
    error::{Error as DbError, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    Client, ClientSession, Database,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{eligibility, Tally, VoterToken, VotingError},
    db::{candidate::Candidate, poll::Poll, voter::Voter},
    mongodb::{
        errors::{is_duplicate_key_error, is_write_conflict},
        Coll, Id,
    },
};

/// Core vote data. Votes are never modified once cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub poll_id: Id,
    pub candidate_id: Id,
    pub voter_id: VoterToken,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

impl DerefMut for Vote {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vote
    }
}

/// Attempts at the vote transaction before giving up on a contended voter.
const MAX_CAST_ATTEMPTS: u32 = 10;

/// Cast `voter`'s vote for `candidate_id` in `poll`.
///
/// The vote is inserted and the voter marked as having voted in one
/// transaction. If the transaction collides with another write to the same
/// voter (a concurrent cast, a delivery update, a removal) or fails
/// transiently, it is retried from the start, so the rules are re-checked
/// against what actually committed. [`VotingError::AlreadyVoted`] is only
/// ever returned when a vote for this voter exists.
pub async fn cast_vote(
    db_client: &Client,
    db: &Database,
    poll: &Poll,
    voter: &Voter,
    candidate_id: Id,
    now: NaiveTime,
) -> Result<Vote> {
    let mut session = db_client.start_session(None).await?;
    let mut attempt = 1;
    loop {
        let result = try_cast_vote(&mut session, db, poll, voter, candidate_id, now).await;
        if result.is_err() {
            // The server may have aborted already, so the outcome is irrelevant.
            let _ = session.abort_transaction().await;
        }
        let err = match result {
            Ok(vote) => {
                debug!("Recorded vote {} in poll {}", vote.id, poll.id);
                return Ok(vote);
            }
            Err(Error::Db(err)) => err,
            Err(other) => return Err(other),
        };
        match classify_cast_error(&err) {
            CastFailure::Retry if attempt < MAX_CAST_ATTEMPTS => {
                debug!("Vote transaction for poll {} collided, retrying: {err}", poll.id);
                rocket::tokio::time::sleep(Duration::from_millis(5 * u64::from(attempt))).await;
                attempt += 1;
            }
            CastFailure::AlreadyVoted => return Err(VotingError::AlreadyVoted.into()),
            _ => return Err(err.into()),
        }
    }
}

/// One run of the vote transaction. Leaves the transaction committed on
/// success, and possibly still open on failure.
async fn try_cast_vote(
    session: &mut ClientSession,
    db: &Database,
    poll: &Poll,
    voter: &Voter,
    candidate_id: Id,
    now: NaiveTime,
) -> Result<Vote> {
    let votes = Coll::<Vote>::from_db(db);
    let new_votes = Coll::<NewVote>::from_db(db);
    let candidates = Coll::<Candidate>::from_db(db);
    let voters = Coll::<Voter>::from_db(db);

    session.start_transaction(None).await?;

    // Gather what the rules need to know.
    let voter_filter = doc! {
        "poll_id": poll.id,
        "voter_id": &voter.token,
    };
    let already_voted = voter.is_voted
        || votes
            .find_one_with_session(voter_filter, None, session)
            .await?
            .is_some();
    let candidate_filter = doc! {
        "_id": candidate_id,
        "poll_id": poll.id,
    };
    let candidate_in_poll = candidates
        .find_one_with_session(candidate_filter, None, session)
        .await?
        .is_some();
    eligibility::can_cast_vote(
        &poll.window,
        already_voted,
        candidate_in_poll,
        &candidate_id.to_string(),
        now,
    )?;

    // Record the vote and flag the voter.
    let vote = NewVote {
        poll_id: poll.id,
        candidate_id,
        voter_id: voter.token.clone(),
        cast_at: Utc::now(),
    };
    let vote_id: Id = new_votes
        .insert_one_with_session(&vote, None, session)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::not_found("ID of inserted vote"))?
        .into();
    let update = doc! {
        "$set": {
            "is_voted": true,
        }
    };
    voters
        .update_one_with_session(voter.token.as_doc(), update, None, session)
        .await?;
    commit(session).await?;

    Ok(Vote { id: vote_id, vote })
}

/// Commit, retrying a few times while the server cannot say whether the
/// commit happened. Committing twice is safe.
async fn commit(session: &mut ClientSession) -> std::result::Result<(), DbError> {
    let mut attempt = 1;
    loop {
        match session.commit_transaction().await {
            Err(e) if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) && attempt < 3 => {
                debug!("Vote commit result unknown, retrying: {e}");
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// What a storage error during [`cast_vote`] means for the voter.
#[derive(Debug, PartialEq, Eq)]
enum CastFailure {
    /// The transaction lost a race or hit a transient fault; run it again.
    Retry,
    /// The `(poll_id, voter_id)` index already holds a committed vote.
    AlreadyVoted,
    /// A storage fault.
    Fatal,
}

fn classify_cast_error(err: &DbError) -> CastFailure {
    if is_duplicate_key_error(err) {
        // The only unique key on votes besides `_id` is `(poll_id, voter_id)`.
        CastFailure::AlreadyVoted
    } else if is_write_conflict(err) {
        CastFailure::Retry
    } else {
        CastFailure::Fatal
    }
}

/// Count the votes cast in a poll.
pub async fn tally_poll(votes: &Coll<Vote>, poll_id: Id) -> Result<Tally<Id>> {
    let cast: Vec<Vote> = votes
        .find(doc! { "poll_id": poll_id }, None)
        .await?
        .try_collect()
        .await?;
    Ok(Tally::from_votes(cast.into_iter().map(|v| v.candidate_id)))
}
