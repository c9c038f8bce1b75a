//! The voter-facing routes. A voter's token in the path is their only credential.

use mongodb::{bson::doc, options::FindOptions, Client, Database};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            poll::PollDescription,
            vote::{VoteOutcome, VoteRequest},
            voter::BallotView,
        },
        common::{VoterToken, VotingError},
        db::{candidate::Candidate, poll::Poll, vote::cast_vote, voter::Voter},
        mongodb::{Coll, Id},
    },
};

use super::common::{poll_by_id, voter_by_token, Now};

pub fn routes() -> Vec<Route> {
    routes![get_ballot, vote]
}

#[get("/polls/<poll_id>/voters/<token>")]
async fn get_ballot(
    poll_id: Id,
    token: VoterToken,
    polls: Coll<Poll>,
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
    now: Now,
) -> Result<Json<BallotView>> {
    let poll = poll_by_id(&polls, poll_id).await?;
    let voter = voter_by_token(&voters, poll_id, &token).await?;
    let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
    let list: Vec<Candidate> = candidates
        .find(doc! { "poll_id": poll_id }, options)
        .await?
        .try_collect()
        .await?;

    Ok(Json(BallotView {
        poll: PollDescription::new(poll, now.0),
        first_name: voter.voter.first_name,
        last_name: voter.voter.last_name,
        is_voted: voter.voter.is_voted,
        candidates: list.into_iter().map(Into::into).collect(),
    }))
}

/// Cast a vote. Voting a second time is reported as an outcome, not an error.
#[allow(clippy::too_many_arguments)]
#[post("/polls/<poll_id>/voters/<token>/vote", data = "<choice>", format = "json")]
async fn vote(
    poll_id: Id,
    token: VoterToken,
    choice: Json<VoteRequest>,
    polls: Coll<Poll>,
    voters: Coll<Voter>,
    db_client: &State<Client>,
    db: &State<Database>,
    now: Now,
) -> Result<Json<VoteOutcome>> {
    let poll = poll_by_id(&polls, poll_id).await?;
    let voter = voter_by_token(&voters, poll_id, &token).await?;

    match cast_vote(db_client, db, &poll, &voter, *choice.candidate, now.0).await {
        Ok(_) => {
            info!("Voter {token} voted in poll {poll_id}");
            Ok(Json(VoteOutcome::Recorded))
        }
        Err(Error::Voting(VotingError::AlreadyVoted)) => {
            info!("Voter {token} tried to vote again in poll {poll_id}");
            Ok(Json(VoteOutcome::AlreadyVoted))
        }
        Err(e) => Err(e),
    }
}
