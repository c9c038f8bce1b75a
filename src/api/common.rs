use std::convert::Infallible;

use chrono::{Local, NaiveTime};
use mongodb::bson::doc;
use rocket::request::{FromRequest, Outcome, Request};

use crate::error::{Error, Result};
use crate::model::{
    common::{RecordStatus, VoterToken},
    db::{poll::Poll, voter::Voter},
    mongodb::{Coll, Id},
};

/// The local time of day at which the request arrived.
///
/// Read once per request, so every rule applied while handling it sees the
/// same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Now(pub NaiveTime);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Now {
    type Error = Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(*req.local_cache(|| Now(Local::now().time())))
    }
}

/// Look up a poll that has not been deleted.
pub async fn poll_by_id(polls: &Coll<Poll>, poll_id: Id) -> Result<Poll> {
    polls
        .find_one(Poll::filter_visible(poll_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Poll {poll_id}")))
}

/// Look up a voter of the given poll who has not been removed.
pub async fn voter_by_token(
    voters: &Coll<Voter>,
    poll_id: Id,
    token: &VoterToken,
) -> Result<Voter> {
    let filter = doc! {
        "_id": token,
        "poll_id": poll_id,
        "status": RecordStatus::Active,
    };
    voters
        .find_one(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter {token} in poll {poll_id}")))
}
