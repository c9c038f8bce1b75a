use chrono::Utc;
use mongodb::{bson::doc, error::Error as DbError, options::FindOptions};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            candidate::{CandidateDescription, CandidateSpec},
            poll::{PollDescription, PollSpec},
            results::{DumpedVote, PollDump, PollResults},
        },
        common::{eligibility, PollWindow, RecordStatus},
        db::{
            candidate::{Candidate, NewCandidate},
            poll::{NewPoll, Poll},
            vote::{tally_poll, Vote},
        },
        mongodb::{errors::is_duplicate_key_error, Coll, Id},
    },
};

use super::common::{poll_by_id, Now};

pub fn routes() -> Vec<Route> {
    routes![
        create_poll,
        get_polls,
        get_poll,
        update_poll,
        delete_poll,
        add_candidate,
        get_candidates,
        get_results,
        dump_poll,
    ]
}

/// Report a unique index violation as a conflict over the named thing.
fn conflict_if_duplicate(err: DbError, what: String) -> Error {
    if is_duplicate_key_error(&err) {
        Error::Status(Status::Conflict, format!("{what} already exists"))
    } else {
        err.into()
    }
}

#[post("/polls", data = "<spec>", format = "json")]
async fn create_poll(
    _token: AuthToken,
    spec: Json<PollSpec>,
    new_polls: Coll<NewPoll>,
    polls: Coll<Poll>,
    now: Now,
) -> Result<Json<PollDescription>> {
    let poll: NewPoll = spec.0.try_into()?;
    let new_id: Id = new_polls
        .insert_one(&poll, None)
        .await
        .map_err(|e| conflict_if_duplicate(e, format!("Poll '{}'", poll.name)))?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::not_found("ID of inserted poll"))?
        .into();
    info!("Created poll {new_id} '{}'", poll.name);

    let poll = poll_by_id(&polls, new_id).await?;
    Ok(Json(PollDescription::new(poll, now.0)))
}

#[get("/polls?<active>")]
async fn get_polls(
    _token: AuthToken,
    active: Option<bool>,
    polls: Coll<Poll>,
    now: Now,
) -> Result<Json<Vec<PollDescription>>> {
    let filter = doc! {
        "status": RecordStatus::Active,
    };
    let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
    let polls: Vec<Poll> = polls.find(filter, options).await?.try_collect().await?;
    let descriptions = polls
        .into_iter()
        .filter(|poll| active.map_or(true, |active| poll.is_active(now.0) == active))
        .map(|poll| PollDescription::new(poll, now.0))
        .collect();
    Ok(Json(descriptions))
}

#[get("/polls/<poll_id>")]
async fn get_poll(
    _token: AuthToken,
    poll_id: Id,
    polls: Coll<Poll>,
    now: Now,
) -> Result<Json<PollDescription>> {
    let poll = poll_by_id(&polls, poll_id).await?;
    Ok(Json(PollDescription::new(poll, now.0)))
}

/// Move a poll's window. While the poll is open only its end time can change.
#[put("/polls/<poll_id>", data = "<window>", format = "json")]
async fn update_poll(
    _token: AuthToken,
    poll_id: Id,
    window: Json<PollWindow>,
    polls: Coll<Poll>,
    new_polls: Coll<NewPoll>,
    now: Now,
) -> Result<Json<PollDescription>> {
    let mut poll = poll_by_id(&polls, poll_id).await?;
    poll.window = eligibility::check_window_update(&poll.window, &window, now.0)?;
    poll.updated_at = Utc::now();

    let result = new_polls
        .replace_one(Poll::filter_visible(poll_id), &poll.poll, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Poll {poll_id}")));
    }
    info!(
        "Poll {poll_id} now runs {} to {}",
        poll.window.start_time, poll.window.end_time
    );

    let poll = poll_by_id(&polls, poll_id).await?;
    Ok(Json(PollDescription::new(poll, now.0)))
}

/// Hide a poll. Its candidates, voters and votes are kept.
#[delete("/polls/<poll_id>")]
async fn delete_poll(_token: AuthToken, poll_id: Id, polls: Coll<Poll>) -> Result<()> {
    let update = doc! {
        "$set": {
            "status": RecordStatus::Deleted,
            "updated_at": mongodb::bson::DateTime::now(),
        }
    };
    let result = polls
        .update_one(Poll::filter_visible(poll_id), update, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Poll {poll_id}")));
    }
    info!("Deleted poll {poll_id}");
    Ok(())
}

#[post("/polls/<poll_id>/candidates", data = "<spec>", format = "json")]
async fn add_candidate(
    _token: AuthToken,
    poll_id: Id,
    spec: Json<CandidateSpec>,
    polls: Coll<Poll>,
    new_candidates: Coll<NewCandidate>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let poll = poll_by_id(&polls, poll_id).await?;
    let candidate = spec.0.into_candidate(poll.id)?;
    let new_id: Id = new_candidates
        .insert_one(&candidate, None)
        .await
        .map_err(|e| conflict_if_duplicate(e, format!("Candidate '{}'", candidate.name)))?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::not_found("ID of inserted candidate"))?
        .into();

    let candidate = candidates
        .find_one(new_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {new_id}")))?;
    Ok(Json(candidate.into()))
}

/// All candidates standing in a poll, by name.
async fn candidates_of(candidates: &Coll<Candidate>, poll_id: Id) -> Result<Vec<Candidate>> {
    let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
    let list = candidates
        .find(doc! { "poll_id": poll_id }, options)
        .await?
        .try_collect()
        .await?;
    Ok(list)
}

#[get("/polls/<poll_id>/candidates")]
async fn get_candidates(
    _token: AuthToken,
    poll_id: Id,
    polls: Coll<Poll>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<CandidateDescription>>> {
    let poll = poll_by_id(&polls, poll_id).await?;
    let list = candidates_of(&candidates, poll.id).await?;
    Ok(Json(list.into_iter().map(Into::into).collect()))
}

/// Anyone may see the results, at any time.
#[get("/polls/<poll_id>/results")]
async fn get_results(
    poll_id: Id,
    polls: Coll<Poll>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<PollResults>> {
    let poll = poll_by_id(&polls, poll_id).await?;
    let list = candidates_of(&candidates, poll.id).await?;
    let tally = tally_poll(&votes, poll.id).await?;
    Ok(Json(PollResults::new(&poll, list, &tally)))
}

/// Export a poll for recounting with `tally-cli`.
#[get("/polls/<poll_id>/dump")]
async fn dump_poll(
    _token: AuthToken,
    poll_id: Id,
    polls: Coll<Poll>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<PollDump>> {
    let poll = poll_by_id(&polls, poll_id).await?;
    let list = candidates_of(&candidates, poll.id).await?;
    let options = FindOptions::builder().sort(doc! { "cast_at": 1 }).build();
    let cast: Vec<Vote> = votes
        .find(doc! { "poll_id": poll_id }, options)
        .await?
        .try_collect()
        .await?;
    if cast.is_empty() {
        debug!("Dumping poll {poll_id} with no votes");
    }

    Ok(Json(PollDump {
        poll_id: poll.id.into(),
        name: poll.poll.name,
        candidates: list.into_iter().map(Into::into).collect(),
        votes: cast.into_iter().map(DumpedVote::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use mongodb::Database;
    use rocket::{
        http::{uri::Origin, ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::{json, serde_json},
    };

    use crate::model::{common::VoterToken, db::vote::NewVote};

    use super::*;

    #[backend_test(admin)]
    async fn create_and_get_poll(client: Client, polls: Coll<Poll>) {
        let created = create_poll_for_spec(&client, &PollSpec::example()).await;
        assert_eq!(created.name, PollSpec::example().name);
        assert_eq!(created.start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());

        let stored = polls
            .find_one(created.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, RecordStatus::Active);

        let response = client.get(uri!(get_poll(*created.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let fetched: PollDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(fetched.id, created.id);
    }

    #[backend_test(admin)]
    async fn bad_create_poll(client: Client, polls: Coll<Poll>) {
        // Backwards window.
        let spec = PollSpec {
            start_time: NaiveTime::from_hms_opt(17, 0, 0),
            end_time: NaiveTime::from_hms_opt(9, 0, 0),
            ..PollSpec::example()
        };
        create_poll_expect_status(&client, &spec, Status::UnprocessableEntity).await;

        // Duplicate name.
        create_poll_for_spec(&client, &PollSpec::example()).await;
        create_poll_expect_status(&client, &PollSpec::example(), Status::Conflict).await;

        assert_eq!(polls.count_documents(None, None).await.unwrap(), 1);
    }

    #[backend_test(admin)]
    async fn list_polls_by_activity(client: Client) {
        let open = create_poll_for_spec(&client, &PollSpec::open_example()).await;
        let closed = create_poll_for_spec(&client, &PollSpec::closed_example()).await;
        assert!(open.active);
        assert!(!closed.active);

        let all = list_polls(&client, uri!(get_polls(_))).await;
        assert_eq!(all.len(), 2);
        let active = list_polls(&client, uri!(get_polls(Some(true)))).await;
        assert_eq!(active.iter().map(|p| p.id).collect::<Vec<_>>(), [open.id]);
        let inactive = list_polls(&client, uri!(get_polls(Some(false)))).await;
        assert_eq!(inactive.iter().map(|p| p.id).collect::<Vec<_>>(), [closed.id]);
    }

    #[backend_test(admin)]
    async fn update_open_poll_moves_only_end(client: Client) {
        let open = create_poll_for_spec(&client, &PollSpec::open_example()).await;

        let window = json!({"start_time": "00:00:10", "end_time": "23:59:58"});
        let response = update_expect_status(&client, *open.id, window, Status::Ok).await;
        let updated: PollDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(updated.start_time, open.start_time);
        assert_eq!(updated.end_time, NaiveTime::from_hms_opt(23, 59, 58).unwrap());

        // The end can't move before the start.
        let window = json!({"start_time": "00:00:00", "end_time": "00:00:00"});
        update_expect_status(&client, *open.id, window, Status::UnprocessableEntity).await;
    }

    #[backend_test(admin)]
    async fn update_closed_poll(client: Client) {
        let closed = create_poll_for_spec(&client, &PollSpec::closed_example()).await;

        // A start time that has already passed today is refused.
        let window = json!({"start_time": "00:00:00", "end_time": "00:00:02"});
        update_expect_status(&client, *closed.id, window, Status::UnprocessableEntity).await;

        // A backwards window is refused.
        let window = json!({"start_time": "23:59:59", "end_time": "23:59:58"});
        update_expect_status(&client, *closed.id, window, Status::UnprocessableEntity).await;

        // Unknown polls are not found.
        let window = json!({"start_time": "23:59:58", "end_time": "23:59:59"});
        update_expect_status(&client, Id::new(), window, Status::NotFound).await;
    }

    #[backend_test(admin)]
    async fn delete_hides_poll(client: Client, polls: Coll<Poll>) {
        let created = create_poll_for_spec(&client, &PollSpec::example()).await;

        let response = client.delete(uri!(delete_poll(*created.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        // Still stored, but gone from every view.
        let stored = polls
            .find_one(created.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, RecordStatus::Deleted);
        let response = client.get(uri!(get_poll(*created.id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        assert!(list_polls(&client, uri!(get_polls(_))).await.is_empty());

        // Deleting twice is not found.
        let response = client.delete(uri!(delete_poll(*created.id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn candidates_and_results(client: Client, db: Database) {
        let poll = create_poll_for_spec(&client, &PollSpec::example()).await;
        let a = add_candidate_for_spec(&client, *poll.id, &CandidateSpec::example1()).await;
        let b = add_candidate_for_spec(&client, *poll.id, &CandidateSpec::example2()).await;
        let c = add_candidate_for_spec(&client, *poll.id, &CandidateSpec::example3()).await;

        // Candidate names are unique.
        let response = client
            .post(uri!(add_candidate(*poll.id)))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&CandidateSpec::example1()).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());

        let response = client.get(uri!(get_candidates(*poll.id))).dispatch().await;
        let listed: Vec<CandidateDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(listed, vec![a.clone(), b.clone(), c.clone()]);

        // No votes yet.
        let results = get_results_for(&client, *poll.id).await;
        assert_eq!(results.total_votes, 0);
        assert!(results.winners.is_empty());
        assert_eq!(results.candidates.len(), 3);

        // A=3, B=3, C=1.
        let cast = [a.id, a.id, a.id, b.id, b.id, b.id, c.id]
            .into_iter()
            .map(|candidate| NewVote {
                poll_id: *poll.id,
                candidate_id: *candidate,
                voter_id: VoterToken::random(),
                cast_at: Utc::now(),
            })
            .collect::<Vec<_>>();
        Coll::<NewVote>::from_db(&db)
            .insert_many(cast, None)
            .await
            .unwrap();

        let results = get_results_for(&client, *poll.id).await;
        assert_eq!(results.total_votes, 7);
        assert_eq!(results.winners, vec![a.id, b.id]);
        let sum: u64 = results.candidates.iter().map(|c| c.votes).sum();
        assert_eq!(sum, results.total_votes);

        // The dump recounts to the same result.
        let response = client.get(uri!(dump_poll(*poll.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let dump: PollDump = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        let tally = dump.tally();
        assert_eq!(tally.total_votes, 7);
        assert_eq!(tally.max_count(), 3);
        assert!(tally.is_winner(&a.id) && tally.is_winner(&b.id));
        assert_eq!(dump.stray_votes(), 0);
    }

    #[backend_test]
    async fn results_are_public(client: Client, db: Database) {
        let poll = Poll::insert_example(&db, NewPoll::example()).await;
        let response = client.get(uri!(get_results(poll.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let response = client.get(uri!(get_results(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        // Everything else needs a login.
        let response = client.get(uri!(dump_poll(poll.id))).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    async fn create_poll_for_spec(client: &Client, spec: &PollSpec) -> PollDescription {
        let response = create_poll_expect_status(client, spec, Status::Ok).await;
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    async fn create_poll_expect_status<'c>(
        client: &'c Client,
        spec: &PollSpec,
        status: Status,
    ) -> LocalResponse<'c> {
        let response = client
            .post(uri!(create_poll))
            .header(ContentType::JSON)
            .body(serde_json::to_string(spec).unwrap())
            .dispatch()
            .await;
        assert_eq!(response.status(), status);
        response
    }

    async fn update_expect_status<'c>(
        client: &'c Client,
        id: Id,
        window: serde_json::Value,
        status: Status,
    ) -> LocalResponse<'c> {
        let response = client
            .put(uri!(update_poll(id)))
            .header(ContentType::JSON)
            .body(window.to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), status);
        response
    }

    async fn list_polls(client: &Client, uri: Origin<'static>) -> Vec<PollDescription> {
        let response = client.get(uri).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    async fn add_candidate_for_spec(
        client: &Client,
        poll_id: Id,
        spec: &CandidateSpec,
    ) -> CandidateDescription {
        let response = client
            .post(uri!(add_candidate(poll_id)))
            .header(ContentType::JSON)
            .body(serde_json::to_string(spec).unwrap())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    async fn get_results_for(client: &Client, poll_id: Id) -> PollResults {
        let response = client.get(uri!(get_results(poll_id))).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }
}
