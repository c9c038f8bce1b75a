use chrono::NaiveTime;
use mongodb::{bson::doc, options::FindOptions, Client, Database};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{
        api::{
            auth::AuthToken,
            import::parse_voters,
            notify::NotifySummary,
            pagination::{Paginated, Pagination},
            voter::{ballot_link, VoterDescription, VoterSpec},
        },
        common::{eligibility, PollWindow, RecordStatus, VoterToken, VotingError},
        db::{
            poll::Poll,
            voter::{import_voters, record_delivery, Delivery, Voter},
        },
        mongodb::{Coll, Id},
    },
    notify::Notifier,
    Config,
};

use super::common::{poll_by_id, voter_by_token, Now};

pub fn routes() -> Vec<Route> {
    routes![
        add_voter,
        get_voters,
        remove_voter,
        import_voter_list,
        notify_voters
    ]
}

#[allow(clippy::too_many_arguments)]
#[post("/polls/<poll_id>/voters", data = "<spec>", format = "json")]
async fn add_voter(
    _token: AuthToken,
    poll_id: Id,
    spec: Json<VoterSpec>,
    polls: Coll<Poll>,
    db_client: &State<Client>,
    db: &State<Database>,
    config: &State<Config>,
    now: Now,
) -> Result<Json<VoterDescription>> {
    let poll = poll_by_id(&polls, poll_id).await?;
    let voter = spec.0.validated()?.into_voter(poll_id);
    let mut added = import_voters(db_client, db, &poll, vec![voter], now.0).await?;
    let voter = added.remove(0);
    Ok(Json(VoterDescription::new(voter, config)))
}

#[get("/polls/<poll_id>/voters")]
async fn get_voters(
    _token: AuthToken,
    poll_id: Id,
    pagination: Pagination,
    polls: Coll<Poll>,
    voters: Coll<Voter>,
    config: &State<Config>,
) -> Result<Json<Paginated<VoterDescription>>> {
    let poll = poll_by_id(&polls, poll_id).await?;
    let filter = doc! {
        "poll_id": poll.id,
        "status": RecordStatus::Active,
    };
    let total = voters.count_documents(filter.clone(), None).await?;
    let options = FindOptions::builder()
        .sort(doc! { "email": 1 })
        .skip(pagination.skip())
        .limit(pagination.page_size() as i64)
        .build();
    let page: Vec<Voter> = voters.find(filter, options).await?.try_collect().await?;
    let page = page
        .into_iter()
        .map(|voter| VoterDescription::new(voter, config))
        .collect();
    Ok(Json(pagination.result(page, total)))
}

/// Strike a voter off the roll. Only allowed while the poll is closed.
#[delete("/polls/<poll_id>/voters/<token>")]
async fn remove_voter(
    _token: AuthToken,
    poll_id: Id,
    token: VoterToken,
    polls: Coll<Poll>,
    voters: Coll<Voter>,
    now: Now,
) -> Result<()> {
    let poll = poll_by_id(&polls, poll_id).await?;
    let voter = voter_by_token(&voters, poll_id, &token).await?;
    eligibility::can_remove_voter(&poll.window, now.0)?;

    let update = doc! {
        "$set": {
            "status": RecordStatus::Deleted,
        }
    };
    voters.update_one(voter.token.as_doc(), update, None).await?;
    info!("Removed voter {token} from poll {poll_id}");
    Ok(())
}

/// Register every voter in an uploaded CSV list, or none of them.
#[allow(clippy::too_many_arguments)]
#[post("/polls/<poll_id>/voters/import", data = "<list>", format = "text/csv")]
async fn import_voter_list(
    _token: AuthToken,
    poll_id: Id,
    list: String,
    polls: Coll<Poll>,
    db_client: &State<Client>,
    db: &State<Database>,
    config: &State<Config>,
    now: Now,
) -> Result<Json<Vec<VoterDescription>>> {
    let poll = poll_by_id(&polls, poll_id).await?;
    let new_voters = voters_from_upload(poll.id, &poll.window, &list, now.0)?;
    let imported = import_voters(db_client, db, &poll, new_voters, now.0).await?;
    Ok(Json(
        imported
            .into_iter()
            .map(|voter| VoterDescription::new(voter, config))
            .collect(),
    ))
}

/// Check that `poll` can take an upload at `now`, then read the voters in it.
///
/// An active poll is refused before the upload is parsed, so it is reported
/// as such whatever the upload holds.
fn voters_from_upload(
    poll_id: Id,
    window: &PollWindow,
    list: &str,
    now: NaiveTime,
) -> std::result::Result<Vec<Voter>, VotingError> {
    eligibility::can_add_voter(window, now)?;
    Ok(parse_voters(list)?
        .into_iter()
        .map(|spec| spec.into_voter(poll_id))
        .collect())
}

/// Send every voter their ballot link.
///
/// Each voter's delivery state is updated as their email goes out. Nothing
/// else about the poll or its voters changes, whatever the outcome.
#[post("/polls/<poll_id>/notify")]
async fn notify_voters(
    _token: AuthToken,
    poll_id: Id,
    polls: Coll<Poll>,
    voters: Coll<Voter>,
    notifier: &State<Notifier>,
    config: &State<Config>,
) -> Result<Json<NotifySummary>> {
    let poll = poll_by_id(&polls, poll_id).await?;
    let filter = doc! {
        "poll_id": poll.id,
        "status": RecordStatus::Active,
    };
    let roll: Vec<Voter> = voters.find(filter, None).await?.try_collect().await?;

    let mut summary = NotifySummary::default();
    for voter in roll {
        let link = ballot_link(config, poll_id, &voter.token);
        let delivery = notifier.send_ballot_link(&voter, &poll.name, &link).await;
        match delivery {
            Delivery::Sent => summary.sent += 1,
            _ => summary.failed += 1,
        }
        if let Err(e) = record_delivery(&voters, &voter.token, delivery).await {
            error!("Failed to record delivery for voter {}: {e}", voter.token);
        }
    }

    info!(
        "Sent ballot links for poll {poll_id}: {} sent, {} failed",
        summary.sent, summary.failed
    );
    Ok(Json(summary))
}
