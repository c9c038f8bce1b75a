use chrono::{serde::ts_seconds, DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::{PollWindow, VotingError},
    db::poll::{NewPoll, Poll},
};

/// A poll as submitted by an admin.
///
/// Either time may be left out, in which case it takes its default
/// (08:00 start, 16:00 end).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
}

impl PollSpec {
    /// The window this spec asks for, with defaults filled in.
    pub fn window(&self) -> Result<PollWindow, VotingError> {
        let default = PollWindow::default();
        PollWindow::new(
            self.start_time.unwrap_or(default.start_time),
            self.end_time.unwrap_or(default.end_time),
        )
    }
}

impl TryFrom<PollSpec> for NewPoll {
    type Error = VotingError;

    fn try_from(spec: PollSpec) -> Result<Self, Self::Error> {
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(VotingError::ValidationFailed(
                "Poll name must not be empty".to_string(),
            ));
        }
        let window = spec.window()?;
        let description = spec.description.filter(|d| !d.trim().is_empty());
        Ok(NewPoll::new(name, description, window))
    }
}

/// An API-friendly poll description, including whether it is open right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDescription {
    pub id: ApiId,
    pub name: String,
    pub description: Option<String>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Whether the poll was accepting votes when this was produced.
    pub active: bool,
    #[serde(with = "ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

impl PollDescription {
    /// Describe `poll` as it stands at `now`.
    pub fn new(poll: Poll, now: NaiveTime) -> Self {
        let active = poll.is_active(now);
        Self {
            id: poll.id.into(),
            name: poll.poll.name,
            description: poll.poll.description,
            start_time: poll.poll.window.start_time,
            end_time: poll.poll.window.end_time,
            active,
            created_at: poll.poll.created_at,
            updated_at: poll.poll.updated_at,
        }
    }
}
