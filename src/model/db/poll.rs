use std::ops::{Deref, DerefMut};

use chrono::{DateTime, NaiveTime, Utc};
use mongodb::bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, Document};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{PollWindow, RecordStatus},
    mongodb::Id,
};

/// Core poll data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollCore {
    pub name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub window: PollWindow,
    pub status: RecordStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl PollCore {
    /// A fresh, visible poll.
    pub fn new(name: String, description: Option<String>, window: PollWindow) -> Self {
        let now = Utc::now();
        Self {
            name,
            description,
            window,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Is this poll accepting votes at `now`?
    pub fn is_active(&self, now: NaiveTime) -> bool {
        crate::model::common::is_active(&self.window, now)
    }
}

/// A poll without an ID.
pub type NewPoll = PollCore;

/// A poll from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub poll: PollCore,
}

impl Poll {
    /// Filter matching this poll, provided it has not been deleted.
    pub fn filter_visible(id: Id) -> Document {
        doc! {
            "_id": id,
            "status": RecordStatus::Active,
        }
    }
}

impl Deref for Poll {
    type Target = PollCore;

    fn deref(&self) -> &Self::Target {
        &self.poll
    }
}

impl DerefMut for Poll {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.poll
    }
}


#[cfg(test)]
mod tests {
    use mongodb::bson::{from_document, to_document};

    use super::*;

    #[test]
    fn window_is_stored_flat() {
        let poll = NewPoll::example();
        let document = to_document(&poll).unwrap();
        assert_eq!(document.get_str("start_time").unwrap(), "08:00:00");
        assert_eq!(document.get_str("end_time").unwrap(), "16:00:00");
        assert_eq!(document.get_str("status").unwrap(), "active");
        assert!(document.get_datetime("created_at").is_ok());

        let back: NewPoll = from_document(document).unwrap();
        assert_eq!(back.window, poll.window);
        assert_eq!(back.name, poll.name);
    }

    #[test]
    fn activity_follows_window() {
        let poll = NewPoll::example();
        assert!(poll.is_active(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
        assert!(!poll.is_active(NaiveTime::from_hms_opt(17, 0, 0).unwrap()));
    }
}
