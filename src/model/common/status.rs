use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Records are never removed from the database, only marked as deleted.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Visible to every default query.
    #[default]
    Active,
    /// Hidden, but retained so that historical votes stay intact.
    Deleted,
}

impl From<RecordStatus> for Bson {
    fn from(status: RecordStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
