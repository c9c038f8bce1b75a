use serde::{Deserialize, Serialize};

/// How a round of ballot-link notifications went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifySummary {
    pub sent: usize,
    pub failed: usize,
}
