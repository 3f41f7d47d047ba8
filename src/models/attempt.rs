//! One answered question. Attempts are only ever appended.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub card_id: i64,
    pub selected_index: u8,
    pub is_correct: bool,
    pub response_ms: u64,
    pub created_at: DateTime<Utc>,
}
