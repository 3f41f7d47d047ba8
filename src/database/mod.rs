//! Persistence boundary for cards, their scheduling state and the attempt log.

pub mod db;

pub use db::SqliteStore;

use crate::error::Result;
use crate::models::{Attempt, CardProgress, CardRecord, ReviewState};
use chrono::{DateTime, Utc};

/// Card templates plus the per-card scheduling record.
pub trait ItemStore {
    /// All cards ordered by id. Cards without a stored state come back with
    /// `ReviewState::default()`, which is always due.
    fn cards(&self) -> Result<Vec<CardRecord>>;

    fn card(&self, card_id: i64) -> Result<Option<CardRecord>>;

    /// Creates default states, due at `now`, for every card that lacks one.
    /// Returns how many were created.
    fn ensure_states(&self, now: DateTime<Utc>) -> Result<usize>;

    fn load_or_create_state(&self, card_id: i64, now: DateTime<Utc>) -> Result<ReviewState>;

    /// Read-modify-write of one card's state and counters.
    ///
    /// Implementations must serialize concurrent calls for the same card so
    /// no review result is lost. The returned record is the one now stored.
    fn update_state<F>(&self, card_id: i64, now: DateTime<Utc>, apply: F) -> Result<CardRecord>
    where
        F: FnOnce(&CardRecord) -> (ReviewState, CardProgress);

    /// Appends `attempt` to the answer history and applies the state update
    /// for its card as one unit: either both are stored or neither is.
    fn record_review<F>(&self, attempt: &Attempt, apply: F) -> Result<CardRecord>
    where
        F: FnOnce(&CardRecord) -> (ReviewState, CardProgress);
}

/// Append-only answer history.
pub trait AttemptLog {
    fn record_attempt(&self, attempt: &Attempt) -> Result<()>;

    /// Attempts created at or after `since`, oldest first.
    fn attempts_since(&self, since: DateTime<Utc>) -> Result<Vec<Attempt>>;
}
