use super::Rating;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Per-card scheduling record. Replaced as a whole after every review.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub lapses: u32,
    pub due_at: DateTime<Utc>,
}

impl ReviewState {
    /// Fresh state for a card seen for the first time; due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            ease_factor: DEFAULT_EASE_FACTOR,
            interval_days: 0,
            repetitions: 0,
            lapses: 0,
            due_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }
}

impl Default for ReviewState {
    fn default() -> Self {
        Self::new(DateTime::UNIX_EPOCH)
    }
}

/// Result of scheduling one review: the new state plus the rating to store
/// as the card's last result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub state: ReviewState,
    pub last_result: Rating,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_default_state() {
        let state = ReviewState::default();
        assert_eq!(state.ease_factor, DEFAULT_EASE_FACTOR);
        assert_eq!(state.interval_days, 0);
        assert_eq!(state.repetitions, 0);
        assert_eq!(state.lapses, 0);
        assert_eq!(state.due_at, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_is_due_boundary() {
        let now = Utc::now();
        let state = ReviewState::new(now);
        assert!(state.is_due(now));
        assert!(!state.is_due(now - Duration::seconds(1)));
        assert!(state.is_due(now + Duration::days(1)));
    }
}
