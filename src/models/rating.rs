//! Reviewer self-assessment after answering a card.
//!
//! Four buttons ("Again", "Hard", "Good", "Easy") collapse onto the 0-5 SM-2
//! quality scale. Anything the caller sends that is not one of those buttons is
//! read as "Again" instead of being rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest quality that counts as a successful recall.
pub const PASSING_QUALITY: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// SM-2 quality value for this rating.
    pub fn quality(self) -> u8 {
        match self {
            Rating::Again => 0,
            Rating::Hard => 1,
            Rating::Good => 3,
            Rating::Easy => 5,
        }
    }

    pub fn is_pass(self) -> bool {
        self.quality() >= PASSING_QUALITY
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Again => "Again",
            Rating::Hard => "Hard",
            Rating::Good => "Good",
            Rating::Easy => "Easy",
        }
    }

    /// Maps a caller-supplied label to a rating.
    ///
    /// Unrecognized labels fall back to `Again`. This is the only place that
    /// policy lives; the scheduler itself only ever sees a valid `Rating`.
    pub fn from_label(label: &str) -> Rating {
        let trimmed = label.trim();
        match Rating::ALL
            .into_iter()
            .find(|rating| rating.label().eq_ignore_ascii_case(trimmed))
        {
            Some(rating) => rating,
            None => {
                tracing::warn!(label = trimmed, "unrecognized rating label, treating as Again");
                Rating::Again
            }
        }
    }

    /// Maps a button code (1 = Again .. 4 = Easy) to a rating, with the same
    /// fallback to `Again` for anything out of range.
    pub fn from_code(code: i64) -> Rating {
        match code {
            1 => Rating::Again,
            2 => Rating::Hard,
            3 => Rating::Good,
            4 => Rating::Easy,
            other => {
                tracing::warn!(code = other, "unrecognized rating code, treating as Again");
                Rating::Again
            }
        }
    }

    /// Accepts either a label or a numeric button code.
    pub fn resolve(input: &str) -> Rating {
        match input.trim().parse::<i64>() {
            Ok(code) => Rating::from_code(code),
            Err(_) => Rating::from_label(input),
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Rating {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Rating::resolve(s))
    }
}
