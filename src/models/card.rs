//! Multiple-choice card as stored in the item store, plus its answer counters.
use super::{Rating, ReviewState};
use crate::error::{FlashcardError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const OPTION_COUNT: usize = 4;

/// Minimum attempts before accuracy counts for mastery or the easy filter.
pub const MIN_ATTEMPTS_FOR_ACCURACY: u32 = 3;
pub const MASTERY_ACCURACY: f64 = 0.7;

/// Card content used to seed the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCard {
    pub slug: String,
    pub kind: String,
    pub question: String,
    pub options: [String; OPTION_COUNT],
    pub correct_index: u8,
}

impl NewCard {
    /// Rejects a card whose correct answer is not one of its options.
    pub fn validate(&self) -> Result<()> {
        if usize::from(self.correct_index) >= OPTION_COUNT {
            return Err(FlashcardError::InvalidCard {
                slug: self.slug.clone(),
                correct_index: self.correct_index,
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardTemplate {
    pub id: i64,
    pub slug: String,
    pub kind: String,
    pub question: String,
    pub options: [String; OPTION_COUNT],
    pub correct_index: u8,
}

/// Answer counters kept next to the scheduling state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CardProgress {
    pub attempts_count: u32,
    pub correct_count: u32,
    pub last_result: Option<Rating>,
    pub last_answer_at: Option<DateTime<Utc>>,
}

impl CardProgress {
    pub fn is_seen(&self) -> bool {
        self.attempts_count > 0
    }

    pub fn accuracy(&self) -> f64 {
        if self.attempts_count == 0 {
            0.0
        } else {
            f64::from(self.correct_count) / f64::from(self.attempts_count)
        }
    }
}

/// Everything the store knows about one card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub template: CardTemplate,
    pub state: ReviewState,
    pub progress: CardProgress,
}

/// A card is mastered after at least three attempts at 70% accuracy or better.
pub fn is_card_mastered(attempts_count: u32, correct_count: u32) -> bool {
    if attempts_count < MIN_ATTEMPTS_FOR_ACCURACY {
        return false;
    }
    f64::from(correct_count) / f64::from(attempts_count) >= MASTERY_ACCURACY
}

/// Narrows the collection the selector draws from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFilter {
    pub kind: Option<String>,
    /// Keep only unseen cards and cards answered well so far.
    pub easy_only: bool,
}

impl CardFilter {
    pub fn matches(&self, record: &CardRecord) -> bool {
        if let Some(kind) = &self.kind {
            if &record.template.kind != kind {
                return false;
            }
        }
        if self.easy_only {
            let progress = &record.progress;
            return progress.attempts_count == 0
                || is_card_mastered(progress.attempts_count, progress.correct_count);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str, attempts_count: u32, correct_count: u32) -> CardRecord {
        CardRecord {
            template: CardTemplate {
                id: 1,
                slug: "c-major-chord-notes".to_string(),
                kind: kind.to_string(),
                question: "Which notes make a C major triad?".to_string(),
                options: [
                    "C - E - G".to_string(),
                    "C - D# - G".to_string(),
                    "C - F - A".to_string(),
                    "C - E - A".to_string(),
                ],
                correct_index: 0,
            },
            state: ReviewState::default(),
            progress: CardProgress {
                attempts_count,
                correct_count,
                ..CardProgress::default()
            },
        }
    }

    #[test]
    fn test_validate_correct_index_range() {
        let mut card = NewCard {
            slug: "c-major-chord-notes".to_string(),
            kind: "notes_from_chord".to_string(),
            question: "Which notes make a C major triad?".to_string(),
            options: record("notes_from_chord", 0, 0).template.options,
            correct_index: 3,
        };
        assert!(card.validate().is_ok());

        card.correct_index = 4;
        assert!(matches!(
            card.validate(),
            Err(FlashcardError::InvalidCard { correct_index: 4, .. })
        ));
    }

    #[test]
    fn test_mastery_needs_three_attempts() {
        assert!(!is_card_mastered(0, 0));
        assert!(!is_card_mastered(2, 2));
        assert!(is_card_mastered(3, 3));
    }

    #[test]
    fn test_mastery_accuracy_threshold() {
        assert!(is_card_mastered(10, 7));
        assert!(!is_card_mastered(10, 6));
    }

    #[test]
    fn test_accuracy_of_unseen_card_is_zero() {
        assert_eq!(CardProgress::default().accuracy(), 0.0);
    }

    #[test]
    fn test_default_filter_matches_everything() {
        assert!(CardFilter::default().matches(&record("key_signature", 5, 0)));
    }

    #[test]
    fn test_kind_filter() {
        let filter = CardFilter {
            kind: Some("notes_from_chord".to_string()),
            easy_only: false,
        };
        assert!(filter.matches(&record("notes_from_chord", 0, 0)));
        assert!(!filter.matches(&record("key_signature", 0, 0)));
    }

    #[test]
    fn test_easy_filter() {
        let filter = CardFilter {
            kind: None,
            easy_only: true,
        };
        assert!(filter.matches(&record("k", 0, 0)));
        assert!(!filter.matches(&record("k", 2, 2)));
        assert!(filter.matches(&record("k", 4, 3)));
        assert!(!filter.matches(&record("k", 4, 2)));
    }
}
