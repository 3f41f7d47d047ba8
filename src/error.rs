//! Error type shared by the store, the review session and the JSON import/export.
//!
//! The scheduler and the selector never fail, so nothing in `models::sm2` or
//! `models::selector` returns this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlashcardError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Card not found: {0}")]
    CardNotFound(i64),

    #[error("Invalid selected index: {0} (expected 0-3)")]
    InvalidSelection(i64),

    #[error("Card '{slug}' has correct index {correct_index} (expected 0-3)")]
    InvalidCard { slug: String, correct_index: u8 },

    #[error("No cards available")]
    NoCardsAvailable,
}

pub type Result<T> = std::result::Result<T, FlashcardError>;
