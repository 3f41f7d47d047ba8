pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use database::{AttemptLog, ItemStore, SqliteStore};
pub use error::{FlashcardError, Result};
pub use models::{
    Answer, AnswerResult, CardFilter, CardRecord, DueItemSelector, NewCard, ProgressSummary,
    Rating, ReviewOutcome, ReviewSession, ReviewState,
};
