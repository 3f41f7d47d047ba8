pub mod attempt;
pub mod card;
pub mod rating;
pub mod review_session;
pub mod review_state;
pub mod selector;
pub mod sm2;
pub mod stats;

pub use attempt::Attempt;
pub use card::{CardFilter, CardProgress, CardRecord, CardTemplate, NewCard, is_card_mastered};
pub use rating::Rating;
pub use review_session::{Answer, AnswerResult, ReviewSession};
pub use review_state::{ReviewOutcome, ReviewState};
pub use selector::DueItemSelector;
pub use stats::ProgressSummary;
