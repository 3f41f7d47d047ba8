//! Review session: picks cards, records answers and reschedules them.
//! Ties the item store, the clock and the due-item selector together.

use super::{
    Attempt, CardFilter, CardProgress, CardRecord, DueItemSelector, ProgressSummary, Rating,
    ReviewOutcome, ReviewState, card::OPTION_COUNT, sm2, stats::ACTIVITY_WINDOW_DAYS,
};
use crate::clock::Clock;
use crate::database::{AttemptLog, ItemStore};
use crate::error::{FlashcardError, Result};
use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

/// A submitted answer to a multiple-choice card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub selected_index: i64,
    #[serde(default)]
    pub response_ms: Option<u64>,
    /// Self-assessed recall. Without one, a correct answer counts as `Good`
    /// and a wrong one as `Again`.
    #[serde(default)]
    pub rating: Option<Rating>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub correct: bool,
    pub correct_index: u8,
    pub outcome: ReviewOutcome,
    pub progress: CardProgress,
}

pub struct ReviewSession<S, C> {
    store: S,
    clock: C,
    selector: DueItemSelector,
}

impl<S, C> ReviewSession<S, C>
where
    S: ItemStore + AttemptLog,
    C: Clock,
{
    pub fn new(store: S, clock: C, selector: DueItemSelector) -> Self {
        Self {
            store,
            clock,
            selector,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn filtered_cards(&self, filter: &CardFilter, now: DateTime<Utc>) -> Result<Vec<CardRecord>> {
        self.store.ensure_states(now)?;

        let mut records = self.store.cards()?;
        records.retain(|record| filter.matches(record));
        Ok(records)
    }

    /// Chooses the next card to present among those matching `filter`.
    pub fn next_card(&mut self, filter: &CardFilter) -> Result<CardRecord> {
        // States created here must be due at the selection instant
        let now = self.clock.now().with_timezone(&Utc);
        let mut records = self.filtered_cards(filter, now)?;

        let items: Vec<(usize, ReviewState)> = records
            .iter()
            .enumerate()
            .map(|(index, record)| (index, record.state.clone()))
            .collect();

        let index = *self
            .selector
            .select(&items, now)
            .ok_or(FlashcardError::NoCardsAvailable)?;

        let record = records.swap_remove(index);
        tracing::debug!(
            card_id = record.template.id,
            due_at = %record.state.due_at,
            candidates = items.len(),
            "selected next card"
        );
        Ok(record)
    }

    pub fn count_cards(&self, filter: &CardFilter) -> Result<usize> {
        let now = self.clock.now().with_timezone(&Utc);
        Ok(self.filtered_cards(filter, now)?.len())
    }

    /// Records an answer and reschedules the card.
    pub fn answer_card(&self, card_id: i64, answer: &Answer) -> Result<AnswerResult> {
        let selected_index = u8::try_from(answer.selected_index)
            .ok()
            .filter(|&index| usize::from(index) < OPTION_COUNT)
            .ok_or(FlashcardError::InvalidSelection(answer.selected_index))?;

        let card = self
            .store
            .card(card_id)?
            .ok_or(FlashcardError::CardNotFound(card_id))?;

        let now = self.clock.now();
        let now_utc = now.with_timezone(&Utc);
        let correct = selected_index == card.template.correct_index;
        let rating = answer
            .rating
            .unwrap_or(if correct { Rating::Good } else { Rating::Again });

        let attempt = Attempt {
            card_id,
            selected_index,
            is_correct: correct,
            response_ms: answer.response_ms.unwrap_or(0),
            created_at: now_utc,
        };

        let updated = self.store.record_review(&attempt, |record| {
            let outcome = sm2::schedule(&record.state, rating, &now);
            let progress = CardProgress {
                attempts_count: record.progress.attempts_count.saturating_add(1),
                correct_count: record.progress.correct_count.saturating_add(u32::from(correct)),
                last_result: Some(outcome.last_result),
                last_answer_at: Some(now_utc),
            };
            (outcome.state, progress)
        })?;

        tracing::info!(
            card_id,
            correct,
            %rating,
            interval_days = updated.state.interval_days,
            due_at = %updated.state.due_at,
            "answered card"
        );

        Ok(AnswerResult {
            correct,
            correct_index: card.template.correct_index,
            outcome: ReviewOutcome {
                state: updated.state,
                last_result: rating,
            },
            progress: updated.progress,
        })
    }

    pub fn summary(&self) -> Result<ProgressSummary> {
        let now = self.clock.now();
        let since = now
            .clone()
            .checked_sub_days(Days::new(ACTIVITY_WINDOW_DAYS))
            .map(|start| start.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let records = self.store.cards()?;
        let attempts = self.store.attempts_since(since)?;
        Ok(ProgressSummary::compute(&records, &attempts, &now))
    }
}
