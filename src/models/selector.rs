//! Picks the next card to review.
//!
//! Due cards are preferred, chosen uniformly at random so reviews do not come
//! back in the same order every session. With nothing due, the cards sharing
//! the earliest upcoming due time are the candidates, again chosen at random.

use super::ReviewState;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Selects the next item from `items` using `rng` for tie-breaking.
///
/// Returns `None` only when `items` is empty.
pub fn select_next<'a, I, R>(
    items: &'a [(I, ReviewState)],
    now: DateTime<Utc>,
    rng: &mut R,
) -> Option<&'a I>
where
    R: Rng + ?Sized,
{
    let due: Vec<&(I, ReviewState)> = items.iter().filter(|(_, state)| state.is_due(now)).collect();

    let candidates: Vec<&(I, ReviewState)> = if due.is_empty() {
        let earliest = items.iter().map(|(_, state)| state.due_at).min()?;
        items
            .iter()
            .filter(|(_, state)| state.due_at == earliest)
            .collect()
    } else {
        due
    };

    tracing::trace!(candidates = candidates.len(), total = items.len(), "selecting next item");

    candidates.choose(rng).copied().map(|(id, _)| id)
}

/// Selector that owns its random source.
pub struct DueItemSelector {
    rng: ChaCha8Rng,
}

impl DueItemSelector {
    /// Seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Fixed seed, for reproducible selection sequences.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn select<'a, I>(
        &mut self,
        items: &'a [(I, ReviewState)],
        now: DateTime<Utc>,
    ) -> Option<&'a I> {
        select_next(items, now, &mut self.rng)
    }
}

impl Default for DueItemSelector {
    fn default() -> Self {
        Self::new()
    }
}
