//! SM-2 (SuperMemo 2) spaced repetition algorithm implementation.
//!
//! The SM-2 algorithm calculates review intervals based on recall quality:
//! - Each card has an ease factor (EF) that is adjusted after every review, pass or fail
//! - Quality 0-2: interval back to 1 day, repetitions back to 0 (a lapse if the card had graduated)
//! - Quality 3-5: interval grows 1 day → 6 days → previous interval × EF
//! - EF never falls below 1.3 and has no upper bound
//!
//! Everything here is pure: the current time is always passed in.

use super::review_state::MIN_EASE_FACTOR;
use super::{Rating, ReviewOutcome, ReviewState};
use super::rating::PASSING_QUALITY;
use chrono::{DateTime, Days, Duration, TimeZone, Utc};

const MAX_QUALITY: u8 = 5;

/// Interval and repetition count produced by one review.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalUpdate {
    pub interval_days: u32,
    pub repetitions: u32,
    pub is_lapse: bool,
}

/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored at 1.3.
pub fn calculate_ease_factor(current_ease_factor: f64, quality: u8) -> f64 {
    let q = f64::from(quality.min(MAX_QUALITY));
    let new_ease_factor = current_ease_factor + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02));
    new_ease_factor.max(MIN_EASE_FACTOR)
}

/// `ease_factor` must already be the updated value from [`calculate_ease_factor`].
pub fn calculate_interval(
    current_interval: u32,
    ease_factor: f64,
    repetitions: u32,
    quality: u8,
) -> IntervalUpdate {
    if quality < PASSING_QUALITY {
        return IntervalUpdate {
            interval_days: 1,
            repetitions: 0,
            is_lapse: repetitions > 0,
        };
    }

    let interval_days = match repetitions {
        0 => 1,
        1 => 6,
        // `as` saturates, so absurdly long intervals pin at u32::MAX
        _ => (f64::from(current_interval) * ease_factor).round() as u32,
    };

    IntervalUpdate {
        interval_days,
        repetitions: repetitions.saturating_add(1),
        is_lapse: false,
    }
}

/// Moves `from` forward by `interval_days` calendar days in its own time zone.
///
/// The local wall-clock time is kept, so a DST switch inside the interval does
/// not change the day count. If the shifted wall-clock time does not exist
/// (DST gap) the days are added as elapsed time instead.
pub fn calculate_due_date<Tz: TimeZone>(interval_days: u32, from: &DateTime<Tz>) -> DateTime<Utc> {
    let shifted = from
        .naive_local()
        .checked_add_days(Days::new(u64::from(interval_days)))
        .and_then(|naive| from.timezone().from_local_datetime(&naive).earliest());

    match shifted {
        Some(due) => due.with_timezone(&Utc),
        None => Duration::try_days(i64::from(interval_days))
            .and_then(|delta| from.with_timezone(&Utc).checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
}

/// Calculates new review state from a raw 0-5 quality value.
/// Quality above 5 is treated as 5.
pub fn calculate_next_review<Tz: TimeZone>(
    state: &ReviewState,
    quality: u8,
    now: &DateTime<Tz>,
) -> ReviewState {
    let quality = quality.min(MAX_QUALITY);

    let ease_factor = calculate_ease_factor(state.ease_factor, quality);
    let update = calculate_interval(state.interval_days, ease_factor, state.repetitions, quality);
    let lapses = if update.is_lapse {
        state.lapses.saturating_add(1)
    } else {
        state.lapses
    };

    ReviewState {
        ease_factor,
        interval_days: update.interval_days,
        repetitions: update.repetitions,
        lapses,
        due_at: calculate_due_date(update.interval_days, now),
    }
}

/// Schedules the next review of a card answered with `rating` at `now`.
pub fn schedule<Tz: TimeZone>(
    state: &ReviewState,
    rating: Rating,
    now: &DateTime<Tz>,
) -> ReviewOutcome {
    let next = calculate_next_review(state, rating.quality(), now);

    tracing::debug!(
        %rating,
        ease_factor = next.ease_factor,
        interval_days = next.interval_days,
        repetitions = next.repetitions,
        lapses = next.lapses,
        due_at = %next.due_at,
        "scheduled review"
    );

    ReviewOutcome {
        state: next,
        last_result: rating,
    }
}
