//! Progress summary across all cards: totals, scheduling load, per-kind
//! accuracy and recent daily activity.

use super::{Attempt, CardRecord, is_card_mastered};
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many days back the activity series reaches.
pub const ACTIVITY_WINDOW_DAYS: u64 = 14;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub cards_total: usize,
    pub cards_seen: usize,
    pub cards_unseen: usize,
    pub cards_mastered: usize,
    pub attempts_total: u64,
    pub correct_total: u64,
    pub accuracy_overall: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulingLoad {
    pub due_now: usize,
    /// Due strictly before now and answered at least once.
    pub overdue: usize,
    /// Due before the end of the current local day.
    pub due_today: usize,
    pub average_interval_days: f64,
    pub average_ease_factor: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KindSummary {
    pub kind: String,
    pub cards: usize,
    pub seen: usize,
    pub accuracy: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyActivity {
    /// Local calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub attempts: u32,
    pub correct: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub totals: Totals,
    pub srs: SchedulingLoad,
    pub by_kind: Vec<KindSummary>,
    pub recent_activity: Vec<DailyActivity>,
}

#[derive(Default)]
struct KindCounts {
    cards: usize,
    seen: usize,
    attempts: u64,
    correct: u64,
}

impl ProgressSummary {
    /// Builds the summary. Calendar days (end of today, activity dates) are
    /// taken in the time zone of `now`.
    pub fn compute<Tz: TimeZone>(
        records: &[CardRecord],
        attempts: &[Attempt],
        now: &DateTime<Tz>,
    ) -> Self {
        let now_utc = now.with_timezone(&Utc);
        let end_of_today = end_of_day(now);

        let seen: Vec<&CardRecord> = records.iter().filter(|r| r.progress.is_seen()).collect();

        let attempts_total: u64 = records
            .iter()
            .map(|r| u64::from(r.progress.attempts_count))
            .sum();
        let correct_total: u64 = records
            .iter()
            .map(|r| u64::from(r.progress.correct_count))
            .sum();

        let totals = Totals {
            cards_total: records.len(),
            cards_seen: seen.len(),
            cards_unseen: records.len() - seen.len(),
            cards_mastered: records
                .iter()
                .filter(|r| is_card_mastered(r.progress.attempts_count, r.progress.correct_count))
                .count(),
            attempts_total,
            correct_total,
            accuracy_overall: ratio(correct_total, attempts_total),
        };

        let srs = SchedulingLoad {
            due_now: records.iter().filter(|r| r.state.is_due(now_utc)).count(),
            overdue: seen.iter().filter(|r| r.state.due_at < now_utc).count(),
            due_today: records.iter().filter(|r| r.state.due_at <= end_of_today).count(),
            average_interval_days: mean(seen.iter().map(|r| f64::from(r.state.interval_days))),
            average_ease_factor: mean(seen.iter().map(|r| r.state.ease_factor)),
        };

        Self {
            totals,
            srs,
            by_kind: by_kind(records),
            recent_activity: recent_activity(attempts, now),
        }
    }
}

fn by_kind(records: &[CardRecord]) -> Vec<KindSummary> {
    let mut kinds: BTreeMap<&str, KindCounts> = BTreeMap::new();
    for record in records {
        let counts = kinds.entry(record.template.kind.as_str()).or_default();
        counts.cards += 1;
        if record.progress.is_seen() {
            counts.seen += 1;
            counts.attempts += u64::from(record.progress.attempts_count);
            counts.correct += u64::from(record.progress.correct_count);
        }
    }

    kinds
        .into_iter()
        .map(|(kind, counts)| KindSummary {
            kind: kind.to_string(),
            cards: counts.cards,
            seen: counts.seen,
            accuracy: ratio(counts.correct, counts.attempts),
        })
        .collect()
}

fn recent_activity<Tz: TimeZone>(attempts: &[Attempt], now: &DateTime<Tz>) -> Vec<DailyActivity> {
    let tz = now.timezone();
    let window_start = now
        .clone()
        .checked_sub_days(Days::new(ACTIVITY_WINDOW_DAYS))
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut days: BTreeMap<NaiveDate, (u32, u32)> = BTreeMap::new();
    for attempt in attempts.iter().filter(|a| a.created_at >= window_start) {
        let date = attempt.created_at.with_timezone(&tz).date_naive();
        let (count, correct) = days.entry(date).or_default();
        *count += 1;
        if attempt.is_correct {
            *correct += 1;
        }
    }

    days.into_iter()
        .map(|(date, (attempts, correct))| DailyActivity {
            date: date.format("%Y-%m-%d").to_string(),
            attempts,
            correct,
        })
        .collect()
}

/// Last millisecond of `now`'s local calendar day, as UTC.
fn end_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_milli_opt(23, 59, 59, 999)
        .and_then(|naive| now.timezone().from_local_datetime(&naive).latest())
        .map(|end| end.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc))
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / f64::from(count) }
}
