//! SQLite-backed card store
//!
//! Handles schema creation, card seeding, per-card review state and the
//! attempt log. Timestamps are stored as milliseconds since the Unix epoch.

use super::{AttemptLog, ItemStore};
use crate::error::{FlashcardError, Result};
use crate::models::{
    Attempt, CardProgress, CardRecord, CardTemplate, NewCard, Rating, ReviewState,
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS card_templates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        slug TEXT NOT NULL UNIQUE,
        kind TEXT NOT NULL,
        question TEXT NOT NULL,
        option_a TEXT NOT NULL,
        option_b TEXT NOT NULL,
        option_c TEXT NOT NULL,
        option_d TEXT NOT NULL,
        correct_index INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS card_states (
        card_id INTEGER PRIMARY KEY,
        ease_factor REAL NOT NULL DEFAULT 2.5,
        interval_days INTEGER NOT NULL DEFAULT 0,
        repetitions INTEGER NOT NULL DEFAULT 0,
        lapses INTEGER NOT NULL DEFAULT 0,
        due_at INTEGER NOT NULL,
        attempts_count INTEGER NOT NULL DEFAULT 0,
        correct_count INTEGER NOT NULL DEFAULT 0,
        last_result TEXT,
        last_answer_at INTEGER,
        FOREIGN KEY (card_id) REFERENCES card_templates(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS card_attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        card_id INTEGER NOT NULL,
        selected_index INTEGER NOT NULL,
        is_correct INTEGER NOT NULL,
        response_ms INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        FOREIGN KEY (card_id) REFERENCES card_templates(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_card_attempts_created_at ON card_attempts(created_at);
";

const RECORD_QUERY: &str = "
    SELECT t.id, t.slug, t.kind, t.question,
           t.option_a, t.option_b, t.option_c, t.option_d, t.correct_index,
           s.ease_factor, s.interval_days, s.repetitions, s.lapses, s.due_at,
           s.attempts_count, s.correct_count, s.last_result, s.last_answer_at
    FROM card_templates t
    LEFT JOIN card_states s ON s.card_id = t.id";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and makes sure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "opened card database");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a card, or refreshes its content if a card with the same slug exists.
    ///
    /// Returns the card ID. Review state is left untouched on refresh.
    pub fn insert_card(&self, card: &NewCard) -> Result<i64> {
        card.validate()?;
        let conn = self.lock();
        let [option_a, option_b, option_c, option_d] = &card.options;

        conn.execute(
            "INSERT INTO card_templates
                 (slug, kind, question, option_a, option_b, option_c, option_d, correct_index)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(slug) DO UPDATE SET
                 kind = excluded.kind,
                 question = excluded.question,
                 option_a = excluded.option_a,
                 option_b = excluded.option_b,
                 option_c = excluded.option_c,
                 option_d = excluded.option_d,
                 correct_index = excluded.correct_index",
            params![
                card.slug,
                card.kind,
                card.question,
                option_a,
                option_b,
                option_c,
                option_d,
                card.correct_index
            ],
        )?;

        let card_id: i64 = conn.query_row(
            "SELECT id FROM card_templates WHERE slug = ?1",
            params![card.slug],
            |row| row.get(0),
        )?;

        tracing::debug!(card_id, slug = %card.slug, "stored card");
        Ok(card_id)
    }
}

impl ItemStore for SqliteStore {
    fn cards(&self) -> Result<Vec<CardRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!("{RECORD_QUERY} ORDER BY t.id"))?;
        let records = stmt
            .query_map([], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn card(&self, card_id: i64) -> Result<Option<CardRecord>> {
        let conn = self.lock();
        Ok(query_record(&conn, card_id)?)
    }

    fn ensure_states(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.lock();
        let created = conn.execute(
            "INSERT INTO card_states (card_id, due_at)
             SELECT id, ?1 FROM card_templates
             WHERE id NOT IN (SELECT card_id FROM card_states)",
            params![now.timestamp_millis()],
        )?;

        if created > 0 {
            tracing::info!(created, "created default review states");
        }
        Ok(created)
    }

    fn load_or_create_state(&self, card_id: i64, now: DateTime<Utc>) -> Result<ReviewState> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let record = load_record_with_state(&tx, card_id, now)?;
        tx.commit()?;

        Ok(record.state)
    }

    fn update_state<F>(&self, card_id: i64, now: DateTime<Utc>, apply: F) -> Result<CardRecord>
    where
        F: FnOnce(&CardRecord) -> (ReviewState, CardProgress),
    {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let record = apply_update(&tx, card_id, now, apply)?;
        tx.commit()?;
        Ok(record)
    }

    fn record_review<F>(&self, attempt: &Attempt, apply: F) -> Result<CardRecord>
    where
        F: FnOnce(&CardRecord) -> (ReviewState, CardProgress),
    {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let record = apply_update(&tx, attempt.card_id, attempt.created_at, apply)?;
        insert_attempt(&tx, attempt)?;
        tx.commit()?;
        Ok(record)
    }
}

impl AttemptLog for SqliteStore {
    fn record_attempt(&self, attempt: &Attempt) -> Result<()> {
        let conn = self.lock();
        insert_attempt(&conn, attempt)
    }

    fn attempts_since(&self, since: DateTime<Utc>) -> Result<Vec<Attempt>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT card_id, selected_index, is_correct, response_ms, created_at
             FROM card_attempts
             WHERE created_at >= ?1
             ORDER BY created_at ASC, id ASC",
        )?;

        let attempts = stmt
            .query_map(params![since.timestamp_millis()], |row| {
                Ok(Attempt {
                    card_id: row.get(0)?,
                    selected_index: row.get(1)?,
                    is_correct: row.get(2)?,
                    response_ms: u64::try_from(row.get::<_, i64>(3)?).unwrap_or(0),
                    created_at: from_millis(4, row.get(4)?)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(attempts)
    }
}

/// Creates the card's state row if missing and returns the full record.
fn load_record_with_state(
    conn: &Connection,
    card_id: i64,
    now: DateTime<Utc>,
) -> Result<CardRecord> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM card_templates WHERE id = ?1",
            params![card_id],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(FlashcardError::CardNotFound(card_id));
    }

    conn.execute(
        "INSERT OR IGNORE INTO card_states (card_id, due_at) VALUES (?1, ?2)",
        params![card_id, now.timestamp_millis()],
    )?;
    query_record(conn, card_id)?.ok_or(FlashcardError::CardNotFound(card_id))
}

/// Applies `apply` to the card's record and writes the result back.
/// Returns the record as re-read from the row, at stored precision.
fn apply_update<F>(
    conn: &Connection,
    card_id: i64,
    now: DateTime<Utc>,
    apply: F,
) -> Result<CardRecord>
where
    F: FnOnce(&CardRecord) -> (ReviewState, CardProgress),
{
    let record = load_record_with_state(conn, card_id, now)?;
    let (state, progress) = apply(&record);

    conn.execute(
        "UPDATE card_states
         SET ease_factor = ?2, interval_days = ?3, repetitions = ?4, lapses = ?5, due_at = ?6,
             attempts_count = ?7, correct_count = ?8, last_result = ?9, last_answer_at = ?10
         WHERE card_id = ?1",
        params![
            card_id,
            state.ease_factor,
            state.interval_days,
            state.repetitions,
            state.lapses,
            state.due_at.timestamp_millis(),
            progress.attempts_count,
            progress.correct_count,
            progress.last_result.map(Rating::label),
            progress.last_answer_at.map(|at| at.timestamp_millis()),
        ],
    )?;

    query_record(conn, card_id)?.ok_or(FlashcardError::CardNotFound(card_id))
}

fn insert_attempt(conn: &Connection, attempt: &Attempt) -> Result<()> {
    conn.execute(
        "INSERT INTO card_attempts
             (card_id, selected_index, is_correct, response_ms, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            attempt.card_id,
            attempt.selected_index,
            attempt.is_correct,
            i64::try_from(attempt.response_ms).unwrap_or(i64::MAX),
            attempt.created_at.timestamp_millis(),
        ],
    )?;
    Ok(())
}

fn query_record(conn: &Connection, card_id: i64) -> rusqlite::Result<Option<CardRecord>> {
    conn.query_row(
        &format!("{RECORD_QUERY} WHERE t.id = ?1"),
        params![card_id],
        record_from_row,
    )
    .optional()
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CardRecord> {
    let template = CardTemplate {
        id: row.get(0)?,
        slug: row.get(1)?,
        kind: row.get(2)?,
        question: row.get(3)?,
        options: [row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?],
        correct_index: row.get(8)?,
    };

    // No state row yet: the card has never been touched
    let Some(due_ms) = row.get::<_, Option<i64>>(13)? else {
        return Ok(CardRecord {
            template,
            state: ReviewState::default(),
            progress: CardProgress::default(),
        });
    };

    let state = ReviewState {
        ease_factor: row.get(9)?,
        interval_days: row.get(10)?,
        repetitions: row.get(11)?,
        lapses: row.get(12)?,
        due_at: from_millis(13, due_ms)?,
    };

    let progress = CardProgress {
        attempts_count: row.get(14)?,
        correct_count: row.get(15)?,
        last_result: row
            .get::<_, Option<String>>(16)?
            .map(|label| Rating::from_label(&label)),
        last_answer_at: row
            .get::<_, Option<i64>>(17)?
            .map(|ms| from_millis(17, ms))
            .transpose()?,
    };

    Ok(CardRecord {
        template,
        state,
        progress,
    })
}

fn from_millis(column: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use std::thread;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    fn new_card(slug: &str) -> NewCard {
        NewCard {
            slug: slug.to_string(),
            kind: "key_signature".to_string(),
            question: "Which major key has exactly one sharp?".to_string(),
            options: [
                "G major".to_string(),
                "D major".to_string(),
                "F major".to_string(),
                "C major".to_string(),
            ],
            correct_index: 0,
        }
    }

    #[test]
    fn test_insert_card_is_idempotent_on_slug() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.insert_card(&new_card("one-sharp")).unwrap();

        let mut changed = new_card("one-sharp");
        changed.question = "Which key has one sharp?".to_string();
        let second = store.insert_card(&changed).unwrap();

        assert_eq!(first, second);
        let cards = store.cards().unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].template.question, "Which key has one sharp?");
    }

    #[test]
    fn test_insert_card_rejects_out_of_range_answer() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut card = new_card("one-sharp");
        card.correct_index = 9;

        assert!(matches!(
            store.insert_card(&card),
            Err(FlashcardError::InvalidCard { correct_index: 9, .. })
        ));
        assert!(store.cards().unwrap().is_empty());
    }

    #[test]
    fn test_card_without_state_is_default() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_card(&new_card("one-sharp")).unwrap();

        let record = store.card(id).unwrap().unwrap();
        assert_eq!(record.state, ReviewState::default());
        assert_eq!(record.progress, CardProgress::default());
    }

    #[test]
    fn test_ensure_states_creates_missing_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_card(&new_card("a")).unwrap();
        store.insert_card(&new_card("b")).unwrap();

        assert_eq!(store.ensure_states(now()).unwrap(), 2);
        assert_eq!(store.ensure_states(now()).unwrap(), 0);

        for record in store.cards().unwrap() {
            assert_eq!(record.state, ReviewState::new(now()));
        }
    }

    #[test]
    fn test_load_or_create_state() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_card(&new_card("a")).unwrap();

        let state = store.load_or_create_state(id, now()).unwrap();
        assert_eq!(state, ReviewState::new(now()));

        // Second access keeps the stored due time
        let later = now() + Duration::days(3);
        assert_eq!(store.load_or_create_state(id, later).unwrap().due_at, now());
    }

    #[test]
    fn test_unknown_card_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.card(99).unwrap().is_none());
        assert!(matches!(
            store.load_or_create_state(99, now()),
            Err(FlashcardError::CardNotFound(99))
        ));
        assert!(matches!(
            store.update_state(99, now(), |r| (r.state.clone(), r.progress.clone())),
            Err(FlashcardError::CardNotFound(99))
        ));
    }

    #[test]
    fn test_update_state_persists_all_fields() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_card(&new_card("a")).unwrap();

        let state = ReviewState {
            ease_factor: 2.36,
            interval_days: 6,
            repetitions: 2,
            lapses: 1,
            due_at: now() + Duration::days(6),
        };
        let progress = CardProgress {
            attempts_count: 4,
            correct_count: 3,
            last_result: Some(Rating::Good),
            last_answer_at: Some(now()),
        };

        let (s, p) = (state.clone(), progress.clone());
        store.update_state(id, now(), move |_| (s, p)).unwrap();

        let record = store.card(id).unwrap().unwrap();
        assert_eq!(record.state, state);
        assert_eq!(record.progress, progress);
    }

    #[test]
    fn test_update_state_returns_stored_precision() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_card(&new_card("a")).unwrap();
        let precise = now() + Duration::nanoseconds(1_234_567);

        let returned = store
            .update_state(id, now(), |record| {
                let mut state = record.state.clone();
                state.due_at = precise;
                let mut progress = record.progress.clone();
                progress.last_answer_at = Some(precise);
                (state, progress)
            })
            .unwrap();

        let stored = store.card(id).unwrap().unwrap();
        assert_eq!(returned, stored);
        assert_eq!(returned.state.due_at, now() + Duration::milliseconds(1));
    }

    #[test]
    fn test_record_review_stores_attempt_and_state() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_card(&new_card("a")).unwrap();
        let attempt = Attempt {
            card_id: id,
            selected_index: 0,
            is_correct: true,
            response_ms: 900,
            created_at: now(),
        };

        let record = store
            .record_review(&attempt, |record| {
                let mut progress = record.progress.clone();
                progress.attempts_count += 1;
                (record.state.clone(), progress)
            })
            .unwrap();

        assert_eq!(record.progress.attempts_count, 1);
        assert_eq!(record.state.due_at, now());
        assert_eq!(store.attempts_since(now()).unwrap(), vec![attempt]);
    }

    #[test]
    fn test_record_review_rolls_back_state_when_log_write_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_card(&new_card("a")).unwrap();
        store.lock().execute_batch("DROP TABLE card_attempts").unwrap();

        let attempt = Attempt {
            card_id: id,
            selected_index: 0,
            is_correct: true,
            response_ms: 900,
            created_at: now(),
        };
        let result = store.record_review(&attempt, |record| {
            let mut progress = record.progress.clone();
            progress.attempts_count += 1;
            (record.state.clone(), progress)
        });

        assert!(matches!(result, Err(FlashcardError::Database(_))));
        let record = store.card(id).unwrap().unwrap();
        assert_eq!(record.progress, CardProgress::default());
        assert_eq!(record.state, ReviewState::default());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let id = store.insert_card(&new_card("a")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..10 {
                        store
                            .update_state(id, now(), |record| {
                                let mut progress = record.progress.clone();
                                progress.attempts_count += 1;
                                (record.state.clone(), progress)
                            })
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.card(id).unwrap().unwrap().progress.attempts_count, 80);
    }

    #[test]
    fn test_attempt_log_filters_by_time() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_card(&new_card("a")).unwrap();

        for days_ago in [20, 5, 1] {
            store
                .record_attempt(&Attempt {
                    card_id: id,
                    selected_index: 1,
                    is_correct: false,
                    response_ms: 1500,
                    created_at: now() - Duration::days(days_ago),
                })
                .unwrap();
        }

        let recent = store.attempts_since(now() - Duration::days(14)).unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].created_at < recent[1].created_at);
        assert_eq!(recent[0].response_ms, 1500);
    }

    #[test]
    fn test_reopen_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.sqlite3");

        let id = {
            let store = SqliteStore::open(&path).unwrap();
            let id = store.insert_card(&new_card("a")).unwrap();
            store.ensure_states(now()).unwrap();
            id
        };

        let store = SqliteStore::open(&path).unwrap();
        let record = store.card(id).unwrap().unwrap();
        assert_eq!(record.state.due_at, now());
    }
}
