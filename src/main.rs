use flashcards_srs::*;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use flashcards_srs::config::{DEFAULT_DATABASE_PATH, DEFAULT_LOG_FILTER};
use flashcards_srs::export::json::{export_summary_to_path, import_cards};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "flashcards")]
#[command(about = "Spaced-repetition flashcard reviews (SM-2)")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "FLASHCARDS_DB", default_value = DEFAULT_DATABASE_PATH)]
    db: PathBuf,

    /// Fixed seed for picking among equally due cards
    #[arg(long, env = "FLASHCARDS_SEED")]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add or refresh cards from a JSON deck file
    Import { path: PathBuf },
    /// Show the next card to review
    Next {
        #[arg(long)]
        kind: Option<String>,
        /// Only unseen cards and cards answered well so far
        #[arg(long)]
        easy: bool,
    },
    /// Answer a card and reschedule it
    Answer {
        card_id: i64,
        selected_index: i64,
        /// Again/Hard/Good/Easy or 1-4; derived from correctness when omitted
        #[arg(long)]
        rating: Option<String>,
        #[arg(long)]
        response_ms: Option<u64>,
    },
    /// Print a progress summary
    Stats {
        /// Also write the summary to this JSON file
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

impl Command {
    /// An import brings its own deck, so the sample cards are left out.
    fn seeds_sample_deck(&self) -> bool {
        !matches!(self, Command::Import { .. })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config {
        database_path: cli.db,
        rng_seed: cli.seed,
        log_filter: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let store = SqliteStore::open(&config.database_path)?;
    if cli.command.seeds_sample_deck() && store.cards()?.is_empty() {
        for card in sample_deck() {
            store.insert_card(&card)?;
        }
        tracing::info!("sample deck created");
    }

    let mut session = ReviewSession::new(store, SystemClock, config.selector());

    match cli.command {
        Command::Import { path } => {
            let cards = import_cards(&path)?;
            for card in &cards {
                session.store().insert_card(card)?;
            }
            println!("Imported {} cards from '{}'", cards.len(), path.display());
        }
        Command::Next { kind, easy } => {
            let filter = CardFilter {
                kind,
                easy_only: easy,
            };
            let record = session.next_card(&filter)?;
            let remaining = session.count_cards(&filter)?;

            println!(
                "#{} [{}] {}",
                record.template.id, record.template.kind, record.template.question
            );
            for (index, option) in record.template.options.iter().enumerate() {
                println!("  {index}) {option}");
            }
            println!(
                "due {} | {} matching cards | seen {} times",
                format_time(record.state.due_at),
                remaining,
                record.progress.attempts_count
            );
        }
        Command::Answer {
            card_id,
            selected_index,
            rating,
            response_ms,
        } => {
            let answer = Answer {
                selected_index,
                response_ms,
                rating: rating.as_deref().map(Rating::resolve),
            };
            let result = session.answer_card(card_id, &answer)?;

            if result.correct {
                println!("Correct!");
            } else {
                println!("Incorrect, the answer was {}", result.correct_index);
            }
            println!(
                "{}: next review in {} day(s), on {} (ease {:.2}, lapses {})",
                result.outcome.last_result,
                result.outcome.state.interval_days,
                format_time(result.outcome.state.due_at),
                result.outcome.state.ease_factor,
                result.outcome.state.lapses
            );
        }
        Command::Stats { json } => {
            let summary = session.summary()?;
            let totals = &summary.totals;
            println!(
                "cards: {} total, {} seen, {} mastered",
                totals.cards_total, totals.cards_seen, totals.cards_mastered
            );
            println!(
                "answers: {} ({:.0}% correct)",
                totals.attempts_total,
                totals.accuracy_overall * 100.0
            );
            println!(
                "due: {} now, {} overdue, {} today",
                summary.srs.due_now, summary.srs.overdue, summary.srs.due_today
            );
            for kind in &summary.by_kind {
                println!(
                    "  {}: {}/{} seen, {:.0}% correct",
                    kind.kind,
                    kind.seen,
                    kind.cards,
                    kind.accuracy * 100.0
                );
            }

            if let Some(path) = json {
                export_summary_to_path(&summary, &path)?;
                println!("Summary written to '{}'", path.display());
            }
        }
    }

    Ok(())
}

/// Formats a UTC instant as local `YYYY-MM-DD HH:MM`
fn format_time(time: DateTime<Utc>) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%d %H:%M").to_string()
}

fn sample_deck() -> Vec<NewCard> {
    let card = |slug: &str, kind: &str, question: &str, options: [&str; 4]| NewCard {
        slug: slug.to_string(),
        kind: kind.to_string(),
        question: question.to_string(),
        options: options.map(str::to_string),
        correct_index: 0,
    };

    vec![
        card(
            "c-major-chord-notes",
            "notes_from_chord",
            "Which notes make a C major triad?",
            ["C - E - G", "C - D# - G", "C - F - A", "C - E - A"],
        ),
        card(
            "which-chord-c-e-g",
            "chord_from_notes",
            "Which chord is built from C - E - G?",
            ["C major", "A minor", "F major", "G major"],
        ),
        card(
            "key-signature-one-sharp",
            "key_signature",
            "Which major key has exactly one sharp?",
            ["G major", "D major", "F major", "C major"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_skips_sample_deck() {
        let cli = Cli::parse_from(["flashcards", "--db", "cards.sqlite3", "import", "deck.json"]);
        assert!(!cli.command.seeds_sample_deck());
    }

    #[test]
    fn test_review_commands_seed_sample_deck() {
        for args in [
            vec!["flashcards", "next", "--easy"],
            vec!["flashcards", "answer", "3", "1", "--rating", "good"],
            vec!["flashcards", "stats"],
        ] {
            let cli = Cli::parse_from(args);
            assert!(cli.command.seeds_sample_deck());
        }
    }

    #[test]
    fn test_sample_deck_is_valid() {
        for card in sample_deck() {
            assert!(card.validate().is_ok(), "{}", card.slug);
        }
    }
}
