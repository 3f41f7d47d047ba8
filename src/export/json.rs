//! JSON import/export module.
//! Loads card decks for seeding the store and writes progress summaries out.

use crate::error::Result;
use crate::models::{NewCard, ProgressSummary};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Exports a progress summary to a pretty-printed JSON file.
pub fn export_summary_to_path<P: AsRef<Path>>(summary: &ProgressSummary, path: P) -> Result<()> {
    let json_string = serde_json::to_string_pretty(summary)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    Ok(())
}

/// Imports a deck file: a JSON array of cards.
/// Returns an error if the file doesn't exist, contains invalid JSON, or any
/// card's correct index falls outside its options.
pub fn import_cards<P: AsRef<Path>>(path: P) -> Result<Vec<NewCard>> {
    let mut file = File::open(path.as_ref())?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let cards: Vec<NewCard> = serde_json::from_str(&contents)?;
    for card in &cards {
        card.validate()?;
    }

    tracing::info!(count = cards.len(), path = %path.as_ref().display(), "imported deck");
    Ok(cards)
}
