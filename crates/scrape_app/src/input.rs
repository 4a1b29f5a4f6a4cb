use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct InputEntry {
    url: String,
}

/// Reads a JSON array of `{ "url": "..." }` entries, keeping every entry in order.
pub fn read_targets(path: &Path) -> Result<Vec<String>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading input list {path:?}"))?;
    parse_targets(&content).with_context(|| format!("parsing input list {path:?}"))
}

fn parse_targets(content: &str) -> Result<Vec<String>> {
    let entries: Vec<InputEntry> = serde_json::from_str(content)?;
    Ok(entries.into_iter().map(|entry| entry.url).collect())
}
