//! Rendering of replay results

use clap::ValueEnum;

use crate::runner::{Outcome, Record, Replay};

/// Output format for replay results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One human-readable line per command plus a summary
    Text,
    /// JSON array of records
    Json,
}

/// Render a replay in the requested format
pub fn render(replay: &Replay, format: Format) -> anyhow::Result<String> {
    match format {
        Format::Text => Ok(render_text(replay)),
        Format::Json => Ok(serde_json::to_string_pretty(&replay.records)?),
    }
}

fn render_text(replay: &Replay) -> String {
    let mut out = String::new();

    for record in &replay.records {
        out.push_str(&render_record(record));
        out.push('\n');
    }

    let gets: Vec<String> = replay.gets().into_iter().map(show_value).collect();
    out.push_str(&format!("gets: [{}]\n", gets.join(", ")));
    out.push_str(&format!(
        "recency (MRU -> LRU): {}\n",
        show_entries(&replay.recency)
    ));

    if !replay.skipped.is_empty() {
        out.push_str(&format!("skipped {} malformed line(s)\n", replay.skipped.len()));
    }

    out
}

fn render_record(record: &Record) -> String {
    match &record.outcome {
        Outcome::Put {
            key,
            value,
            evicted: Some(evicted),
        } => format!(
            "put {} {} (evicted {} -> {})",
            key, value, evicted.key, evicted.value
        ),
        Outcome::Put { key, value, .. } => format!("put {} {}", key, value),
        Outcome::Get { key, value } => format!("get {} -> {}", key, show_value(*value)),
        Outcome::Remove { key, removed } => {
            format!("remove {} -> {}", key, show_value(*removed))
        }
        Outcome::Dump { entries } => format!("dump -> {}", show_entries(entries)),
    }
}

fn show_value(value: Option<i64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "not found".to_string(),
    }
}

fn show_entries(entries: &[(i64, i64)]) -> String {
    let parts: Vec<String> = entries
        .iter()
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect();
    format!("[{}]", parts.join(", "))
}
