//! JSONL transcripts of stream events and UI actions

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use qsolver_core::StreamRouter;
use qsolver_wire::StreamEvent;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// UI actions interleaved with stream events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum Control {
    Select { index: usize },
    Delete { index: usize },
    Overwrite,
    Append,
    KeepContext { enabled: bool },
    SetBuffer { text: String },
}

/// One transcript line.
///
/// Lines are either typed events (`{"type": "content", "delta": "..."}`),
/// controls (`{"control": "select", "index": 1}`), or raw backend channel
/// messages (`{"event": "solution-stream-chunk", "data": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscriptEntry {
    Event(StreamEvent),
    Control(Control),
    Wire {
        event: String,
        #[serde(default)]
        data: Option<String>,
    },
}

/// Read a transcript, skipping blank lines and `#` comments
pub fn load(path: &Path) -> Result<Vec<TranscriptEntry>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse(BufReader::new(file)).with_context(|| format!("reading {}", path.display()))
}

pub fn parse(reader: impl BufRead) -> Result<Vec<TranscriptEntry>> {
    let mut entries = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let entry = serde_json::from_str(trimmed)
            .with_context(|| format!("line {}: not a transcript entry", i + 1))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Feed entries through the router in order
pub fn replay(router: &mut StreamRouter, entries: impl IntoIterator<Item = TranscriptEntry>) {
    for entry in entries {
        match entry {
            TranscriptEntry::Event(event) => router.handle(event),
            TranscriptEntry::Wire { event, data } => {
                match StreamEvent::from_wire(&event, data.as_deref()) {
                    Some(event) => router.handle(event),
                    None => warn!(channel = %event, "Ignoring unknown backend channel"),
                }
            }
            TranscriptEntry::Control(control) => {
                debug!(?control, "Applying control");
                match control {
                    Control::Select { index } => router.select_history(index),
                    Control::Delete { index } => router.delete_history(index),
                    Control::Overwrite => router.request_overwrite(),
                    Control::Append => router.begin_append(),
                    Control::KeepContext { enabled } => router.set_keep_context(enabled),
                    Control::SetBuffer { text } => router.set_stream_buffer(text),
                }
            }
        }
    }
}
