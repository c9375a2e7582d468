//! Bounded interaction history persisted as JSON lines.
//!
//! Every write rewrites the whole file with the newest `max_entries` records.
//! There is no locking: two processes appending at the same moment may lose
//! one of the writes, but the file itself is always replaced atomically.

use crate::config::{ContextConfig, MIN_CONTEXT_WINDOW, MIN_OUTPUT_LIMIT};
use crate::types::HistoryEntry;
use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Separator placed between the kept head and tail of an over-long text.
pub const TRUNCATION_MARKER: &str = "\n...\n";

/// Keeps the start and end of `text`, eliding the middle, so the result is
/// at most `limit` characters plus the marker.
///
/// The head is `max(100, limit / 2)` characters (right-trimmed) and the tail
/// the remaining `limit - head` (left-trimmed).
pub fn truncate_middle(text: &str, limit: usize) -> String {
    let len = text.chars().count();
    if len <= limit {
        return text.to_string();
    }
    let head_len = (limit / 2).max(100);
    let tail_len = limit.saturating_sub(head_len);

    let head: String = text.chars().take(head_len).collect();
    let tail: String = text.chars().skip(len - tail_len).collect();
    format!(
        "{}{}{}",
        head.trim_end(),
        TRUNCATION_MARKER,
        tail.trim_start()
    )
}

#[derive(Debug, Clone)]
pub struct ContextStore {
    path: PathBuf,
    max_entries: usize,
    output_limit: usize,
}

impl ContextStore {
    pub fn new(path: impl Into<PathBuf>, max_entries: usize, output_limit: usize) -> Self {
        Self {
            path: path.into(),
            max_entries: max_entries.max(MIN_CONTEXT_WINDOW),
            output_limit: output_limit.max(MIN_OUTPUT_LIMIT),
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.history_path(), config.window, config.output_limit)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the newest well-formed records, oldest first.
    ///
    /// Missing or unreadable files yield an empty history; malformed lines
    /// are skipped.
    pub fn load(&self) -> Vec<HistoryEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::debug!("cannot read history {}: {}", self.path.display(), e);
                }
                return Vec::new();
            }
        };

        let mut entries: Vec<HistoryEntry> = content.lines().filter_map(parse_line).collect();
        let excess = entries.len().saturating_sub(self.max_entries);
        entries.drain(..excess);
        entries
    }

    /// Records one interaction, evicting the oldest entries beyond the window.
    ///
    /// Persistence errors are logged and dropped.
    pub fn add_entry(&self, query: &str, command: &str, output: Option<&str>) {
        let output = output
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(|o| truncate_middle(o, self.output_limit));

        let mut entries = self.load();
        entries.push(HistoryEntry::new(query, command, output));
        let excess = entries.len().saturating_sub(self.max_entries);
        entries.drain(..excess);

        if let Err(e) = self.write_all(&entries) {
            tracing::debug!("cannot write history {}: {}", self.path.display(), e);
        }
    }

    fn write_all(&self, entries: &[HistoryEntry]) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            for entry in entries {
                serde_json::to_writer(&mut writer, entry)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn parse_line(line: &str) -> Option<HistoryEntry> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    let object = value.as_object()?;
    let query = object.get("query")?.as_str()?;
    let command = object.get("command")?.as_str()?;
    let output = object
        .get("output")
        .and_then(|o| o.as_str())
        .filter(|o| !o.is_empty())
        .map(String::from);
    Some(HistoryEntry::new(query, command, output))
}
