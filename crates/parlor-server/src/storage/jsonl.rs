//! File-backed history: one JSON object per line, one file per room.
//!
//! The on-disk format is append-only JSON lines with `sender`, `message`,
//! and an RFC 3339 `timestamp`. Lines that fail to parse on replay are
//! skipped rather than failing the whole replay — a torn write must not make
//! a room's history unreadable.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
    sync::Arc,
};

use parlor_proto::ChatEntry;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use super::{HistoryError, HistoryStore};

/// One persisted chat line.
#[derive(Debug, Serialize, Deserialize)]
struct StoredMessage {
    sender: String,
    message: String,
    timestamp: String,
}

/// History stored as `<dir>/<room_id>.json` files of JSON lines.
#[derive(Debug, Clone)]
pub struct JsonlHistory {
    dir: Arc<PathBuf>,
}

impl JsonlHistory {
    /// Open (creating if needed) a history directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir: Arc::new(dir) })
    }

    fn room_path(&self, room_id: u32) -> PathBuf {
        self.dir.join(format!("{room_id}.json"))
    }
}

impl HistoryStore for JsonlHistory {
    fn append(&self, room_id: u32, entry: &ChatEntry) -> Result<(), HistoryError> {
        let stored = StoredMessage {
            sender: entry.from.clone(),
            message: entry.text.clone(),
            timestamp: OffsetDateTime::now_utc().format(&Rfc3339)?,
        };

        let mut file =
            OpenOptions::new().append(true).create(true).open(self.room_path(room_id))?;
        let mut line = serde_json::to_vec(&stored)?;
        line.push(b'\n');
        file.write_all(&line)?;
        Ok(())
    }

    fn replay(&self, room_id: u32) -> Result<Vec<ChatEntry>, HistoryError> {
        let contents = match fs::read_to_string(self.room_path(room_id)) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredMessage>(line) {
                Ok(stored) => {
                    entries.push(ChatEntry { from: stored.sender, text: stored.message });
                },
                Err(err) => tracing::warn!("skipping corrupt history line: {err}"),
            }
        }
        Ok(entries)
    }

    fn remove_room(&self, room_id: u32) -> Result<(), HistoryError> {
        match fs::remove_file(self.room_path(room_id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
