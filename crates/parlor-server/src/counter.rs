//! Aggregate chatter counter.
//!
//! Cumulative count of successful joins across the server's lifetime, kept in
//! a small JSON document (`{"count": N}`) on disk so it survives restarts.
//! Read by the `/chatters` endpoint that clients poll out-of-band.

use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from counter file operations.
#[derive(Debug, Error)]
pub enum CounterError {
    /// Filesystem operation failed.
    #[error("counter I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The counter document failed to (de)serialize.
    #[error("counter document invalid: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-disk shape of the counter document.
#[derive(Debug, Serialize, Deserialize)]
struct CountDocument {
    count: u64,
}

/// File-backed cumulative join counter; clones share one file lock.
#[derive(Debug, Clone)]
pub struct ChatterCounter {
    path: Arc<PathBuf>,
    guard: Arc<Mutex<()>>,
}

impl ChatterCounter {
    /// Create a counter stored at `path`. The file is created lazily with a
    /// zero count on first access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Arc::new(path.into()), guard: Arc::new(Mutex::new(())) }
    }

    /// Read, increment, and write back the count. Returns the new value.
    pub fn increment(&self) -> Result<u64, CounterError> {
        let _held = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut document = self.read_document()?;
        document.count += 1;
        fs::write(self.path.as_ref(), serde_json::to_vec_pretty(&document)?)?;
        Ok(document.count)
    }

    /// Current count.
    pub fn current(&self) -> Result<u64, CounterError> {
        let _held = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_document()?.count)
    }

    fn read_document(&self) -> Result<CountDocument, CounterError> {
        match fs::read(self.path.as_ref()) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let document = CountDocument { count: 0 };
                fs::write(self.path.as_ref(), serde_json::to_vec_pretty(&document)?)?;
                Ok(document)
            },
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let counter = ChatterCounter::new(dir.path().join("count.json"));
        assert_eq!(counter.current().unwrap(), 0);
    }

    #[test]
    fn increments_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("count.json");

        let counter = ChatterCounter::new(&path);
        assert_eq!(counter.increment().unwrap(), 1);
        assert_eq!(counter.increment().unwrap(), 2);

        let reopened = ChatterCounter::new(&path);
        assert_eq!(reopened.current().unwrap(), 2);
    }

    #[test]
    fn document_shape_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("count.json");
        let counter = ChatterCounter::new(&path);
        counter.increment().unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["count"], 1);
    }
}
