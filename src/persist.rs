use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::Result;

/// Where the diagram snapshot lives between sessions.
pub trait SnapshotStorage {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<String>>;
    fn save(&mut self, snapshot: &str) -> Result<()>;
}

/// A single JSON file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStorage for FileStorage {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, snapshot: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, snapshot)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), bytes = snapshot.len(), "snapshot written");
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    pub content: Option<String>,
    pub writes: usize,
}

impl MemoryStorage {
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            writes: 0,
        }
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.content.clone())
    }

    fn save(&mut self, snapshot: &str) -> Result<()> {
        self.content = Some(snapshot.to_string());
        self.writes += 1;
        Ok(())
    }
}

/// Decides when the store needs writing: after a change, at most once per
/// revision, and on a fixed interval.
#[derive(Debug, Clone)]
pub struct Autosave {
    interval: Duration,
    last_flush: Instant,
    saved_revision: Option<u64>,
}

impl Autosave {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_flush: now,
            saved_revision: None,
        }
    }

    /// Treat `revision` as already stored, e.g. right after loading it.
    pub fn synced(mut self, revision: u64) -> Self {
        self.saved_revision = Some(revision);
        self
    }

    pub fn is_dirty(&self, revision: u64) -> bool {
        self.saved_revision != Some(revision)
    }

    /// True when the interval has elapsed and `revision` is not on disk yet.
    pub fn due(&self, now: Instant, revision: u64) -> bool {
        now.duration_since(self.last_flush) >= self.interval && self.is_dirty(revision)
    }

    pub fn mark_saved(&mut self, revision: u64, now: Instant) {
        self.saved_revision = Some(revision);
        self.last_flush = now;
        info!(revision, "diagram saved");
    }

    /// Restart the interval without recording a save, e.g. after a failed write.
    pub fn defer(&mut self, now: Instant) {
        self.last_flush = now;
    }
}
