//! [`ArtifactSink`] implementations: a directory on disk and an in-memory
//! buffer.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use sentinel_types::{ArtifactSink, Frame, SentinelError};
use tracing::debug;

/// Writes every artifact as an image file inside one directory.
///
/// The encoding follows the file extension of the artifact name (`.jpg`
/// for every name Sentinel generates).  Existing files are overwritten.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Use `dir`, creating it (and its parents) when missing.
    ///
    /// # Errors
    ///
    /// [`SentinelError::Persistence`] if the directory cannot be created.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, SentinelError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| SentinelError::Persistence {
            name: dir.display().to_string(),
            details: e.to_string(),
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for DirectorySink {
    fn persist(&self, name: &str, frame: &Frame) -> Result<(), SentinelError> {
        let err = |details: String| SentinelError::Persistence {
            name: name.to_string(),
            details,
        };
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(err("artifact names must be plain file names".to_string()));
        }
        let path = self.dir.join(name);
        frame
            .pixels()
            .save(&path)
            .map_err(|e| err(e.to_string()))?;
        debug!(path = %path.display(), "artifact written");
        Ok(())
    }
}

/// Keeps artifacts in memory, in persist order.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(String, Frame)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    /// The most recent frame stored under `name`.
    pub fn get(&self, name: &str) -> Option<Frame> {
        self.lock()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, frame)| frame.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Frame)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ArtifactSink for MemorySink {
    fn persist(&self, name: &str, frame: &Frame) -> Result<(), SentinelError> {
        self.lock().push((name.to_string(), frame.clone()));
        Ok(())
    }
}
