//! # Code Sinks
//!
//! The generator never touches the filesystem. Rendered modules are handed
//! to a [`CodeSink`], which decides where the text goes. [`MemorySink`]
//! keeps everything in memory; the CLI supplies a filesystem sink.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use parking_lot::Mutex;

use crate::error::SinkError;

/// Destination for generated source files.
pub trait CodeSink: Send + Sync {
    /// Store `source` under the relative `path`.
    fn write(&self, path: &Path, source: &str) -> Result<(), SinkError>;
}

/// Reject absolute paths and `..` components, so a sink never writes
/// outside its root.
pub fn check_relative(path: &Path) -> Result<(), SinkError> {
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || path.as_os_str().is_empty() {
        return Err(SinkError::Rejected {
            path: path.to_path_buf(),
            reason: "path must be relative and stay below the output root".to_string(),
        });
    }
    Ok(())
}

/// In-memory sink. Later writes to the same path replace earlier ones.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().get(path.as_ref()).cloned()
    }

    /// Written paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }
}

impl CodeSink for MemorySink {
    fn write(&self, path: &Path, source: &str) -> Result<(), SinkError> {
        check_relative(path)?;
        self.files.lock().insert(path.to_path_buf(), source.to_string());
        Ok(())
    }
}
