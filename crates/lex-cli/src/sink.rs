//! Filesystem sink for generated modules.

use std::path::{Path, PathBuf};

use lex_codegen::sink::check_relative;
use lex_codegen::{CodeSink, SinkError};

/// Writes generated files below a root directory, creating parent
/// directories as needed.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl CodeSink for FsSink {
    fn write(&self, path: &Path, source: &str) -> Result<(), SinkError> {
        check_relative(path)?;
        let target = self.root.join(path);
        let io_err = |source: std::io::Error| SinkError::Io {
            path: target.clone(),
            source,
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&target, source).map_err(io_err)?;
        tracing::debug!(path = %target.display(), bytes = source.len(), "wrote module");
        Ok(())
    }
}
