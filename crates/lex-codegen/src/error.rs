//! Errors raised while generating code.

use std::path::PathBuf;

use thiserror::Error;

/// A structurally valid document could not be turned into code.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The main definition is not a `record` or `object`.
    #[error("cannot generate code for {id}: main definition is a {variant}, expected record or object")]
    UnsupportedVariant {
        /// Identifier of the document.
        id: String,
        /// Kind of the main definition.
        variant: String,
    },

    /// The document has no `main` definition.
    #[error("cannot generate code for {id}: no main definition")]
    MissingMain {
        /// Identifier of the document.
        id: String,
    },

    /// A stub failed to compile or render.
    #[error("stub rendering failed: {0}")]
    Render(String),

    /// The sink refused the generated source.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Writing generated source failed.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The sink does not accept this path.
    #[error("refused to write {}: {reason}", path.display())]
    Rejected { path: PathBuf, reason: String },
}
