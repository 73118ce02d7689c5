//! # Error Types
//!
//! Identifier errors carry the rejected input and the reason it was
//! rejected, so that a malformed `id` or `ref` in a schema document can be
//! diagnosed without re-reading the grammar.

use thiserror::Error;

/// A namespaced identifier or reference failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// The identifier string is empty.
    #[error("identifier is empty")]
    Empty,

    /// Fewer than three dot-separated segments.
    #[error("invalid identifier \"{value}\": expected at least 3 dot-separated segments, found {found}")]
    TooFewSegments {
        /// The rejected input.
        value: String,
        /// Number of segments present.
        found: usize,
    },

    /// The identifier exceeds the maximum length.
    #[error("invalid identifier \"{value}\": longer than {max} characters")]
    TooLong {
        /// The rejected input.
        value: String,
        /// Maximum permitted length.
        max: usize,
    },

    /// An authority segment violates the domain label grammar.
    #[error("invalid identifier \"{value}\": authority segment \"{segment}\" {reason}")]
    InvalidAuthority {
        /// The rejected input.
        value: String,
        /// The offending segment.
        segment: String,
        /// Why the segment was rejected.
        reason: &'static str,
    },

    /// The final name segment is malformed.
    #[error("invalid identifier \"{value}\": name segment \"{segment}\" must start with a letter and contain only ASCII letters and digits")]
    InvalidName {
        /// The rejected input.
        value: String,
        /// The offending segment.
        segment: String,
    },

    /// The `#fragment` part is malformed.
    #[error("invalid identifier \"{value}\": fragment \"{fragment}\" must start with a letter and contain only ASCII letters and digits")]
    InvalidFragment {
        /// The rejected input.
        value: String,
        /// The offending fragment (without `#`).
        fragment: String,
    },
}
