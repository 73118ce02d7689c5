//! # Structural Parse Errors
//!
//! A malformed schema document cannot be trusted for validation or for
//! generation, so every parse failure is fatal and carries the location of
//! the offending node (`defs/main/record/properties/text`) plus the variant
//! and key involved.

use lex_core::{IdentifierError, ValueKind};
use thiserror::Error;

/// A schema document or type node could not be parsed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A node was expected to be a JSON object.
    #[error("{location}: expected a JSON object, found {found}")]
    NotAnObject {
        /// Slash-separated location of the node.
        location: String,
        /// Kind of the value found instead.
        found: ValueKind,
    },

    /// A key that the variant cannot do without is absent.
    #[error("{location}: `{variant}` is missing required key `{key}`")]
    MissingKey {
        /// Slash-separated location of the node.
        location: String,
        /// Variant tag of the node.
        variant: &'static str,
        /// The missing key.
        key: &'static str,
    },

    /// A known key holds a value of the wrong shape.
    #[error("{location}: key `{key}` of `{variant}` {reason}")]
    InvalidKey {
        /// Slash-separated location of the node.
        location: String,
        /// Variant tag of the node.
        variant: &'static str,
        /// The offending key.
        key: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// The `type` tag names no known variant.
    #[error("{location}: unknown type tag \"{tag}\"")]
    UnknownVariant {
        /// Slash-separated location of the node.
        location: String,
        /// The unrecognised tag.
        tag: String,
    },

    /// A primary-definition variant appeared where only field types are allowed.
    #[error("{location}: `{variant}` may only appear as a top-level definition")]
    MisplacedVariant {
        /// Slash-separated location of the node.
        location: String,
        /// The definition variant found.
        variant: String,
    },

    /// The document `id` is not a valid identifier.
    #[error("invalid document id: {0}")]
    Identifier(#[from] IdentifierError),

    /// The document text is not JSON.
    #[error("invalid JSON: {0}")]
    Json(String),
}

impl ParseError {
    /// Prefix the error location with the segment of the enclosing node.
    pub fn within(self, segment: &str) -> Self {
        let join = |location: String| {
            if location.is_empty() {
                segment.to_string()
            } else {
                format!("{segment}/{location}")
            }
        };
        match self {
            Self::NotAnObject { location, found } => Self::NotAnObject {
                location: join(location),
                found,
            },
            Self::MissingKey { location, variant, key } => Self::MissingKey {
                location: join(location),
                variant,
                key,
            },
            Self::InvalidKey { location, variant, key, reason } => Self::InvalidKey {
                location: join(location),
                variant,
                key,
                reason,
            },
            Self::UnknownVariant { location, tag } => Self::UnknownVariant {
                location: join(location),
                tag,
            },
            Self::MisplacedVariant { location, variant } => Self::MisplacedVariant {
                location: join(location),
                variant,
            },
            other @ (Self::Identifier(_) | Self::Json(_)) => other,
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
