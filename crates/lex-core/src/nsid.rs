//! # Namespaced Identifiers
//!
//! An [`Nsid`] addresses a schema document (`com.example.feed.post`) or a
//! single definition inside one (`com.example.feed.post#replyRef`). The
//! authority is a reverse-domain name; the last segment is the name.
//!
//! ## Validation
//!
//! - At least three segments: an authority of two or more labels plus the name.
//! - Authority labels: ASCII alphanumeric with internal hyphens, 1..=63 chars.
//! - Name: starts with an ASCII letter, ASCII alphanumeric (camelCase allowed).
//! - Fragment: same shape as the name. `#main` is the same as no fragment.
//!
//! Parsed identifiers are immutable and round-trip losslessly through
//! [`Display`](std::fmt::Display), apart from the `#main` normalisation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IdentifierError;

/// Name of the primary definition of a schema document.
pub const MAIN_DEF: &str = "main";

/// Maximum length of an identifier, fragment excluded.
const MAX_NSID_LEN: usize = 317;

/// Maximum length of a single domain label.
const MAX_LABEL_LEN: usize = 63;

/// A parsed namespaced identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nsid {
    authority: String,
    name: String,
    fragment: Option<String>,
}

impl Nsid {
    /// Parse an identifier, with or without a `#fragment`.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentifierError`] describing the first grammar violation.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        if value.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let (base, fragment) = match value.split_once('#') {
            Some((base, frag)) => (base, Some(frag)),
            None => (value, None),
        };

        if base.len() > MAX_NSID_LEN {
            return Err(IdentifierError::TooLong {
                value: value.to_string(),
                max: MAX_NSID_LEN,
            });
        }

        let segments: Vec<&str> = base.split('.').collect();
        if segments.len() < 3 {
            return Err(IdentifierError::TooFewSegments {
                value: value.to_string(),
                found: segments.len(),
            });
        }

        let (name, authority) = segments
            .split_last()
            .ok_or(IdentifierError::Empty)?;

        for segment in authority {
            validate_label(segment).map_err(|reason| IdentifierError::InvalidAuthority {
                value: value.to_string(),
                segment: segment.to_string(),
                reason,
            })?;
        }

        if !is_name_segment(name) {
            return Err(IdentifierError::InvalidName {
                value: value.to_string(),
                segment: name.to_string(),
            });
        }

        let fragment = match fragment {
            None => None,
            Some(MAIN_DEF) => None,
            Some(frag) if is_name_segment(frag) => Some(frag.to_string()),
            Some(frag) => {
                return Err(IdentifierError::InvalidFragment {
                    value: value.to_string(),
                    fragment: frag.to_string(),
                })
            }
        };

        Ok(Self {
            authority: authority.join("."),
            name: name.to_string(),
            fragment,
        })
    }

    /// The reverse-domain authority (everything before the name).
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// The authority labels, in document order.
    pub fn authority_segments(&self) -> impl Iterator<Item = &str> {
        self.authority.split('.')
    }

    /// The final name segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fragment, if the identifier addresses a non-main definition.
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// The definition name this identifier addresses (`main` when no fragment).
    pub fn definition_name(&self) -> &str {
        self.fragment.as_deref().unwrap_or(MAIN_DEF)
    }

    /// True when the identifier addresses the document's main definition.
    pub fn is_main(&self) -> bool {
        self.fragment.is_none()
    }

    /// The identifier of the enclosing document (fragment dropped).
    pub fn base(&self) -> Nsid {
        Self {
            authority: self.authority.clone(),
            name: self.name.clone(),
            fragment: None,
        }
    }

    /// A copy of this identifier addressing `fragment` in the same document.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidFragment`] if `fragment` is malformed.
    pub fn with_fragment(&self, fragment: &str) -> Result<Nsid, IdentifierError> {
        if fragment == MAIN_DEF {
            return Ok(self.base());
        }
        if !is_name_segment(fragment) {
            return Err(IdentifierError::InvalidFragment {
                value: format!("{}#{fragment}", self.base()),
                fragment: fragment.to_string(),
            });
        }
        Ok(Self {
            authority: self.authority.clone(),
            name: self.name.clone(),
            fragment: Some(fragment.to_string()),
        })
    }
}

impl fmt::Display for Nsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.authority, self.name)?;
        if let Some(frag) = &self.fragment {
            write!(f, "#{frag}")?;
        }
        Ok(())
    }
}

impl FromStr for Nsid {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Nsid {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Nsid> for String {
    fn from(id: Nsid) -> Self {
        id.to_string()
    }
}

// ---------------------------------------------------------------------------
// Reference targets
// ---------------------------------------------------------------------------

/// Where a `ref` (or a union member) points.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefTarget {
    /// `#name`: a definition in the same document.
    Local(String),
    /// A fully qualified identifier, optionally with a fragment.
    External(Nsid),
}

impl RefTarget {
    /// Parse a reference string.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentifierError`] if the reference is neither a valid
    /// `#fragment` nor a valid identifier.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        match value.strip_prefix('#') {
            Some(frag) if is_name_segment(frag) => Ok(Self::Local(frag.to_string())),
            Some(frag) => Err(IdentifierError::InvalidFragment {
                value: value.to_string(),
                fragment: frag.to_string(),
            }),
            None => Nsid::parse(value).map(Self::External),
        }
    }

    /// Resolve this target against the identifier of the enclosing document.
    pub fn absolute(&self, base: &Nsid) -> Result<Nsid, IdentifierError> {
        match self {
            Self::Local(frag) => base.base().with_fragment(frag),
            Self::External(id) => Ok(id.clone()),
        }
    }
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(frag) => write!(f, "#{frag}"),
            Self::External(id) => write!(f, "{id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Grammar helpers
// ---------------------------------------------------------------------------

/// Check a single domain label: ASCII alphanumeric with internal hyphens,
/// 1..=63 characters.
///
/// Returns the reason for rejection on failure. Shared with the `handle`
/// and `nsid` string formats.
pub fn validate_label(label: &str) -> Result<(), &'static str> {
    if label.is_empty() {
        return Err("must not be empty");
    }
    if label.len() > MAX_LABEL_LEN {
        return Err("must be at most 63 characters");
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err("must not start or end with a hyphen");
    }
    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err("must contain only ASCII letters, digits, and hyphens");
    }
    Ok(())
}

fn is_name_segment(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}
