//! # Union Resolution
//!
//! Maps a value's `$type` discriminator to a member of a union.
//!
//! Open unions are intentionally non-exhaustive: [`UnionResolver::resolve`]
//! returns `Ok(None)` for them without looking at the value. Closed unions
//! must name a listed member.
//!
//! References are compared after normalisation: a local `#name` member is
//! expanded against the enclosing document identifier (when the resolver
//! knows it) and `#main` suffixes are dropped on both sides.

use lex_core::{Nsid, MAIN_DEF};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::UnionType;

/// Discriminator key carried by union members.
pub const TYPE_KEY: &str = "$type";

/// A value could not be resolved to a member of a closed union.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnionError {
    /// The value carries no `$type`, or is not an object.
    #[error("missing $type discriminator")]
    MissingDiscriminator,

    /// `$type` is present but not a string.
    #[error("$type must be a string, found {found}")]
    InvalidDiscriminator {
        /// Kind of the value found.
        found: lex_core::ValueKind,
    },

    /// `$type` names a type that is not a member of the union.
    #[error("\"{discriminator}\" is not a member of the closed union")]
    UnknownMember {
        /// The discriminator found on the value.
        discriminator: String,
    },
}

/// Resolves discriminators against union members.
#[derive(Debug, Clone, Default)]
pub struct UnionResolver {
    base: Option<Nsid>,
}

impl UnionResolver {
    /// A resolver that compares references as written (apart from `#main`).
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver that expands local `#name` members against `base`.
    pub fn within(base: Nsid) -> Self {
        Self {
            base: Some(base.base()),
        }
    }

    /// Canonical form of a reference for comparison.
    pub fn normalize(&self, reference: &str) -> String {
        let (doc, fragment) = match reference.split_once('#') {
            Some((doc, fragment)) => (doc, Some(fragment).filter(|f| *f != MAIN_DEF)),
            None => (reference, None),
        };
        let doc = match (doc, &self.base) {
            ("", Some(base)) => base.to_string(),
            (doc, _) => doc.to_string(),
        };
        match fragment {
            Some(fragment) => format!("{doc}#{fragment}"),
            None => doc,
        }
    }

    /// The member a value belongs to.
    ///
    /// Returns `Ok(None)` for open unions. For closed unions returns the
    /// member reference as listed in `refs`.
    ///
    /// # Errors
    ///
    /// [`UnionError`] when a closed union's value carries no usable
    /// discriminator or names an unlisted member.
    pub fn resolve<'u>(
        &self,
        value: &Value,
        union: &'u UnionType,
    ) -> Result<Option<&'u str>, UnionError> {
        if !union.closed {
            return Ok(None);
        }
        let discriminator = discriminator(value)?;
        let wanted = self.normalize(discriminator);
        union
            .refs
            .iter()
            .find(|r| self.normalize(r) == wanted)
            .map(|r| Some(r.as_str()))
            .ok_or_else(|| UnionError::UnknownMember {
                discriminator: discriminator.to_string(),
            })
    }

    /// Whether `value` is the member `candidate`. Never fails: malformed
    /// input is simply not a match.
    ///
    /// For open unions the discriminator is compared with the candidate
    /// directly.
    pub fn matches(&self, value: &Value, candidate: &str, union: &UnionType) -> bool {
        let wanted = self.normalize(candidate);
        if union.closed {
            matches!(self.resolve(value, union), Ok(Some(member)) if self.normalize(member) == wanted)
        } else {
            discriminator(value).is_ok_and(|d| self.normalize(d) == wanted)
        }
    }

    /// A field map tagged as `reference`. Any existing `$type` is replaced
    /// and the discriminator always comes first.
    pub fn create_discriminated(reference: &str, fields: Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::with_capacity(fields.len() + 1);
        out.insert(TYPE_KEY.to_string(), Value::String(reference.to_string()));
        out.extend(fields.into_iter().filter(|(k, _)| k != TYPE_KEY));
        out
    }
}

/// The `$type` string of a value.
pub fn discriminator(value: &Value) -> Result<&str, UnionError> {
    match value.get(TYPE_KEY) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(UnionError::InvalidDiscriminator {
            found: lex_core::ValueKind::of(other),
        }),
        None => Err(UnionError::MissingDiscriminator),
    }
}
