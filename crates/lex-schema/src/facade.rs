//! # Validation Entry Points
//!
//! [`LexiconValidator`] bundles a registry with call-site options and
//! offers the convenience forms callers usually want: a boolean, a
//! path-keyed error map, a single-field check, or a `Result`.
//!
//! All entry points validate against the document's `main` definition
//! unless an identifier with a fragment says otherwise.

use std::sync::Arc;

use indexmap::IndexMap;
use lex_core::{Nsid, MAIN_DEF};
use serde_json::Value;
use thiserror::Error;

use crate::document::LexiconDoc;
use crate::registry::SchemaRegistry;
use crate::validate::{ValidationMode, ValidationOptions, ValidationOutcome, Validator, Violations};

/// Error returned by [`LexiconValidator::ensure_valid`] and
/// [`LexiconValidator::validate_id`].
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The value did not conform to the schema.
    #[error("validation failed against schema '{schema_id}':\n{violations}")]
    ValidationFailed {
        /// Identifier of the definition validated against.
        schema_id: String,
        /// Structured list of individual failures.
        violations: Violations,
    },

    /// The schema is not in the registry.
    #[error("schema '{schema_id}' is not registered")]
    SchemaNotFound {
        /// Identifier that was looked up.
        schema_id: String,
    },
}

/// Registry-backed validation with a fixed strictness.
#[derive(Clone)]
pub struct LexiconValidator {
    registry: Arc<dyn SchemaRegistry>,
    options: ValidationOptions,
}

impl std::fmt::Debug for LexiconValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexiconValidator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl LexiconValidator {
    /// Validate in the default (optimistic) mode.
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self {
            registry,
            options: ValidationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.options.mode = mode;
        self
    }

    pub fn options(&self) -> ValidationOptions {
        self.options
    }

    fn validator(&self) -> Validator<'_> {
        Validator::with_registry(self.options, self.registry.as_ref())
    }

    /// Full outcome against the document's `main` definition.
    pub fn outcome(&self, value: &Value, doc: &LexiconDoc) -> ValidationOutcome {
        self.validator().validate_definition(value, doc, MAIN_DEF)
    }

    /// Whether `value` conforms to `doc`.
    pub fn validate(&self, value: &Value, doc: &LexiconDoc) -> bool {
        self.outcome(value, doc).is_valid()
    }

    /// Failure messages grouped by path, in the order paths first failed.
    /// Empty when the value conforms.
    pub fn validate_with_errors(
        &self,
        value: &Value,
        doc: &LexiconDoc,
    ) -> IndexMap<String, Vec<String>> {
        let mut grouped: IndexMap<String, Vec<String>> = IndexMap::new();
        for error in self.outcome(value, doc).errors() {
            grouped
                .entry(error.path.clone())
                .or_default()
                .push(error.message.clone());
        }
        grouped
    }

    /// Whether `value` is acceptable for the field `field` of the
    /// document's main object. Unknown fields are never acceptable.
    pub fn validate_field(&self, value: &Value, field: &str, doc: &LexiconDoc) -> bool {
        let Some(object) = doc.main().and_then(|def| def.object()) else {
            return false;
        };
        let Some(node) = object.properties.get(field) else {
            return false;
        };
        if value.is_null() && object.accepts_null(field) {
            return true;
        }
        self.validator()
            .validate_in_document(value, node, doc)
            .is_valid()
    }

    /// `Ok(())` when `value` conforms to `doc`.
    ///
    /// # Errors
    ///
    /// [`SchemaValidationError::ValidationFailed`] listing every failure.
    pub fn ensure_valid(&self, value: &Value, doc: &LexiconDoc) -> Result<(), SchemaValidationError> {
        self.outcome(value, doc)
            .into_result()
            .map_err(|violations| SchemaValidationError::ValidationFailed {
                schema_id: doc.id.to_string(),
                violations,
            })
    }

    /// Look `id` up in the registry and validate against the definition it
    /// addresses.
    ///
    /// # Errors
    ///
    /// [`SchemaValidationError::SchemaNotFound`] when the document is not
    /// registered; otherwise as [`LexiconValidator::ensure_valid`].
    pub fn validate_id(&self, value: &Value, id: &Nsid) -> Result<(), SchemaValidationError> {
        let doc = self
            .registry
            .get(id)
            .ok_or_else(|| SchemaValidationError::SchemaNotFound {
                schema_id: id.to_string(),
            })?;
        tracing::debug!(schema = %id, mode = %self.options.mode, "validating");
        self.validator()
            .validate_definition(value, &doc, id.definition_name())
            .into_result()
            .map_err(|violations| SchemaValidationError::ValidationFailed {
                schema_id: id.to_string(),
                violations,
            })
    }
}
