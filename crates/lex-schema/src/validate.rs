//! # Validation
//!
//! Path-tracked structural validation of JSON values against type nodes.
//!
//! ## Paths
//!
//! Errors are located with `.field` for object members and `[index]` for
//! array elements, concatenated from the root: `items[2].author.handle`.
//! The root itself is the empty path.
//!
//! ## Check order
//!
//! For every value the type check runs first, and a mismatch reports the
//! value's own kind (`expected string, found integer`). Constraint checks
//! then run in a fixed order: const, enum, size or range, format. A value
//! stops at its first failing constraint unless
//! [`ValidationOptions::accumulate`] is set. Other fields are always
//! checked.
//!
//! ## References
//!
//! A `ref` node is transparent: the validator resolves it and validates the
//! same value, at the same path, against the target. Local references need
//! a document in scope ([`Validator::validate_in_document`]); external
//! references need a registry ([`Validator::with_registry`]). When no
//! resolution is available the reference accepts any value. Chains of
//! references are bounded by [`MAX_REF_HOPS`].

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use lex_core::{Nsid, RefTarget, ValueKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use unicode_segmentation::UnicodeSegmentation;

use crate::document::{Definition, LexiconDoc};
use crate::format;
use crate::registry::SchemaRegistry;
use crate::types::{
    ArrayType, BlobType, BooleanType, BytesType, IntegerType, ObjectType, StringType, TypeNode,
    UnionType,
};
use crate::union::UnionResolver;

/// Maximum number of consecutive reference hops before a value is rejected.
pub const MAX_REF_HOPS: usize = 32;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How strictly data is held to its schema. Chosen per call site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Undeclared object fields are errors; required fields and
    /// constraints are enforced.
    Strict,
    /// Undeclared fields are ignored; required fields and constraints are
    /// enforced.
    #[default]
    Optimistic,
    /// Only types are checked. Required fields and constraints are skipped.
    Lenient,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Optimistic => "optimistic",
            Self::Lenient => "lenient",
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "optimistic" => Ok(Self::Optimistic),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!(
                "unknown validation mode \"{other}\" (expected strict, optimistic, or lenient)"
            )),
        }
    }
}

/// Call-site validation settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    pub mode: ValidationMode,
    /// Keep checking a value's constraints after the first failure.
    pub accumulate: bool,
}

impl ValidationOptions {
    pub fn with_mode(mode: ValidationMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Location in the instance; empty for the root.
    pub path: String,
    /// What the schema expected at this location.
    pub expected: String,
    /// Human-readable description of the failure.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.path, self.message)
        }
    }
}

/// The result of validating one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    /// Failures in the order they were found.
    Invalid(Vec<ValidationError>),
}

impl ValidationOutcome {
    fn from_errors(errors: Vec<ValidationError>) -> Self {
        if errors.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(errors)
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn errors(&self) -> &[ValidationError] {
        match self {
            Self::Valid => &[],
            Self::Invalid(errors) => errors,
        }
    }

    pub fn into_result(self) -> Result<(), Violations> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid(errors) => Err(Violations::new(errors)),
        }
    }
}

/// Collection of validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations {
    errors: Vec<ValidationError>,
}

impl Violations {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    /// Returns the number of failures.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if there are no failures.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns a slice of all failures.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<ValidationError> {
        self.errors
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Validates values against type nodes.
///
/// Holds no per-call state; one validator can serve any number of
/// concurrent calls.
#[derive(Clone, Copy)]
pub struct Validator<'r> {
    options: ValidationOptions,
    registry: Option<&'r dyn SchemaRegistry>,
}

impl fmt::Debug for Validator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("options", &self.options)
            .field("registry", &self.registry.is_some())
            .finish()
    }
}

impl Default for Validator<'static> {
    fn default() -> Self {
        Self::new(ValidationOptions::default())
    }
}

impl Validator<'static> {
    /// A validator without cross-document reference resolution.
    pub fn new(options: ValidationOptions) -> Self {
        Self {
            options,
            registry: None,
        }
    }
}

impl<'r> Validator<'r> {
    /// A validator that resolves external references through `registry`.
    pub fn with_registry(options: ValidationOptions, registry: &'r dyn SchemaRegistry) -> Self {
        Self {
            options,
            registry: Some(registry),
        }
    }

    pub fn options(&self) -> ValidationOptions {
        self.options
    }

    /// Validate `value` against `node` from the root path.
    pub fn validate(&self, value: &Value, node: &TypeNode) -> ValidationOutcome {
        self.validate_at(value, node, "")
    }

    /// Validate `value` against `node`, reporting paths under `path`.
    pub fn validate_at(&self, value: &Value, node: &TypeNode, path: &str) -> ValidationOutcome {
        let mut walk = Walk::new(self);
        walk.node(value, node, path, None, 0);
        ValidationOutcome::from_errors(walk.errors)
    }

    /// Validate `value` against `node`, resolving local `#name` references
    /// within `doc`.
    pub fn validate_in_document(
        &self,
        value: &Value,
        node: &TypeNode,
        doc: &LexiconDoc,
    ) -> ValidationOutcome {
        let mut walk = Walk::new(self);
        walk.node(value, node, "", Some(doc), 0);
        ValidationOutcome::from_errors(walk.errors)
    }

    /// Validate `value` against the definition `name` of `doc`.
    ///
    /// Definitions without a data type (endpoints, tokens) and missing
    /// definitions fail with a root-level error.
    pub fn validate_definition(
        &self,
        value: &Value,
        doc: &LexiconDoc,
        name: &str,
    ) -> ValidationOutcome {
        let mut walk = Walk::new(self);
        match doc.def(name) {
            Some(def) => {
                let reference = doc
                    .id_of(name)
                    .map_or_else(|| format!("#{name}"), |id| id.to_string());
                walk.definition(value, def, &reference, "", doc, 0);
            }
            None => walk.push(
                "",
                "definition",
                format!("document {} has no definition named \"{name}\"", doc.id),
            ),
        }
        ValidationOutcome::from_errors(walk.errors)
    }
}

impl TypeNode {
    /// Validate `value` against this node with default options and no
    /// reference resolution.
    pub fn validate(&self, value: &Value, path: &str) -> Result<(), Vec<ValidationError>> {
        match Validator::default().validate_at(value, self, path) {
            ValidationOutcome::Valid => Ok(()),
            ValidationOutcome::Invalid(errors) => Err(errors),
        }
    }
}

/// Join an object member onto a path.
pub fn field_path(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

/// Join an array index onto a path.
pub fn index_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

/// State of one validation call.
struct Walk<'a, 'r> {
    validator: &'a Validator<'r>,
    errors: Vec<ValidationError>,
}

impl<'a, 'r> Walk<'a, 'r> {
    fn new(validator: &'a Validator<'r>) -> Self {
        Self {
            validator,
            errors: Vec::new(),
        }
    }

    fn mode(&self) -> ValidationMode {
        self.validator.options.mode
    }

    fn constraints(&self) -> bool {
        self.mode() != ValidationMode::Lenient
    }

    fn push(&mut self, path: &str, expected: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            path: path.to_string(),
            expected: expected.to_string(),
            message: message.into(),
        });
    }

    /// Record a constraint failure. Returns true when the current value's
    /// remaining constraints should be skipped.
    fn fail(&mut self, path: &str, expected: &str, message: impl Into<String>) -> bool {
        self.push(path, expected, message);
        !self.validator.options.accumulate
    }

    fn mismatch(&mut self, path: &str, expected: &str, value: &Value) {
        self.push(
            path,
            expected,
            format!("expected {expected}, found {}", ValueKind::of(value)),
        );
    }

    fn node(
        &mut self,
        value: &Value,
        node: &TypeNode,
        path: &str,
        scope: Option<&LexiconDoc>,
        hops: usize,
    ) {
        match node {
            TypeNode::Null(_) => {
                if !value.is_null() {
                    self.mismatch(path, "null", value);
                }
            }
            TypeNode::Boolean(t) => self.boolean(value, t, path),
            TypeNode::Integer(t) => self.integer(value, t, path),
            TypeNode::String(t) => self.string(value, t, path),
            TypeNode::Bytes(t) => self.bytes(value, t, path),
            TypeNode::CidLink(_) => self.cid_link(value, path),
            TypeNode::Blob(t) => self.blob(value, t, path),
            TypeNode::Array(t) => self.array(value, t, path, scope),
            TypeNode::Object(t) => self.object(value, t, path, scope),
            TypeNode::Ref(r) => self.follow(value, &r.reference, path, scope, hops + 1, true),
            TypeNode::Union(u) => self.union(value, u, path, scope, hops),
            TypeNode::Unknown(_) => {}
        }
    }

    fn boolean(&mut self, value: &Value, t: &BooleanType, path: &str) {
        let Some(b) = value.as_bool() else {
            return self.mismatch(path, "boolean", value);
        };
        if !self.constraints() {
            return;
        }
        if let Some(c) = t.const_value {
            if b != c {
                self.fail(path, "boolean", format!("must be {c}"));
            }
        }
    }

    fn integer(&mut self, value: &Value, t: &IntegerType, path: &str) {
        let n: i128 = match (value.as_i64(), value.as_u64()) {
            (Some(n), _) => i128::from(n),
            (None, Some(n)) => i128::from(n),
            _ => return self.mismatch(path, "integer", value),
        };
        if !self.constraints() {
            return;
        }
        if let Some(c) = t.const_value {
            if n != i128::from(c) && self.fail(path, "integer", format!("must be {c}")) {
                return;
            }
        }
        if let Some(allowed) = &t.enum_values {
            if !allowed.iter().any(|a| i128::from(*a) == n)
                && self.fail(path, "integer", format!("{n} is not one of {allowed:?}"))
            {
                return;
            }
        }
        if let Some(min) = t.minimum {
            if n < i128::from(min)
                && self.fail(path, "integer", format!("{n} is less than minimum {min}"))
            {
                return;
            }
        }
        if let Some(max) = t.maximum {
            if n > i128::from(max) {
                self.fail(path, "integer", format!("{n} is greater than maximum {max}"));
            }
        }
    }

    fn string(&mut self, value: &Value, t: &StringType, path: &str) {
        let Some(s) = value.as_str() else {
            return self.mismatch(path, "string", value);
        };
        if !self.constraints() {
            return;
        }
        if let Some(c) = &t.const_value {
            if s != c && self.fail(path, "string", format!("must be \"{c}\"")) {
                return;
            }
        }
        if let Some(allowed) = &t.enum_values {
            if !allowed.iter().any(|a| a == s)
                && self.fail(path, "string", format!("\"{s}\" is not one of {allowed:?}"))
            {
                return;
            }
        }

        let bytes = s.len() as u64;
        if let Some(min) = t.min_length {
            if bytes < min
                && self.fail(path, "string", format!("{bytes} bytes is shorter than minLength {min}"))
            {
                return;
            }
        }
        if let Some(max) = t.max_length {
            if bytes > max
                && self.fail(path, "string", format!("{bytes} bytes is longer than maxLength {max}"))
            {
                return;
            }
        }
        if t.min_graphemes.is_some() || t.max_graphemes.is_some() {
            let graphemes = s.graphemes(true).count() as u64;
            if let Some(min) = t.min_graphemes {
                if graphemes < min
                    && self.fail(
                        path,
                        "string",
                        format!("{graphemes} graphemes is fewer than minGraphemes {min}"),
                    )
                {
                    return;
                }
            }
            if let Some(max) = t.max_graphemes {
                if graphemes > max
                    && self.fail(
                        path,
                        "string",
                        format!("{graphemes} graphemes is more than maxGraphemes {max}"),
                    )
                {
                    return;
                }
            }
        }

        if let Some(fmt) = &t.format {
            if format::check(fmt, s) == Some(false) {
                self.fail(path, "string", format!("\"{s}\" is not a valid {fmt}"));
            }
        }
    }

    fn bytes(&mut self, value: &Value, t: &BytesType, path: &str) {
        let encoded = match value {
            Value::String(s) => s.as_str(),
            Value::Object(map) => match map.get("$bytes").and_then(Value::as_str) {
                Some(s) => s,
                None => return self.push(path, "bytes", "expected a {\"$bytes\": ...} object"),
            },
            other => return self.mismatch(path, "bytes", other),
        };
        let decoded = match STANDARD
            .decode(encoded)
            .or_else(|_| STANDARD_NO_PAD.decode(encoded))
        {
            Ok(decoded) => decoded,
            Err(e) => return self.push(path, "bytes", format!("invalid base64: {e}")),
        };
        if !self.constraints() {
            return;
        }
        let len = decoded.len() as u64;
        if let Some(min) = t.min_length {
            if len < min
                && self.fail(path, "bytes", format!("{len} bytes is shorter than minLength {min}"))
            {
                return;
            }
        }
        if let Some(max) = t.max_length {
            if len > max {
                self.fail(path, "bytes", format!("{len} bytes is longer than maxLength {max}"));
            }
        }
    }

    fn cid_link(&mut self, value: &Value, path: &str) {
        let Value::Object(map) = value else {
            return self.mismatch(path, "cid-link", value);
        };
        match map.get("$link").and_then(Value::as_str) {
            Some(link) if format::is_cid(link) => {}
            Some(link) => self.push(path, "cid-link", format!("\"{link}\" is not a valid cid")),
            None => self.push(path, "cid-link", "expected a {\"$link\": ...} object"),
        }
    }

    fn blob(&mut self, value: &Value, t: &BlobType, path: &str) {
        let Value::Object(map) = value else {
            return self.mismatch(path, "blob", value);
        };
        if map.get("$type").and_then(Value::as_str) != Some("blob") {
            return self.push(path, "blob", "blob must carry $type \"blob\"");
        }
        let has_ref = map
            .get("ref")
            .and_then(|r| r.get("$link"))
            .and_then(Value::as_str)
            .is_some_and(format::is_cid);
        if !has_ref {
            return self.push(path, "blob", "blob ref must be a cid link");
        }
        let Some(mime) = map.get("mimeType").and_then(Value::as_str) else {
            return self.push(path, "blob", "blob is missing string mimeType");
        };
        let Some(size) = map.get("size").and_then(Value::as_u64) else {
            return self.push(path, "blob", "blob is missing integer size");
        };
        if !self.constraints() {
            return;
        }
        if let Some(accept) = &t.accept {
            if !accept.iter().any(|pattern| mime_matches(pattern, mime))
                && self.fail(path, "blob", format!("mimeType \"{mime}\" is not accepted"))
            {
                return;
            }
        }
        if let Some(max) = t.max_size {
            if size > max {
                self.fail(path, "blob", format!("size {size} exceeds maxSize {max}"));
            }
        }
    }

    fn array(&mut self, value: &Value, t: &ArrayType, path: &str, scope: Option<&LexiconDoc>) {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(map) if is_index_keyed(map) => {
                return self.push(path, "array", "expected array, found sparse or associative sequence");
            }
            other => return self.mismatch(path, "array", other),
        };
        if self.constraints() {
            let len = items.len() as u64;
            if let Some(min) = t.min_length {
                if len < min {
                    self.push(path, "array", format!("{len} elements is fewer than minLength {min}"));
                }
            }
            if let Some(max) = t.max_length {
                if len > max {
                    self.push(path, "array", format!("{len} elements is more than maxLength {max}"));
                }
            }
        }
        if let Some(item_type) = &t.items {
            for (i, item) in items.iter().enumerate() {
                self.node(item, item_type, &index_path(path, i), scope, 0);
            }
        }
    }

    fn object(&mut self, value: &Value, t: &ObjectType, path: &str, scope: Option<&LexiconDoc>) {
        let Value::Object(map) = value else {
            return self.mismatch(path, "object", value);
        };

        if self.constraints() {
            for field in &t.required {
                if !map.contains_key(field) {
                    let expected = t.properties.get(field).map_or("value", TypeNode::kind);
                    self.push(&field_path(path, field), expected, "required field is missing");
                }
            }
        }

        for (field, node) in &t.properties {
            let Some(v) = map.get(field) else {
                continue;
            };
            if v.is_null() && t.accepts_null(field) {
                continue;
            }
            self.node(v, node, &field_path(path, field), scope, 0);
        }

        if self.mode() == ValidationMode::Strict {
            for key in map.keys() {
                if key != "$type" && !t.properties.contains_key(key) {
                    self.push(&field_path(path, key), "no field", "field is not declared by the schema");
                }
            }
        }
    }

    fn union(
        &mut self,
        value: &Value,
        u: &UnionType,
        path: &str,
        scope: Option<&LexiconDoc>,
        hops: usize,
    ) {
        let Value::Object(map) = value else {
            return self.mismatch(path, "union", value);
        };
        let discriminator = match map.get("$type") {
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                return self.push(
                    path,
                    "union",
                    format!("$type must be a string, found {}", ValueKind::of(other)),
                )
            }
            None => return self.push(path, "union", "missing $type discriminator"),
        };

        let resolver = match scope {
            Some(doc) => UnionResolver::within(doc.id.clone()),
            None => UnionResolver::new(),
        };
        let member = u
            .refs
            .iter()
            .find(|r| resolver.normalize(r) == resolver.normalize(discriminator));

        match member {
            Some(reference) => {
                self.follow(value, reference, path, scope, hops + 1, u.closed);
            }
            None if u.closed => self.push(
                path,
                "union",
                format!("\"{discriminator}\" is not a member of the closed union"),
            ),
            None => {
                tracing::debug!(path, discriminator, "open union member not listed, accepting");
            }
        }
    }

    /// Resolve `reference` and validate `value` against its target.
    fn follow(
        &mut self,
        value: &Value,
        reference: &str,
        path: &str,
        scope: Option<&LexiconDoc>,
        hops: usize,
        report_missing: bool,
    ) {
        if hops > MAX_REF_HOPS {
            return self.push(
                path,
                reference,
                format!("reference chain exceeds {MAX_REF_HOPS} hops at {reference}"),
            );
        }
        let target = match RefTarget::parse(reference) {
            Ok(target) => target,
            Err(e) => return self.push(path, reference, format!("unresolvable reference: {e}")),
        };

        let local_name = match (&target, scope) {
            (RefTarget::Local(name), Some(_)) => Some(name.clone()),
            (RefTarget::External(id), Some(doc)) if id.base() == doc.id => {
                Some(id.definition_name().to_string())
            }
            _ => None,
        };

        if let (Some(name), Some(doc)) = (local_name, scope) {
            match doc.def(&name) {
                Some(def) => self.definition(value, def, reference, path, doc, hops),
                None if report_missing => self.push(
                    path,
                    reference,
                    format!("reference {reference} names no definition in {}", doc.id),
                ),
                None => {}
            }
            return;
        }

        let id: Nsid = match target {
            RefTarget::External(id) => id,
            RefTarget::Local(_) => {
                tracing::debug!(path, reference, "no document in scope, local reference accepted");
                return;
            }
        };
        let Some(registry) = self.validator.registry else {
            tracing::debug!(path, reference, "no registry, external reference accepted");
            return;
        };
        let Some(doc) = registry.get(&id) else {
            if report_missing {
                self.push(path, reference, format!("schema {} is not registered", id.base()));
            }
            return;
        };
        match doc.def(id.definition_name()) {
            Some(def) => {
                tracing::debug!(path, reference, "resolved external reference");
                self.definition(value, def, reference, path, &doc, hops);
            }
            None if report_missing => self.push(
                path,
                reference,
                format!("reference {reference} names no definition in {}", doc.id),
            ),
            None => {}
        }
    }

    fn definition(
        &mut self,
        value: &Value,
        def: &Definition,
        reference: &str,
        path: &str,
        scope: &LexiconDoc,
        hops: usize,
    ) {
        match def {
            Definition::Record { record, .. } => self.object(value, record, path, Some(scope)),
            Definition::Data(node) => self.node(value, node, path, Some(scope), hops),
            other => self.push(
                path,
                other.kind(),
                format!("{reference} is a {} and carries no data type", other.kind()),
            ),
        }
    }
}

/// An object whose keys are all decimal indices: an array serialised as a
/// map.
fn is_index_keyed(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map
            .keys()
            .all(|k| !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()))
}

/// Match a MIME type against an exact (`image/png`) or wildcard (`image/*`,
/// `*/*`) pattern.
pub fn mime_matches(pattern: &str, mime: &str) -> bool {
    if pattern == "*/*" {
        return true;
    }
    match pattern.strip_suffix("/*") {
        Some(major) => mime
            .split_once('/')
            .is_some_and(|(m, _)| m.eq_ignore_ascii_case(major)),
        None => pattern.eq_ignore_ascii_case(mime),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;
    use serde_json::json;

    fn node(raw: Value) -> TypeNode {
        TypeNode::parse_tree(&raw).unwrap()
    }

    fn errors(outcome: ValidationOutcome) -> Vec<ValidationError> {
        match outcome {
            ValidationOutcome::Valid => Vec::new(),
            ValidationOutcome::Invalid(errors) => errors,
        }
    }

    fn paths(outcome: ValidationOutcome) -> Vec<String> {
        errors(outcome).into_iter().map(|e| e.path).collect()
    }

    #[test]
    fn test_type_mismatch_reports_value_kind() {
        let t = node(json!({"type": "string"}));
        let errs = errors(Validator::default().validate(&json!(42), &t));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "");
        assert_eq!(errs[0].expected, "string");
        assert_eq!(errs[0].message, "expected string, found integer");
    }

    #[test]
    fn test_grapheme_and_byte_lengths_diverge() {
        let emoji = "\u{1F600}".repeat(6);
        assert_eq!(emoji.len(), 24);
        let v = json!(emoji);

        let by_bytes = node(json!({"type": "string", "maxLength": 10}));
        assert!(!Validator::default().validate(&v, &by_bytes).is_valid());

        let by_graphemes = node(json!({"type": "string", "maxGraphemes": 10}));
        assert!(Validator::default().validate(&v, &by_graphemes).is_valid());

        let both = node(json!({"type": "string", "maxLength": 30, "maxGraphemes": 5}));
        let errs = errors(Validator::default().validate(&v, &both));
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("6 graphemes"), "{}", errs[0].message);
    }

    #[test]
    fn test_constraints_fail_fast_per_field() {
        let t = node(json!({"type": "string", "enum": ["a", "bb"], "maxLength": 1}));
        let v = json!("ccc");
        assert_eq!(errors(Validator::default().validate(&v, &t)).len(), 1);

        let accumulate = ValidationOptions {
            accumulate: true,
            ..ValidationOptions::default()
        };
        let errs = errors(Validator::new(accumulate).validate(&v, &t));
        assert_eq!(errs.len(), 2);
        assert!(errs[0].message.contains("not one of"), "enum runs before length");
    }

    #[test]
    fn test_integer_constraints() {
        let t = node(json!({"type": "integer", "minimum": 1, "maximum": 10, "enum": [2, 4, 12]}));
        let v = Validator::default();
        assert!(v.validate(&json!(4), &t).is_valid());
        assert!(!v.validate(&json!(3), &t).is_valid(), "not in enum");
        assert!(!v.validate(&json!(12), &t).is_valid(), "above maximum");
        assert!(!v.validate(&json!(4.5), &t).is_valid(), "float is not an integer");
        assert!(!v.validate(&json!(u64::MAX), &t).is_valid());

        let pinned = node(json!({"type": "integer", "const": 7}));
        assert!(v.validate(&json!(7), &pinned).is_valid());
        assert!(!v.validate(&json!(8), &pinned).is_valid());
    }

    #[test]
    fn test_boolean_const() {
        let t = node(json!({"type": "boolean", "const": true}));
        assert!(Validator::default().validate(&json!(true), &t).is_valid());
        assert!(!Validator::default().validate(&json!(false), &t).is_valid());
    }

    #[test]
    fn test_string_formats_and_unknown_format() {
        let t = node(json!({"type": "string", "format": "datetime"}));
        assert!(Validator::default().validate(&json!("2024-01-15T10:30:00Z"), &t).is_valid());
        let errs = errors(Validator::default().validate(&json!("soon"), &t));
        assert_eq!(errs[0].message, "\"soon\" is not a valid datetime");

        let future = node(json!({"type": "string", "format": "record-key"}));
        assert!(Validator::default().validate(&json!("anything"), &future).is_valid());
    }

    #[test]
    fn test_object_required() {
        let t = node(json!({
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string"}}
        }));
        let v = Validator::default();

        let errs = errors(v.validate(&json!({}), &t));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "name");

        let errs = errors(v.validate(&json!({"name": 123}), &t));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "name");
        assert_eq!(errs[0].message, "expected string, found integer");

        assert!(v.validate(&json!({"name": "ok"}), &t).is_valid());
    }

    #[test]
    fn test_nullable_fields() {
        let t = node(json!({
            "type": "object",
            "required": ["a"],
            "nullable": ["a"],
            "properties": {"a": {"type": "string"}, "b": {"type": "string"}}
        }));
        let v = Validator::default();
        assert!(v.validate(&json!({"a": null}), &t).is_valid());
        assert_eq!(paths(v.validate(&json!({"a": "x", "b": null}), &t)), vec!["b"]);
    }

    #[test]
    fn test_modes() {
        let t = node(json!({
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string", "maxLength": 3}}
        }));
        let extra = json!({"name": "abc", "extra": 1, "$type": "x.y.z"});

        let optimistic = Validator::default();
        assert!(optimistic.validate(&extra, &t).is_valid());

        let strict = Validator::new(ValidationOptions::with_mode(ValidationMode::Strict));
        assert_eq!(paths(strict.validate(&extra, &t)), vec!["extra"]);

        let lenient = Validator::new(ValidationOptions::with_mode(ValidationMode::Lenient));
        assert!(lenient.validate(&json!({}), &t).is_valid());
        assert!(lenient.validate(&json!({"name": "too long"}), &t).is_valid());
        assert!(!lenient.validate(&json!({"name": 5}), &t).is_valid(), "types still checked");
    }

    #[test]
    fn test_array_items_path() {
        let t = node(json!({"type": "array", "items": {"type": "string"}}));
        let errs = errors(Validator::default().validate(&json!(["a", 123, "c"]), &t));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "[1]");
    }

    #[test]
    fn test_array_sparse_and_length() {
        let t = node(json!({"type": "array", "items": {"type": "string"}, "maxLength": 2}));
        let v = Validator::default();
        let errs = errors(v.validate(&json!({"0": "a", "2": "b"}), &t));
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("sparse"));
        assert!(!v.validate(&json!(["a", "b", "c"]), &t).is_valid());
        assert!(!v.validate(&json!({"a": 1}), &t).is_valid());
    }

    #[test]
    fn test_nested_paths() {
        let t = node(json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "author": {
                                "type": "object",
                                "properties": {"handle": {"type": "string", "format": "handle"}}
                            }
                        }
                    }
                }
            }
        }));
        let v = json!({"items": [{}, {}, {"author": {"handle": "nope"}}]});
        assert_eq!(
            paths(Validator::default().validate(&v, &t)),
            vec!["items[2].author.handle"]
        );
    }

    #[test]
    fn test_bytes_forms() {
        let t = node(json!({"type": "bytes", "maxLength": 4}));
        let v = Validator::default();
        assert!(v.validate(&json!("AQID"), &t).is_valid(), "padded, 3 bytes");
        assert!(v.validate(&json!("AQIDBA"), &t).is_valid(), "unpadded, 4 bytes");
        assert!(v.validate(&json!({"$bytes": "AQID"}), &t).is_valid());
        assert!(!v.validate(&json!("AQIDBAU="), &t).is_valid(), "5 bytes decoded");
        assert!(!v.validate(&json!("***"), &t).is_valid());
        assert!(!v.validate(&json!(12), &t).is_valid());
    }

    #[test]
    fn test_cid_link_and_blob() {
        let v = Validator::default();
        let cid = "bafkreibme22gw2h7y2h7tg2fhqotaqjucnbc24deqo72b6mkl2egezxhvy";

        let link = node(json!({"type": "cid-link"}));
        assert!(v.validate(&json!({"$link": cid}), &link).is_valid());
        assert!(!v.validate(&json!(cid), &link).is_valid());

        let blob = node(json!({"type": "blob", "accept": ["image/*"], "maxSize": 1000}));
        let ok = json!({"$type": "blob", "ref": {"$link": cid}, "mimeType": "image/png", "size": 900});
        assert!(v.validate(&ok, &blob).is_valid());

        let wrong_mime = json!({"$type": "blob", "ref": {"$link": cid}, "mimeType": "video/mp4", "size": 10});
        assert!(!v.validate(&wrong_mime, &blob).is_valid());

        let too_big = json!({"$type": "blob", "ref": {"$link": cid}, "mimeType": "image/png", "size": 5000});
        assert!(!v.validate(&too_big, &blob).is_valid());

        let untyped = json!({"ref": {"$link": cid}, "mimeType": "image/png", "size": 1});
        assert!(!v.validate(&untyped, &blob).is_valid());
    }

    #[test]
    fn test_mime_matches() {
        assert!(mime_matches("*/*", "application/json"));
        assert!(mime_matches("image/*", "image/jpeg"));
        assert!(mime_matches("image/png", "image/png"));
        assert!(!mime_matches("image/png", "image/jpeg"));
        assert!(!mime_matches("image/*", "video/mp4"));
    }

    #[test]
    fn test_bare_ref_accepts_anything() {
        let t = node(json!({"type": "ref", "ref": "a.b.c"}));
        assert!(Validator::default().validate(&json!(42), &t).is_valid());
    }

    fn feed_doc() -> LexiconDoc {
        LexiconDoc::from_value(&json!({
            "lexicon": 1,
            "id": "a.b.feed",
            "defs": {
                "main": {
                    "type": "object",
                    "required": ["reply"],
                    "properties": {
                        "reply": {"type": "ref", "ref": "#replyRef"},
                        "embed": {"type": "union", "refs": ["#image", "a.b.link"], "closed": true}
                    }
                },
                "replyRef": {
                    "type": "object",
                    "required": ["uri"],
                    "properties": {"uri": {"type": "string", "format": "at-uri"}}
                },
                "image": {
                    "type": "object",
                    "required": ["alt"],
                    "properties": {"alt": {"type": "string"}}
                },
                "loop": {"type": "ref", "ref": "#loop"},
                "endpoint": {"type": "token"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_local_ref_resolution() {
        let doc = feed_doc();
        let v = Validator::default();
        let ok = json!({"reply": {"uri": "at://did:plc:x/post/1"}});
        assert!(v.validate_definition(&ok, &doc, "main").is_valid());

        let bad = json!({"reply": {"uri": "https://x"}});
        assert_eq!(paths(v.validate_definition(&bad, &doc, "main")), vec!["reply.uri"]);
    }

    #[test]
    fn test_union_members_validated() {
        let doc = feed_doc();
        let v = Validator::default();
        let good = json!({"reply": {"uri": "at://x"}, "embed": {"$type": "a.b.feed#image", "alt": "hi"}});
        assert!(v.validate_definition(&good, &doc, "main").is_valid());

        let missing_alt = json!({"reply": {"uri": "at://x"}, "embed": {"$type": "a.b.feed#image"}});
        assert_eq!(paths(v.validate_definition(&missing_alt, &doc, "main")), vec!["embed.alt"]);

        let not_member = json!({"reply": {"uri": "at://x"}, "embed": {"$type": "a.b.other"}});
        assert_eq!(paths(v.validate_definition(&not_member, &doc, "main")), vec!["embed"]);

        let no_type = json!({"reply": {"uri": "at://x"}, "embed": {"alt": "hi"}});
        let errs = errors(v.validate_definition(&no_type, &doc, "main"));
        assert_eq!(errs[0].message, "missing $type discriminator");
    }

    #[test]
    fn test_external_member_needs_registry() {
        let doc = feed_doc();
        let value = json!({"reply": {"uri": "at://x"}, "embed": {"$type": "a.b.link", "url": 5}});

        assert!(
            Validator::default().validate_definition(&value, &doc, "main").is_valid(),
            "no registry: member accepted"
        );

        let registry = MemoryRegistry::new();
        registry.register(
            LexiconDoc::from_value(&json!({
                "lexicon": 1,
                "id": "a.b.link",
                "defs": {"main": {"type": "object", "properties": {"url": {"type": "string", "format": "uri"}}}}
            }))
            .unwrap(),
        );
        let v = Validator::with_registry(ValidationOptions::default(), &registry);
        assert_eq!(paths(v.validate_definition(&value, &doc, "main")), vec!["embed.url"]);

        let empty = MemoryRegistry::new();
        let v = Validator::with_registry(ValidationOptions::default(), &empty);
        let errs = errors(v.validate_definition(&value, &doc, "main"));
        assert!(errs[0].message.contains("not registered"), "{}", errs[0].message);
    }

    #[test]
    fn test_open_union_accepts_unlisted() {
        let t = node(json!({"type": "union", "refs": ["a.b.c"]}));
        let v = Validator::default();
        assert!(v.validate(&json!({"$type": "x.y.z"}), &t).is_valid());
        assert!(!v.validate(&json!({"$type": 1}), &t).is_valid());
        assert!(!v.validate(&json!("a.b.c"), &t).is_valid());
    }

    #[test]
    fn test_reference_cycle_bounded() {
        let doc = feed_doc();
        let errs = errors(Validator::default().validate_definition(&json!(1), &doc, "loop"));
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("exceeds 32 hops"), "{}", errs[0].message);
    }

    #[test]
    fn test_definition_without_data_type() {
        let doc = feed_doc();
        let errs = errors(Validator::default().validate_definition(&json!({}), &doc, "endpoint"));
        assert_eq!(errs[0].path, "");
        assert!(errs[0].message.contains("token"));

        let errs = errors(Validator::default().validate_definition(&json!({}), &doc, "nope"));
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn test_type_node_validate() {
        let t = node(json!({"type": "integer", "maximum": 3}));
        assert!(t.validate(&json!(2), "count").is_ok());
        let errs = t.validate(&json!(5), "count").unwrap_err();
        assert_eq!(errs[0].path, "count");
    }

    #[test]
    fn test_mode_parse_and_display() {
        assert_eq!("Strict".parse::<ValidationMode>().unwrap(), ValidationMode::Strict);
        assert_eq!(ValidationMode::default(), ValidationMode::Optimistic);
        assert!("loose".parse::<ValidationMode>().is_err());
        assert_eq!(ValidationMode::Lenient.to_string(), "lenient");
    }

    #[test]
    fn test_violations_display() {
        let violations = Violations::new(vec![
            ValidationError {
                path: String::new(),
                expected: "object".into(),
                message: "expected object, found string".into(),
            },
            ValidationError {
                path: "a.b".into(),
                expected: "string".into(),
                message: "required field is missing".into(),
            },
        ]);
        assert_eq!(
            violations.to_string(),
            "  (root): expected object, found string\n  a.b: required field is missing"
        );
    }
}
