//! # Type Node Model
//!
//! The closed set of field-level schema variants. Each variant is its own
//! struct carrying the constraints that apply to it; [`TypeNode`] is the
//! tagged union over all of them, so validation and type mapping are
//! exhaustive `match`es that fail to compile when a variant is added.
//!
//! ## Structural form
//!
//! Every node round-trips to and from the generic JSON form found in schema
//! documents (`{"type": "string", "maxLength": 300}`). Parsing tolerates
//! unknown keys so that documents written for a newer dialect still load,
//! but a missing *required* key (a `ref` without `ref`, a `union` without
//! `refs`) is a [`ParseError`].
//!
//! ## Two-pass construction
//!
//! [`TypeNode::from_value`] is shallow: arrays come back without `items`
//! and objects without `properties`. Children are attached afterwards with
//! [`ArrayType::with_items`] / [`ObjectType::with_properties`], each of which
//! returns a new node and leaves the original untouched.
//! [`TypeNode::parse_tree`] runs both passes for a single subtree.

use std::fmt;

use indexmap::IndexMap;
use lex_core::ValueKind;
use serde_json::{Map, Value};

use crate::error::ParseError;

/// Tags that name primary definitions rather than field types.
pub(crate) const DEFINITION_TAGS: &[&str] =
    &["record", "query", "procedure", "subscription", "token"];

// ---------------------------------------------------------------------------
// String formats
// ---------------------------------------------------------------------------

/// The `format` of a string field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StringFormat {
    Datetime,
    Uri,
    AtUri,
    Did,
    Handle,
    AtIdentifier,
    Nsid,
    Cid,
    Language,
    /// A format this validator does not understand. Kept so documents
    /// round-trip; skipped during validation.
    Other(String),
}

impl StringFormat {
    /// Parse a format name. Never fails: unknown names become [`StringFormat::Other`].
    pub fn parse(name: &str) -> Self {
        match name {
            "datetime" => Self::Datetime,
            "uri" => Self::Uri,
            "at-uri" => Self::AtUri,
            "did" => Self::Did,
            "handle" => Self::Handle,
            "at-identifier" => Self::AtIdentifier,
            "nsid" => Self::Nsid,
            "cid" => Self::Cid,
            "language" => Self::Language,
            other => Self::Other(other.to_string()),
        }
    }

    /// The format name as written in schema documents.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Datetime => "datetime",
            Self::Uri => "uri",
            Self::AtUri => "at-uri",
            Self::Did => "did",
            Self::Handle => "handle",
            Self::AtIdentifier => "at-identifier",
            Self::Nsid => "nsid",
            Self::Cid => "cid",
            Self::Language => "language",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for StringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// Exactly `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullType {
    pub description: Option<String>,
}

/// A boolean, optionally pinned by `const`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BooleanType {
    pub description: Option<String>,
    pub default: Option<bool>,
    pub const_value: Option<bool>,
}

/// A signed integer with optional range, enumeration, and `const`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegerType {
    pub description: Option<String>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
    pub enum_values: Option<Vec<i64>>,
    pub const_value: Option<i64>,
    pub default: Option<i64>,
}

/// A UTF-8 string.
///
/// `min_length`/`max_length` count encoded bytes; `min_graphemes` /
/// `max_graphemes` count user-perceived characters. `known_values` is
/// documentation only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringType {
    pub description: Option<String>,
    pub format: Option<StringFormat>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_graphemes: Option<u64>,
    pub max_graphemes: Option<u64>,
    pub enum_values: Option<Vec<String>>,
    pub const_value: Option<String>,
    pub known_values: Option<Vec<String>>,
    pub default: Option<String>,
}

/// Base64-encoded bytes. Length bounds apply to the decoded bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BytesType {
    pub description: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
}

/// A content-identifier link (`{"$link": "..."}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CidLinkType {
    pub description: Option<String>,
}

/// A reference to stored binary content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobType {
    pub description: Option<String>,
    /// Exact (`image/png`) or wildcard (`image/*`, `*/*`) MIME patterns.
    pub accept: Option<Vec<String>>,
    pub max_size: Option<u64>,
}

/// A dense sequence, optionally typed by `items`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrayType {
    pub description: Option<String>,
    pub items: Option<Box<TypeNode>>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
}

/// A structured object with declared properties.
///
/// Undeclared fields are permitted unless a validator runs in strict mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectType {
    pub description: Option<String>,
    pub required: Vec<String>,
    /// Fields that may hold `null` in place of their declared type.
    pub nullable: Vec<String>,
    pub properties: IndexMap<String, TypeNode>,
}

/// A reference to another definition, local (`#name`) or external.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefType {
    pub description: Option<String>,
    pub reference: String,
}

/// A `$type`-discriminated union over referenced definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnionType {
    pub description: Option<String>,
    pub refs: Vec<String>,
    /// Closed unions accept only listed members; open unions accept any `$type`.
    pub closed: bool,
}

/// Any value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownType {
    pub description: Option<String>,
}

/// A field-level schema node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode {
    Null(NullType),
    Boolean(BooleanType),
    Integer(IntegerType),
    String(StringType),
    Bytes(BytesType),
    CidLink(CidLinkType),
    Blob(BlobType),
    Array(ArrayType),
    Object(ObjectType),
    Ref(RefType),
    Union(UnionType),
    Unknown(UnknownType),
}

// ---------------------------------------------------------------------------
// Structural field access
// ---------------------------------------------------------------------------

/// Typed accessors over the keys of one structural node.
pub(crate) struct Fields<'a> {
    map: &'a Map<String, Value>,
    variant: &'static str,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(value: &'a Value, variant: &'static str) -> Result<Self, ParseError> {
        match value {
            Value::Object(map) => Ok(Self { map, variant }),
            other => Err(ParseError::NotAnObject {
                location: String::new(),
                found: ValueKind::of(other),
            }),
        }
    }

    fn invalid(&self, key: &'static str, reason: impl Into<String>) -> ParseError {
        ParseError::InvalidKey {
            location: String::new(),
            variant: self.variant,
            key,
            reason: reason.into(),
        }
    }

    fn expected(&self, key: &'static str, what: &str, found: &Value) -> ParseError {
        self.invalid(key, format!("must be {what}, found {}", ValueKind::of(found)))
    }

    pub(crate) fn raw(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key)
    }

    pub(crate) fn description(&self) -> Result<Option<String>, ParseError> {
        self.opt_str("description")
    }

    pub(crate) fn opt_str(&self, key: &'static str) -> Result<Option<String>, ParseError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.expected(key, "a string", other)),
        }
    }

    pub(crate) fn req_str(&self, key: &'static str) -> Result<String, ParseError> {
        self.opt_str(key)?.ok_or(ParseError::MissingKey {
            location: String::new(),
            variant: self.variant,
            key,
        })
    }

    pub(crate) fn opt_bool(&self, key: &'static str) -> Result<Option<bool>, ParseError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.expected(key, "a boolean", other)),
        }
    }

    pub(crate) fn opt_i64(&self, key: &'static str) -> Result<Option<i64>, ParseError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.expected(key, "an integer", v)),
        }
    }

    pub(crate) fn opt_u64(&self, key: &'static str) -> Result<Option<u64>, ParseError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.expected(key, "a non-negative integer", v)),
        }
    }

    pub(crate) fn opt_str_list(&self, key: &'static str) -> Result<Option<Vec<String>>, ParseError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(self.expected(key, "a list of strings", other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(other) => Err(self.expected(key, "a list of strings", other)),
        }
    }

    pub(crate) fn opt_i64_list(&self, key: &'static str) -> Result<Option<Vec<i64>>, ParseError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_i64()
                        .ok_or_else(|| self.expected(key, "a list of integers", item))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(other) => Err(self.expected(key, "a list of integers", other)),
        }
    }
}

/// Builder for the structural form of a node. Keys with `None` values are
/// omitted.
pub(crate) struct Emit(Map<String, Value>);

impl Emit {
    pub(crate) fn new(tag: &str, description: &Option<String>) -> Self {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(tag.to_string()));
        let mut emit = Self(map);
        emit.opt("description", description.clone());
        emit
    }

    pub(crate) fn opt<T: Into<Value>>(&mut self, key: &str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.0.insert(key.to_string(), v.into());
        }
        self
    }

    pub(crate) fn list(&mut self, key: &str, values: &[String]) -> &mut Self {
        if !values.is_empty() {
            self.0.insert(key.to_string(), Value::from(values.to_vec()));
        }
        self
    }

    pub(crate) fn set(&mut self, key: &str, value: Value) -> &mut Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub(crate) fn finish(&mut self) -> Value {
        Value::Object(std::mem::take(&mut self.0))
    }
}

// ---------------------------------------------------------------------------
// Per-variant parse / emit
// ---------------------------------------------------------------------------

impl NullType {
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "null")?;
        Ok(Self {
            description: f.description()?,
        })
    }

    pub fn to_value(&self) -> Value {
        Emit::new("null", &self.description).finish()
    }
}

impl BooleanType {
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "boolean")?;
        Ok(Self {
            description: f.description()?,
            default: f.opt_bool("default")?,
            const_value: f.opt_bool("const")?,
        })
    }

    pub fn to_value(&self) -> Value {
        Emit::new("boolean", &self.description)
            .opt("default", self.default)
            .opt("const", self.const_value)
            .finish()
    }
}

impl IntegerType {
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "integer")?;
        let parsed = Self {
            description: f.description()?,
            minimum: f.opt_i64("minimum")?,
            maximum: f.opt_i64("maximum")?,
            enum_values: f.opt_i64_list("enum")?,
            const_value: f.opt_i64("const")?,
            default: f.opt_i64("default")?,
        };
        if let (Some(min), Some(max)) = (parsed.minimum, parsed.maximum) {
            if min > max {
                return Err(f.invalid("minimum", format!("{min} exceeds maximum {max}")));
            }
        }
        Ok(parsed)
    }

    pub fn to_value(&self) -> Value {
        Emit::new("integer", &self.description)
            .opt("minimum", self.minimum)
            .opt("maximum", self.maximum)
            .opt("enum", self.enum_values.clone())
            .opt("const", self.const_value)
            .opt("default", self.default)
            .finish()
    }
}

impl StringType {
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "string")?;
        Ok(Self {
            description: f.description()?,
            format: f.opt_str("format")?.as_deref().map(StringFormat::parse),
            min_length: f.opt_u64("minLength")?,
            max_length: f.opt_u64("maxLength")?,
            min_graphemes: f.opt_u64("minGraphemes")?,
            max_graphemes: f.opt_u64("maxGraphemes")?,
            enum_values: f.opt_str_list("enum")?,
            const_value: f.opt_str("const")?,
            known_values: f.opt_str_list("knownValues")?,
            default: f.opt_str("default")?,
        })
    }

    pub fn to_value(&self) -> Value {
        Emit::new("string", &self.description)
            .opt("format", self.format.as_ref().map(|fmt| fmt.as_str().to_string()))
            .opt("minLength", self.min_length)
            .opt("maxLength", self.max_length)
            .opt("minGraphemes", self.min_graphemes)
            .opt("maxGraphemes", self.max_graphemes)
            .opt("enum", self.enum_values.clone())
            .opt("const", self.const_value.clone())
            .opt("knownValues", self.known_values.clone())
            .opt("default", self.default.clone())
            .finish()
    }
}

impl BytesType {
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "bytes")?;
        Ok(Self {
            description: f.description()?,
            min_length: f.opt_u64("minLength")?,
            max_length: f.opt_u64("maxLength")?,
        })
    }

    pub fn to_value(&self) -> Value {
        Emit::new("bytes", &self.description)
            .opt("minLength", self.min_length)
            .opt("maxLength", self.max_length)
            .finish()
    }
}

impl CidLinkType {
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "cid-link")?;
        Ok(Self {
            description: f.description()?,
        })
    }

    pub fn to_value(&self) -> Value {
        Emit::new("cid-link", &self.description).finish()
    }
}

impl BlobType {
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "blob")?;
        Ok(Self {
            description: f.description()?,
            accept: f.opt_str_list("accept")?,
            max_size: f.opt_u64("maxSize")?,
        })
    }

    pub fn to_value(&self) -> Value {
        Emit::new("blob", &self.description)
            .opt("accept", self.accept.clone())
            .opt("maxSize", self.max_size)
            .finish()
    }
}

impl ArrayType {
    /// Parse the array's own constraints. `items` is attached separately.
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "array")?;
        Ok(Self {
            description: f.description()?,
            items: None,
            min_length: f.opt_u64("minLength")?,
            max_length: f.opt_u64("maxLength")?,
        })
    }

    /// A copy of this array with `items` attached.
    pub fn with_items(&self, items: TypeNode) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..self.clone()
        }
    }

    pub fn to_value(&self) -> Value {
        let mut emit = Emit::new("array", &self.description);
        if let Some(items) = &self.items {
            emit.set("items", items.to_value());
        }
        emit.opt("minLength", self.min_length)
            .opt("maxLength", self.max_length)
            .finish()
    }
}

impl ObjectType {
    /// Parse the object's own constraints. `properties` are attached separately.
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "object")?;
        Ok(Self {
            description: f.description()?,
            required: f.opt_str_list("required")?.unwrap_or_default(),
            nullable: f.opt_str_list("nullable")?.unwrap_or_default(),
            properties: IndexMap::new(),
        })
    }

    /// A copy of this object with `properties` attached.
    pub fn with_properties(&self, properties: IndexMap<String, TypeNode>) -> Self {
        Self {
            properties,
            ..self.clone()
        }
    }

    /// The field must be present.
    pub fn is_required(&self, field: &str) -> bool {
        self.required.iter().any(|r| r == field)
    }

    /// The field may hold `null` in place of its declared type.
    pub fn is_nullable(&self, field: &str) -> bool {
        self.nullable.iter().any(|n| n == field)
    }

    /// A present `null` is accepted without consulting the field's type.
    pub fn accepts_null(&self, field: &str) -> bool {
        self.is_nullable(field)
    }

    /// The field's value may be absent in a conforming instance, either
    /// because the field is not required or because it is nullable.
    ///
    /// The validator and the type mapper both use this to decide optionality.
    pub fn is_optional(&self, field: &str) -> bool {
        !self.is_required(field) || self.is_nullable(field)
    }

    pub fn to_value(&self) -> Value {
        self.to_value_tagged("object")
    }

    pub(crate) fn to_value_tagged(&self, tag: &str) -> Value {
        let mut emit = Emit::new(tag, &self.description);
        emit.list("required", &self.required)
            .list("nullable", &self.nullable);
        if !self.properties.is_empty() {
            let props: Map<String, Value> = self
                .properties
                .iter()
                .map(|(name, node)| (name.clone(), node.to_value()))
                .collect();
            emit.set("properties", Value::Object(props));
        }
        emit.finish()
    }
}

impl RefType {
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "ref")?;
        Ok(Self {
            description: f.description()?,
            reference: f.req_str("ref")?,
        })
    }

    pub fn to_value(&self) -> Value {
        Emit::new("ref", &self.description)
            .set("ref", Value::String(self.reference.clone()))
            .finish()
    }
}

impl UnionType {
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "union")?;
        let refs = f.opt_str_list("refs")?.ok_or(ParseError::MissingKey {
            location: String::new(),
            variant: "union",
            key: "refs",
        })?;
        Ok(Self {
            description: f.description()?,
            refs,
            closed: f.opt_bool("closed")?.unwrap_or(false),
        })
    }

    pub fn to_value(&self) -> Value {
        let mut emit = Emit::new("union", &self.description);
        emit.set("refs", Value::from(self.refs.clone()));
        if self.closed {
            emit.set("closed", Value::Bool(true));
        }
        emit.finish()
    }
}

impl UnknownType {
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "unknown")?;
        Ok(Self {
            description: f.description()?,
        })
    }

    pub fn to_value(&self) -> Value {
        Emit::new("unknown", &self.description).finish()
    }
}

// ---------------------------------------------------------------------------
// TypeNode
// ---------------------------------------------------------------------------

impl TypeNode {
    /// Parse one node, without children.
    ///
    /// # Errors
    ///
    /// [`ParseError::UnknownVariant`] for an unrecognised tag,
    /// [`ParseError::MisplacedVariant`] for a definition tag such as
    /// `record`, and the variant's own errors for malformed keys.
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "type")?;
        let tag = f.req_str("type")?;
        match tag.as_str() {
            "null" => NullType::from_value(value).map(Self::Null),
            "boolean" => BooleanType::from_value(value).map(Self::Boolean),
            "integer" => IntegerType::from_value(value).map(Self::Integer),
            "string" => StringType::from_value(value).map(Self::String),
            "bytes" => BytesType::from_value(value).map(Self::Bytes),
            "cid-link" => CidLinkType::from_value(value).map(Self::CidLink),
            "blob" => BlobType::from_value(value).map(Self::Blob),
            "array" => ArrayType::from_value(value).map(Self::Array),
            "object" => ObjectType::from_value(value).map(Self::Object),
            "ref" => RefType::from_value(value).map(Self::Ref),
            "union" => UnionType::from_value(value).map(Self::Union),
            "unknown" => UnknownType::from_value(value).map(Self::Unknown),
            other if DEFINITION_TAGS.contains(&other) => Err(ParseError::MisplacedVariant {
                location: String::new(),
                variant: other.to_string(),
            }),
            other => Err(ParseError::UnknownVariant {
                location: String::new(),
                tag: other.to_string(),
            }),
        }
    }

    /// Parse a node together with all of its descendants.
    pub fn parse_tree(value: &Value) -> Result<Self, ParseError> {
        Self::from_value(value)?.attach_children(value)
    }

    /// Second pass: re-read the structural form of this node and return a
    /// copy with its children attached.
    pub(crate) fn attach_children(self, value: &Value) -> Result<Self, ParseError> {
        match self {
            Self::Array(array) => match value.get("items") {
                Some(raw) => {
                    let items = Self::parse_tree(raw).map_err(|e| e.within("items"))?;
                    Ok(Self::Array(array.with_items(items)))
                }
                None => Ok(Self::Array(array)),
            },
            Self::Object(object) => {
                let properties = parse_properties(value, "object")?;
                Ok(Self::Object(object.with_properties(properties)))
            }
            other => Ok(other),
        }
    }

    /// The variant tag as written in schema documents.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null(_) => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::CidLink(_) => "cid-link",
            Self::Blob(_) => "blob",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Ref(_) => "ref",
            Self::Union(_) => "union",
            Self::Unknown(_) => "unknown",
        }
    }

    /// The node's documentation, if any.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Null(t) => t.description.as_deref(),
            Self::Boolean(t) => t.description.as_deref(),
            Self::Integer(t) => t.description.as_deref(),
            Self::String(t) => t.description.as_deref(),
            Self::Bytes(t) => t.description.as_deref(),
            Self::CidLink(t) => t.description.as_deref(),
            Self::Blob(t) => t.description.as_deref(),
            Self::Array(t) => t.description.as_deref(),
            Self::Object(t) => t.description.as_deref(),
            Self::Ref(t) => t.description.as_deref(),
            Self::Union(t) => t.description.as_deref(),
            Self::Unknown(t) => t.description.as_deref(),
        }
    }

    /// The structural form of this node and its attached children.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null(t) => t.to_value(),
            Self::Boolean(t) => t.to_value(),
            Self::Integer(t) => t.to_value(),
            Self::String(t) => t.to_value(),
            Self::Bytes(t) => t.to_value(),
            Self::CidLink(t) => t.to_value(),
            Self::Blob(t) => t.to_value(),
            Self::Array(t) => t.to_value(),
            Self::Object(t) => t.to_value(),
            Self::Ref(t) => t.to_value(),
            Self::Union(t) => t.to_value(),
            Self::Unknown(t) => t.to_value(),
        }
    }

    /// Every reference string reachable from this node (`ref` targets and
    /// union members), in document order, duplicates included.
    pub fn dependencies(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_dependencies(&mut out);
        out
    }

    fn collect_dependencies<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Ref(r) => out.push(&r.reference),
            Self::Union(u) => out.extend(u.refs.iter().map(String::as_str)),
            Self::Array(a) => {
                if let Some(items) = &a.items {
                    items.collect_dependencies(out);
                }
            }
            Self::Object(o) => {
                for node in o.properties.values() {
                    node.collect_dependencies(out);
                }
            }
            _ => {}
        }
    }
}

/// Parse the `properties` map of an object-shaped node, children included.
pub(crate) fn parse_properties(
    value: &Value,
    variant: &'static str,
) -> Result<IndexMap<String, TypeNode>, ParseError> {
    let f = Fields::new(value, variant)?;
    match f.raw("properties") {
        None => Ok(IndexMap::new()),
        Some(Value::Object(props)) => props
            .iter()
            .map(|(name, raw)| {
                TypeNode::parse_tree(raw)
                    .map(|node| (name.clone(), node))
                    .map_err(|e| e.within(&format!("properties/{name}")))
            })
            .collect(),
        Some(other) => Err(ParseError::InvalidKey {
            location: String::new(),
            variant,
            key: "properties",
            reason: format!("must be an object, found {}", ValueKind::of(other)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_string_constraints() {
        let node = TypeNode::from_value(&json!({
            "type": "string",
            "format": "datetime",
            "maxLength": 3000,
            "maxGraphemes": 300,
            "knownValues": ["a", "b"],
            "x-future-key": {"ignored": true}
        }))
        .unwrap();
        let TypeNode::String(s) = node else {
            panic!("expected string node");
        };
        assert_eq!(s.format, Some(StringFormat::Datetime));
        assert_eq!(s.max_length, Some(3000));
        assert_eq!(s.max_graphemes, Some(300));
        assert_eq!(s.known_values.as_deref(), Some(&["a".to_string(), "b".to_string()][..]));
    }

    #[test]
    fn test_unknown_format_kept() {
        let node = TypeNode::from_value(&json!({"type": "string", "format": "record-key"})).unwrap();
        let TypeNode::String(s) = &node else {
            panic!("expected string node");
        };
        assert_eq!(s.format, Some(StringFormat::Other("record-key".to_string())));
        assert_eq!(node.to_value()["format"], "record-key");
    }

    #[test]
    fn test_ref_requires_ref_key() {
        let err = TypeNode::from_value(&json!({"type": "ref"})).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingKey {
                location: String::new(),
                variant: "ref",
                key: "ref",
            }
        );
    }

    #[test]
    fn test_union_requires_refs() {
        let err = TypeNode::from_value(&json!({"type": "union", "closed": true})).unwrap_err();
        assert!(matches!(err, ParseError::MissingKey { key: "refs", .. }));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = TypeNode::from_value(&json!({"type": "float"})).unwrap_err();
        assert!(matches!(err, ParseError::UnknownVariant { ref tag, .. } if tag == "float"));
    }

    #[test]
    fn test_definition_tag_misplaced() {
        let err = TypeNode::from_value(&json!({"type": "record", "record": {}})).unwrap_err();
        assert!(matches!(err, ParseError::MisplacedVariant { .. }));
    }

    #[test]
    fn test_missing_type_tag() {
        let err = TypeNode::from_value(&json!({"description": "x"})).unwrap_err();
        assert!(matches!(err, ParseError::MissingKey { key: "type", .. }));
    }

    #[test]
    fn test_invalid_key_type() {
        let err = TypeNode::from_value(&json!({"type": "string", "maxLength": "ten"})).unwrap_err();
        match err {
            ParseError::InvalidKey { key, reason, .. } => {
                assert_eq!(key, "maxLength");
                assert!(reason.contains("found string"), "{reason}");
            }
            other => panic!("expected InvalidKey, got {other}"),
        }
    }

    #[test]
    fn test_integer_min_exceeds_max() {
        let err = TypeNode::from_value(&json!({"type": "integer", "minimum": 5, "maximum": 1}));
        assert!(err.is_err());
    }

    #[test]
    fn test_from_value_is_shallow() {
        let raw = json!({
            "type": "object",
            "required": ["a"],
            "properties": {"a": {"type": "string"}}
        });
        let TypeNode::Object(obj) = TypeNode::from_value(&raw).unwrap() else {
            panic!("expected object");
        };
        assert!(obj.properties.is_empty());
        assert_eq!(obj.required, vec!["a".to_string()]);
    }

    #[test]
    fn test_with_items_leaves_original() {
        let bare = ArrayType::from_value(&json!({"type": "array", "maxLength": 3})).unwrap();
        let typed = bare.with_items(TypeNode::String(StringType::default()));
        assert!(bare.items.is_none());
        assert!(typed.items.is_some());
        assert_eq!(typed.max_length, Some(3));
    }

    #[test]
    fn test_parse_tree_attaches_children() {
        let raw = json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "items": {"type": "string", "maxLength": 64}},
                "reply": {"type": "ref", "ref": "#replyRef"}
            }
        });
        let node = TypeNode::parse_tree(&raw).unwrap();
        let TypeNode::Object(obj) = &node else {
            panic!("expected object");
        };
        let Some(TypeNode::Array(tags)) = obj.properties.get("tags") else {
            panic!("expected tags array");
        };
        assert!(matches!(tags.items.as_deref(), Some(TypeNode::String(_))));
        assert_eq!(node.dependencies(), vec!["#replyRef"]);
        assert_eq!(node.to_value(), raw);
    }

    #[test]
    fn test_nested_parse_error_location() {
        let raw = json!({
            "type": "object",
            "properties": {
                "list": {"type": "array", "items": {"type": "ref"}}
            }
        });
        let err = TypeNode::parse_tree(&raw).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingKey {
                location: "properties/list/items".to_string(),
                variant: "ref",
                key: "ref",
            }
        );
    }

    #[test]
    fn test_optionality_helpers() {
        let obj = ObjectType {
            required: vec!["a".into(), "b".into()],
            nullable: vec!["b".into(), "c".into()],
            ..Default::default()
        };
        assert!(!obj.is_optional("a"));
        assert!(obj.is_optional("b"));
        assert!(obj.is_optional("c"));
        assert!(obj.accepts_null("c"));
        assert!(!obj.accepts_null("a"));
    }

    #[test]
    fn test_union_closed_defaults_false() {
        let node = TypeNode::from_value(&json!({"type": "union", "refs": ["a.b.c"]})).unwrap();
        let TypeNode::Union(u) = &node else {
            panic!("expected union");
        };
        assert!(!u.closed);
        assert!(node.to_value().get("closed").is_none());
    }
}
