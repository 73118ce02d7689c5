//! # Schema Documents
//!
//! A [`LexiconDoc`] is one parsed schema document: its identifier, its
//! dialect version, and the named [`Definition`]s in `defs`. The definition
//! named `main` is the document's primary type.
//!
//! ## Two-pass build
//!
//! Definitions reference each other by name (`#replyRef`) regardless of the
//! order they appear in. [`LexiconDoc::from_value`] therefore builds in two
//! passes:
//!
//! 1. Every entry in `defs` is parsed shallowly. This fixes the set of
//!    definition names and rejects unknown tags and missing keys early.
//! 2. The raw definitions are re-read and each shallow definition is
//!    replaced by a fully populated immutable copy.
//!
//! Local references that name no definition are logged, not rejected.
//! Whether a dangling reference matters depends on the data, so it is
//! reported by the validator at the point of use.

use indexmap::IndexMap;
use lex_core::{Nsid, RefTarget, ValueKind, MAIN_DEF};
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::types::{parse_properties, Emit, Fields, ObjectType, TypeNode, DEFINITION_TAGS};

/// The dialect version this crate understands.
pub const LEXICON_VERSION: u64 = 1;

// ---------------------------------------------------------------------------
// Definition parts
// ---------------------------------------------------------------------------

/// The payload of a query or procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    pub description: Option<String>,
    /// MIME type of the payload, e.g. `application/json`.
    pub encoding: String,
    pub schema: Option<TypeNode>,
}

/// The message of a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub description: Option<String>,
    pub schema: Option<TypeNode>,
}

/// A named error an endpoint may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDecl {
    pub name: String,
    pub description: Option<String>,
}

/// A named entry of a document's `defs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    /// A stored record. `key` names the record-key scheme.
    Record {
        description: Option<String>,
        key: Option<String>,
        record: ObjectType,
    },
    Query {
        description: Option<String>,
        parameters: Option<ObjectType>,
        output: Option<Body>,
        errors: Vec<ErrorDecl>,
    },
    Procedure {
        description: Option<String>,
        parameters: Option<ObjectType>,
        input: Option<Body>,
        output: Option<Body>,
        errors: Vec<ErrorDecl>,
    },
    Subscription {
        description: Option<String>,
        parameters: Option<ObjectType>,
        message: Option<Message>,
        errors: Vec<ErrorDecl>,
    },
    /// A named symbolic value with no data shape.
    Token { description: Option<String> },
    /// A plain field type (`object`, `string`, `union`, ...).
    Data(TypeNode),
}

impl Definition {
    /// The variant tag (`record`, `query`, ..., or the data type's own tag).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Record { .. } => "record",
            Self::Query { .. } => "query",
            Self::Procedure { .. } => "procedure",
            Self::Subscription { .. } => "subscription",
            Self::Token { .. } => "token",
            Self::Data(node) => node.kind(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Record { description, .. }
            | Self::Query { description, .. }
            | Self::Procedure { description, .. }
            | Self::Subscription { description, .. }
            | Self::Token { description } => description.as_deref(),
            Self::Data(node) => node.description(),
        }
    }

    /// The object shape of a record or object definition.
    pub fn object(&self) -> Option<&ObjectType> {
        match self {
            Self::Record { record, .. } => Some(record),
            Self::Data(TypeNode::Object(object)) => Some(object),
            _ => None,
        }
    }

    /// The type data is validated against: the record object for records,
    /// the node itself for data definitions, none for endpoints and tokens.
    pub fn data_type(&self) -> Option<TypeNode> {
        match self {
            Self::Record { record, .. } => Some(TypeNode::Object(record.clone())),
            Self::Data(node) => Some(node.clone()),
            _ => None,
        }
    }

    /// Every reference string reachable from this definition.
    pub fn dependencies(&self) -> Vec<&str> {
        let mut out = Vec::new();
        match self {
            Self::Record { record, .. } => collect_object(record, &mut out),
            Self::Query { parameters, output, .. } => {
                if let Some(p) = parameters {
                    collect_object(p, &mut out);
                }
                collect_body(output.as_ref(), &mut out);
            }
            Self::Procedure { parameters, input, output, .. } => {
                if let Some(p) = parameters {
                    collect_object(p, &mut out);
                }
                collect_body(input.as_ref(), &mut out);
                collect_body(output.as_ref(), &mut out);
            }
            Self::Subscription { parameters, message, .. } => {
                if let Some(p) = parameters {
                    collect_object(p, &mut out);
                }
                if let Some(schema) = message.as_ref().and_then(|m| m.schema.as_ref()) {
                    out.extend(schema.dependencies());
                }
            }
            Self::Token { .. } => {}
            Self::Data(node) => out.extend(node.dependencies()),
        }
        out
    }

    /// Parse a definition without its children.
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "definition")?;
        let tag = f.req_str("type")?;
        let description = f.description()?;
        match tag.as_str() {
            "record" => {
                let raw = value.get("record").ok_or(ParseError::MissingKey {
                    location: String::new(),
                    variant: "record",
                    key: "record",
                })?;
                let record = match TypeNode::from_value(raw).map_err(|e| e.within("record"))? {
                    TypeNode::Object(object) => object,
                    other => {
                        return Err(ParseError::InvalidKey {
                            location: String::new(),
                            variant: "record",
                            key: "record",
                            reason: format!("must be an object type, found `{}`", other.kind()),
                        })
                    }
                };
                Ok(Self::Record {
                    description,
                    key: Fields::new(value, "record")?.opt_str("key")?,
                    record,
                })
            }
            "query" => Ok(Self::Query {
                description,
                parameters: shallow_params(value)?,
                output: shallow_body(value, "query", "output")?,
                errors: parse_errors(value, "query")?,
            }),
            "procedure" => Ok(Self::Procedure {
                description,
                parameters: shallow_params(value)?,
                input: shallow_body(value, "procedure", "input")?,
                output: shallow_body(value, "procedure", "output")?,
                errors: parse_errors(value, "procedure")?,
            }),
            "subscription" => Ok(Self::Subscription {
                description,
                parameters: shallow_params(value)?,
                message: match value.get("message") {
                    None => None,
                    Some(raw) => Some(Message {
                        description: Fields::new(raw, "subscription")
                            .map_err(|e| e.within("message"))?
                            .description()?,
                        schema: None,
                    }),
                },
                errors: parse_errors(value, "subscription")?,
            }),
            "token" => Ok(Self::Token { description }),
            _ => TypeNode::from_value(value).map(Self::Data),
        }
    }

    /// Second pass: a copy of this definition with every child attached.
    pub(crate) fn attach_children(self, value: &Value) -> Result<Self, ParseError> {
        match self {
            Self::Record { description, key, record } => {
                let raw = value.get("record").unwrap_or(&Value::Null);
                let properties = parse_properties(raw, "object").map_err(|e| e.within("record"))?;
                Ok(Self::Record {
                    description,
                    key,
                    record: record.with_properties(properties),
                })
            }
            Self::Query { description, parameters, output, errors } => Ok(Self::Query {
                description,
                parameters: full_params(parameters, value)?,
                output: full_body(output, value, "output")?,
                errors,
            }),
            Self::Procedure { description, parameters, input, output, errors } => {
                Ok(Self::Procedure {
                    description,
                    parameters: full_params(parameters, value)?,
                    input: full_body(input, value, "input")?,
                    output: full_body(output, value, "output")?,
                    errors,
                })
            }
            Self::Subscription { description, parameters, message, errors } => {
                let message = match (message, value.get("message")) {
                    (Some(message), Some(raw)) => Some(Message {
                        schema: optional_tree(raw, "schema").map_err(|e| e.within("message"))?,
                        ..message
                    }),
                    (message, _) => message,
                };
                Ok(Self::Subscription {
                    description,
                    parameters: full_params(parameters, value)?,
                    message,
                    errors,
                })
            }
            token @ Self::Token { .. } => Ok(token),
            Self::Data(node) => node.attach_children(value).map(Self::Data),
        }
    }

    /// The structural form of this definition.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Record { description, key, record } => Emit::new("record", description)
                .opt("key", key.clone())
                .set("record", record.to_value())
                .finish(),
            Self::Query { description, parameters, output, errors } => {
                let mut emit = Emit::new("query", description);
                emit_params(&mut emit, parameters.as_ref());
                emit_body(&mut emit, "output", output.as_ref());
                emit_errors(&mut emit, errors);
                emit.finish()
            }
            Self::Procedure { description, parameters, input, output, errors } => {
                let mut emit = Emit::new("procedure", description);
                emit_params(&mut emit, parameters.as_ref());
                emit_body(&mut emit, "input", input.as_ref());
                emit_body(&mut emit, "output", output.as_ref());
                emit_errors(&mut emit, errors);
                emit.finish()
            }
            Self::Subscription { description, parameters, message, errors } => {
                let mut emit = Emit::new("subscription", description);
                emit_params(&mut emit, parameters.as_ref());
                if let Some(message) = message {
                    let mut map = Map::new();
                    if let Some(d) = &message.description {
                        map.insert("description".to_string(), Value::String(d.clone()));
                    }
                    if let Some(schema) = &message.schema {
                        map.insert("schema".to_string(), schema.to_value());
                    }
                    emit.set("message", Value::Object(map));
                }
                emit_errors(&mut emit, errors);
                emit.finish()
            }
            Self::Token { description } => Emit::new("token", description).finish(),
            Self::Data(node) => node.to_value(),
        }
    }
}

fn collect_object<'a>(object: &'a ObjectType, out: &mut Vec<&'a str>) {
    for node in object.properties.values() {
        out.extend(node.dependencies());
    }
}

fn collect_body<'a>(body: Option<&'a Body>, out: &mut Vec<&'a str>) {
    if let Some(schema) = body.and_then(|b| b.schema.as_ref()) {
        out.extend(schema.dependencies());
    }
}

fn shallow_params(value: &Value) -> Result<Option<ObjectType>, ParseError> {
    let Some(raw) = value.get("parameters") else {
        return Ok(None);
    };
    let wrap = |e: ParseError| e.within("parameters");
    let tag = Fields::new(raw, "params").map_err(wrap)?.req_str("type").map_err(wrap)?;
    if tag != "params" {
        return Err(ParseError::InvalidKey {
            location: "parameters".to_string(),
            variant: "params",
            key: "type",
            reason: format!("must be \"params\", found \"{tag}\""),
        });
    }
    ObjectType::from_value(raw).map(Some).map_err(wrap)
}

fn full_params(
    shallow: Option<ObjectType>,
    value: &Value,
) -> Result<Option<ObjectType>, ParseError> {
    match (shallow, value.get("parameters")) {
        (Some(params), Some(raw)) => {
            let properties =
                parse_properties(raw, "params").map_err(|e| e.within("parameters"))?;
            Ok(Some(params.with_properties(properties)))
        }
        (params, _) => Ok(params),
    }
}

fn shallow_body(
    value: &Value,
    variant: &'static str,
    key: &'static str,
) -> Result<Option<Body>, ParseError> {
    let Some(raw) = value.get(key) else {
        return Ok(None);
    };
    let f = Fields::new(raw, variant).map_err(|e| e.within(key))?;
    Ok(Some(Body {
        description: f.description().map_err(|e| e.within(key))?,
        encoding: f.req_str("encoding").map_err(|e| e.within(key))?,
        schema: None,
    }))
}

fn full_body(
    shallow: Option<Body>,
    value: &Value,
    key: &'static str,
) -> Result<Option<Body>, ParseError> {
    match (shallow, value.get(key)) {
        (Some(body), Some(raw)) => Ok(Some(Body {
            schema: optional_tree(raw, "schema").map_err(|e| e.within(key))?,
            ..body
        })),
        (body, _) => Ok(body),
    }
}

fn optional_tree(value: &Value, key: &str) -> Result<Option<TypeNode>, ParseError> {
    value
        .get(key)
        .map(|raw| TypeNode::parse_tree(raw).map_err(|e| e.within(key)))
        .transpose()
}

fn parse_errors(value: &Value, variant: &'static str) -> Result<Vec<ErrorDecl>, ParseError> {
    let Some(raw) = value.get("errors") else {
        return Ok(Vec::new());
    };
    let Value::Array(items) = raw else {
        return Err(ParseError::InvalidKey {
            location: String::new(),
            variant,
            key: "errors",
            reason: format!("must be a list, found {}", ValueKind::of(raw)),
        });
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let f = Fields::new(item, variant).map_err(|e| e.within(&format!("errors/{i}")))?;
            Ok(ErrorDecl {
                name: f.req_str("name").map_err(|e| e.within(&format!("errors/{i}")))?,
                description: f.description()?,
            })
        })
        .collect()
}

fn emit_params(emit: &mut Emit, params: Option<&ObjectType>) {
    if let Some(params) = params {
        emit.set("parameters", params.to_value_tagged("params"));
    }
}

fn emit_body(emit: &mut Emit, key: &str, body: Option<&Body>) {
    if let Some(body) = body {
        let mut map = Map::new();
        if let Some(d) = &body.description {
            map.insert("description".to_string(), Value::String(d.clone()));
        }
        map.insert("encoding".to_string(), Value::String(body.encoding.clone()));
        if let Some(schema) = &body.schema {
            map.insert("schema".to_string(), schema.to_value());
        }
        emit.set(key, Value::Object(map));
    }
}

fn emit_errors(emit: &mut Emit, errors: &[ErrorDecl]) {
    if errors.is_empty() {
        return;
    }
    let list = errors
        .iter()
        .map(|e| {
            let mut map = Map::new();
            map.insert("name".to_string(), Value::String(e.name.clone()));
            if let Some(d) = &e.description {
                map.insert("description".to_string(), Value::String(d.clone()));
            }
            Value::Object(map)
        })
        .collect();
    emit.set("errors", Value::Array(list));
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// A parsed schema document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconDoc {
    /// Dialect version.
    pub lexicon: u64,
    /// Identifier of the document (never carries a fragment).
    pub id: Nsid,
    pub revision: Option<u64>,
    pub description: Option<String>,
    /// Definitions by name, in document order.
    pub defs: IndexMap<String, Definition>,
}

impl LexiconDoc {
    /// Parse a document from its JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Parse a document from its structural form.
    ///
    /// # Errors
    ///
    /// Any [`ParseError`] from a definition, located at `defs/<name>/...`,
    /// or from the document header itself.
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let f = Fields::new(value, "document")?;

        let lexicon = match f.raw("lexicon") {
            None => {
                return Err(ParseError::MissingKey {
                    location: String::new(),
                    variant: "document",
                    key: "lexicon",
                })
            }
            Some(raw) => raw.as_u64().ok_or_else(|| ParseError::InvalidKey {
                location: String::new(),
                variant: "document",
                key: "lexicon",
                reason: format!("must be an integer, found {}", ValueKind::of(raw)),
            })?,
        };

        let id = Nsid::parse(&f.req_str("id")?)?;
        if !id.is_main() {
            return Err(ParseError::InvalidKey {
                location: String::new(),
                variant: "document",
                key: "id",
                reason: format!("must not carry a fragment, found \"{id}\""),
            });
        }
        if lexicon != LEXICON_VERSION {
            tracing::warn!(id = %id, lexicon, "unrecognised lexicon version, parsing anyway");
        }

        let raw_defs = match f.raw("defs") {
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ParseError::InvalidKey {
                    location: String::new(),
                    variant: "document",
                    key: "defs",
                    reason: format!("must be an object, found {}", ValueKind::of(other)),
                })
            }
            None => {
                return Err(ParseError::MissingKey {
                    location: String::new(),
                    variant: "document",
                    key: "defs",
                })
            }
        };

        // Pass one: shallow definitions for every name.
        let mut shallow = IndexMap::with_capacity(raw_defs.len());
        for (name, raw) in raw_defs {
            let location = format!("defs/{name}");
            let tag = raw.get("type").and_then(Value::as_str).unwrap_or_default();
            if name != MAIN_DEF && tag != "token" && DEFINITION_TAGS.contains(&tag) {
                return Err(ParseError::MisplacedVariant {
                    location,
                    variant: tag.to_string(),
                });
            }
            let def = Definition::from_value(raw).map_err(|e| e.within(&location))?;
            shallow.insert(name.clone(), def);
        }

        // Pass two: attach children against the now-known name set.
        let mut defs = IndexMap::with_capacity(shallow.len());
        for (name, def) in shallow {
            let location = format!("defs/{name}");
            let raw = &raw_defs[name.as_str()];
            let full = def.attach_children(raw).map_err(|e| e.within(&location))?;
            defs.insert(name, full);
        }

        let doc = Self {
            lexicon,
            id,
            revision: f.opt_u64("revision")?,
            description: f.description()?,
            defs,
        };
        doc.check_references()?;
        Ok(doc)
    }

    /// Reject malformed reference strings; log local references to
    /// definitions that do not exist.
    fn check_references(&self) -> Result<(), ParseError> {
        for (name, def) in &self.defs {
            for reference in def.dependencies() {
                let target = RefTarget::parse(reference).map_err(|e| ParseError::InvalidKey {
                    location: format!("defs/{name}"),
                    variant: "ref",
                    key: "ref",
                    reason: e.to_string(),
                })?;
                let local = match &target {
                    RefTarget::Local(fragment) => Some(fragment.as_str()),
                    RefTarget::External(id) if id.base() == self.id => Some(id.definition_name()),
                    RefTarget::External(_) => None,
                };
                if let Some(fragment) = local {
                    if !self.defs.contains_key(fragment) {
                        tracing::warn!(
                            id = %self.id,
                            definition = %name,
                            reference = %reference,
                            "reference names no definition in this document"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// The primary definition.
    pub fn main(&self) -> Option<&Definition> {
        self.defs.get(MAIN_DEF)
    }

    /// A definition by name.
    pub fn def(&self, name: &str) -> Option<&Definition> {
        self.defs.get(name)
    }

    /// A definition by local reference (`#name`, `name`, or `#main`).
    pub fn resolve_local(&self, reference: &str) -> Option<&Definition> {
        let name = reference.strip_prefix('#').unwrap_or(reference);
        self.def(if name.is_empty() { MAIN_DEF } else { name })
    }

    /// The identifier of a definition of this document.
    pub fn id_of(&self, name: &str) -> Option<Nsid> {
        self.id.with_fragment(name).ok()
    }

    /// The structural form of this document.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("lexicon".to_string(), Value::from(self.lexicon));
        map.insert("id".to_string(), Value::String(self.id.to_string()));
        if let Some(revision) = self.revision {
            map.insert("revision".to_string(), Value::from(revision));
        }
        if let Some(d) = &self.description {
            map.insert("description".to_string(), Value::String(d.clone()));
        }
        let defs = self
            .defs
            .iter()
            .map(|(name, def)| (name.clone(), def.to_value()))
            .collect();
        map.insert("defs".to_string(), Value::Object(defs));
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post_doc() -> Value {
        json!({
            "lexicon": 1,
            "id": "com.example.feed.post",
            "description": "A short post.",
            "defs": {
                "main": {
                    "type": "record",
                    "key": "tid",
                    "record": {
                        "type": "object",
                        "required": ["text", "createdAt"],
                        "properties": {
                            "text": {"type": "string", "maxLength": 3000, "maxGraphemes": 300},
                            "reply": {"type": "ref", "ref": "#replyRef"},
                            "createdAt": {"type": "string", "format": "datetime"}
                        }
                    }
                },
                "replyRef": {
                    "type": "object",
                    "required": ["root"],
                    "properties": {
                        "root": {"type": "string", "format": "at-uri"}
                    }
                }
            }
        })
    }

    #[test]
    fn test_parse_record_document() {
        let doc = LexiconDoc::from_value(&post_doc()).unwrap();
        assert_eq!(doc.id.to_string(), "com.example.feed.post");
        assert_eq!(doc.lexicon, 1);
        let main = doc.main().unwrap();
        assert_eq!(main.kind(), "record");
        let record = main.object().unwrap();
        assert_eq!(record.required, vec!["text", "createdAt"]);
        assert_eq!(
            record.properties.keys().collect::<Vec<_>>(),
            vec!["text", "reply", "createdAt"]
        );
        assert_eq!(doc.resolve_local("#replyRef").unwrap().kind(), "object");
        assert_eq!(main.dependencies(), vec!["#replyRef"]);
    }

    #[test]
    fn test_document_round_trip() {
        let raw = post_doc();
        let doc = LexiconDoc::from_value(&raw).unwrap();
        assert_eq!(doc.to_value(), raw);
        assert_eq!(LexiconDoc::from_value(&doc.to_value()).unwrap(), doc);
    }

    #[test]
    fn test_query_document() {
        let raw = json!({
            "lexicon": 1,
            "id": "com.example.feed.getTimeline",
            "defs": {
                "main": {
                    "type": "query",
                    "parameters": {
                        "type": "params",
                        "properties": {"limit": {"type": "integer", "minimum": 1, "maximum": 100}}
                    },
                    "output": {
                        "encoding": "application/json",
                        "schema": {"type": "ref", "ref": "com.example.feed.defs#feedView"}
                    },
                    "errors": [{"name": "BlockedActor"}]
                }
            }
        });
        let doc = LexiconDoc::from_value(&raw).unwrap();
        let main = doc.main().unwrap();
        assert_eq!(main.kind(), "query");
        assert!(main.data_type().is_none());
        let Definition::Query { parameters, output, errors, .. } = main else {
            panic!("expected query");
        };
        assert!(parameters.as_ref().unwrap().properties.contains_key("limit"));
        assert_eq!(output.as_ref().unwrap().encoding, "application/json");
        assert_eq!(errors[0].name, "BlockedActor");
        assert_eq!(doc.to_value(), raw);
    }

    #[test]
    fn test_body_requires_encoding() {
        let raw = json!({
            "lexicon": 1,
            "id": "a.b.c",
            "defs": {"main": {"type": "procedure", "input": {"schema": {"type": "object"}}}}
        });
        let err = LexiconDoc::from_value(&raw).unwrap_err();
        assert!(
            matches!(err, ParseError::MissingKey { ref location, key: "encoding", .. } if location == "defs/main/input"),
            "{err}"
        );
    }

    #[test]
    fn test_record_outside_main_rejected() {
        let raw = json!({
            "lexicon": 1,
            "id": "a.b.c",
            "defs": {"other": {"type": "record", "record": {"type": "object"}}}
        });
        let err = LexiconDoc::from_value(&raw).unwrap_err();
        assert!(matches!(err, ParseError::MisplacedVariant { .. }), "{err}");
    }

    #[test]
    fn test_record_must_wrap_object() {
        let raw = json!({
            "lexicon": 1,
            "id": "a.b.c",
            "defs": {"main": {"type": "record", "record": {"type": "string"}}}
        });
        assert!(matches!(
            LexiconDoc::from_value(&raw),
            Err(ParseError::InvalidKey { key: "record", .. })
        ));
    }

    #[test]
    fn test_unknown_tag_located() {
        let raw = json!({
            "lexicon": 1,
            "id": "a.b.c",
            "defs": {"main": {"type": "object", "properties": {"x": {"type": "decimal"}}}}
        });
        let err = LexiconDoc::from_value(&raw).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownVariant {
                location: "defs/main/properties/x".to_string(),
                tag: "decimal".to_string(),
            }
        );
    }

    #[test]
    fn test_header_errors() {
        assert!(matches!(
            LexiconDoc::from_value(&json!({"id": "a.b.c", "defs": {}})),
            Err(ParseError::MissingKey { key: "lexicon", .. })
        ));
        assert!(matches!(
            LexiconDoc::from_value(&json!({"lexicon": "1", "id": "a.b.c", "defs": {}})),
            Err(ParseError::InvalidKey { key: "lexicon", .. })
        ));
        assert!(matches!(
            LexiconDoc::from_value(&json!({"lexicon": 1, "id": "nope", "defs": {}})),
            Err(ParseError::Identifier(_))
        ));
        assert!(matches!(
            LexiconDoc::from_value(&json!({"lexicon": 1, "id": "a.b.c#x", "defs": {}})),
            Err(ParseError::InvalidKey { key: "id", .. })
        ));
        assert!(matches!(
            LexiconDoc::from_json_str("{not json"),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn test_newer_version_accepted() {
        let doc = LexiconDoc::from_value(&json!({"lexicon": 2, "id": "a.b.c", "defs": {}})).unwrap();
        assert_eq!(doc.lexicon, 2);
        assert!(doc.main().is_none());
    }

    #[test]
    fn test_dangling_local_ref_not_fatal() {
        let raw = json!({
            "lexicon": 1,
            "id": "a.b.c",
            "defs": {"main": {"type": "object", "properties": {"x": {"type": "ref", "ref": "#missing"}}}}
        });
        assert!(LexiconDoc::from_value(&raw).is_ok());
    }

    #[test]
    fn test_malformed_ref_rejected() {
        let raw = json!({
            "lexicon": 1,
            "id": "a.b.c",
            "defs": {"main": {"type": "union", "refs": ["not an id"]}}
        });
        assert!(matches!(
            LexiconDoc::from_value(&raw),
            Err(ParseError::InvalidKey { variant: "ref", .. })
        ));
    }
}
