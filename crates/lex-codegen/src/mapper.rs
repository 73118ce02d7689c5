//! # Type Mapping
//!
//! Maps a [`TypeNode`] to the Rust type a generated struct stores, the
//! runtime reader expression that fills it, and the `use` paths it needs.
//! A second, documentation mapping renders the node in schema vocabulary
//! (`array<string>`, `{ uri: string, cid?: string }`, `a.b.c | a.b.d`).
//!
//! ## References
//!
//! A `ref` to a `record` or `object` definition maps to the generated
//! struct of that definition. A `ref` to any other data definition (a
//! string alias, a union) maps to that definition's own type, followed
//! through at most [`MAX_REF_HOPS`] aliases. Targets that cannot be
//! resolved are assumed to be generated structs.

use std::collections::BTreeSet;
use std::sync::Arc;

use lex_core::{Nsid, RefTarget};
use lex_schema::{
    Definition, LexiconDoc, ObjectType, SchemaRegistry, StringFormat, TypeNode, UnionResolver,
    MAX_REF_HOPS,
};

use crate::naming::NamingConfig;

const VALUE: &str = "serde_json::Value";
const MAP: &str = "serde_json::Map<String, serde_json::Value>";

/// The Rust side of a mapped node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapped {
    /// Rust type expression, never wrapped in `Option`.
    pub rust: String,
    /// Expression usable as `Fn(&serde_json::Value) -> Result<T, FromValueError>`.
    pub reader: String,
    /// The definition whose generated struct this maps to, for refs.
    pub target: Option<Nsid>,
}

impl Mapped {
    fn new(rust: impl Into<String>, reader: impl Into<String>) -> Self {
        Self {
            rust: rust.into(),
            reader: reader.into(),
            target: None,
        }
    }
}

/// Maps schema types to Rust types in the context of a document.
#[derive(Clone, Copy)]
pub struct TypeMapper<'a> {
    naming: &'a NamingConfig,
    runtime_path: &'a str,
    registry: Option<&'a dyn SchemaRegistry>,
}

impl<'a> TypeMapper<'a> {
    pub fn new(naming: &'a NamingConfig, runtime_path: &'a str) -> Self {
        Self {
            naming,
            runtime_path,
            registry: None,
        }
    }

    /// Resolve cross-document refs through `registry`.
    pub fn with_registry(mut self, registry: &'a dyn SchemaRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Map `node`, declared in `doc`, adding the `use` paths it needs to
    /// `imports`.
    pub fn map(&self, node: &TypeNode, doc: &LexiconDoc, imports: &mut BTreeSet<String>) -> Mapped {
        self.map_node(node, doc, 0, imports)
    }

    /// The Rust type of `node`.
    pub fn rust_type(&self, node: &TypeNode, doc: &LexiconDoc) -> String {
        self.map(node, doc, &mut BTreeSet::new()).rust
    }

    /// The `use` paths `node` needs.
    pub fn imports(&self, node: &TypeNode, doc: &LexiconDoc) -> BTreeSet<String> {
        let mut imports = BTreeSet::new();
        self.map(node, doc, &mut imports);
        imports
    }

    /// The Rust type of the property `field` of `object`: optional and
    /// nullable properties wrap in `Option`.
    pub fn field_type(&self, object: &ObjectType, field: &str, doc: &LexiconDoc) -> Option<String> {
        let node = object.properties.get(field)?;
        let rust = self.rust_type(node, doc);
        Some(if object.is_optional(field) {
            format!("Option<{rust}>")
        } else {
            rust
        })
    }

    fn rt(&self, item: &str) -> String {
        format!("{}::{item}", self.runtime_path)
    }

    fn map_node(
        &self,
        node: &TypeNode,
        doc: &LexiconDoc,
        depth: usize,
        imports: &mut BTreeSet<String>,
    ) -> Mapped {
        match node {
            TypeNode::Null(_) => Mapped::new("()", self.rt("read_null")),
            TypeNode::Boolean(_) => Mapped::new("bool", self.rt("read_bool")),
            TypeNode::Integer(_) => Mapped::new("i64", self.rt("read_integer")),
            TypeNode::String(s) if s.format == Some(StringFormat::Datetime) => {
                imports.insert("chrono::DateTime".to_string());
                imports.insert("chrono::Utc".to_string());
                Mapped::new("DateTime<Utc>", self.rt("read_datetime"))
            }
            TypeNode::String(_) => Mapped::new("String", self.rt("read_string")),
            TypeNode::Bytes(_) => Mapped::new("Vec<u8>", self.rt("read_bytes")),
            TypeNode::CidLink(_) => Mapped::new("String", self.rt("read_cid_link")),
            TypeNode::Blob(_) => {
                imports.insert(self.rt("BlobRef"));
                Mapped::new("BlobRef", self.rt("read_blob"))
            }
            TypeNode::Array(array) => {
                let item = match &array.items {
                    Some(items) => self.map_node(items, doc, depth, imports),
                    None => Mapped::new(VALUE, self.rt("read_unknown")),
                };
                Mapped::new(
                    format!("Vec<{}>", item.rust),
                    format!("|v| {}(v, {})", self.rt("read_array"), item.reader),
                )
            }
            TypeNode::Object(_) => Mapped::new(MAP, self.rt("read_map")),
            TypeNode::Ref(r) => self.map_ref(&r.reference, doc, depth, imports),
            TypeNode::Union(_) | TypeNode::Unknown(_) => Mapped::new(VALUE, self.rt("read_unknown")),
        }
    }

    fn map_ref(
        &self,
        reference: &str,
        doc: &LexiconDoc,
        depth: usize,
        imports: &mut BTreeSet<String>,
    ) -> Mapped {
        let Some(id) = RefTarget::parse(reference)
            .ok()
            .and_then(|target| target.absolute(&doc.id).ok())
        else {
            return Mapped::new(VALUE, self.rt("read_unknown"));
        };
        if depth >= MAX_REF_HOPS {
            tracing::warn!(reference, "alias chain too long, mapping to a generic value");
            return Mapped::new(VALUE, self.rt("read_unknown"));
        }

        if id.base() == doc.id {
            return match doc.def(id.definition_name()) {
                Some(def) => self.map_definition(&id, def, doc, false, depth, imports),
                None => self.struct_ref(&id, false, imports),
            };
        }

        let target: Option<Arc<LexiconDoc>> = self.registry.and_then(|r| r.get(&id));
        match target {
            Some(target) => match target.def(id.definition_name()) {
                Some(def) => self.map_definition(&id, def, &target, true, depth, imports),
                None => self.struct_ref(&id, true, imports),
            },
            None => {
                tracing::debug!(%id, "ref target not registered, assuming a generated struct");
                self.struct_ref(&id, true, imports)
            }
        }
    }

    fn map_definition(
        &self,
        id: &Nsid,
        def: &Definition,
        target_doc: &LexiconDoc,
        external: bool,
        depth: usize,
        imports: &mut BTreeSet<String>,
    ) -> Mapped {
        match def {
            Definition::Record { .. } | Definition::Data(TypeNode::Object(_)) => {
                self.struct_ref(id, external, imports)
            }
            Definition::Data(node) => self.map_node(node, target_doc, depth + 1, imports),
            _ => Mapped::new(VALUE, self.rt("read_unknown")),
        }
    }

    fn struct_ref(&self, id: &Nsid, external: bool, imports: &mut BTreeSet<String>) -> Mapped {
        let name = self.naming.type_name(id);
        if external {
            imports.insert(self.naming.qualified_type_name(id));
        }
        Mapped {
            reader: format!("{name}::from_value"),
            rust: name,
            target: Some(id.clone()),
        }
    }
}

impl std::fmt::Debug for TypeMapper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMapper")
            .field("naming", self.naming)
            .field("runtime_path", &self.runtime_path)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Documentation types
// ---------------------------------------------------------------------------

/// `node` in schema vocabulary, with refs made absolute against `doc`.
pub fn doc_type(node: &TypeNode, doc: &LexiconDoc) -> String {
    match node {
        TypeNode::Array(array) => match &array.items {
            Some(items) => format!("array<{}>", doc_type(items, doc)),
            None => "array<unknown>".to_string(),
        },
        TypeNode::Object(object) => object_shape(object, doc),
        TypeNode::Ref(r) => absolute_ref(&r.reference, doc),
        TypeNode::Union(union) if union.closed && !union.refs.is_empty() => {
            let resolver = UnionResolver::within(doc.id.clone());
            union
                .refs
                .iter()
                .map(|r| resolver.normalize(r))
                .collect::<Vec<_>>()
                .join(" | ")
        }
        TypeNode::Union(_) | TypeNode::Unknown(_) => "unknown".to_string(),
        leaf => leaf.kind().to_string(),
    }
}

/// Documentation type of a property, with `| null` for nullable ones.
pub fn field_doc_type(object: &ObjectType, field: &str, doc: &LexiconDoc) -> Option<String> {
    let node = object.properties.get(field)?;
    let base = doc_type(node, doc);
    Some(if object.is_nullable(field) {
        format!("{base} | null")
    } else {
        base
    })
}

fn object_shape(object: &ObjectType, doc: &LexiconDoc) -> String {
    if object.properties.is_empty() {
        return "{}".to_string();
    }
    let fields: Vec<String> = object
        .properties
        .keys()
        .filter_map(|name| {
            let marker = if object.is_required(name) { "" } else { "?" };
            field_doc_type(object, name, doc).map(|t| format!("{name}{marker}: {t}"))
        })
        .collect();
    format!("{{ {} }}", fields.join(", "))
}

fn absolute_ref(reference: &str, doc: &LexiconDoc) -> String {
    RefTarget::parse(reference)
        .and_then(|target| target.absolute(&doc.id))
        .map(|id| id.to_string())
        .unwrap_or_else(|_| reference.to_string())
}

/// Every constraint declared on `node`, one entry each, for documentation.
pub fn constraints(node: &TypeNode) -> Vec<String> {
    let mut out = Vec::new();
    match node {
        TypeNode::Boolean(b) => {
            push(&mut out, "const", b.const_value);
            push(&mut out, "default", b.default);
        }
        TypeNode::Integer(i) => {
            push(&mut out, "minimum", i.minimum);
            push(&mut out, "maximum", i.maximum);
            push_list(&mut out, "enum", i.enum_values.as_deref());
            push(&mut out, "const", i.const_value);
            push(&mut out, "default", i.default);
        }
        TypeNode::String(s) => {
            push(&mut out, "format", s.format.as_ref());
            push(&mut out, "minLength", s.min_length);
            push(&mut out, "maxLength", s.max_length);
            push(&mut out, "minGraphemes", s.min_graphemes);
            push(&mut out, "maxGraphemes", s.max_graphemes);
            push_list(&mut out, "enum", s.enum_values.as_deref());
            push_list(&mut out, "knownValues", s.known_values.as_deref());
            push(&mut out, "const", s.const_value.as_ref().map(|c| format!("\"{c}\"")));
            push(&mut out, "default", s.default.as_ref().map(|d| format!("\"{d}\"")));
        }
        TypeNode::Bytes(b) => {
            push(&mut out, "minLength", b.min_length);
            push(&mut out, "maxLength", b.max_length);
        }
        TypeNode::Blob(b) => {
            push_list(&mut out, "accept", b.accept.as_deref());
            push(&mut out, "maxSize", b.max_size);
        }
        TypeNode::Array(a) => {
            push(&mut out, "minLength", a.min_length);
            push(&mut out, "maxLength", a.max_length);
            if let Some(items) = &a.items {
                out.extend(constraints(items).into_iter().map(|c| format!("items {c}")));
            }
        }
        TypeNode::Union(u) if u.closed => out.push("closed".to_string()),
        _ => {}
    }
    out
}

fn push<T: std::fmt::Display>(out: &mut Vec<String>, name: &str, value: Option<T>) {
    if let Some(value) = value {
        out.push(format!("{name} {value}"));
    }
}

fn push_list<T: std::fmt::Display>(out: &mut Vec<String>, name: &str, values: Option<&[T]>) {
    if let Some(values) = values {
        let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
        out.push(format!("{name} [{}]", joined.join(", ")));
    }
}
