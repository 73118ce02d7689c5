//! # Code Generator
//!
//! Turns a parsed [`LexiconDoc`] into one Rust module: a struct for the
//! main `record` or `object` definition plus one for every other `object`
//! definition of the document, so local refs always have a target.
//!
//! Generation is a pure function of the document, the naming
//! configuration, and the stubs. Nothing is written until a
//! [`CodeSink`] is handed the result.
//!
//! ## Generated API
//!
//! Each struct carries:
//!
//! - `NSID`, `REQUIRED` (the schema's `required` list, in order), and
//!   `KEY` for records.
//! - `new`, taking one parameter per property.
//! - `from_value(&serde_json::Value)`, reading every property through the
//!   runtime crate.
//! - `<field>_or_default()` for optional properties with a default, and
//!   `push_<item>()` for array properties.
//!
//! ## Recursion
//!
//! A field whose struct leads back to the declaring struct through
//! non-`Vec` fields is stored as `Box<T>`, so self-referential and
//! mutually recursive definitions have a finite size. The search follows
//! refs into other documents when a registry is attached.
//!
//! Property names that collapse to the same snake-case identifier, or to
//! none at all, get a numeric suffix (`created_at_2`) or the name `field`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use lex_core::{Nsid, MAIN_DEF};
use lex_schema::{Definition, LexiconDoc, ObjectType, SchemaRegistry, StringFormat, TypeNode};
use serde_json::json;

use crate::error::GenerationError;
use crate::mapper::{self, TypeMapper};
use crate::naming::{field_name, module_ident, singularize, NamingConfig};
use crate::render::{StubRenderer, DECLARATION_STUB, FILE_STUB};
use crate::sink::CodeSink;

/// Constructors with more parameters than this get a clippy allowance.
const MAX_PLAIN_PARAMS: usize = 7;

/// One generated module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Document the module was generated from.
    pub id: Nsid,
    /// File path relative to the root module's directory.
    pub path: PathBuf,
    /// Rust path of the module.
    pub module_path: String,
    pub source: String,
}

/// Renders documents into Rust modules.
pub struct CodeGenerator {
    naming: NamingConfig,
    runtime_path: String,
    renderer: StubRenderer,
    registry: Option<Arc<dyn SchemaRegistry>>,
}

impl std::fmt::Debug for CodeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeGenerator")
            .field("naming", &self.naming)
            .field("runtime_path", &self.runtime_path)
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

impl CodeGenerator {
    pub fn new(naming: NamingConfig, renderer: StubRenderer) -> Self {
        Self {
            naming,
            runtime_path: "lex_runtime".to_string(),
            renderer,
            registry: None,
        }
    }

    /// Path of the runtime support crate in generated code.
    pub fn with_runtime_path(mut self, path: impl Into<String>) -> Self {
        self.runtime_path = path.into();
        self
    }

    /// Resolve cross-document refs through `registry`, so aliases to
    /// non-object definitions map to their real types.
    pub fn with_registry(mut self, registry: Arc<dyn SchemaRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn naming(&self) -> &NamingConfig {
        &self.naming
    }

    fn mapper(&self) -> TypeMapper<'_> {
        let mapper = TypeMapper::new(&self.naming, &self.runtime_path);
        match &self.registry {
            Some(registry) => mapper.with_registry(registry.as_ref()),
            None => mapper,
        }
    }

    /// Render the module for `doc`.
    ///
    /// # Errors
    ///
    /// [`GenerationError::MissingMain`] or
    /// [`GenerationError::UnsupportedVariant`] when the document has no
    /// generatable main definition; [`GenerationError::Render`] when a stub
    /// fails.
    pub fn generate(&self, doc: &LexiconDoc) -> Result<GeneratedFile, GenerationError> {
        let main = generatable_main(doc)?;
        let mut imports = BTreeSet::new();
        let mut names = Vec::new();
        let mut declarations = Vec::new();

        let (name, source) = self.declaration(doc, &doc.id, main, &mut imports)?;
        names.push(name);
        declarations.push(source);

        for (def_name, def) in &doc.defs {
            if def_name == MAIN_DEF || !matches!(def, Definition::Data(TypeNode::Object(_))) {
                continue;
            }
            let Some(id) = doc.id_of(def_name) else {
                tracing::warn!(id = %doc.id, def = %def_name, "definition name is not a valid fragment, skipping");
                continue;
            };
            let (name, source) = self.declaration(doc, &id, def, &mut imports)?;
            names.push(name);
            declarations.push(source);
        }

        let data = json!({
            "nsid": doc.id.to_string(),
            "description": doc.description,
            "count": names.len(),
            "type_list": names.join(", "),
            "imports": imports,
            "declarations": declarations,
        });
        let source = self.renderer.render(FILE_STUB, &data)?;
        let path = self.naming.relative_path(&doc.id);
        tracing::debug!(id = %doc.id, path = %path.display(), types = names.len(), "generated module");

        Ok(GeneratedFile {
            id: doc.id.clone(),
            module_path: self.naming.module_path(&doc.id),
            path,
            source,
        })
    }

    /// Render only the main type's declaration, without imports.
    ///
    /// # Errors
    ///
    /// As [`CodeGenerator::generate`].
    pub fn generate_declaration(&self, doc: &LexiconDoc) -> Result<String, GenerationError> {
        let main = generatable_main(doc)?;
        let (_, source) = self.declaration(doc, &doc.id, main, &mut BTreeSet::new())?;
        Ok(source)
    }

    /// Generate `doc` and hand the module to `sink`.
    ///
    /// # Errors
    ///
    /// As [`CodeGenerator::generate`], or [`GenerationError::Sink`].
    pub fn write_to(&self, doc: &LexiconDoc, sink: &dyn CodeSink) -> Result<GeneratedFile, GenerationError> {
        let file = self.generate(doc)?;
        sink.write(&file.path, &file.source)?;
        Ok(file)
    }

    /// `mod.rs` files declaring every directory and module below the root.
    pub fn module_indexes(&self, files: &[GeneratedFile]) -> BTreeMap<PathBuf, String> {
        let mut children: BTreeMap<PathBuf, BTreeSet<String>> = BTreeMap::new();
        for file in files {
            let mut dir = PathBuf::new();
            for component in file.path.components() {
                let part = component.as_os_str().to_string_lossy();
                let module = part.strip_suffix(".rs").unwrap_or(&part).to_string();
                children.entry(dir.clone()).or_default().insert(module);
                dir.push(component);
            }
        }

        children
            .into_iter()
            .map(|(dir, modules)| {
                let mut source = String::from("// @generated by lexgen. Do not edit.\n\n");
                for module in modules {
                    source.push_str(&format!("pub mod {};\n", module_ident(&module)));
                }
                (dir.join("mod.rs"), source)
            })
            .collect()
    }

    /// Write the `mod.rs` files for `files` to `sink`.
    ///
    /// # Errors
    ///
    /// [`GenerationError::Sink`] if the sink refuses a file.
    pub fn write_indexes(&self, files: &[GeneratedFile], sink: &dyn CodeSink) -> Result<usize, GenerationError> {
        let indexes = self.module_indexes(files);
        for (path, source) in &indexes {
            sink.write(path, source)?;
        }
        Ok(indexes.len())
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    fn declaration(
        &self,
        doc: &LexiconDoc,
        id: &Nsid,
        def: &Definition,
        imports: &mut BTreeSet<String>,
    ) -> Result<(String, String), GenerationError> {
        let (object, key) = match def {
            Definition::Record { record, key, .. } => (record, key.as_deref()),
            Definition::Data(TypeNode::Object(object)) => (object, None),
            other => {
                return Err(GenerationError::UnsupportedVariant {
                    id: id.to_string(),
                    variant: other.kind().to_string(),
                })
            }
        };
        let name = self.naming.type_name(id);
        let mapper = self.mapper();
        let rt = &self.runtime_path;

        let mut fields = Vec::new();
        let mut params = Vec::new();
        let mut idents = Vec::new();
        let mut accessors = Vec::new();
        let mut taken = BTreeSet::new();

        for (field, node) in &object.properties {
            let ident = unique_ident(field, &mut taken);
            let mut mapped = mapper.map(node, doc, imports);
            if mapped.target.as_ref().is_some_and(|target| self.leads_back(doc, target, id)) {
                mapped.rust = format!("Box<{}>", mapped.rust);
                mapped.reader = format!("|v| {}(v).map(Box::new)", mapped.reader);
            }
            let optional = object.is_optional(field);
            let rust_type = if optional {
                format!("Option<{}>", mapped.rust)
            } else {
                mapped.rust.clone()
            };
            let read = match (object.is_required(field), object.is_nullable(field)) {
                (true, false) => format!("{rt}::required(map, {field:?}, {})", mapped.reader),
                (true, true) => format!(
                    "{rt}::required(map, {field:?}, |v| {rt}::nullable(v, {}))",
                    mapped.reader
                ),
                (false, _) => format!("{rt}::optional(map, {field:?}, {})", mapped.reader),
            };

            accessors.extend(default_accessor(field, &ident, node, optional));
            if let TypeNode::Array(array) = node {
                let item = match &array.items {
                    Some(items) => mapper.map(items, doc, imports).rust,
                    None => "serde_json::Value".to_string(),
                };
                accessors.push(push_accessor(field, &ident, &item, optional));
            }

            params.push(format!("{ident}: {rust_type}"));
            idents.push(ident.clone());
            fields.push(json!({
                "ident": ident,
                "rust_type": rust_type,
                "read": read,
                "description": field_doc(node),
            }));
        }

        let data = json!({
            "name": name,
            "nsid": format!("{:?}", id.to_string()),
            "key": key.map(|k| format!("{k:?}")),
            "summary": self.summary(doc, id, def, object, key),
            "required": object.required.iter().map(|r| format!("{r:?}")).collect::<Vec<_>>().join(", "),
            "many_params": params.len() > MAX_PLAIN_PARAMS,
            "params": params.join(", "),
            "field_list": idents.join(", "),
            "runtime": rt,
            "fields": fields,
            "accessors": accessors,
        });
        let source = self.renderer.render(DECLARATION_STUB, &data)?;
        Ok((name, source))
    }

    /// Whether the struct `from` reaches the struct `to` through fields
    /// stored inline. `Vec` fields break the chain.
    fn leads_back(&self, doc: &LexiconDoc, from: &Nsid, to: &Nsid) -> bool {
        let mut seen = BTreeSet::new();
        let mut pending = vec![from.clone()];
        while let Some(id) = pending.pop() {
            if &id == to {
                return true;
            }
            if seen.insert(id.clone()) {
                pending.extend(self.inline_struct_fields(doc, &id));
            }
        }
        false
    }

    /// Struct types held directly (not in a `Vec`) by the struct `id`.
    fn inline_struct_fields(&self, doc: &LexiconDoc, id: &Nsid) -> Vec<Nsid> {
        let external;
        let owner: &LexiconDoc = if id.base() == doc.id {
            doc
        } else {
            external = match self.registry.as_ref().and_then(|r| r.get(id)) {
                Some(found) => found,
                None => return Vec::new(),
            };
            &external
        };
        let object = match owner.def(id.definition_name()) {
            Some(Definition::Record { record, .. }) => record,
            Some(Definition::Data(TypeNode::Object(object))) => object,
            _ => return Vec::new(),
        };
        let mapper = self.mapper();
        object
            .properties
            .values()
            .filter_map(|node| mapper.map(node, owner, &mut BTreeSet::new()).target)
            .collect()
    }

    /// Type-level documentation: description, origin, and every property
    /// with its schema type and constraints.
    fn summary(
        &self,
        doc: &LexiconDoc,
        id: &Nsid,
        def: &Definition,
        object: &ObjectType,
        key: Option<&str>,
    ) -> String {
        let mut lines = Vec::new();
        if let Some(description) = def.description().or(object.description.as_deref()) {
            lines.push(description.to_string());
            lines.push(String::new());
        }
        let origin = match key {
            Some(key) => format!("Lexicon: `{id}` ({}, key `{key}`).", def.kind()),
            None => format!("Lexicon: `{id}` ({}).", def.kind()),
        };
        lines.push(origin);

        if !object.properties.is_empty() {
            lines.push(String::new());
            lines.push("# Fields".to_string());
            lines.push(String::new());
        }
        for (field, node) in &object.properties {
            let flags = match (object.is_required(field), object.is_nullable(field)) {
                (true, true) => " (required, nullable)",
                (true, false) => " (required)",
                (false, true) => " (nullable)",
                (false, false) => "",
            };
            let doc_type = mapper::doc_type(node, doc);
            let constraints = mapper::constraints(node);
            if constraints.is_empty() {
                lines.push(format!("- `{field}`{flags}: `{doc_type}`"));
            } else {
                lines.push(format!("- `{field}`{flags}: `{doc_type}`; {}", constraints.join(", ")));
            }
        }
        lines.join("\n")
    }
}

/// The main definition, if it can be generated.
fn generatable_main(doc: &LexiconDoc) -> Result<&Definition, GenerationError> {
    let main = doc.main().ok_or_else(|| GenerationError::MissingMain {
        id: doc.id.to_string(),
    })?;
    match main {
        Definition::Record { .. } | Definition::Data(TypeNode::Object(_)) => Ok(main),
        other => Err(GenerationError::UnsupportedVariant {
            id: doc.id.to_string(),
            variant: other.kind().to_string(),
        }),
    }
}

/// Struct field identifier for `field`, distinct from every entry in `taken`.
fn unique_ident(field: &str, taken: &mut BTreeSet<String>) -> String {
    let base = match field_name(field) {
        ident if ident.is_empty() => "field".to_string(),
        ident => ident,
    };
    let stem = base.strip_prefix("r#").unwrap_or(&base).to_string();
    let mut ident = base.clone();
    let mut n = 2;
    while !taken.insert(ident.clone()) {
        ident = format!("{stem}_{n}");
        n += 1;
    }
    if ident != base {
        tracing::warn!(field, ident = %ident, "property name collides with another field, renamed");
    }
    ident
}

fn field_doc(node: &TypeNode) -> String {
    let mut doc = node.description().unwrap_or_default().to_string();
    let default = match node {
        TypeNode::Boolean(b) => b.default.map(|d| d.to_string()),
        TypeNode::Integer(i) => i.default.map(|d| d.to_string()),
        TypeNode::String(s) => s.default.as_ref().map(|d| format!("{d:?}")),
        _ => None,
    };
    if let Some(default) = default {
        if !doc.is_empty() {
            doc.push_str("\n\n");
        }
        doc.push_str(&format!("Defaults to `{default}`."));
    }
    doc
}

/// `<field>_or_default()` for an optional property with a declared default.
fn default_accessor(field: &str, ident: &str, node: &TypeNode, optional: bool) -> Option<String> {
    if !optional {
        return None;
    }
    let method = format!("{}_or_default", ident.strip_prefix("r#").unwrap_or(ident));
    let (ret, body) = match node {
        TypeNode::Boolean(b) => ("bool", format!("self.{ident}.unwrap_or({})", b.default?)),
        TypeNode::Integer(i) => ("i64", format!("self.{ident}.unwrap_or({})", i.default?)),
        TypeNode::String(s) if s.format != Some(StringFormat::Datetime) => (
            "&str",
            format!("self.{ident}.as_deref().unwrap_or({:?})", s.default.as_ref()?),
        ),
        _ => return None,
    };
    Some(format!(
        "    /// `{field}`, or its schema default when absent.\n    pub fn {method}(&self) -> {ret} {{\n        {body}\n    }}"
    ))
}

/// `push_<item>()` for an array property.
fn push_accessor(field: &str, ident: &str, item: &str, optional: bool) -> String {
    let plural = ident.strip_prefix("r#").unwrap_or(ident).to_string();
    let singular = singularize(&plural);
    let method = if singular == plural {
        format!("push_{plural}_item")
    } else {
        format!("push_{singular}")
    };
    let target = if optional {
        format!("self.{ident}.get_or_insert_with(Vec::new)")
    } else {
        format!("self.{ident}")
    };
    format!(
        "    /// Append to `{field}`.\n    pub fn {method}(&mut self, item: {item}) {{\n        {target}.push(item);\n    }}"
    )
}

/// Generate every generatable document and write the modules plus their
/// `mod.rs` indexes. Documents without a `record` or `object` main are
/// skipped and returned by identifier.
///
/// # Errors
///
/// The first render or sink failure.
pub fn generate_all<'d>(
    generator: &CodeGenerator,
    docs: impl IntoIterator<Item = &'d LexiconDoc>,
    sink: &dyn CodeSink,
) -> Result<(Vec<GeneratedFile>, Vec<Nsid>), GenerationError> {
    let mut files = Vec::new();
    let mut skipped = Vec::new();
    for doc in docs {
        match generator.write_to(doc, sink) {
            Ok(file) => files.push(file),
            Err(GenerationError::UnsupportedVariant { variant, .. }) => {
                tracing::info!(id = %doc.id, variant = %variant, "no record or object to generate, skipping");
                skipped.push(doc.id.clone());
            }
            Err(GenerationError::MissingMain { .. }) => {
                tracing::info!(id = %doc.id, "no main definition, skipping");
                skipped.push(doc.id.clone());
            }
            Err(other) => return Err(other),
        }
    }
    generator.write_indexes(&files, sink)?;
    Ok((files, skipped))
}
