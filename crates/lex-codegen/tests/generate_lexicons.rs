//! Integration test: generate modules for every fixture under `lexicons/`
//! and check the generated API against the schemas.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lex_codegen::{
    generate_all, CodeGenerator, GenerationError, MemorySink, NamespaceOrder, NamingConfig,
    StubRenderer,
};
use lex_core::Nsid;
use lex_schema::{LexiconDoc, MemoryRegistry, SchemaRegistry};
use serde_json::json;

/// Find the repository root.
fn repo_root() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir
}

fn find_schema_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(find_schema_files(&path));
            } else if path.extension().is_some_and(|e| e == "json") {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

fn load_docs() -> Vec<LexiconDoc> {
    find_schema_files(&repo_root().join("lexicons"))
        .iter()
        .map(|path| {
            let text = std::fs::read_to_string(path).unwrap();
            LexiconDoc::from_json_str(&text)
                .unwrap_or_else(|e| panic!("{} failed to parse: {e}", path.display()))
        })
        .collect()
}

fn generator(docs: &[LexiconDoc]) -> CodeGenerator {
    let registry: MemoryRegistry = docs.iter().cloned().collect();
    CodeGenerator::new(NamingConfig::default(), StubRenderer::new().unwrap())
        .with_registry(Arc::new(registry))
}

fn doc<'d>(docs: &'d [LexiconDoc], id: &str) -> &'d LexiconDoc {
    docs.iter()
        .find(|d| d.id.to_string() == id)
        .unwrap_or_else(|| panic!("fixture {id} missing"))
}

#[test]
fn test_every_record_and_object_generates() {
    let docs = load_docs();
    let generator = generator(&docs);
    let sink = MemorySink::new();
    let (files, skipped) = generate_all(&generator, &docs, &sink).unwrap();

    assert_eq!(
        skipped,
        vec![Nsid::parse("com.example.feed.getTimeline").unwrap()],
        "only the query is skipped"
    );
    assert_eq!(files.len(), docs.len() - 1);
    for file in &files {
        let source = sink.get(&file.path).unwrap();
        assert!(source.starts_with(&format!("// @generated by lexgen from {}.", file.id)));
    }
    assert!(sink.get("mod.rs").unwrap().contains("pub mod feed;"));
    assert!(sink.get("feed/example/com/mod.rs").unwrap().contains("pub mod post;"));
}

#[test]
fn test_query_is_unsupported() {
    let docs = load_docs();
    let err = generator(&docs)
        .generate(doc(&docs, "com.example.feed.getTimeline"))
        .unwrap_err();
    match err {
        GenerationError::UnsupportedVariant { id, variant } => {
            assert_eq!(id, "com.example.feed.getTimeline");
            assert_eq!(variant, "query");
        }
        other => panic!("expected UnsupportedVariant, got {other}"),
    }
}

#[test]
fn test_required_list_matches_schema() {
    let docs = load_docs();
    let generator = generator(&docs);
    for d in &docs {
        let Some(object) = d.main().and_then(|m| m.object()) else {
            continue;
        };
        let source = generator.generate_declaration(d).unwrap();
        let expected: Vec<String> = object.required.iter().map(|r| format!("{r:?}")).collect();
        let line = format!("pub const REQUIRED: &[&str] = &[{}];", expected.join(", "));
        assert!(source.contains(&line), "{} lacks {line}", d.id);
    }
}

#[test]
fn test_post_module() {
    let docs = load_docs();
    let file = generator(&docs).generate(doc(&docs, "com.example.feed.post")).unwrap();
    let src = &file.source;

    assert_eq!(file.path, PathBuf::from("feed/example/com/post.rs"));
    assert!(src.contains("//! A short text post, optionally replying to another post."));
    assert!(src.contains("use crate::lexicons::repo::example::com::strong_ref::StrongRef;"));
    assert!(src.contains("pub reply: Option<PostReplyRef>,"));
    assert!(src.contains("pub embed: Option<serde_json::Value>,"));
    assert!(src.contains("pub langs: Option<Vec<String>>,"));
    assert!(src.contains("pub root: StrongRef,"));
    assert!(src.contains("pub fn push_lang(&mut self, item: String) {"));
    assert!(src.contains("/// - `text` (required): `string`; maxLength 3000, maxGraphemes 300"));
    assert!(src.contains(
        "/// - `embed`: `unknown`"
    ));
}

#[test]
fn test_profile_keywords_and_defaults() {
    let docs = load_docs();
    let src = generator(&docs)
        .generate(doc(&docs, "com.example.actor.profile"))
        .unwrap()
        .source;

    assert!(src.contains("pub const KEY: &str = \"literal:self\";"));
    assert!(src.contains("pub r#type: Option<String>,"));
    assert!(src.contains("r#type: lex_runtime::optional(map, \"type\", lex_runtime::read_string)?,"));
    assert!(src.contains("pub description: Option<String>,"));
    assert!(src.contains("pub avatar: Option<BlobRef>,"));
    assert!(src.contains("use lex_runtime::BlobRef;"));
    assert!(src.contains("pub fn visibility_or_default(&self) -> &str {"));
    assert!(src.contains("pub fn posts_count_or_default(&self) -> i64 {"));
    assert!(src.contains("pub labels: Option<serde_json::Value>,"));
}

#[test]
fn test_images_embed_uses_local_struct() {
    let docs = load_docs();
    let src = generator(&docs)
        .generate(doc(&docs, "com.example.embed.images"))
        .unwrap()
        .source;
    assert!(src.contains("pub struct Images {"));
    assert!(src.contains("pub struct ImagesImage {"));
    assert!(src.contains("pub images: Vec<ImagesImage>,"));
    assert!(src.contains("|v| lex_runtime::read_array(v, ImagesImage::from_value)"));
    assert!(src.contains("pub fn push_image(&mut self, item: ImagesImage) {"));
}

#[test]
fn test_forward_namespace_and_custom_runtime() {
    let docs = load_docs();
    let naming = NamingConfig {
        root_namespace: "crate::schema".to_string(),
        order: NamespaceOrder::Forward,
    };
    let generator = CodeGenerator::new(naming, StubRenderer::new().unwrap()).with_runtime_path("rt");
    let file = generator.generate(doc(&docs, "com.example.feed.like")).unwrap();
    assert_eq!(file.path, PathBuf::from("com/example/feed/like.rs"));
    assert_eq!(file.module_path, "crate::schema::com::example::feed::like");
    assert!(file.source.contains("use crate::schema::com::example::repo::strong_ref::StrongRef;"));
    assert!(file.source.contains("rt::required(map, \"subject\", StrongRef::from_value)?"));
}

#[test]
fn test_registry_has_all_fixtures() {
    let docs = load_docs();
    let registry: MemoryRegistry = docs.iter().cloned().collect();
    for d in &docs {
        assert!(registry.has(&d.id));
    }
}

fn thread() -> LexiconDoc {
    LexiconDoc::from_value(&json!({
        "lexicon": 1,
        "id": "com.example.feed.thread",
        "defs": {
            "main": {
                "type": "object",
                "required": ["root"],
                "properties": {"root": {"type": "ref", "ref": "#node"}}
            },
            "node": {
                "type": "object",
                "properties": {
                    "parent": {"type": "ref", "ref": "#edge"},
                    "children": {"type": "array", "items": {"type": "ref", "ref": "#edge"}}
                }
            },
            "edge": {
                "type": "object",
                "properties": {"to": {"type": "ref", "ref": "#node"}}
            }
        }
    }))
    .unwrap()
}

#[test]
fn test_mutually_recursive_definitions_are_boxed() {
    let doc = thread();
    let src = generator(std::slice::from_ref(&doc)).generate(&doc).unwrap().source;

    assert!(src.contains("pub parent: Option<Box<ThreadEdge>>,"), "{src}");
    assert!(src.contains("pub to: Option<Box<ThreadNode>>,"), "{src}");
    assert!(src.contains("|v| ThreadEdge::from_value(v).map(Box::new)"));
    assert!(src.contains("|v| ThreadNode::from_value(v).map(Box::new)"));
    // Outside the cycle, or behind a Vec, fields stay inline.
    assert!(src.contains("pub root: ThreadNode,"));
    assert!(src.contains("pub children: Option<Vec<ThreadEdge>>,"));
}

#[test]
fn test_recursion_across_documents_is_boxed() {
    let question = LexiconDoc::from_value(&json!({
        "lexicon": 1,
        "id": "com.example.qa.question",
        "defs": {"main": {
            "type": "object",
            "properties": {"accepted": {"type": "ref", "ref": "com.example.qa.answer"}}
        }}
    }))
    .unwrap();
    let answer = LexiconDoc::from_value(&json!({
        "lexicon": 1,
        "id": "com.example.qa.answer",
        "defs": {"main": {
            "type": "object",
            "required": ["question"],
            "properties": {"question": {"type": "ref", "ref": "com.example.qa.question"}}
        }}
    }))
    .unwrap();
    let docs = vec![question, answer];
    let generator = generator(&docs);

    let question_src = generator.generate(&docs[0]).unwrap().source;
    assert!(question_src.contains("pub accepted: Option<Box<Answer>>,"), "{question_src}");
    let answer_src = generator.generate(&docs[1]).unwrap().source;
    assert!(answer_src.contains("pub question: Box<Question>,"), "{answer_src}");
}

#[test]
fn test_colliding_property_names_get_distinct_fields() {
    let doc = LexiconDoc::from_value(&json!({
        "lexicon": 1,
        "id": "com.example.feed.stamp",
        "defs": {"main": {
            "type": "object",
            "properties": {
                "createdAt": {"type": "string"},
                "created_at": {"type": "string"},
                "$": {"type": "integer"}
            }
        }}
    }))
    .unwrap();
    let src = generator(std::slice::from_ref(&doc)).generate(&doc).unwrap().source;

    assert!(src.contains("pub created_at: Option<String>,"));
    assert!(src.contains("pub created_at_2: Option<String>,"));
    assert!(src.contains("pub field: Option<i64>,"));
    assert!(src.contains("created_at_2: lex_runtime::optional(map, \"created_at\", lex_runtime::read_string)?,"));
    assert!(src.contains("field: lex_runtime::optional(map, \"$\", lex_runtime::read_integer)?,"));
}
