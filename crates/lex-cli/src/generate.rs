//! # Generate Subcommand
//!
//! Generates one Rust module per `record` or `object` schema, plus the
//! `mod.rs` files that tie them together, below an output directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use lex_codegen::{generate_all, CodeGenerator, NamespaceOrder, StubRenderer};

use crate::config::LexgenConfig;
use crate::lexicons;
use crate::sink::FsSink;

/// Arguments for the `lexgen generate` subcommand.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Directory holding the schema documents.
    #[arg(long, value_name = "DIR")]
    pub lexicons: PathBuf,

    /// Directory that receives the generated modules.
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// Rust path of the module the output directory becomes.
    #[arg(long, value_name = "PATH")]
    pub root_namespace: Option<String>,

    /// Authority order in module paths: reversed or forward.
    #[arg(long)]
    pub namespace_order: Option<NamespaceOrder>,

    /// Rust path of the runtime support crate.
    #[arg(long, value_name = "PATH")]
    pub runtime_path: Option<String>,

    /// Directory of `.hbs` files overriding the built-in stubs by name.
    #[arg(long, value_name = "DIR")]
    pub stubs: Option<PathBuf>,
}

/// Execute the generate subcommand. Returns exit code 0 on success.
pub fn run_generate(args: &GenerateArgs, config: &LexgenConfig) -> Result<u8> {
    let docs = lexicons::load_dir(&args.lexicons)?;
    let registry = Arc::new(lexicons::registry(&docs));

    let mut renderer = StubRenderer::new()?;
    if let Some(dir) = &args.stubs {
        load_stubs(&mut renderer, dir)?;
    }

    let naming = config.naming(args.root_namespace.as_deref(), args.namespace_order);
    let generator = CodeGenerator::new(naming, renderer)
        .with_runtime_path(config.runtime_path(args.runtime_path.as_deref()))
        .with_registry(registry);

    let sink = FsSink::new(&args.out);
    let (files, skipped) = generate_all(&generator, &docs, &sink)
        .with_context(|| format!("generation into {} failed", args.out.display()))?;

    for file in &files {
        println!("  {} -> {}", file.id, file.path.display());
    }
    println!(
        "Generated {} module(s) in {} ({} schema(s) without a record or object skipped).",
        files.len(),
        args.out.display(),
        skipped.len()
    );
    Ok(0)
}

/// Register every `<name>.hbs` under `dir` as stub `<name>`.
fn load_stubs(renderer: &mut StubRenderer, dir: &Path) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read stub directory {}", dir.display()))?;
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "hbs"))
        .collect();
    paths.sort();
    for path in paths {
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read stub {}", path.display()))?;
        renderer.register_stub(name, &source)?;
        tracing::info!(stub = name, path = %path.display(), "overriding stub");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_lexicons() -> PathBuf {
        let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        dir.pop(); // crates/
        dir.pop(); // repo root
        dir.join("lexicons")
    }

    fn args(out: &Path) -> GenerateArgs {
        GenerateArgs {
            lexicons: repo_lexicons(),
            out: out.to_path_buf(),
            root_namespace: None,
            namespace_order: None,
            runtime_path: None,
            stubs: None,
        }
    }

    #[test]
    fn generates_modules_and_indexes() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(run_generate(&args(dir.path()), &LexgenConfig::default()).unwrap(), 0);

        let post = std::fs::read_to_string(dir.path().join("feed/example/com/post.rs")).unwrap();
        assert!(post.contains("pub struct Post {"));
        let root = std::fs::read_to_string(dir.path().join("mod.rs")).unwrap();
        assert!(root.contains("pub mod feed;"));
        assert!(!dir.path().join("feed/example/com/get_timeline.rs").exists());
    }

    #[test]
    fn config_and_flags_shape_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = LexgenConfig {
            namespace_order: Some(NamespaceOrder::Forward),
            runtime_path: Some("rt".to_string()),
            ..LexgenConfig::default()
        };
        let mut args = args(dir.path());
        args.root_namespace = Some("crate::schema".to_string());
        run_generate(&args, &config).unwrap();

        let like = std::fs::read_to_string(dir.path().join("com/example/feed/like.rs")).unwrap();
        assert!(like.contains("use crate::schema::com::example::repo::strong_ref::StrongRef;"));
        assert!(like.contains("rt::required(map, \"subject\", StrongRef::from_value)?"));
    }

    #[test]
    fn stub_overrides_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let stubs = dir.path().join("stubs");
        std::fs::create_dir_all(&stubs).unwrap();
        std::fs::write(stubs.join("file.hbs"), "// custom {{nsid}}\n").unwrap();
        std::fs::write(stubs.join("README.md"), "ignored").unwrap();

        let out = dir.path().join("out");
        let mut args = args(&out);
        args.stubs = Some(stubs);
        run_generate(&args, &LexgenConfig::default()).unwrap();

        let like = std::fs::read_to_string(out.join("feed/example/com/like.rs")).unwrap();
        assert_eq!(like, "// custom com.example.feed.like\n");
    }

    #[test]
    fn broken_stub_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("declaration.hbs"), "{{#each fields}}").unwrap();
        let mut args = args(&dir.path().join("out"));
        args.stubs = Some(dir.path().to_path_buf());
        assert!(run_generate(&args, &LexgenConfig::default()).is_err());
    }
}
