//! # Validate Subcommand
//!
//! Validates JSON (or YAML) data files against one schema definition.
//!
//! Every file is checked and reported; the exit code is 1 when any file
//! fails. An unknown schema or unreadable file is an operational error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use lex_core::Nsid;
use lex_schema::{LexiconValidator, SchemaValidationError, ValidationMode};
use serde_json::Value;

use crate::config::LexgenConfig;
use crate::lexicons;

/// Arguments for the `lexgen validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Directory holding the schema documents.
    #[arg(long, value_name = "DIR")]
    pub lexicons: PathBuf,

    /// Identifier of the definition to validate against, e.g.
    /// `com.example.feed.post` or `com.example.feed.post#replyRef`.
    #[arg(long, value_name = "NSID")]
    pub schema: String,

    /// Strictness: strict, optimistic, or lenient.
    #[arg(long)]
    pub mode: Option<ValidationMode>,

    /// Data files to validate.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when every file is valid, 1 when any is not.
pub fn run_validate(args: &ValidateArgs, config: &LexgenConfig) -> Result<u8> {
    let schema = Nsid::parse(&args.schema)
        .with_context(|| format!("invalid schema identifier \"{}\"", args.schema))?;
    let docs = lexicons::load_dir(&args.lexicons)?;
    let mode = config.mode(args.mode);
    let validator = LexiconValidator::new(Arc::new(lexicons::registry(&docs))).with_mode(mode);

    tracing::info!(schema = %schema, mode = %mode, files = args.files.len(), "validating");

    let mut failed = 0usize;
    for path in &args.files {
        let value = read_data(path)?;
        match validator.validate_id(&value, &schema) {
            Ok(()) => println!("PASS: {}", path.display()),
            Err(SchemaValidationError::ValidationFailed { violations, .. }) => {
                failed += 1;
                println!("FAIL: {}", path.display());
                println!("{violations}");
            }
            Err(e @ SchemaValidationError::SchemaNotFound { .. }) => {
                return Err(e).context(format!("cannot validate {}", path.display()));
            }
        }
    }

    println!("{}/{} passed", args.files.len() - failed, args.files.len());
    Ok(if failed > 0 { 1 } else { 0 })
}

/// Read a data file: YAML for `.yaml`/`.yml`, JSON otherwise.
fn read_data(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_yaml = path
        .extension()
        .is_some_and(|e| e == "yaml" || e == "yml");
    if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
    }
}
