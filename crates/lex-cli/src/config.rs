//! # Configuration
//!
//! `lexgen.yaml` holds defaults for both subcommands. Every key is
//! optional and every key can be overridden by a command-line flag.
//!
//! ```yaml
//! root_namespace: crate::lexicons
//! namespace_order: reversed   # or forward
//! runtime_path: lex_runtime
//! mode: optimistic            # strict, optimistic, or lenient
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use lex_codegen::{NamespaceOrder, NamingConfig};
use lex_schema::ValidationMode;
use serde::Deserialize;

/// Config file read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG: &str = "lexgen.yaml";

/// Contents of `lexgen.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LexgenConfig {
    pub root_namespace: Option<String>,
    pub namespace_order: Option<NamespaceOrder>,
    pub runtime_path: Option<String>,
    pub mode: Option<ValidationMode>,
}

impl LexgenConfig {
    /// Load `path`, or `./lexgen.yaml` when no path is given and the file
    /// exists, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG).is_file() => Self::from_file(Path::new(DEFAULT_CONFIG)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Naming configuration, with flag values taking precedence.
    pub fn naming(&self, root_namespace: Option<&str>, order: Option<NamespaceOrder>) -> NamingConfig {
        let defaults = NamingConfig::default();
        NamingConfig {
            root_namespace: root_namespace
                .map(str::to_string)
                .or_else(|| self.root_namespace.clone())
                .unwrap_or(defaults.root_namespace),
            order: order.or(self.namespace_order).unwrap_or(defaults.order),
        }
    }

    pub fn runtime_path(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.runtime_path.clone())
            .unwrap_or_else(|| "lex_runtime".to_string())
    }

    pub fn mode(&self, flag: Option<ValidationMode>) -> ValidationMode {
        flag.or(self.mode).unwrap_or_default()
    }
}
