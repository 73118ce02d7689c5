//! # Naming Conventions
//!
//! Pure conversions from schema identifiers and field names to Rust module
//! paths, type names, and identifiers.
//!
//! ## Case conversion
//!
//! Words are split on `-`, `_`, space, `.` and `/`, and on case
//! boundaries: before an uppercase letter that follows a lowercase letter
//! or digit (`replyRef` -> `reply`, `Ref`), and before the last capital of
//! an acronym run (`HTMLParser` -> `HTML`, `Parser`). Every converter
//! re-splits its own output the same way, so conversions compose:
//! `to_snake_case(&to_pascal_case(x)) == to_snake_case(x)` for words of two
//! or more characters.
//!
//! Known limitation: a single-letter word or a word starting with a digit
//! is merged into its neighbour once PascalCase has erased the separator.
//!
//! ## Namespaces
//!
//! Module paths are derived from the authority of the identifier. With the
//! default [`NamespaceOrder::Reversed`], `com.example.feed.post` lands in
//! `<root>::feed::example::com::post`: the most specific segment is
//! outermost.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use lex_core::Nsid;
use serde::{Deserialize, Serialize};

/// Words Rust reserves; they become raw identifiers.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in", "let",
    "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return",
    "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use",
    "virtual", "where", "while", "yield",
];

/// Keywords that cannot be raw identifiers; they get a trailing underscore.
const PATH_KEYWORDS: &[&str] = &["crate", "self", "super", "Self"];

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Order of authority segments in generated module paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceOrder {
    /// `com.example.feed` -> `feed::example::com`.
    #[default]
    Reversed,
    /// `com.example.feed` -> `com::example::feed`.
    Forward,
}

impl FromStr for NamespaceOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reversed" => Ok(Self::Reversed),
            "forward" => Ok(Self::Forward),
            other => Err(format!(
                "unknown namespace order \"{other}\" (expected reversed or forward)"
            )),
        }
    }
}

impl fmt::Display for NamespaceOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reversed => "reversed",
            Self::Forward => "forward",
        })
    }
}

/// Where generated modules live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Rust path of the module that holds all generated modules.
    pub root_namespace: String,
    pub order: NamespaceOrder,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            root_namespace: "crate::lexicons".to_string(),
            order: NamespaceOrder::default(),
        }
    }
}

impl NamingConfig {
    /// Module names for the authority of `id`, in configured order.
    pub fn namespace_segments(&self, id: &Nsid) -> Vec<String> {
        let mut segments: Vec<String> = id.authority_segments().map(to_snake_case).collect();
        if self.order == NamespaceOrder::Reversed {
            segments.reverse();
        }
        segments
    }

    /// Module names from the root to the module generated for `id`.
    pub fn module_segments(&self, id: &Nsid) -> Vec<String> {
        let mut segments = self.namespace_segments(id);
        segments.push(to_snake_case(id.name()));
        segments
    }

    /// Full Rust path of the module generated for `id`.
    pub fn module_path(&self, id: &Nsid) -> String {
        let mut path = self.root_namespace.clone();
        for segment in self.module_segments(id) {
            if !path.is_empty() {
                path.push_str("::");
            }
            path.push_str(&module_ident(&segment));
        }
        path
    }

    /// Type name of the definition `id` addresses: `Post` for the main
    /// definition of `...post`, `PostReplyRef` for `...post#replyRef`.
    pub fn type_name(&self, id: &Nsid) -> String {
        let mut name = to_pascal_case(id.name());
        if let Some(fragment) = id.fragment() {
            name.push_str(&to_pascal_case(fragment));
        }
        name
    }

    /// Full Rust path of the type generated for `id`.
    pub fn qualified_type_name(&self, id: &Nsid) -> String {
        format!("{}::{}", self.module_path(id), self.type_name(id))
    }

    /// File path of the module generated for `id`, relative to the root
    /// module's directory.
    pub fn relative_path(&self, id: &Nsid) -> PathBuf {
        let mut path: PathBuf = self
            .namespace_segments(id)
            .iter()
            .map(|segment| file_stem(segment))
            .collect();
        path.push(format!("{}.rs", file_stem(&to_snake_case(id.name()))));
        path
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Rust field name for a schema field: snake case, keywords escaped.
pub fn field_name(name: &str) -> String {
    escape_keyword(&to_snake_case(name))
}

/// Rust module name for a path segment.
pub fn module_ident(segment: &str) -> String {
    escape_keyword(segment)
}

/// File or directory name holding the module `segment`. Raw identifiers
/// map to their bare name; escaped path keywords keep the underscore.
pub fn file_stem(segment: &str) -> String {
    let ident = module_ident(segment);
    match ident.strip_prefix("r#") {
        Some(bare) => bare.to_string(),
        None => ident,
    }
}

fn escape_keyword(ident: &str) -> String {
    if PATH_KEYWORDS.contains(&ident) {
        format!("{ident}_")
    } else if KEYWORDS.contains(&ident) {
        format!("r#{ident}")
    } else if ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{ident}")
    } else {
        ident.to_string()
    }
}

// ---------------------------------------------------------------------------
// Case conversion
// ---------------------------------------------------------------------------

/// Split on separators and case boundaries.
pub fn split_words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn to_pascal_case(s: &str) -> String {
    split_words(s).iter().map(|w| capitalize(w)).collect()
}

pub fn to_camel_case(s: &str) -> String {
    split_words(s)
        .iter()
        .enumerate()
        .map(|(i, w)| if i == 0 { w.to_lowercase() } else { capitalize(w) })
        .collect()
}

pub fn to_snake_case(s: &str) -> String {
    split_words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

pub fn to_kebab_case(s: &str) -> String {
    split_words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

// ---------------------------------------------------------------------------
// Plurals
// ---------------------------------------------------------------------------

/// English plural by a fixed rule table: `y` -> `ies`, `s`/`x`/`ch`/`sh`
/// -> `+es`, otherwise `+s`.
///
/// Not linguistically complete: irregular plurals are wrong, and a word
/// that is already plural is pluralised again (`posts` -> `postses`).
pub fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        format!("{stem}ies")
    } else if ["s", "x", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

/// Inverse of [`pluralize`] over the same rule table.
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    for suffix in ["ses", "xes", "ches", "shes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() && !stem.ends_with('s') => stem.to_string(),
        _ => word.to_string(),
    }
}
