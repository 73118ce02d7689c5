//! Loading schema documents from a directory tree.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use lex_schema::{LexiconDoc, MemoryRegistry};

/// Recursively find all `.json` files under a directory, sorted.
pub fn find_schema_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    walk_for_files(dir, &mut files);
    files.sort();
    files
}

fn walk_for_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_for_files(&path, files);
        } else if path.extension().is_some_and(|e| e == "json") {
            files.push(path);
        }
    }
}

/// Parse every schema under `dir`. Any malformed document fails the load.
pub fn load_dir(dir: &Path) -> Result<Vec<LexiconDoc>> {
    if !dir.is_dir() {
        bail!("lexicon directory {} does not exist", dir.display());
    }
    let docs = find_schema_files(dir)
        .iter()
        .map(|path| {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            LexiconDoc::from_json_str(&text)
                .with_context(|| format!("malformed schema {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(count = docs.len(), dir = %dir.display(), "loaded lexicons");
    Ok(docs)
}

/// A registry holding `docs`. Later documents with a duplicate id replace
/// earlier ones, with a warning.
pub fn registry(docs: &[LexiconDoc]) -> MemoryRegistry {
    let registry = MemoryRegistry::new();
    for doc in docs {
        if registry.register(doc.clone()).is_some() {
            tracing::warn!(id = %doc.id, "duplicate lexicon id, keeping the last one");
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_schema::SchemaRegistry;

    fn repo_lexicons() -> PathBuf {
        let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        dir.pop(); // crates/
        dir.pop(); // repo root
        dir.join("lexicons")
    }

    #[test]
    fn loads_repository_fixtures() {
        let docs = load_dir(&repo_lexicons()).unwrap();
        assert!(docs.len() >= 6);
        let registry = registry(&docs);
        assert_eq!(registry.len(), docs.len());
        assert!(registry.has(&lex_core::Nsid::parse("com.example.feed.post").unwrap()));
    }

    #[test]
    fn missing_dir_is_an_error() {
        let err = load_dir(Path::new("/tmp/lexgen-test-nonexistent-dir-xyz")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn malformed_schema_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), r#"{"lexicon": 1, "id": "x"}"#).unwrap();
        let err = load_dir(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("bad.json"), "{err:#}");
    }

    #[test]
    fn ignores_other_files_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("z.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let files = find_schema_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.json"));
    }
}
