//! # Schema Registry
//!
//! The lookup collaborator used to resolve cross-document references and
//! union members. The validator never constructs a registry itself; callers
//! inject one through [`crate::Validator::with_registry`].
//!
//! [`MemoryRegistry`] is the in-process implementation. Lookups take a read
//! lock, registration takes the write lock, so concurrent validations can
//! resolve references while schema loading stays rare and exclusive.

use std::collections::HashMap;
use std::sync::Arc;

use lex_core::Nsid;
use parking_lot::RwLock;

use crate::document::{Definition, LexiconDoc};

/// Resolves document identifiers to parsed documents.
pub trait SchemaRegistry: Send + Sync {
    /// The document with this identifier. Any fragment is ignored.
    fn get(&self, id: &Nsid) -> Option<Arc<LexiconDoc>>;

    /// Whether a document with this identifier is known.
    fn has(&self, id: &Nsid) -> bool {
        self.get(id).is_some()
    }
}

/// Look up the definition an identifier addresses (`main` when it carries
/// no fragment), together with its enclosing document.
pub fn resolve_definition(
    registry: &dyn SchemaRegistry,
    id: &Nsid,
) -> Option<(Arc<LexiconDoc>, Definition)> {
    let doc = registry.get(id)?;
    let def = doc.def(id.definition_name())?.clone();
    Some((doc, def))
}

/// Thread-safe, cloneable in-memory registry.
///
/// `parking_lot::RwLock` does not poison, so a panicking writer cannot lock
/// readers out permanently.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    docs: Arc<RwLock<HashMap<Nsid, Arc<LexiconDoc>>>>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, returning the document it replaced, if any.
    pub fn register(&self, doc: LexiconDoc) -> Option<Arc<LexiconDoc>> {
        let id = doc.id.base();
        tracing::debug!(id = %id, defs = doc.defs.len(), "registering schema");
        self.docs.write().insert(id, Arc::new(doc))
    }

    /// Number of registered documents.
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<Nsid> {
        let mut ids: Vec<Nsid> = self.docs.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl SchemaRegistry for MemoryRegistry {
    fn get(&self, id: &Nsid) -> Option<Arc<LexiconDoc>> {
        self.docs.read().get(&id.base()).cloned()
    }

    fn has(&self, id: &Nsid) -> bool {
        self.docs.read().contains_key(&id.base())
    }
}

impl FromIterator<LexiconDoc> for MemoryRegistry {
    fn from_iter<I: IntoIterator<Item = LexiconDoc>>(iter: I) -> Self {
        let registry = Self::new();
        for doc in iter {
            registry.register(doc);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str) -> LexiconDoc {
        LexiconDoc::from_value(&json!({
            "lexicon": 1,
            "id": id,
            "defs": {
                "main": {"type": "object", "properties": {"a": {"type": "string"}}},
                "view": {"type": "string"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let registry = MemoryRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.register(doc("a.b.c")).is_none());
        assert!(registry.register(doc("a.b.c")).is_some(), "second register replaces");
        assert_eq!(registry.len(), 1);

        let id = Nsid::parse("a.b.c#view").unwrap();
        assert!(registry.has(&id), "fragment ignored for lookup");
        assert_eq!(registry.get(&id).unwrap().id.to_string(), "a.b.c");
    }

    #[test]
    fn test_resolve_definition() {
        let registry: MemoryRegistry = [doc("a.b.c"), doc("d.e.f")].into_iter().collect();
        assert_eq!(registry.ids().len(), 2);

        let (_, def) = resolve_definition(&registry, &Nsid::parse("a.b.c#view").unwrap()).unwrap();
        assert_eq!(def.kind(), "string");
        let (_, main) = resolve_definition(&registry, &Nsid::parse("d.e.f").unwrap()).unwrap();
        assert_eq!(main.kind(), "object");
        assert!(resolve_definition(&registry, &Nsid::parse("a.b.c#nope").unwrap()).is_none());
        assert!(resolve_definition(&registry, &Nsid::parse("x.y.z").unwrap()).is_none());
    }

    #[test]
    fn test_concurrent_readers() {
        let registry = MemoryRegistry::new();
        registry.register(doc("a.b.c"));
        let id = Nsid::parse("a.b.c").unwrap();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..100 {
                        assert!(registry.has(&id));
                    }
                });
            }
        });
    }
}
