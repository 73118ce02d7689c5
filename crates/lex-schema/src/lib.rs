//! # lex-schema — Lexicon Schema Model and Validation
//!
//! Parses Lexicon schema documents into an immutable model and validates
//! arbitrary JSON data against it.
//!
//! ## Model (`types`, `document`)
//!
//! [`TypeNode`] is a closed sum over the twelve field-level variants, each
//! carrying its own constraints. [`Definition`] adds the primary
//! definitions (`record`, `query`, `procedure`, `subscription`, `token`)
//! and [`LexiconDoc`] is one parsed document, built in two passes so that
//! definitions may reference each other in any order.
//!
//! ## Validation (`validate`, `facade`)
//!
//! [`Validator`] walks a value and a type node together, producing
//! path-qualified [`ValidationError`]s. References are resolved through an
//! injected [`SchemaRegistry`]. [`LexiconValidator`] offers the boolean,
//! path-keyed, single-field, and `Result`-returning entry points.
//!
//! ## Unions (`union`)
//!
//! [`UnionResolver`] maps a `$type` discriminator to a union member.
//!
//! ## Crate Policy
//!
//! - Depends only on `lex-core` internally.
//! - Parsing never panics on malformed input; every failure is a
//!   [`ParseError`] carrying the location of the offending node.
//! - Type nodes are immutable once built and safe to share across threads.

pub mod document;
pub mod error;
pub mod facade;
pub mod format;
pub mod registry;
pub mod types;
pub mod union;
pub mod validate;

pub use document::{Body, Definition, ErrorDecl, LexiconDoc, Message, LEXICON_VERSION};
pub use error::ParseError;
pub use facade::{LexiconValidator, SchemaValidationError};
pub use registry::{resolve_definition, MemoryRegistry, SchemaRegistry};
pub use types::{
    ArrayType, BlobType, BooleanType, BytesType, CidLinkType, IntegerType, NullType, ObjectType,
    RefType, StringFormat, StringType, TypeNode, UnionType, UnknownType,
};
pub use union::{UnionError, UnionResolver};
pub use validate::{
    ValidationError, ValidationMode, ValidationOptions, ValidationOutcome, Validator, Violations,
    MAX_REF_HOPS,
};
