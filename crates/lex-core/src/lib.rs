//! # lex-core — Foundational Types for lexgen
//!
//! This crate is the leaf of the lexgen workspace. It defines the
//! addressing scheme shared by every schema document and every
//! cross-reference, plus the small vocabulary the validator and the code
//! generator must agree on.
//!
//! ## Key Design Principles
//!
//! 1. **Validated identifier newtype.** [`Nsid`] is only constructible
//!    through [`Nsid::parse`]; no bare strings travel between the parser,
//!    the registry, and the generator.
//!
//! 2. **One reference grammar.** [`RefTarget`] distinguishes local
//!    `#fragment` references from fully qualified identifiers so that every
//!    consumer resolves references the same way.
//!
//! 3. **One kind vocabulary.** [`ValueKind`] names the runtime kind of a
//!    JSON value. Type-mismatch errors always report the value's kind, never
//!    the schema's.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lex-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod kind;
pub mod nsid;

pub use error::IdentifierError;
pub use kind::ValueKind;
pub use nsid::{validate_label, Nsid, RefTarget, MAIN_DEF};
