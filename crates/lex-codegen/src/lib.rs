//! # lex-codegen — Rust Code Generation from Lexicon Schemas
//!
//! Turns parsed Lexicon documents into Rust modules: one struct per
//! `record` or `object` definition, with constructors and readers built on
//! `lex-runtime`.
//!
//! ## Pipeline
//!
//! 1. [`naming`] derives module paths, type names, and field identifiers.
//! 2. [`mapper`] maps each property's type node to a Rust type, a reader
//!    expression, and the imports it needs.
//! 3. [`render`] lays the result out through handlebars stubs owned by a
//!    [`StubRenderer`].
//! 4. [`generator`] assembles declarations into a module and hands it to
//!    a [`CodeSink`].
//!
//! ## Crate Policy
//!
//! - The generator performs no I/O. Sinks are injected.
//! - Stubs are compiled once per renderer; there is no global cache.

pub mod error;
pub mod generator;
pub mod mapper;
pub mod naming;
pub mod render;
pub mod sink;

pub use error::{GenerationError, SinkError};
pub use generator::{generate_all, CodeGenerator, GeneratedFile};
pub use mapper::{Mapped, TypeMapper};
pub use naming::{NamespaceOrder, NamingConfig};
pub use render::StubRenderer;
pub use sink::{CodeSink, MemorySink};
