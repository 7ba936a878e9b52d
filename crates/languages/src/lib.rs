//! # Repograph Languages
//!
//! Pluggable per-language AST support: a registry mapping file extensions to
//! declarative language specs, lazy validated grammar loading, and the pure
//! extractor that turns a parsed tree into raw definitions, imports, calls
//! and doc-comment spans.
//!
//! ## Flow
//!
//! ```text
//! file path
//!     │
//!     ├──> LanguageRegistry::resolve (extension → spec, validated grammar)
//!     │      └─> LoadedLanguage (spec + tree_sitter::Language)
//!     │
//!     └──> extract(root, spec, source)
//!            └─> Extraction { defs, imports, calls, docs }
//! ```
//!
//! Adding a language means registering a new `LanguageSpec` value (node-type
//! lists plus a grammar entry point), not writing a new extractor.

mod error;
mod extract;
mod registry;
mod spec;

pub use error::{LanguageError, Result};
pub use extract::{extract, Extraction, NamedSite};
pub use registry::{LanguageRegistry, LoadedLanguage};
pub use spec::{spec_for, LanguageId, LanguageSpec};
