//! FACET compile engine.
//!
//! FACET is a human-readable, machine-deterministic markup for authoring
//! structured AI instructions. Every source document compiles to exactly one
//! canonical JSON value through a fixed, side-effect-free pipeline: lexical
//! normalization, tokenization with indentation, parsing, import expansion,
//! variable resolution and static typing, conditional pruning, anchor and
//! alias resolution, lens application, and JSON construction.
//!
//! The two entry points are [`canonize`] and [`lint`]:
//!
//! ```rust
//! use facet::{canonize, CanonizeOptions};
//!
//! let source = b"@user(name=\"Alex\")\n  message: \"Hello, world!\"\n";
//! let value = canonize(source, &CanonizeOptions::default()).unwrap();
//! assert_eq!(value["user"]["message"], "Hello, world!");
//! ```
//!
//! Determinism is the defining property: identical source, host variables,
//! resolve mode, and import-root contents always produce byte-identical
//! output, including seeded `choose`/`shuffle` lenses.

pub mod anchors;
pub mod api;
pub mod ast;
pub mod diagnostics;
pub mod emit;
pub mod expr;
pub mod imports;
pub mod lenses;
pub mod lexer;
pub mod limits;
pub mod parser;
pub mod pipeline;
pub mod scalars;
pub mod vars;

pub use api::{canonize, format_source, lint, CanonizeOptions, ResolveMode};
pub use diagnostics::{Diagnostic, ErrorCode};
