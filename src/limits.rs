//! Central resource ceilings for the compile engine.
//!
//! Every bound the engine enforces lives here so the enforcement sites and
//! the tests agree on a single set of numbers.

/// Maximum size of a source document in bytes, after newline normalization.
pub const MAX_DOCUMENT_BYTES: usize = 1 << 20;

/// Maximum size of a single fence body in bytes.
pub const MAX_FENCE_BYTES: usize = 256 * 1024;

/// Maximum indentation depth (levels of two spaces).
pub const MAX_INDENT_DEPTH: usize = 32;

/// Maximum depth of nested `@import` resolution.
pub const MAX_IMPORT_DEPTH: usize = 8;

/// Maximum number of files loaded through `@import` per canonicalization.
pub const MAX_IMPORT_COUNT: usize = 64;

/// Maximum number of lens calls in a single pipeline.
pub const MAX_PIPELINE_LENGTH: usize = 16;
