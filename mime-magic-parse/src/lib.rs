//! Magic(5) rule compiler for mime-magic.
//!
//! This crate compiles textual magic rule documents into the immutable
//! [`RuleForest`](mime_magic_core::RuleForest) consumed by
//! `mime-magic-engine`. Compilation is one-pass and total: malformed lines
//! become collected [`Diagnostic`]s rather than errors, and the caller
//! decides whether a partial forest is acceptable.
//!
//! # Example
//!
//! ```
//! use mime_magic_parse::compile;
//!
//! let (forest, diagnostics) = compile(
//!     "builtin",
//!     "0 string %PDF application/pdf\n\
//!      0 belong 0x89504E47 image/png\n",
//! );
//! assert_eq!(forest.roots().len(), 2);
//! assert!(diagnostics.is_empty());
//! ```

pub mod compiler;
pub mod diagnostic;
mod lines;

pub use compiler::{compile, compile_reader, Compiler};
pub use diagnostic::Diagnostic;
