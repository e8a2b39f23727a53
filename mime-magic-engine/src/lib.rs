//! # mime-magic-engine
//!
//! Match engine for compiled magic(5) rule forests: walks every root rule
//! tree over a byte source, collects the rules that matched and carry a
//! MIME type, and selects the most specific one.
//!
//! The engine accepts random-access sources (in-memory bytes, memory-mapped
//! files) and mark-capable forward streams; both feed the same matching
//! core. A forest is immutable, so one [`Detector`] serves concurrent match
//! calls without locking.
//!
//! # Example
//!
//! ```
//! use mime_magic_engine::Detector;
//! use mime_magic_parse::compile;
//!
//! let (forest, diagnostics) = compile(
//!     "builtin",
//!     "0 string %PDF application/pdf\n",
//! );
//! assert!(diagnostics.is_empty());
//!
//! let detector = Detector::new(forest);
//! let detection = detector.detect_bytes(b"%PDF-1.4").unwrap();
//! assert_eq!(detection.mime_type(), Some("application/pdf"));
//! ```

pub mod detector;
mod eval;
pub mod specificity;

pub use detector::{
    Detection, Detector, DetectorConfig, MatchMode, MatchResult, UNKNOWN_MIME_TYPE,
};
pub use specificity::specificity;

// Re-export the core types callers need alongside the engine.
pub use mime_magic_core::{
    Error, MarkRead, MmapSource, RandomAccess, ReplayReader, Result, RuleForest, RuleId,
};
