//! # mime-magic-core
//!
//! Shared data model and byte-source seam for magic(5) MIME detection.
//!
//! This crate provides:
//! - The compiled rule model: [`Rule`], [`RuleKind`], [`RuleOp`], and the
//!   arena-backed [`RuleForest`]
//! - The byte-source abstraction: [`RandomAccess`] for length-known sources
//!   (in-memory slices, [`MmapSource`]) and [`MarkRead`] for forward streams
//!   with bounded rewind ([`ReplayReader`])
//! - The shared [`Error`] type for source and usage failures
//!
//! ## Design Principles
//!
//! 1. **Immutable after compile**: a forest is append-only while the
//!    compiler builds it and read-only forever after, so it can be shared
//!    across concurrent match calls without locking
//! 2. **Ids, not pointers**: rules reference parents and children by arena
//!    index; no ownership cycles, and source order falls out of id order
//! 3. **One matching core**: both byte-source seams feed the same code; the
//!    stream path buffers a bounded prefix and rejoins the slice path

pub mod error;
pub mod rule;
pub mod source;

pub use error::{Error, Result};
pub use rule::{Rule, RuleForest, RuleId, RuleKind, RuleOp};
pub use source::{MarkRead, MmapSource, RandomAccess, ReplayReader};
