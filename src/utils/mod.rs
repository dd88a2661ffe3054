//! Utility types shared across the crate.
//!
//! - [`BitSet`] - Fixed-capacity bit vector used for per-offset slot sets
//! - [`graph`] - Graph traits and traversal orders used by the analyses

mod bitset;
pub mod graph;

pub use bitset::{BitSet, BitSetIter};
