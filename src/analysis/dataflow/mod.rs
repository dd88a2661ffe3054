//! Liveness of local slots.
//!
//! This module computes, for every instruction of a method body and every
//! local slot, whether the slot holds a value that may still be read. The
//! analysis runs per instruction rather than per basic block, since the
//! slot optimizer needs facts at every program point.
//!
//! # Key Components
//!
//! - [`SlotEffects`] - Uses, kills and writes of a single instruction
//! - [`LivenessAnalyzer`] - Worklist solver producing the tables
//! - [`Liveness`] - Alive-before, alive-after and category 2 facts per offset

mod effects;
mod liveness;
mod solver;

pub use effects::SlotEffects;
pub use liveness::Liveness;
pub use solver::LivenessAnalyzer;
