//! Instruction-level control flow.
//!
//! Liveness is computed per instruction, so the graph has one node per
//! instruction instead of one per basic block. Exception handler edges are
//! tracked separately from normal edges because the liveness transfer
//! function treats them differently.
//!
//! # Key Components
//!
//! - [`InstructionGraph`] - Successors, handlers and predecessors of every instruction
//! - [`Edge`] / [`EdgeKind`] - Edges classified by the kind of control transfer
//!
//! # Subroutines
//!
//! `jsr` edges lead to the subroutine entry. A `ret` is connected to the
//! instruction following every `jsr` of the method, a conservative superset
//! of the return sites that avoids tracking return addresses.

mod edge;
mod graph;

pub use edge::{Edge, EdgeKind};
pub use graph::InstructionGraph;
