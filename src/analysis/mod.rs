//! Program analysis of method bodies.
//!
//! The analysis module is organized into focused sub-modules:
//!
//! - [`cfg`] - Instruction-level control flow graph, including exception and
//!   subroutine edges
//! - [`dataflow`] - Backward liveness of local slots
//!
//! # Usage
//!
//! ```rust
//! use slotopt::{analysis::{InstructionGraph, LivenessAnalyzer}, code::MethodAssembler};
//!
//! let mut asm = MethodAssembler::new_instance("get", "()I");
//! asm.iconst(7)?.istore(1)?.iload(1)?.return_value(slotopt::code::ValueKind::Int)?;
//! let body = asm.finish()?;
//!
//! let graph = InstructionGraph::build(&body)?;
//! assert_eq!(graph.exits().count(), 1);
//!
//! let liveness = LivenessAnalyzer::analyze(&body)?;
//! // bipush 7 takes two bytes, so the load sits at offset 3.
//! assert!(liveness.is_alive_before(3, 1));
//! # Ok::<(), slotopt::Error>(())
//! ```

pub mod cfg;
pub mod dataflow;

pub use cfg::{Edge, EdgeKind, InstructionGraph};
pub use dataflow::{Liveness, LivenessAnalyzer, SlotEffects};
