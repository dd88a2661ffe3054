// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # slotopt
//!
//! Liveness analysis and local variable slot coalescing for JVM-style method bodies.
//!
//! A method keeps its local variables in a fixed array of slots. Compilers usually give every
//! source variable its own slot, even when two variables are never in use at the same time.
//! `slotopt` computes exactly where every slot holds a value that may still be read, and then
//! packs variables with disjoint lifetimes into shared slots, shrinking the frame of the method
//! without changing its behavior.
//!
//! ## Features
//!
//! - **Per-instruction liveness** - Alive-before and alive-after facts for every slot at every
//!   instruction, including exception handler and subroutine control flow
//! - **First-fit coalescing** - Every non-parameter slot moves to the lowest compatible slot
//! - **Safe by construction** - Parameters, `long`/`double` values and (optionally) the receiver
//!   slot are never touched
//! - **Debug tables** - Local variable tables are remapped and trimmed along with the code
//! - **Batch mode** - Many methods are optimized in parallel with `rayon`
//!
//! ## Quick Start
//!
//! ```rust
//! use slotopt::prelude::*;
//!
//! // static void f() { int a = 1; use(a); int b = 2; use(b); }
//! let mut asm = MethodAssembler::new_static("f", "()V");
//! asm.iconst(1)?.istore(0)?.iload(0)?.invoke(1)?
//!     .iconst(2)?.istore(1)?.iload(1)?.invoke(1)?
//!     .return_void()?;
//! let mut body = asm.finish()?;
//! assert_eq!(body.max_locals, 2);
//!
//! assert!(VariableOptimizer::new().optimize(&mut body)?);
//! assert_eq!(body.max_locals, 1);
//! # Ok::<(), slotopt::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`code`] - The method body model: instructions, exception and debug tables, an assembler
//! - [`analysis`] - Instruction-level control flow graph and the liveness solver
//! - [`optimizer`] - Slot coalescing, remapping and reporting
//! - [`utils`] - Bit sets and graph traversal shared by the analyses
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. A method body is validated before it is
//! analyzed; a body that fails validation produces an [`Error`] and is never modified.
//!
//! ## Logging
//!
//! The crate emits records through the [`log`](https://docs.rs/log) facade and never installs
//! a logger itself. Enable [`OptimizerConfig::debug`](optimizer::OptimizerConfig::debug) to
//! log the variable map of every visited method.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use slotopt::prelude::*;
///
/// let optimizer = VariableOptimizer::with_config(OptimizerConfig::aggressive());
/// assert!(optimizer.config().allow_receiver_slot_reuse);
/// ```
pub mod prelude;

/// Program analysis of method bodies.
///
/// Builds the per-instruction control flow graph and solves backward liveness of every local
/// slot over it.
///
/// # Key Types
///
/// - [`analysis::InstructionGraph`] - Successors, exception handlers and predecessors
/// - [`analysis::LivenessAnalyzer`] - Worklist solver
/// - [`analysis::Liveness`] - Alive-before, alive-after and category 2 facts
pub mod analysis;

/// The in-memory method body model.
///
/// # Key Types
///
/// - [`code::MethodBody`] - Instructions plus exception and debug tables
/// - [`code::Instruction`] - A single instruction at a byte offset
/// - [`code::MethodAssembler`] - Label-based builder for method bodies
pub mod code;

/// Liveness-driven coalescing of local variable slots.
///
/// # Key Types
///
/// - [`optimizer::VariableOptimizer`] - Entry point
/// - [`optimizer::OptimizerConfig`] - Tuning knobs
/// - [`optimizer::VariableMap`] - Result of the slot assignment
pub mod optimizer;

/// Utility types shared by the analyses.
pub mod utils;

/// `slotopt` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `slotopt` Error type
///
/// The main error type for all operations in this crate. See [`Error`] for the individual
/// failure modes.
pub use error::Error;
