//! Local variable slot coalescing.
//!
//! Local slots whose values are never alive at the same time can share one
//! slot. The [`VariableOptimizer`] finds such slots from the liveness of a
//! method body, builds a [`VariableMap`] from old to new slots, and rewrites
//! the body with the [`VariableRemapper`]. The result uses a smaller frame
//! and behaves exactly like the original.
//!
//! # Key Components
//!
//! - [`VariableOptimizer`] - Per-method and batch entry points
//! - [`OptimizerConfig`] - Receiver reuse, slot limit, debug table trimming and debug output
//! - [`SlotOccupancy`] - Cumulative liveness of destination slots during merging
//! - [`VariableMap`] / [`VariableRemapper`] - Slot mapping and its application
//! - [`MethodListener`] / [`RemapLog`] - Notification about changed methods
//!
//! # Usage
//!
//! ```rust
//! use slotopt::{code::MethodAssembler, optimizer::{OptimizerConfig, VariableOptimizer}};
//!
//! let mut bodies = Vec::new();
//! for name in ["a", "b", "c"] {
//!     let mut asm = MethodAssembler::new_static(name, "()V");
//!     asm.iconst(1)?.istore(0)?.iload(0)?.pop()?
//!         .iconst(2)?.istore(1)?.iload(1)?.pop()?
//!         .return_void()?;
//!     bodies.push(asm.finish()?);
//! }
//!
//! let optimizer = VariableOptimizer::with_config(OptimizerConfig::default());
//! let summary = optimizer.optimize_all(&mut bodies)?;
//! assert_eq!(summary.changed, 3);
//! assert_eq!(summary.slots_saved, 3);
//! # Ok::<(), slotopt::Error>(())
//! ```

mod config;
mod events;
mod map;
mod occupancy;
mod remapper;
mod variables;

pub use config::{OptimizerConfig, DEFAULT_MAX_VARIABLES};
pub use events::{MethodListener, OptimizationSummary, RemapEvent, RemapLog};
pub use map::VariableMap;
pub use occupancy::SlotOccupancy;
pub use remapper::{trim_local_variables, VariableRemapper};
pub use variables::VariableOptimizer;
