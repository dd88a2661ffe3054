//! # slotopt Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the slotopt library. Import this module to get quick access to everything needed
//! to build, analyze and optimize method bodies.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all slotopt operations
pub use crate::Error;

/// The result type used throughout slotopt
pub use crate::Result;

// ================================================================================================
// Method Body Model
// ================================================================================================

/// Method bodies and their tables
pub use crate::code::{AccessFlags, ExceptionHandler, LocalVariable, MethodBody};

/// Instructions and operands
pub use crate::code::{Condition, Instruction, Operation, StackOp, ValueKind};

/// Label-based construction of method bodies
pub use crate::code::MethodAssembler;

// ================================================================================================
// Analysis
// ================================================================================================

/// Control flow and liveness
pub use crate::analysis::{InstructionGraph, Liveness, LivenessAnalyzer};

// ================================================================================================
// Optimization
// ================================================================================================

/// Slot coalescing
pub use crate::optimizer::{OptimizerConfig, VariableMap, VariableOptimizer};

/// Reporting of changed methods
pub use crate::optimizer::{MethodListener, OptimizationSummary, RemapLog};
