//! Method body model.
//!
//! A [`MethodBody`] holds the instructions of one method together with the
//! tables that refer to local slots or instruction offsets: the exception
//! table and the two local variable debug tables. Bodies are usually built
//! with the [`MethodAssembler`], which lays out offsets and resolves labels.
//!
//! # Key Components
//!
//! - [`Instruction`] / [`Operation`] - Instructions with byte offset, size and operands
//! - [`MethodBody`] - Instructions plus exception and debug tables
//! - [`MethodAssembler`] - Fluent builder with labels
//! - [`descriptor`] - Parameter sizing from method descriptors

mod assembler;
mod body;
pub mod descriptor;
mod instruction;

pub use assembler::MethodAssembler;
pub use body::{AccessFlags, ExceptionHandler, LocalVariable, MethodBody};
pub use instruction::{Condition, Instruction, LocalAccess, Operation, StackOp, ValueKind};
