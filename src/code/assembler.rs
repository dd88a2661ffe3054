//! Fluent construction of method bodies.
//!
//! [`MethodAssembler`] builds a [`MethodBody`] from a sequence of operations
//! with symbolic labels. Offsets and encoded sizes are computed when the
//! body is finished, labels are resolved to byte offsets, and the result is
//! validated before it is handed out.
//!
//! # Examples
//!
//! ```rust
//! use slotopt::code::{MethodAssembler, ValueKind};
//!
//! // static int count(int n) { int i = 0; while (i < n) i++; return i; }
//! let mut asm = MethodAssembler::new_static("count", "(I)I");
//! asm.iconst(0)?
//!     .istore(1)?
//!     .label("loop")?
//!     .iload(1)?
//!     .iload(0)?
//!     .if_icmpge("done")?
//!     .iinc(1, 1)?
//!     .goto("loop")?
//!     .label("done")?
//!     .iload(1)?
//!     .return_value(ValueKind::Int)?;
//!
//! let body = asm.finish()?;
//! assert_eq!(body.max_locals, 2);
//! assert_eq!(body.code_length(), 15);
//! # Ok::<(), slotopt::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    code::{
        AccessFlags, Condition, ExceptionHandler, Instruction, LocalVariable, MethodBody,
        Operation, StackOp, ValueKind,
    },
    Error, Result,
};

/// An operation whose jump targets may still be symbolic.
enum PendingOp {
    Resolved(Operation),
    Goto(String),
    Jsr(String),
    Branch(Condition, String),
    Switch {
        default: String,
        cases: Vec<(i32, String)>,
    },
}

impl PendingOp {
    /// The operation with every label replaced by `lookup(label)`.
    fn resolve(&self, lookup: impl Fn(&str) -> Result<u32>) -> Result<Operation> {
        Ok(match self {
            Self::Resolved(op) => op.clone(),
            Self::Goto(label) => Operation::Goto {
                target: lookup(label)?,
            },
            Self::Jsr(label) => Operation::Jsr {
                target: lookup(label)?,
            },
            Self::Branch(condition, label) => Operation::Branch {
                condition: *condition,
                target: lookup(label)?,
            },
            Self::Switch { default, cases } => Operation::Switch {
                default: lookup(default)?,
                cases: cases
                    .iter()
                    .map(|(key, label)| Ok((*key, lookup(label)?)))
                    .collect::<Result<_>>()?,
            },
        })
    }
}

struct PendingHandler {
    start: String,
    end: String,
    handler: String,
    catch_type: Option<String>,
}

struct PendingLocal {
    name: String,
    descriptor: String,
    slot: u16,
    start: String,
    end: String,
}

/// Builder for [`MethodBody`] with symbolic labels.
///
/// Every emitting method returns `Result<&mut Self>` so calls chain with `?`.
/// Label references are checked when [`MethodAssembler::finish`] runs.
pub struct MethodAssembler {
    name: String,
    descriptor: String,
    access: AccessFlags,
    ops: Vec<PendingOp>,
    /// Label name to the index of the instruction that follows it.
    labels: HashMap<String, usize>,
    handlers: Vec<PendingHandler>,
    locals: Vec<PendingLocal>,
    local_types: Vec<PendingLocal>,
    max_stack: u16,
    max_locals: Option<u16>,
}

impl MethodAssembler {
    /// Creates an assembler for a method with the given access flags.
    #[must_use]
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>, access: AccessFlags) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access,
            ops: Vec::new(),
            labels: HashMap::new(),
            handlers: Vec::new(),
            locals: Vec::new(),
            local_types: Vec::new(),
            max_stack: 0,
            max_locals: None,
        }
    }

    /// Creates an assembler for a public static method.
    #[must_use]
    pub fn new_static(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self::new(name, descriptor, AccessFlags::PUBLIC | AccessFlags::STATIC)
    }

    /// Creates an assembler for a public instance method.
    #[must_use]
    pub fn new_instance(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self::new(name, descriptor, AccessFlags::PUBLIC)
    }

    /// Overrides the computed frame size.
    pub fn max_locals(&mut self, max_locals: u16) -> &mut Self {
        self.max_locals = Some(max_locals);
        self
    }

    /// Sets the recorded operand stack depth.
    pub fn max_stack(&mut self, max_stack: u16) -> &mut Self {
        self.max_stack = max_stack;
        self
    }

    /// Places a label before the next emitted instruction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateLabel`] if the label was placed before.
    pub fn label(&mut self, name: &str) -> Result<&mut Self> {
        if self.labels.insert(name.to_string(), self.ops.len()).is_some() {
            return Err(Error::DuplicateLabel(name.to_string()));
        }
        Ok(self)
    }

    /// Emits an arbitrary operation with resolved targets.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn emit(&mut self, op: Operation) -> Result<&mut Self> {
        self.ops.push(PendingOp::Resolved(op));
        Ok(self)
    }

    /// Emits a stack-only operation.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn stack(&mut self, op: StackOp) -> Result<&mut Self> {
        self.emit(Operation::Stack(op))
    }

    /// Emits a typed load.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn load(&mut self, kind: ValueKind, slot: u16) -> Result<&mut Self> {
        self.emit(Operation::Load { kind, slot })
    }

    /// Emits a typed store.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn store(&mut self, kind: ValueKind, slot: u16) -> Result<&mut Self> {
        self.emit(Operation::Store { kind, slot })
    }

    /// Emits `iload`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn iload(&mut self, slot: u16) -> Result<&mut Self> {
        self.load(ValueKind::Int, slot)
    }

    /// Emits `istore`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn istore(&mut self, slot: u16) -> Result<&mut Self> {
        self.store(ValueKind::Int, slot)
    }

    /// Emits `lload`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn lload(&mut self, slot: u16) -> Result<&mut Self> {
        self.load(ValueKind::Long, slot)
    }

    /// Emits `lstore`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn lstore(&mut self, slot: u16) -> Result<&mut Self> {
        self.store(ValueKind::Long, slot)
    }

    /// Emits `dload`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn dload(&mut self, slot: u16) -> Result<&mut Self> {
        self.load(ValueKind::Double, slot)
    }

    /// Emits `dstore`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn dstore(&mut self, slot: u16) -> Result<&mut Self> {
        self.store(ValueKind::Double, slot)
    }

    /// Emits `aload`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn aload(&mut self, slot: u16) -> Result<&mut Self> {
        self.load(ValueKind::Reference, slot)
    }

    /// Emits `astore`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn astore(&mut self, slot: u16) -> Result<&mut Self> {
        self.store(ValueKind::Reference, slot)
    }

    /// Emits `iinc`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn iinc(&mut self, slot: u16, delta: i16) -> Result<&mut Self> {
        self.emit(Operation::Increment { slot, delta })
    }

    /// Emits `ret`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn ret(&mut self, slot: u16) -> Result<&mut Self> {
        self.emit(Operation::Ret { slot })
    }

    /// Emits an `int` constant in its shortest form.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn iconst(&mut self, value: i32) -> Result<&mut Self> {
        self.stack(StackOp::Const(value))
    }

    /// Emits a typed addition.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn add(&mut self, kind: ValueKind) -> Result<&mut Self> {
        self.stack(StackOp::Add(kind))
    }

    /// Emits a typed subtraction.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn sub(&mut self, kind: ValueKind) -> Result<&mut Self> {
        self.stack(StackOp::Sub(kind))
    }

    /// Emits `pop`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn pop(&mut self) -> Result<&mut Self> {
        self.stack(StackOp::Pop)
    }

    /// Emits `dup`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn dup(&mut self) -> Result<&mut Self> {
        self.stack(StackOp::Dup)
    }

    /// Emits a method invocation.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn invoke(&mut self, index: u16) -> Result<&mut Self> {
        self.stack(StackOp::Invoke(index))
    }

    /// Emits `nop`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn nop(&mut self) -> Result<&mut Self> {
        self.stack(StackOp::Nop)
    }

    /// Emits `return`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn return_void(&mut self) -> Result<&mut Self> {
        self.emit(Operation::Return(None))
    }

    /// Emits a typed value return.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn return_value(&mut self, kind: ValueKind) -> Result<&mut Self> {
        self.emit(Operation::Return(Some(kind)))
    }

    /// Emits `athrow`.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` for chaining.
    pub fn athrow(&mut self) -> Result<&mut Self> {
        self.emit(Operation::Throw)
    }

    /// Emits `goto` to a label.
    ///
    /// # Errors
    ///
    /// Never fails; an undefined label is reported by [`MethodAssembler::finish`].
    pub fn goto(&mut self, label: &str) -> Result<&mut Self> {
        self.ops.push(PendingOp::Goto(label.to_string()));
        Ok(self)
    }

    /// Emits `jsr` to a label.
    ///
    /// # Errors
    ///
    /// Never fails; an undefined label is reported by [`MethodAssembler::finish`].
    pub fn jsr(&mut self, label: &str) -> Result<&mut Self> {
        self.ops.push(PendingOp::Jsr(label.to_string()));
        Ok(self)
    }

    /// Emits a conditional branch to a label.
    ///
    /// # Errors
    ///
    /// Never fails; an undefined label is reported by [`MethodAssembler::finish`].
    pub fn branch(&mut self, condition: Condition, label: &str) -> Result<&mut Self> {
        self.ops.push(PendingOp::Branch(condition, label.to_string()));
        Ok(self)
    }

    /// Emits `ifeq`.
    ///
    /// # Errors
    ///
    /// Never fails; an undefined label is reported by [`MethodAssembler::finish`].
    pub fn ifeq(&mut self, label: &str) -> Result<&mut Self> {
        self.branch(Condition::Eq, label)
    }

    /// Emits `ifne`.
    ///
    /// # Errors
    ///
    /// Never fails; an undefined label is reported by [`MethodAssembler::finish`].
    pub fn ifne(&mut self, label: &str) -> Result<&mut Self> {
        self.branch(Condition::Ne, label)
    }

    /// Emits `if_icmpge`.
    ///
    /// # Errors
    ///
    /// Never fails; an undefined label is reported by [`MethodAssembler::finish`].
    pub fn if_icmpge(&mut self, label: &str) -> Result<&mut Self> {
        self.branch(Condition::IntGe, label)
    }

    /// Emits `if_icmplt`.
    ///
    /// # Errors
    ///
    /// Never fails; an undefined label is reported by [`MethodAssembler::finish`].
    pub fn if_icmplt(&mut self, label: &str) -> Result<&mut Self> {
        self.branch(Condition::IntLt, label)
    }

    /// Emits `lookupswitch` with labelled cases.
    ///
    /// # Errors
    ///
    /// Never fails; an undefined label is reported by [`MethodAssembler::finish`].
    pub fn lookupswitch(&mut self, default: &str, cases: &[(i32, &str)]) -> Result<&mut Self> {
        self.ops.push(PendingOp::Switch {
            default: default.to_string(),
            cases: cases
                .iter()
                .map(|&(key, label)| (key, label.to_string()))
                .collect(),
        });
        Ok(self)
    }

    /// Adds an exception table entry protecting `[start, end)`.
    ///
    /// Handlers are recorded in the order they are added.
    pub fn try_catch(
        &mut self,
        start: &str,
        end: &str,
        handler: &str,
        catch_type: Option<&str>,
    ) -> &mut Self {
        self.handlers.push(PendingHandler {
            start: start.to_string(),
            end: end.to_string(),
            handler: handler.to_string(),
            catch_type: catch_type.map(str::to_string),
        });
        self
    }

    /// Adds a `LocalVariableTable` entry scoped to `[start, end)`.
    pub fn local_variable(
        &mut self,
        name: &str,
        descriptor: &str,
        slot: u16,
        start: &str,
        end: &str,
    ) -> &mut Self {
        self.locals.push(PendingLocal {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            slot,
            start: start.to_string(),
            end: end.to_string(),
        });
        self
    }

    /// Adds a `LocalVariableTypeTable` entry scoped to `[start, end)`.
    pub fn local_variable_type(
        &mut self,
        name: &str,
        signature: &str,
        slot: u16,
        start: &str,
        end: &str,
    ) -> &mut Self {
        self.local_types.push(PendingLocal {
            name: name.to_string(),
            descriptor: signature.to_string(),
            slot,
            start: start.to_string(),
            end: end.to_string(),
        });
        self
    }

    /// Lays out the instructions, resolves labels and validates the body.
    ///
    /// Unless overridden, `max_locals` is the smallest frame holding the
    /// parameters, every slot operand, and every debug table entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndefinedLabel`] for labels that were never placed,
    /// and any error reported by [`MethodBody::validate`].
    pub fn finish(self) -> Result<MethodBody> {
        // Sizes never depend on target values, so one pass with placeholder
        // targets yields the final layout.
        let mut offsets = Vec::with_capacity(self.ops.len() + 1);
        let mut offset = 0u32;
        for pending in &self.ops {
            offsets.push(offset);
            offset += pending.resolve(|_| Ok(0))?.encoded_size(offset);
        }
        offsets.push(offset);

        let resolve = |label: &str| -> Result<u32> {
            self.labels
                .get(label)
                .map(|&index| offsets[index])
                .ok_or_else(|| Error::UndefinedLabel(label.to_string()))
        };

        let instructions = self
            .ops
            .iter()
            .zip(&offsets)
            .map(|(pending, &offset)| Ok(Instruction::new(offset, pending.resolve(resolve)?)))
            .collect::<Result<Vec<_>>>()?;

        let exception_handlers = self
            .handlers
            .iter()
            .map(|h| {
                Ok(ExceptionHandler {
                    start: resolve(&h.start)?,
                    end: resolve(&h.end)?,
                    handler: resolve(&h.handler)?,
                    catch_type: h.catch_type.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let debug_entries = |pending: &[PendingLocal]| {
            pending
                .iter()
                .map(|local| {
                    let start = resolve(&local.start)?;
                    let end = resolve(&local.end)?;
                    Ok(LocalVariable {
                        start,
                        length: end.saturating_sub(start),
                        name: local.name.clone(),
                        descriptor: local.descriptor.clone(),
                        slot: local.slot,
                    })
                })
                .collect::<Result<Vec<_>>>()
        };
        let local_variables = debug_entries(&self.locals)?;
        let local_variable_types = debug_entries(&self.local_types)?;

        let mut body = MethodBody {
            name: self.name,
            descriptor: self.descriptor,
            access: self.access,
            max_stack: self.max_stack,
            max_locals: 0,
            instructions,
            exception_handlers,
            local_variables,
            local_variable_types,
        };

        body.max_locals = match self.max_locals {
            Some(max_locals) => max_locals,
            None => body
                .local_variables
                .iter()
                .chain(&body.local_variable_types)
                .map(|variable| variable.slot.saturating_add(variable.width()))
                .chain([body.parameter_size()?, body.referenced_frame_size()])
                .max()
                .unwrap_or(0),
        };

        body.validate()?;
        Ok(body)
    }
}
