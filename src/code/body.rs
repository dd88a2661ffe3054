//! Method bodies: instructions plus the tables that refer to them.

use std::fmt;

use bitflags::bitflags;

use crate::{
    code::{descriptor, Instruction},
    Error, Result,
};

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
    /// Method access and property flags
    pub struct AccessFlags: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static; the method has no receiver
        const STATIC = 0x0008;
        /// Declared final
        const FINAL = 0x0010;
        /// Invocation is wrapped by a monitor
        const SYNCHRONIZED = 0x0020;
        /// Compiler-generated bridge method
        const BRIDGE = 0x0040;
        /// Declared with a variable number of arguments
        const VARARGS = 0x0080;
        /// Implemented natively
        const NATIVE = 0x0100;
        /// Declared abstract
        const ABSTRACT = 0x0400;
        /// Declared strictfp
        const STRICT = 0x0800;
        /// Not present in the source code
        const SYNTHETIC = 0x1000;
    }
}

/// One entry of the exception table.
///
/// Protects the instructions in `[start, end)` and transfers control to
/// `handler` when a matching exception is thrown.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExceptionHandler {
    /// First protected offset
    pub start: u32,
    /// Offset right after the protected range
    pub end: u32,
    /// Handler entry offset
    pub handler: u32,
    /// Caught class, or `None` for a catch-all (`finally`) handler
    pub catch_type: Option<String>,
}

impl ExceptionHandler {
    /// Returns `true` if the instruction at `offset` is protected by this handler.
    #[must_use]
    pub const fn covers(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// One entry of a local variable debug table.
///
/// The same shape is used for `LocalVariableTable` entries, where
/// `descriptor` is a field descriptor, and `LocalVariableTypeTable` entries,
/// where it is a generic signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalVariable {
    /// First offset at which the variable is in scope
    pub start: u32,
    /// Length of the scope in bytes
    pub length: u32,
    /// Source name
    pub name: String,
    /// Field descriptor or generic signature
    pub descriptor: String,
    /// Local slot holding the variable
    pub slot: u16,
}

impl LocalVariable {
    /// Offset right after the variable's scope.
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.start + self.length
    }

    /// Returns `true` if the scope contains `offset`.
    #[must_use]
    pub const fn covers(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end()
    }

    /// Number of slots taken by the variable.
    ///
    /// Generic signatures of `long` and `double` are the plain `J` and `D`,
    /// so this works for both kinds of debug table.
    #[must_use]
    pub fn width(&self) -> u16 {
        match self.descriptor.as_str() {
            "J" | "D" => 2,
            _ => 1,
        }
    }
}

/// The code of a single method, together with everything that refers to
/// local slots or instruction offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    /// Method name
    pub name: String,
    /// Method type descriptor, e.g. `(IJ)V`
    pub descriptor: String,
    /// Access flags
    pub access: AccessFlags,
    /// Maximum operand stack depth
    pub max_stack: u16,
    /// Size of the local variable frame, in slots
    pub max_locals: u16,
    /// Instructions in ascending offset order
    pub instructions: Vec<Instruction>,
    /// Exception table, in priority order
    pub exception_handlers: Vec<ExceptionHandler>,
    /// `LocalVariableTable` entries
    pub local_variables: Vec<LocalVariable>,
    /// `LocalVariableTypeTable` entries
    pub local_variable_types: Vec<LocalVariable>,
}

impl MethodBody {
    /// Creates a body without exception handlers or debug tables.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        descriptor: impl Into<String>,
        access: AccessFlags,
        max_locals: u16,
        instructions: Vec<Instruction>,
    ) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access,
            max_stack: 0,
            max_locals,
            instructions,
            exception_handlers: Vec::new(),
            local_variables: Vec::new(),
            local_variable_types: Vec::new(),
        }
    }

    /// Returns `true` for static methods.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }

    /// Returns `true` for instance initializers (`<init>`).
    #[must_use]
    pub fn is_initializer(&self) -> bool {
        self.name == "<init>"
    }

    /// Length of the code in bytes.
    #[must_use]
    pub fn code_length(&self) -> u32 {
        self.instructions.last().map_or(0, Instruction::next_offset)
    }

    /// Index of the instruction starting at `offset`.
    #[must_use]
    pub fn index_of(&self, offset: u32) -> Option<usize> {
        self.instructions
            .binary_search_by_key(&offset, |instr| instr.offset)
            .ok()
    }

    /// The instruction starting at `offset`.
    #[must_use]
    pub fn instruction_at(&self, offset: u32) -> Option<&Instruction> {
        self.index_of(offset).map(|index| &self.instructions[index])
    }

    /// Number of slots occupied by the parameters, including the receiver.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDescriptor`] if the descriptor cannot be parsed.
    pub fn parameter_size(&self) -> Result<u16> {
        descriptor::parameter_size(&self.descriptor, self.is_static())
    }

    /// Smallest frame that holds every slot touched by an instruction.
    #[must_use]
    pub fn referenced_frame_size(&self) -> u16 {
        self.instructions
            .iter()
            .filter_map(Instruction::local_access)
            .map(|access| access.slot.saturating_add(access.width()))
            .max()
            .unwrap_or(0)
    }

    /// Checks that the body is internally consistent.
    ///
    /// Verifies that instructions are laid out back to back from offset 0,
    /// that every local slot operand fits in `max_locals`, that every jump
    /// lands on an instruction, that execution cannot run off the end of the
    /// code, that the last instruction is not a subroutine call, and that the
    /// exception and debug tables line up with instruction boundaries.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<()> {
        let Some(last) = self.instructions.last() else {
            return Err(Error::Empty);
        };

        let mut expected = 0;
        for instr in &self.instructions {
            if instr.offset != expected {
                return Err(malformed_error!(
                    "Instruction at offset {} should start at {}",
                    instr.offset,
                    expected
                ));
            }
            if instr.size == 0 {
                return Err(malformed_error!(
                    "Instruction at offset {} has no size",
                    instr.offset
                ));
            }
            expected = instr.next_offset();
        }

        for instr in &self.instructions {
            if let Some(access) = instr.local_access() {
                if u32::from(access.slot) + u32::from(access.width()) > u32::from(self.max_locals) {
                    return Err(Error::SlotOutOfRange {
                        offset: instr.offset,
                        slot: u32::from(access.slot) + u32::from(access.width()) - 1,
                        max_locals: self.max_locals,
                    });
                }
            }
            for target in instr.branch_targets() {
                if self.index_of(target).is_none() {
                    return Err(Error::InvalidBranchTarget {
                        offset: instr.offset,
                        target,
                    });
                }
            }
        }

        if last.falls_through() {
            return Err(malformed_error!(
                "Execution falls off the end of the code at offset {}",
                last.offset
            ));
        }
        if last.is_subroutine_call() {
            return Err(malformed_error!(
                "Subroutine call at offset {} has no return site",
                last.offset
            ));
        }

        let parameter_size = self.parameter_size()?;
        if parameter_size > self.max_locals {
            return Err(malformed_error!(
                "Parameters of {}{} need {} slots but max_locals is {}",
                self.name,
                self.descriptor,
                parameter_size,
                self.max_locals
            ));
        }

        let code_length = self.code_length();
        let is_boundary = |offset: u32| offset == code_length || self.index_of(offset).is_some();

        for handler in &self.exception_handlers {
            if handler.start >= handler.end
                || self.index_of(handler.start).is_none()
                || !is_boundary(handler.end)
                || self.index_of(handler.handler).is_none()
            {
                return Err(malformed_error!(
                    "Exception handler [{}, {}) -> {} does not line up with the code",
                    handler.start,
                    handler.end,
                    handler.handler
                ));
            }
        }

        for (table, is_types) in [
            (&self.local_variables, false),
            (&self.local_variable_types, true),
        ] {
            for variable in table {
                if variable.end() > code_length {
                    return Err(malformed_error!(
                        "Local variable '{}' [{}, {}) extends past the end of the code",
                        variable.name,
                        variable.start,
                        variable.end()
                    ));
                }
                let width = if is_types {
                    variable.width()
                } else {
                    descriptor::field_width(&variable.descriptor)?
                };
                if u32::from(variable.slot) + u32::from(width) > u32::from(self.max_locals) {
                    return Err(Error::SlotOutOfRange {
                        offset: variable.start,
                        slot: u32::from(variable.slot),
                        max_locals: self.max_locals,
                    });
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}{} [max_locals={}, max_stack={}]",
            self.name, self.descriptor, self.max_locals, self.max_stack
        )?;
        for instr in &self.instructions {
            writeln!(f, "{instr}")?;
        }
        for handler in &self.exception_handlers {
            writeln!(
                f,
                "  try [{}, {}) catch {} -> {}",
                handler.start,
                handler.end,
                handler.catch_type.as_deref().unwrap_or("any"),
                handler.handler
            )?;
        }
        for variable in &self.local_variables {
            writeln!(
                f,
                "  local {} {} slot {} [{}, {})",
                variable.name,
                variable.descriptor,
                variable.slot,
                variable.start,
                variable.end()
            )?;
        }
        Ok(())
    }
}
