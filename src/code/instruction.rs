//! Instruction model for method bodies.
//!
//! Only the parts of the JVM instruction set that matter for local variable
//! liveness are modeled explicitly: loads, stores, `iinc`, subroutine calls
//! and returns, and every form of control transfer. Everything that only
//! touches the operand stack is folded into [`StackOp`].
//!
//! Instructions carry their byte offset and encoded size. The size follows
//! the JVM encoding rules (short `xload_<n>` forms, `wide` prefixes,
//! `lookupswitch` padding) and is fixed when the body is laid out; rewriting
//! operands afterwards does not re-lay out the body.

use std::fmt;

use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// The computational type of a value moved between the stack and a local slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum ValueKind {
    /// `int`, and everything the JVM widens to `int` (`boolean`, `byte`, `char`, `short`).
    Int,
    /// `long`, a category 2 value.
    Long,
    /// `float`.
    Float,
    /// `double`, a category 2 value.
    Double,
    /// An object reference or a subroutine return address.
    Reference,
}

impl ValueKind {
    /// Returns `true` for 64-bit values, which occupy two consecutive slots.
    #[must_use]
    pub const fn is_category2(self) -> bool {
        matches!(self, Self::Long | Self::Double)
    }

    /// Number of local slots a value of this kind occupies.
    #[must_use]
    pub const fn width(self) -> u16 {
        if self.is_category2() {
            2
        } else {
            1
        }
    }

    /// Leading descriptor characters of the field types held as this kind.
    #[must_use]
    pub const fn descriptor_codes(self) -> &'static [u8] {
        match self {
            Self::Int => b"BCISZ",
            Self::Long => b"J",
            Self::Float => b"F",
            Self::Double => b"D",
            Self::Reference => b"L[",
        }
    }

    /// The kind a field type starting with `code` is held as in a local slot.
    #[must_use]
    pub fn from_descriptor_code(code: u8) -> Option<Self> {
        Self::iter().find(|kind| kind.descriptor_codes().contains(&code))
    }

    /// The mnemonic prefix used by the typed load/store/return opcodes.
    #[must_use]
    pub const fn prefix(self) -> char {
        match self {
            Self::Int => 'i',
            Self::Long => 'l',
            Self::Float => 'f',
            Self::Double => 'd',
            Self::Reference => 'a',
        }
    }
}

/// Condition of a two-way branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// `ifeq`
    Eq,
    /// `ifne`
    Ne,
    /// `iflt`
    Lt,
    /// `ifge`
    Ge,
    /// `ifgt`
    Gt,
    /// `ifle`
    Le,
    /// `if_icmpeq`
    IntEq,
    /// `if_icmpne`
    IntNe,
    /// `if_icmplt`
    IntLt,
    /// `if_icmpge`
    IntGe,
    /// `if_icmpgt`
    IntGt,
    /// `if_icmple`
    IntLe,
    /// `ifnull`
    Null,
    /// `ifnonnull`
    NonNull,
}

impl Condition {
    /// The opcode mnemonic of a branch with this condition.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Eq => "ifeq",
            Self::Ne => "ifne",
            Self::Lt => "iflt",
            Self::Ge => "ifge",
            Self::Gt => "ifgt",
            Self::Le => "ifle",
            Self::IntEq => "if_icmpeq",
            Self::IntNe => "if_icmpne",
            Self::IntLt => "if_icmplt",
            Self::IntGe => "if_icmpge",
            Self::IntGt => "if_icmpgt",
            Self::IntLe => "if_icmple",
            Self::Null => "ifnull",
            Self::NonNull => "ifnonnull",
        }
    }
}

/// Operations that neither touch local slots nor transfer control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackOp {
    /// `nop`
    Nop,
    /// Push an `int` constant (`iconst_<n>`, `bipush`, `sipush` or `ldc`).
    Const(i32),
    /// Typed addition.
    Add(ValueKind),
    /// Typed subtraction.
    Sub(ValueKind),
    /// Typed multiplication.
    Mul(ValueKind),
    /// Typed comparison (`lcmp`, `fcmpl`, `dcmpl`).
    Compare(ValueKind),
    /// `pop`
    Pop,
    /// `pop2`
    Pop2,
    /// `dup`
    Dup,
    /// `dup2`
    Dup2,
    /// Method invocation through a constant pool reference.
    Invoke(u16),
    /// Object allocation through a constant pool reference.
    New(u16),
    /// `arraylength`
    ArrayLength,
}

impl StackOp {
    fn encoded_size(self) -> u32 {
        match self {
            Self::Const(value) => match value {
                -1..=5 => 1,
                v if i8::try_from(v).is_ok() => 2,
                v if i16::try_from(v).is_ok() => 3,
                _ => 2,
            },
            Self::Invoke(_) | Self::New(_) => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for StackOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Nop => f.write_str("nop"),
            Self::Const(-1) => f.write_str("iconst_m1"),
            Self::Const(value @ 0..=5) => write!(f, "iconst_{value}"),
            Self::Const(value) if i8::try_from(value).is_ok() => write!(f, "bipush {value}"),
            Self::Const(value) if i16::try_from(value).is_ok() => write!(f, "sipush {value}"),
            Self::Const(value) => write!(f, "ldc {value}"),
            Self::Add(kind) => write!(f, "{}add", kind.prefix()),
            Self::Sub(kind) => write!(f, "{}sub", kind.prefix()),
            Self::Mul(kind) => write!(f, "{}mul", kind.prefix()),
            Self::Compare(ValueKind::Long) => f.write_str("lcmp"),
            Self::Compare(kind) => write!(f, "{}cmpl", kind.prefix()),
            Self::Pop => f.write_str("pop"),
            Self::Pop2 => f.write_str("pop2"),
            Self::Dup => f.write_str("dup"),
            Self::Dup2 => f.write_str("dup2"),
            Self::Invoke(index) => write!(f, "invoke #{index}"),
            Self::New(index) => write!(f, "new #{index}"),
            Self::ArrayLength => f.write_str("arraylength"),
        }
    }
}

/// What an instruction does, with its operands.
///
/// Branch targets are absolute byte offsets within the method body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Push the value of a local slot.
    Load {
        /// Type of the loaded value
        kind: ValueKind,
        /// Local slot (low half for category 2 values)
        slot: u16,
    },
    /// Pop a value into a local slot.
    Store {
        /// Type of the stored value
        kind: ValueKind,
        /// Local slot (low half for category 2 values)
        slot: u16,
    },
    /// Add a constant to an `int` local in place (`iinc`).
    Increment {
        /// Local slot
        slot: u16,
        /// Signed increment
        delta: i16,
    },
    /// Return from a subroutine to the address held in a local slot.
    Ret {
        /// Local slot holding the return address
        slot: u16,
    },
    /// Call a subroutine, pushing the return address.
    Jsr {
        /// Subroutine entry
        target: u32,
    },
    /// Unconditional jump.
    Goto {
        /// Jump target
        target: u32,
    },
    /// Two-way conditional branch; falls through when the condition is false.
    Branch {
        /// Branch condition
        condition: Condition,
        /// Target taken when the condition holds
        target: u32,
    },
    /// Multi-way branch (`lookupswitch`).
    Switch {
        /// Target when no case matches
        default: u32,
        /// `(key, target)` pairs
        cases: Vec<(i32, u32)>,
    },
    /// Return from the method, with a value of the given kind or `void`.
    Return(Option<ValueKind>),
    /// `athrow`
    Throw,
    /// Operand-stack-only operation.
    Stack(StackOp),
}

impl Operation {
    /// Computes the encoded size of this operation placed at `offset`.
    ///
    /// The offset only matters for `lookupswitch`, whose operands are aligned
    /// to a four-byte boundary.
    #[must_use]
    pub fn encoded_size(&self, offset: u32) -> u32 {
        match self {
            Self::Load { slot, .. } | Self::Store { slot, .. } => match *slot {
                0..=3 => 1,
                4..=255 => 2,
                _ => 4,
            },
            Self::Increment { slot, delta } => {
                if *slot <= 255 && i8::try_from(*delta).is_ok() {
                    3
                } else {
                    6
                }
            }
            Self::Ret { slot } => {
                if *slot <= 255 {
                    2
                } else {
                    4
                }
            }
            Self::Jsr { .. } | Self::Goto { .. } | Self::Branch { .. } => 3,
            Self::Switch { cases, .. } => {
                let padding = (4 - (offset + 1) % 4) % 4;
                // opcode + padding + default + npairs + (key, offset) pairs
                1 + padding + 8 + 8 * cases.len() as u32
            }
            Self::Return(_) | Self::Throw => 1,
            Self::Stack(op) => op.encoded_size(),
        }
    }
}

/// How an instruction accesses a local slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalAccess {
    /// The accessed slot; the low half for category 2 values.
    pub slot: u16,
    /// Type of the accessed value.
    pub kind: ValueKind,
    /// The instruction reads the slot's current value.
    pub reads: bool,
    /// The instruction overwrites the slot.
    pub writes: bool,
}

impl LocalAccess {
    /// Number of slots touched by this access.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.kind.width()
    }

    /// Returns the touched slot indices (one, or two for category 2 values).
    pub fn slots(&self) -> impl Iterator<Item = usize> {
        let low = usize::from(self.slot);
        low..low + usize::from(self.width())
    }
}

/// A single instruction of a method body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    /// Byte offset of the instruction within the code.
    pub offset: u32,
    /// Encoded size in bytes, fixed at layout time.
    pub size: u32,
    /// The operation and its operands.
    pub op: Operation,
}

impl Instruction {
    /// Creates an instruction at `offset`, computing its encoded size.
    #[must_use]
    pub fn new(offset: u32, op: Operation) -> Self {
        Self {
            offset,
            size: op.encoded_size(offset),
            op,
        }
    }

    /// Offset of the byte following this instruction.
    #[must_use]
    pub const fn next_offset(&self) -> u32 {
        self.offset + self.size
    }

    /// Returns how this instruction accesses a local slot, if at all.
    ///
    /// `iinc` both reads and writes its slot. `ret` reads the return address.
    #[must_use]
    pub fn local_access(&self) -> Option<LocalAccess> {
        match self.op {
            Operation::Load { kind, slot } => Some(LocalAccess {
                slot,
                kind,
                reads: true,
                writes: false,
            }),
            Operation::Store { kind, slot } => Some(LocalAccess {
                slot,
                kind,
                reads: false,
                writes: true,
            }),
            Operation::Increment { slot, .. } => Some(LocalAccess {
                slot,
                kind: ValueKind::Int,
                reads: true,
                writes: true,
            }),
            Operation::Ret { slot } => Some(LocalAccess {
                slot,
                kind: ValueKind::Reference,
                reads: true,
                writes: false,
            }),
            _ => None,
        }
    }

    /// The local slot operand of this instruction, if it has one.
    #[must_use]
    pub fn local_slot(&self) -> Option<u16> {
        self.local_access().map(|access| access.slot)
    }

    /// Replaces the local slot operand.
    ///
    /// Returns `false` if the instruction has no local slot operand.
    pub fn set_local_slot(&mut self, new_slot: u16) -> bool {
        match &mut self.op {
            Operation::Load { slot, .. }
            | Operation::Store { slot, .. }
            | Operation::Increment { slot, .. }
            | Operation::Ret { slot } => {
                *slot = new_slot;
                true
            }
            _ => false,
        }
    }

    /// Explicit jump targets: branch, switch, and subroutine entries.
    #[must_use]
    pub fn branch_targets(&self) -> Vec<u32> {
        match &self.op {
            Operation::Jsr { target } | Operation::Goto { target } => vec![*target],
            Operation::Branch { target, .. } => vec![*target],
            Operation::Switch { default, cases } => std::iter::once(*default)
                .chain(cases.iter().map(|&(_, target)| target))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Returns `true` if execution may continue with the next instruction.
    ///
    /// A `jsr` does not fall through directly: control reaches the following
    /// instruction only through the matching `ret`.
    #[must_use]
    pub const fn falls_through(&self) -> bool {
        !matches!(
            self.op,
            Operation::Goto { .. }
                | Operation::Jsr { .. }
                | Operation::Switch { .. }
                | Operation::Return(_)
                | Operation::Throw
                | Operation::Ret { .. }
        )
    }

    /// Returns `true` for `jsr`.
    #[must_use]
    pub const fn is_subroutine_call(&self) -> bool {
        matches!(self.op, Operation::Jsr { .. })
    }

    /// Returns `true` for `ret`.
    #[must_use]
    pub const fn is_subroutine_return(&self) -> bool {
        matches!(self.op, Operation::Ret { .. })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5}: ", self.offset)?;
        match &self.op {
            Operation::Load { kind, slot } => write!(f, "{}load {slot}", kind.prefix()),
            Operation::Store { kind, slot } => write!(f, "{}store {slot}", kind.prefix()),
            Operation::Increment { slot, delta } => write!(f, "iinc {slot}, {delta}"),
            Operation::Ret { slot } => write!(f, "ret {slot}"),
            Operation::Jsr { target } => write!(f, "jsr {target}"),
            Operation::Goto { target } => write!(f, "goto {target}"),
            Operation::Branch { condition, target } => {
                write!(f, "{} {target}", condition.mnemonic())
            }
            Operation::Switch { default, cases } => {
                write!(f, "lookupswitch {{")?;
                for (key, target) in cases {
                    write!(f, " {key}: {target},")?;
                }
                write!(f, " default: {default} }}")
            }
            Operation::Return(None) => f.write_str("return"),
            Operation::Return(Some(kind)) => write!(f, "{}return", kind.prefix()),
            Operation::Throw => f.write_str("athrow"),
            Operation::Stack(op) => write!(f, "{op}"),
        }
    }
}
