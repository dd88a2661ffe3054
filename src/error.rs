use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The optimizer itself never fails on a well-formed method body. Every variant here describes
/// a violated precondition that is detected before any rewriting starts, so a method that
/// produces an error is left exactly as it was handed in.
///
/// # Error Categories
///
/// ## Method Body Errors
/// - [`Error::Malformed`] - Inconsistent instruction layout or exception table
/// - [`Error::SlotOutOfRange`] - A local slot operand outside of `max_locals`
/// - [`Error::InvalidBranchTarget`] - A jump that does not land on an instruction
/// - [`Error::Empty`] - A method body without instructions
///
/// ## Signature Errors
/// - [`Error::InvalidDescriptor`] - A method type descriptor that could not be parsed
///
/// ## Assembler Errors
/// - [`Error::UndefinedLabel`] - A label was referenced but never placed
/// - [`Error::DuplicateLabel`] - A label was placed twice
///
/// # Examples
///
/// ```rust
/// use slotopt::{code::MethodAssembler, Error};
///
/// let mut asm = MethodAssembler::new_static("broken", "()V");
/// asm.goto("nowhere")?;
///
/// match asm.finish() {
///     Err(Error::UndefinedLabel(label)) => assert_eq!(label, "nowhere"),
///     other => panic!("unexpected result: {other:?}"),
/// }
/// # Ok::<(), slotopt::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The method body is internally inconsistent.
    ///
    /// Raised by validation when instruction offsets overlap or are not strictly increasing,
    /// or when exception table and debug table ranges do not line up with instruction
    /// boundaries. The error includes the source location where the malformation was
    /// detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An instruction references a local slot that does not exist in the frame.
    ///
    /// For category 2 accesses the high half (`slot + 1`) must also be in range.
    #[error("Slot {slot} at offset {offset} is outside of max_locals {max_locals}")]
    SlotOutOfRange {
        /// Offset of the offending instruction
        offset: u32,
        /// The referenced slot
        slot: u32,
        /// Declared frame size
        max_locals: u16,
    },

    /// A branch, switch, or subroutine target does not start an instruction.
    #[error("Branch at offset {offset} targets {target}, which is not an instruction")]
    InvalidBranchTarget {
        /// Offset of the branching instruction
        offset: u32,
        /// The target that could not be resolved
        target: u32,
    },

    /// The method type descriptor could not be parsed.
    #[error("Invalid method descriptor - {0}")]
    InvalidDescriptor(String),

    /// A label was used by the assembler but never placed.
    #[error("Label '{0}' is referenced but never defined")]
    UndefinedLabel(String),

    /// A label was placed more than once.
    #[error("Label '{0}' is defined more than once")]
    DuplicateLabel(String),

    /// The method body has no instructions.
    #[error("Method body is empty")]
    Empty,
}
