//! Method and field type descriptors.
//!
//! Only as much of the descriptor grammar is understood as is needed to
//! size the parameter area of a frame: every parameter takes one slot,
//! except `long` and `double`, which take two. Instance methods add one
//! slot for the receiver in front of the declared parameters.

use crate::{code::ValueKind, Error, Result};

/// Most parameter slots a method may declare, receiver included.
pub const MAX_PARAMETER_SLOTS: u16 = 255;

/// Parses the parameter list of a method descriptor such as `(IJ[Ljava/lang/String;)V`.
///
/// # Errors
///
/// Returns [`Error::InvalidDescriptor`] if the descriptor is not a well-formed
/// method descriptor.
pub fn parameter_kinds(descriptor: &str) -> Result<Vec<ValueKind>> {
    let invalid = || Error::InvalidDescriptor(descriptor.to_string());

    let rest = descriptor.strip_prefix('(').ok_or_else(invalid)?;
    let bytes = rest.as_bytes();
    let mut kinds = Vec::new();
    let mut pos = 0;

    loop {
        match bytes.get(pos) {
            Some(b')') => {
                pos += 1;
                break;
            }
            Some(_) => {
                let (kind, next) = field_type(bytes, pos).ok_or_else(invalid)?;
                kinds.push(kind);
                pos = next;
            }
            None => return Err(invalid()),
        }
    }

    // Return type: void or exactly one field type.
    let end = match bytes.get(pos) {
        Some(b'V') => pos + 1,
        Some(_) => field_type(bytes, pos).ok_or_else(invalid)?.1,
        None => return Err(invalid()),
    };
    if end != bytes.len() {
        return Err(invalid());
    }

    Ok(kinds)
}

/// Number of local slots occupied by the parameters of a method, including the
/// receiver of an instance method.
///
/// # Errors
///
/// Returns [`Error::InvalidDescriptor`] if the descriptor cannot be parsed,
/// or if its parameters need more than [`MAX_PARAMETER_SLOTS`] slots.
pub fn parameter_size(descriptor: &str, is_static: bool) -> Result<u16> {
    let declared: u32 = parameter_kinds(descriptor)?
        .iter()
        .map(|kind| u32::from(kind.width()))
        .sum();
    let total = declared + u32::from(!is_static);
    match u16::try_from(total) {
        Ok(size) if size <= MAX_PARAMETER_SLOTS => Ok(size),
        _ => Err(Error::InvalidDescriptor(descriptor.to_string())),
    }
}

/// Number of local slots a value of the given field type occupies.
///
/// Used for debug table entries, whose descriptors are field descriptors.
///
/// # Errors
///
/// Returns [`Error::InvalidDescriptor`] if the descriptor is not a single field type.
pub fn field_width(descriptor: &str) -> Result<u16> {
    match field_type(descriptor.as_bytes(), 0) {
        Some((kind, end)) if end == descriptor.len() => Ok(kind.width()),
        _ => Err(Error::InvalidDescriptor(descriptor.to_string())),
    }
}

/// Parses one field type starting at `pos`, returning its kind and the
/// position right after it.
fn field_type(bytes: &[u8], pos: usize) -> Option<(ValueKind, usize)> {
    let code = *bytes.get(pos)?;
    let kind = ValueKind::from_descriptor_code(code)?;
    match code {
        b'L' => {
            let len = bytes[pos + 1..].iter().position(|&b| b == b';')?;
            // An empty class name is not a type.
            (len > 0).then_some((kind, pos + len + 2))
        }
        b'[' => {
            let mut element = pos + 1;
            while bytes.get(element) == Some(&b'[') {
                element += 1;
            }
            let (_, end) = field_type(bytes, element)?;
            Some((kind, end))
        }
        _ => Some((kind, pos + 1)),
    }
}
