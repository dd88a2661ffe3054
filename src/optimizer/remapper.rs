//! Applying a variable map to a method body.

use crate::{
    analysis::Liveness,
    code::{Instruction, LocalVariable, MethodBody},
    optimizer::VariableMap,
    Result,
};

/// Rewrites every slot reference of a method body through a [`VariableMap`].
///
/// Instruction operands and both local variable debug tables are rewritten.
/// Offsets and encoded sizes stay as they are.
pub struct VariableRemapper<'a> {
    map: &'a VariableMap,
}

impl<'a> VariableRemapper<'a> {
    /// Creates a remapper for `map`.
    #[must_use]
    pub const fn new(map: &'a VariableMap) -> Self {
        Self { map }
    }

    /// Applies the map to `body` and shrinks `max_locals` to the smallest
    /// frame holding the parameters and every remaining slot reference.
    ///
    /// `max_locals` never grows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDescriptor`](crate::Error::InvalidDescriptor)
    /// if the method descriptor cannot be parsed; the body is left untouched
    /// in that case.
    pub fn remap(&self, body: &mut MethodBody) -> Result<()> {
        let parameter_size = body.parameter_size()?;

        for instr in &mut body.instructions {
            if let Some(slot) = instr.local_slot() {
                instr.set_local_slot(self.map.get(slot));
            }
        }
        for variable in body
            .local_variables
            .iter_mut()
            .chain(body.local_variable_types.iter_mut())
        {
            variable.slot = self.map.get(variable.slot);
        }

        let required = body
            .local_variables
            .iter()
            .chain(&body.local_variable_types)
            .map(|variable| variable.slot.saturating_add(variable.width()))
            .chain([parameter_size, body.referenced_frame_size()])
            .max()
            .unwrap_or(0);
        body.max_locals = body.max_locals.min(required);

        Ok(())
    }
}

/// Trims the debug entries of non-parameter slots to the ranges where their
/// slot is alive, and removes entries that end up empty.
///
/// Within its original scope, an entry is split into one entry per stretch of
/// instructions where its slot is alive before or after. Each range starts at
/// the first instruction of the stretch where the slot is alive before, so the
/// storing instruction itself is not included. `liveness` must describe `body`
/// as it was before any remapping.
///
/// Returns the number of entries that had no live range left.
///
/// # Errors
///
/// Returns [`Error::InvalidDescriptor`](crate::Error::InvalidDescriptor)
/// if the method descriptor cannot be parsed.
pub fn trim_local_variables(body: &mut MethodBody, liveness: &Liveness) -> Result<usize> {
    let parameter_size = body.parameter_size()?;
    let instructions = &body.instructions;
    let mut removed = 0;

    let mut trim = |table: &mut Vec<LocalVariable>| {
        for variable in std::mem::take(table) {
            if variable.slot < parameter_size {
                table.push(variable);
                continue;
            }
            let ranges = live_ranges(&variable, instructions, liveness);
            if ranges.is_empty() {
                removed += 1;
            }
            table.extend(ranges);
        }
    };
    trim(&mut body.local_variables);
    trim(&mut body.local_variable_types);

    Ok(removed)
}

/// Copies of `variable`, one per live stretch of its slot inside its scope.
fn live_ranges(
    variable: &LocalVariable,
    instructions: &[Instruction],
    liveness: &Liveness,
) -> Vec<LocalVariable> {
    let mut spans = Vec::new();
    let mut start = None;
    let mut end = 0;

    for instr in instructions.iter().filter(|i| variable.covers(i.offset)) {
        let before = liveness.is_alive_before(instr.offset, variable.slot);
        let after = liveness.is_alive_after(instr.offset, variable.slot);
        if !before && !after {
            spans.extend(start.take().map(|start| (start, end)));
            continue;
        }
        if before && start.is_none() {
            start = Some(instr.offset);
        }
        end = instr.next_offset();
    }
    spans.extend(start.map(|start| (start, end)));

    spans
        .into_iter()
        .map(|(start, end)| LocalVariable {
            start,
            length: end - start,
            ..variable.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analysis::LivenessAnalyzer, code::MethodAssembler};

    #[test]
    fn test_remap_operands_and_tables() -> Result<()> {
        let mut asm = MethodAssembler::new_static("f", "()V");
        asm.iconst(1)?
            .istore(3)?
            .label("b")?
            .iload(3)?
            .pop()?
            .return_void()?
            .label("c")?;
        asm.local_variable("x", "I", 3, "b", "c")
            .local_variable_type("x", "I", 3, "b", "c");
        let mut body = asm.finish()?;
        assert_eq!(body.max_locals, 4);

        let mut map = VariableMap::identity(4);
        map.set(3, 0);
        VariableRemapper::new(&map).remap(&mut body)?;

        assert_eq!(body.instructions[1].local_slot(), Some(0));
        assert_eq!(body.instructions[2].local_slot(), Some(0));
        assert_eq!(body.local_variables[0].slot, 0);
        assert_eq!(body.local_variable_types[0].slot, 0);
        assert_eq!(body.max_locals, 1);
        // The layout is not touched: istore_3 and istore_0 are both one byte.
        assert_eq!(body.instructions[2].offset, 2);
        Ok(())
    }

    #[test]
    fn test_remap_keeps_parameter_frame() -> Result<()> {
        let mut asm = MethodAssembler::new_static("f", "(JI)V");
        asm.return_void()?;
        let mut body = asm.finish()?;
        assert_eq!(body.max_locals, 3);

        VariableRemapper::new(&VariableMap::identity(3)).remap(&mut body)?;
        assert_eq!(body.max_locals, 3);
        Ok(())
    }

    #[test]
    fn test_trim_to_live_range() -> Result<()> {
        // x = 1 (offset 1); nop; use x (offset 3); nop; return
        let mut asm = MethodAssembler::new_static("f", "(I)V");
        asm.label("start")?
            .iconst(1)?
            .istore(1)?
            .nop()?
            .iload(1)?
            .pop()?
            .nop()?
            .return_void()?
            .label("end")?;
        asm.local_variable("p", "I", 0, "start", "end")
            .local_variable("x", "I", 1, "start", "end")
            .local_variable("unused", "I", 1, "end", "end");
        let mut body = asm.finish()?;
        let liveness = LivenessAnalyzer::analyze(&body)?;

        let removed = trim_local_variables(&mut body, &liveness)?;
        assert_eq!(removed, 1);

        // The parameter keeps its full range.
        assert_eq!(body.local_variables[0].start, 0);
        assert_eq!(body.local_variables[0].length, 7);
        // x is alive before the nop at 2 and the load at 3.
        assert_eq!(body.local_variables[1].start, 2);
        assert_eq!(body.local_variables[1].end(), 4);
        Ok(())
    }

    #[test]
    fn test_trim_splits_reused_variable() -> Result<()> {
        // x = 1; use x; nop; x = 2; use x
        let mut asm = MethodAssembler::new_static("f", "()V");
        asm.label("start")?
            .iconst(1)?
            .istore(0)?
            .iload(0)?
            .pop()?
            .nop()?
            .iconst(2)?
            .istore(0)?
            .iload(0)?
            .pop()?
            .return_void()?
            .label("end")?;
        asm.local_variable("x", "I", 0, "start", "end")
            .local_variable_type("x", "I", 0, "start", "end");
        let mut body = asm.finish()?;
        let liveness = LivenessAnalyzer::analyze(&body)?;

        assert_eq!(trim_local_variables(&mut body, &liveness)?, 0);

        for table in [&body.local_variables, &body.local_variable_types] {
            let ranges: Vec<(u32, u32)> = table.iter().map(|v| (v.start, v.end())).collect();
            assert_eq!(ranges, vec![(2, 3), (7, 8)]);
            assert!(table.iter().all(|v| v.name == "x" && v.slot == 0));
        }
        Ok(())
    }
}
