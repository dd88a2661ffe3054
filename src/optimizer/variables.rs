//! Liveness-driven coalescing of local variable slots.

use std::{fmt, sync::Arc};

use log::debug;
use rayon::prelude::*;

use crate::{
    analysis::{Liveness, LivenessAnalyzer},
    code::MethodBody,
    optimizer::{
        remapper::trim_local_variables, MethodListener, OptimizationSummary, OptimizerConfig,
        SlotOccupancy, VariableMap, VariableRemapper,
    },
    Result,
};

/// Packs the local variables of method bodies into as few slots as possible.
///
/// For each method, the optimizer computes exact liveness of every slot and
/// then walks the non-parameter slots in ascending order. Each slot moves to
/// the lowest slot it never is alive together with, if there is one below it
/// (first fit). The combined occupancy of a destination is kept up to date, so
/// several variables can end up sharing one slot as long as none of them
/// overlap.
///
/// Parameter slots never move. Slots that hold part of a `long` or `double`
/// neither move nor receive other variables. The receiver slot of instance
/// methods is only reused when
/// [`allow_receiver_slot_reuse`](OptimizerConfig::allow_receiver_slot_reuse)
/// is set, and never in instance initializers.
///
/// # Examples
///
/// ```rust
/// use slotopt::{code::{MethodAssembler, ValueKind}, optimizer::VariableOptimizer};
///
/// // int f(int p) { int a = p; use(a); int b = p; return b; }
/// let mut asm = MethodAssembler::new_instance("f", "(I)I");
/// asm.iload(1)?.istore(2)?.iload(2)?.invoke(1)?
///     .iload(1)?.istore(3)?.iload(3)?.return_value(ValueKind::Int)?;
/// let mut body = asm.finish()?;
/// assert_eq!(body.max_locals, 4);
///
/// let optimizer = VariableOptimizer::new();
/// assert!(optimizer.optimize(&mut body)?);
/// // `b` takes over the slot of `p` once `p` is dead.
/// assert_eq!(body.instructions[5].local_slot(), Some(1));
/// assert_eq!(body.max_locals, 3);
///
/// // Running again changes nothing.
/// assert!(!optimizer.optimize(&mut body)?);
/// # Ok::<(), slotopt::Error>(())
/// ```
#[derive(Default, Clone)]
pub struct VariableOptimizer {
    config: OptimizerConfig,
    listener: Option<Arc<dyn MethodListener>>,
}

impl fmt::Debug for VariableOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableOptimizer")
            .field("config", &self.config)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl VariableOptimizer {
    /// Creates an optimizer with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an optimizer with the given configuration.
    #[must_use]
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self {
            config,
            listener: None,
        }
    }

    /// Installs a listener that is told about every remapped method.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn MethodListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Optimizes the local slots of a single method body.
    ///
    /// Returns `true` if any slot was remapped. When nothing can be merged,
    /// the body is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns an error if the body fails validation or its descriptor cannot
    /// be parsed. The body is not modified in that case.
    pub fn optimize(&self, body: &mut MethodBody) -> Result<bool> {
        let liveness = LivenessAnalyzer::analyze(body)?;
        let map = self.compute_variable_map(body, &liveness)?;

        if self.config.debug {
            debug!("{}{}: {}", body.name, body.descriptor, map);
        }
        if map.is_identity() {
            return Ok(false);
        }

        if self.config.trim_local_variables {
            let removed = trim_local_variables(body, &liveness)?;
            if removed > 0 {
                debug!(
                    "{}{}: removed {} dead local variable entries",
                    body.name, body.descriptor, removed
                );
            }
        }
        VariableRemapper::new(&map).remap(body)?;

        if let Some(listener) = &self.listener {
            listener.method_remapped(body, &map);
        }
        Ok(true)
    }

    /// Computes the slot map for `body` from its liveness, without touching
    /// the body.
    ///
    /// `liveness` must have been computed for `body`; it is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDescriptor`](crate::Error::InvalidDescriptor)
    /// if the method descriptor cannot be parsed.
    pub fn compute_variable_map(
        &self,
        body: &MethodBody,
        liveness: &Liveness,
    ) -> Result<VariableMap> {
        let parameter_size = body.parameter_size()?;
        let start_index = self.start_index(body);
        let limit = body.max_locals.min(self.config.max_variables);

        let mut map = VariableMap::identity(body.max_locals);
        let mut occupancy = SlotOccupancy::from_liveness(liveness, limit);

        for old in parameter_size..limit {
            // Unused slots stay put; moving them would change nothing but the map.
            if !occupancy.is_occupied(old) {
                continue;
            }
            if let Some(new) = (start_index..old).find(|&new| occupancy.can_merge(old, new)) {
                occupancy.merge(old, new);
                map.set(old, new);
            }
        }

        Ok(map)
    }

    /// Optimizes a batch of method bodies in parallel.
    ///
    /// Every body is processed independently. On error, the other bodies
    /// have still been optimized and the error of the first failing body (in
    /// slice order) is returned; the failing body itself is unchanged.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by [`VariableOptimizer::optimize`].
    pub fn optimize_all(&self, bodies: &mut [MethodBody]) -> Result<OptimizationSummary> {
        let outcomes: Vec<Result<OptimizationSummary>> = bodies
            .par_iter_mut()
            .map(|body| {
                let slots_before = body.max_locals;
                let changed = self.optimize(body)?;
                Ok(OptimizationSummary {
                    methods: 1,
                    changed: usize::from(changed),
                    slots_saved: usize::from(slots_before.saturating_sub(body.max_locals)),
                })
            })
            .collect();

        let mut summary = OptimizationSummary::default();
        for outcome in outcomes {
            summary = summary.merge(outcome?);
        }
        debug!("slot optimization: {summary}");
        Ok(summary)
    }

    /// First slot that other variables may be moved into.
    fn start_index(&self, body: &MethodBody) -> u16 {
        if body.is_initializer() {
            1
        } else {
            u16::from(!(body.is_static() || self.config.allow_receiver_slot_reuse))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{AccessFlags, MethodAssembler, ValueKind};

    #[test]
    fn test_start_index() {
        let optimizer = VariableOptimizer::new();
        let reuse =
            VariableOptimizer::with_config(OptimizerConfig::new().with_receiver_slot_reuse(true));

        let stat = MethodBody::new("f", "()V", AccessFlags::STATIC, 0, Vec::new());
        let inst = MethodBody::new("f", "()V", AccessFlags::PUBLIC, 1, Vec::new());
        let init = MethodBody::new("<init>", "()V", AccessFlags::PUBLIC, 1, Vec::new());

        assert_eq!(optimizer.start_index(&stat), 0);
        assert_eq!(optimizer.start_index(&inst), 1);
        assert_eq!(optimizer.start_index(&init), 1);
        assert_eq!(reuse.start_index(&inst), 0);
        assert_eq!(reuse.start_index(&init), 1);
    }

    #[test]
    fn test_first_fit_prefers_lowest_slot() -> Result<()> {
        // Three temporaries, each alive on its own: all end up in slot 0.
        let mut asm = MethodAssembler::new_static("f", "()V");
        for slot in 0..3 {
            asm.iconst(1)?.istore(slot)?.iload(slot)?.pop()?;
        }
        asm.return_void()?;
        let body = asm.finish()?;

        let liveness = LivenessAnalyzer::analyze(&body)?;
        let map = VariableOptimizer::new().compute_variable_map(&body, &liveness)?;
        assert_eq!(map.as_slice(), &[0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_occupancy_accumulates_across_merges() -> Result<()> {
        // a (slot 0) is alive first, then b (slot 1), then c (slot 2) overlaps b only.
        let mut asm = MethodAssembler::new_static("f", "()V");
        asm.iconst(1)?
            .istore(0)?
            .iload(0)?
            .pop()?
            .iconst(2)?
            .istore(1)?
            .iconst(3)?
            .istore(2)?
            .iload(1)?
            .pop()?
            .iload(2)?
            .pop()?
            .return_void()?;
        let body = asm.finish()?;

        let liveness = LivenessAnalyzer::analyze(&body)?;
        let map = VariableOptimizer::new().compute_variable_map(&body, &liveness)?;
        // b joins a in slot 0, so c cannot, and c goes to the freed slot 1.
        assert_eq!(map.as_slice(), &[0, 0, 1]);
        // The tables themselves are not modified by the merge.
        assert!(liveness.is_alive_before(10, 2));
        Ok(())
    }

    #[test]
    fn test_max_variables_limit() -> Result<()> {
        let mut asm = MethodAssembler::new_static("f", "()V");
        for slot in 0..3 {
            asm.iconst(1)?.istore(slot)?.iload(slot)?.pop()?;
        }
        asm.return_void()?;
        let body = asm.finish()?;

        let liveness = LivenessAnalyzer::analyze(&body)?;
        let optimizer =
            VariableOptimizer::with_config(OptimizerConfig::new().with_max_variables(2));
        let map = optimizer.compute_variable_map(&body, &liveness)?;
        assert_eq!(map.as_slice(), &[0, 0, 2]);
        Ok(())
    }

    #[test]
    fn test_invalid_body_is_untouched() {
        let mut body = MethodBody::new("f", "()V", AccessFlags::STATIC, 0, Vec::new());
        let copy = body.clone();
        assert!(VariableOptimizer::new().optimize(&mut body).is_err());
        assert_eq!(body, copy);
    }

    #[test]
    fn test_debug_flag_does_not_change_result() -> Result<()> {
        let mut asm = MethodAssembler::new_static("f", "()I");
        asm.iconst(1)?
            .istore(0)?
            .iload(0)?
            .pop()?
            .iconst(1)?
            .istore(1)?
            .iload(1)?
            .return_value(ValueKind::Int)?;
        let mut quiet = asm.finish()?;
        let mut loud = quiet.clone();

        let debug = VariableOptimizer::with_config(OptimizerConfig::new().with_debug(true));
        assert!(VariableOptimizer::new().optimize(&mut quiet)?);
        assert!(debug.optimize(&mut loud)?);
        assert_eq!(quiet, loud);
        Ok(())
    }
}
