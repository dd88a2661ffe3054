//! Worklist-based liveness solver.
//!
//! # Algorithm
//!
//! Liveness is a backward problem solved per instruction:
//!
//! ```text
//! after(i)  = ∪ before(s) for normal successors s
//!             ∪ writes(i)
//!             ∪ before(h) for handlers h protecting i
//! before(i) = uses(i) ∪ (after(i) − kills(i))
//!             ∪ before(h) for handlers h protecting i
//! ```
//!
//! Handler entry liveness is added on both sides of a protected instruction
//! because the exception may be raised before or after its effect.
//!
//! 1. Compute the slot effects of every instruction
//! 2. Add all instructions to the worklist in postorder from the entry,
//!    followed by the unreachable ones
//! 3. While the worklist is non-empty:
//!    a. Remove an instruction from the worklist
//!    b. Recompute its after and before sets
//!    c. If the before set changed, add all predecessors to the worklist
//!       (including instructions protected by a handler starting here)
//!
//! Sets only grow, and there are finitely many facts, so the loop terminates.

use std::collections::VecDeque;

use log::trace;

use crate::{
    analysis::{dataflow::SlotEffects, InstructionGraph, Liveness},
    code::MethodBody,
    utils::{
        graph::{postorder_with_unreachable, NodeId, Predecessors},
        BitSet,
    },
    Result,
};

/// Computes [`Liveness`] for a method body.
///
/// # Usage
///
/// ```rust
/// use slotopt::{analysis::LivenessAnalyzer, code::MethodAssembler};
///
/// // static void f(int n) { int i = 0; while (i < n) i++; }
/// let mut asm = MethodAssembler::new_static("f", "(I)V");
/// asm.iconst(0)?
///     .istore(1)?
///     .label("loop")?
///     .iload(1)?
///     .iload(0)?
///     .if_icmpge("done")?
///     .iinc(1, 1)?
///     .goto("loop")?
///     .label("done")?
///     .return_void()?;
/// let body = asm.finish()?;
///
/// let liveness = LivenessAnalyzer::analyze(&body)?;
/// // `n` is read on every trip through the loop header.
/// assert!(liveness.is_alive_before(2, 0));
/// assert!(liveness.iterations() > body.instructions.len());
/// # Ok::<(), slotopt::Error>(())
/// ```
pub struct LivenessAnalyzer<'a> {
    body: &'a MethodBody,
    graph: &'a InstructionGraph,
    effects: Vec<SlotEffects>,
    /// Before set of each instruction, by instruction index.
    before: Vec<BitSet>,
    /// After set of each instruction, by instruction index.
    after: Vec<BitSet>,
    /// Instructions to process.
    worklist: VecDeque<usize>,
    /// Whether each instruction is currently in the worklist (for deduplication).
    in_worklist: Vec<bool>,
    /// Number of iterations performed.
    iterations: usize,
}

impl<'a> LivenessAnalyzer<'a> {
    /// Validates `body`, builds its instruction graph and computes liveness.
    ///
    /// # Errors
    ///
    /// Returns any error reported by [`MethodBody::validate`] or
    /// [`InstructionGraph::build`].
    pub fn analyze(body: &MethodBody) -> Result<Liveness> {
        body.validate()?;
        let graph = InstructionGraph::build(body)?;
        Ok(LivenessAnalyzer::new(body, &graph).solve())
    }

    /// Creates a solver for a body and its graph.
    ///
    /// The body must be valid and `graph` must have been built from it.
    #[must_use]
    pub fn new(body: &'a MethodBody, graph: &'a InstructionGraph) -> Self {
        let count = body.instructions.len();
        let empty = BitSet::new(usize::from(body.max_locals));
        Self {
            body,
            graph,
            effects: body
                .instructions
                .iter()
                .map(|instr| SlotEffects::of(instr, body.max_locals))
                .collect(),
            before: vec![empty.clone(); count],
            after: vec![empty; count],
            worklist: VecDeque::with_capacity(count),
            in_worklist: vec![false; count],
            iterations: 0,
        }
    }

    /// Runs the solver to its fixed point and returns the liveness tables.
    #[must_use]
    pub fn solve(mut self) -> Liveness {
        if self.body.instructions.is_empty() {
            return Liveness::new(0, self.body.max_locals);
        }

        for node in postorder_with_unreachable(self.graph, self.graph.entry()) {
            self.push(node.index());
        }

        let mut after = BitSet::new(usize::from(self.body.max_locals));
        let mut before = after.clone();
        while let Some(index) = self.worklist.pop_front() {
            self.in_worklist[index] = false;
            self.iterations += 1;

            self.transfer(index, &mut after, &mut before);
            self.after[index].clone_from(&after);
            if before != self.before[index] {
                self.before[index].clone_from(&before);
                let graph = self.graph;
                for pred in graph.predecessors(NodeId::new(index)) {
                    self.push(pred.index());
                }
            }
        }

        trace!(
            "liveness of {}{} converged after {} iterations over {} instructions",
            self.body.name,
            self.body.descriptor,
            self.iterations,
            self.body.instructions.len()
        );

        self.into_liveness()
    }

    /// Evaluates the transfer function of one instruction into `after` and `before`.
    fn transfer(&self, index: usize, after: &mut BitSet, before: &mut BitSet) {
        let node = NodeId::new(index);
        let effects = &self.effects[index];

        after.clear();
        for succ in self.graph.normal_successors(node) {
            after.union_with(&self.before[succ.index()]);
        }
        after.union_with(&effects.writes);

        before.clone_from(after);
        before.difference_with(&effects.kills);
        before.union_with(&effects.uses);

        for handler in self.graph.handlers(node) {
            let entry = &self.before[handler.index()];
            after.union_with(entry);
            before.union_with(entry);
        }
    }

    fn push(&mut self, index: usize) {
        if !self.in_worklist[index] {
            self.in_worklist[index] = true;
            self.worklist.push_back(index);
        }
    }

    fn into_liveness(self) -> Liveness {
        let mut liveness = Liveness::new(self.body.code_length(), self.body.max_locals);
        for (index, instr) in self.body.instructions.iter().enumerate() {
            liveness.record(instr.offset, &self.before[index], &self.after[index]);
            if let Some(slot) = self.effects[index].category2 {
                liveness.set_category2(instr.offset, slot, true);
            }
        }
        liveness.set_iterations(self.iterations);
        liveness
    }
}
