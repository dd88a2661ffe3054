//! Instruction-level control flow graph.

use crate::{
    analysis::cfg::{Edge, EdgeKind},
    code::{MethodBody, Operation},
    utils::graph::{GraphBase, NodeId, Predecessors, Successors},
    Error, Result,
};

/// A control flow graph with one node per instruction.
///
/// Node `n` is the instruction at index `n` of the method body. Normal
/// successors (fall-through, jumps, switch targets, subroutine edges) are
/// kept apart from exception handler edges: every instruction protected by
/// an exception table entry may transfer control to that entry's handler.
///
/// The [`Successors`] implementation yields both kinds. Predecessor lists
/// likewise include the protected instructions of every handler entry.
///
/// # Examples
///
/// ```rust
/// use slotopt::{analysis::InstructionGraph, code::MethodAssembler};
/// use slotopt::utils::graph::{NodeId, Successors};
///
/// let mut asm = MethodAssembler::new_static("f", "(I)V");
/// asm.iload(0)?.ifeq("end")?.nop()?.label("end")?.return_void()?;
/// let body = asm.finish()?;
///
/// let graph = InstructionGraph::build(&body)?;
/// let succs: Vec<_> = graph.successors(NodeId::new(1)).collect();
/// assert_eq!(succs, vec![NodeId::new(3), NodeId::new(2)]);
/// # Ok::<(), slotopt::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct InstructionGraph {
    /// Normal edges, per instruction.
    edges: Vec<Vec<Edge>>,
    /// Exception handler edges, per protected instruction, in table order.
    handlers: Vec<Vec<Edge>>,
    /// Reverse adjacency over both kinds of edges.
    predecessors: Vec<Vec<NodeId>>,
}

impl InstructionGraph {
    /// Builds the graph of a method body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] for a body without instructions,
    /// [`Error::InvalidBranchTarget`] if a jump does not land on an
    /// instruction, and [`Error::Malformed`] if an exception handler entry
    /// does not start an instruction.
    pub fn build(body: &MethodBody) -> Result<Self> {
        let count = body.instructions.len();
        if count == 0 {
            return Err(Error::Empty);
        }

        let node_at = |from: u32, target: u32| {
            body.index_of(target)
                .map(NodeId::new)
                .ok_or(Error::InvalidBranchTarget {
                    offset: from,
                    target,
                })
        };

        // Instructions a `ret` may return to.
        let return_sites: Vec<NodeId> = body
            .instructions
            .iter()
            .enumerate()
            .filter(|(index, instr)| instr.is_subroutine_call() && index + 1 < count)
            .map(|(index, _)| NodeId::new(index + 1))
            .collect();

        let mut edges = vec![Vec::new(); count];
        for (index, instr) in body.instructions.iter().enumerate() {
            let out = &mut edges[index];
            match &instr.op {
                Operation::Goto { target } => {
                    out.push(Edge::new(node_at(instr.offset, *target)?, EdgeKind::Jump));
                }
                Operation::Jsr { target } => {
                    out.push(Edge::new(
                        node_at(instr.offset, *target)?,
                        EdgeKind::SubroutineCall,
                    ));
                }
                Operation::Branch { target, .. } => {
                    out.push(Edge::new(
                        node_at(instr.offset, *target)?,
                        EdgeKind::ConditionalTrue,
                    ));
                }
                Operation::Switch { default, cases } => {
                    for (key, target) in cases {
                        out.push(Edge::new(
                            node_at(instr.offset, *target)?,
                            EdgeKind::Switch {
                                case_value: Some(*key),
                            },
                        ));
                    }
                    out.push(Edge::new(
                        node_at(instr.offset, *default)?,
                        EdgeKind::Switch { case_value: None },
                    ));
                }
                Operation::Ret { .. } => {
                    out.extend(
                        return_sites
                            .iter()
                            .map(|&site| Edge::new(site, EdgeKind::SubroutineReturn)),
                    );
                }
                _ => {}
            }

            if instr.falls_through() && index + 1 < count {
                let kind = if matches!(instr.op, Operation::Branch { .. }) {
                    EdgeKind::ConditionalFalse
                } else {
                    EdgeKind::FallThrough
                };
                out.push(Edge::new(NodeId::new(index + 1), kind));
            }
        }

        let mut handlers = vec![Vec::new(); count];
        for entry in &body.exception_handlers {
            let handler = body.index_of(entry.handler).map(NodeId::new).ok_or_else(|| {
                malformed_error!(
                    "Exception handler entry {} is not an instruction",
                    entry.handler
                )
            })?;
            for (index, instr) in body.instructions.iter().enumerate() {
                if entry.covers(instr.offset) {
                    handlers[index].push(Edge::new(
                        handler,
                        EdgeKind::ExceptionHandler {
                            catch_type: entry.catch_type.clone(),
                        },
                    ));
                }
            }
        }

        let mut predecessors = vec![Vec::new(); count];
        for (index, out) in edges.iter().chain(&handlers).enumerate() {
            let source = NodeId::new(index % count);
            for edge in out {
                let preds: &mut Vec<NodeId> = &mut predecessors[edge.target().index()];
                if !preds.contains(&source) {
                    preds.push(source);
                }
            }
        }

        Ok(Self {
            edges,
            handlers,
            predecessors,
        })
    }

    /// The method entry, always the first instruction.
    #[must_use]
    pub const fn entry(&self) -> NodeId {
        NodeId::new(0)
    }

    /// Normal outgoing edges of an instruction.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not an instruction of this graph.
    #[must_use]
    pub fn edges(&self, node: NodeId) -> &[Edge] {
        &self.edges[node.index()]
    }

    /// Exception handler edges of an instruction, in exception table order.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not an instruction of this graph.
    #[must_use]
    pub fn handler_edges(&self, node: NodeId) -> &[Edge] {
        &self.handlers[node.index()]
    }

    /// Targets of the normal outgoing edges of an instruction.
    pub fn normal_successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges(node).iter().map(Edge::target)
    }

    /// Handler entries that protect an instruction.
    pub fn handlers(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.handler_edges(node).iter().map(Edge::target)
    }

    /// Instructions without any normal successor: returns, throws, and
    /// subroutine returns in methods without `jsr`.
    pub fn exits(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, out)| out.is_empty())
            .map(|(index, _)| NodeId::new(index))
    }

    /// Total number of edges, exception edges included.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.iter().chain(&self.handlers).map(Vec::len).sum()
    }
}

impl GraphBase for InstructionGraph {
    fn node_count(&self) -> usize {
        self.edges.len()
    }
}

impl Successors for InstructionGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.normal_successors(node).chain(self.handlers(node))
    }
}

impl Predecessors for InstructionGraph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.predecessors[node.index()].iter().copied()
    }
}
