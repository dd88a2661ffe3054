//! Control flow edge types for the instruction graph.
//!
//! Edges carry the reason control moves from one instruction to another.
//! Liveness itself only needs the adjacency, but the kinds make the graph
//! readable when debugging and let callers tell exception edges apart.

use crate::utils::graph::NodeId;

/// The kind of control flow represented by an edge.
///
/// # Examples
///
/// ```rust
/// use slotopt::analysis::EdgeKind;
///
/// assert!(EdgeKind::ConditionalTrue.is_conditional());
/// assert!(EdgeKind::ExceptionHandler { catch_type: None }.is_exceptional());
/// assert!(!EdgeKind::FallThrough.is_subroutine());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    /// Execution continues with the next instruction.
    FallThrough,

    /// Unconditional jump (`goto`).
    Jump,

    /// The taken side of a conditional branch.
    ConditionalTrue,

    /// The fall-through side of a conditional branch.
    ConditionalFalse,

    /// A `lookupswitch` case.
    Switch {
        /// The case key, or `None` for the default target.
        case_value: Option<i32>,
    },

    /// From a `jsr` to the subroutine entry.
    SubroutineCall,

    /// From a `ret` to an instruction following some `jsr`.
    ///
    /// Subroutine returns are not matched to their calls; a `ret` may
    /// return after any `jsr` in the method.
    SubroutineReturn,

    /// From a protected instruction to an exception handler entry.
    ExceptionHandler {
        /// The caught class, or `None` for a catch-all handler.
        catch_type: Option<String>,
    },
}

impl EdgeKind {
    /// Returns `true` for both sides of a conditional branch.
    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        matches!(self, Self::ConditionalTrue | Self::ConditionalFalse)
    }

    /// Returns `true` for edges to exception handlers.
    #[must_use]
    pub const fn is_exceptional(&self) -> bool {
        matches!(self, Self::ExceptionHandler { .. })
    }

    /// Returns `true` for subroutine calls and returns.
    #[must_use]
    pub const fn is_subroutine(&self) -> bool {
        matches!(self, Self::SubroutineCall | Self::SubroutineReturn)
    }
}

/// An edge of the instruction graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    target: NodeId,
    kind: EdgeKind,
}

impl Edge {
    /// Creates a new edge.
    #[must_use]
    pub const fn new(target: NodeId, kind: EdgeKind) -> Self {
        Self { target, kind }
    }

    /// The instruction this edge leads to.
    #[must_use]
    pub const fn target(&self) -> NodeId {
        self.target
    }

    /// The kind of control flow.
    #[must_use]
    pub const fn kind(&self) -> &EdgeKind {
        &self.kind
    }
}
