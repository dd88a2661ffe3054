//! Minimal directed-graph abstractions shared by the analyses.
//!
//! - [`NodeId`] - Strongly-typed node index
//! - [`GraphBase`], [`Successors`], [`Predecessors`] - Adjacency traits
//! - [`postorder`], [`postorder_with_unreachable`] - Traversal orders

mod node;
mod traits;
mod traversal;

pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, Successors};
pub use traversal::{postorder, postorder_with_unreachable};
