//! Graph traversal orders.
//!
//! Iterative data flow solvers converge fastest when nodes are visited in
//! an order that follows the direction of the analysis. For backward
//! problems such as liveness that is postorder.
//!
//! - [`postorder`] - Depth-first postorder of the nodes reachable from a start node
//! - [`postorder_with_unreachable`] - Postorder, followed by every node the start
//!   node cannot reach (in descending index order)

use crate::utils::graph::{NodeId, Successors};

/// Computes the postorder traversal of nodes reachable from the start.
///
/// In postorder, a node is visited after all its descendants have been visited.
/// Invalid start nodes yield an empty order.
///
/// # Complexity
///
/// - Time: O(V + E)
/// - Space: O(V)
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut visited = vec![false; graph.node_count()];
    let mut result = Vec::with_capacity(graph.node_count());
    postorder_into(graph, start, &mut visited, &mut result);
    result
}

/// Computes a postorder from `start` and appends all nodes it does not reach.
///
/// Bytecode may contain instructions that no path from the entry reaches
/// (dead code the compiler left behind). Backward analyses still need facts
/// for them, so the unreachable nodes are appended last, highest index first,
/// which is the natural backward order for straight-line code.
pub fn postorder_with_unreachable<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);
    postorder_into(graph, start, &mut visited, &mut result);

    for index in (0..node_count).rev() {
        if !visited[index] {
            result.push(NodeId::new(index));
        }
    }
    result
}

#[allow(clippy::items_after_statements)]
fn postorder_into<G: Successors>(
    graph: &G,
    start: NodeId,
    visited: &mut [bool],
    result: &mut Vec<NodeId>,
) {
    if start.index() >= visited.len() {
        return;
    }

    // Iterative postorder using explicit stack with state
    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let mut stack = vec![(start, State::Enter)];

    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if visited[node.index()] {
                    continue;
                }
                visited[node.index()] = true;

                stack.push((node, State::Exit));

                // Push children in reverse order so they're processed in order
                let successors: Vec<NodeId> = graph.successors(node).collect();
                for &succ in successors.iter().rev() {
                    if !visited[succ.index()] {
                        stack.push((succ, State::Enter));
                    }
                }
            }
            State::Exit => result.push(node),
        }
    }
}
