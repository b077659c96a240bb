//! Graph build (`spec.md` §4.4 "Graph build"): topological sort plus
//! feedback-edge classification, grounded on
//! `compiler::ir::IRGraph`/`find_node_by_id` from the teacher crate.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;

use crate::error::{EventFlowError, ValidationError};
use crate::ir::graph::EirGraph;
use crate::ir::types::Eir;

pub struct ExecPlan {
    pub graph: EirGraph,
    pub order: Vec<NodeIndex>,
    pub feedback: HashSet<(NodeIndex, NodeIndex)>,
}

/// Builds the exec plan: an indexed graph plus a topological node order.
/// Cycles are rejected unless broken by a positive-delay `delay_line`
/// (`spec.md` §3 Invariant (c)); such edges are recorded in `feedback` and
/// excluded from the ordering constraint, fed back "late" by the fixed
/// number of iterations the scheduler runs in fixed-step mode.
pub fn build_exec_order(eir: &Eir) -> Result<ExecPlan, EventFlowError> {
    let (graph, issues) = EirGraph::build(eir);
    if !issues.is_empty() {
        return Err(EventFlowError::Validation(ValidationError(issues)));
    }
    let (order, feedback) = graph
        .topo_order_with_feedback()
        .map_err(|issue| EventFlowError::Validation(ValidationError(vec![issue])))?;
    Ok(ExecPlan {
        graph,
        order,
        feedback,
    })
}
