//! EIR graph construction and topological scheduling order (`spec.md` §3
//! Invariants, §4.4 "Graph build").
//!
//! Grounded on `compiler::ir::IRGraph` (a `petgraph::DiGraph` type alias)
//! and `compiler::ir::find_node_by_id` from the teacher crate: an index map
//! from string id to `NodeIndex` sits alongside the graph so lookups by id
//! stay O(1) instead of scanning.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::ValidationIssue;
use crate::ir::types::{Edge, Eir, Node, NodeKind, OpParams};

pub type NodeIdx = NodeIndex;

/// An EIR lowered to a `petgraph` graph, indexed by node id.
pub struct EirGraph {
    pub graph: DiGraph<Node, Edge>,
    pub index: HashMap<String, NodeIndex>,
}

impl EirGraph {
    /// Builds the graph from an already-parsed EIR. Duplicate ids and
    /// dangling edge endpoints are reported as issues rather than panicking
    /// — callers that only need a best-effort graph (e.g. the validator)
    /// can inspect `issues` and still get the graph for the nodes that did
    /// resolve; callers that need a sound graph (the scheduler) must check
    /// `issues.is_empty()` first.
    pub fn build(eir: &Eir) -> (Self, Vec<ValidationIssue>) {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        let mut issues = Vec::new();

        for (i, node) in eir.nodes.iter().enumerate() {
            if index.contains_key(&node.id) {
                issues.push(ValidationIssue::new(
                    format!("/nodes/{i}/id"),
                    format!("duplicate node id {:?}", node.id),
                ));
                continue;
            }
            let idx = graph.add_node(node.clone());
            index.insert(node.id.clone(), idx);
        }

        for (i, edge) in eir.edges.iter().enumerate() {
            let src = index.get(&edge.src).copied();
            let dst = index.get(&edge.dst).copied();
            match (src, dst) {
                (Some(s), Some(d)) => {
                    graph.add_edge(s, d, edge.clone());
                }
                (None, _) => issues.push(ValidationIssue::new(
                    format!("/edges/{i}/src"),
                    format!("unknown node id {:?}", edge.src),
                )),
                (_, None) => issues.push(ValidationIssue::new(
                    format!("/edges/{i}/dst"),
                    format!("unknown node id {:?}", edge.dst),
                )),
            }
        }

        (Self { graph, index }, issues)
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|idx| &self.graph[*idx])
    }

    /// True if `node` is a `delay_line` node whose resolved delay is > 0 ns.
    fn has_positive_delay(node: &Node) -> bool {
        matches!(node.kind, NodeKind::DelayLine)
            && matches!(&node.op, Some(OpParams::Delay(p)) if p.delay.to_ns().map(|ns| ns > 0).unwrap_or(false))
    }

    /// Computes a topological schedule order. Cycles are permitted only
    /// when every strongly-connected component containing more than one
    /// node has at least one outgoing edge from a positive-delay
    /// `delay_line` node; such edges are treated as feedback (excluded from
    /// the ordering constraint, fed back "late" by the scheduler) rather
    /// than being routed through `petgraph::algo::toposort` directly.
    ///
    /// Returns the order plus the set of edges classified as feedback.
    pub fn topo_order_with_feedback(
        &self,
    ) -> Result<(Vec<NodeIndex>, HashSet<(NodeIndex, NodeIndex)>), ValidationIssue> {
        let sccs = petgraph::algo::tarjan_scc(&self.graph);
        let mut feedback: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();

        for scc in &sccs {
            if scc.len() < 2 {
                // A single-node SCC is only cyclic if it has a self-loop.
                if let Some(&n) = scc.first() {
                    let self_loop = self
                        .graph
                        .edges(n)
                        .any(|e| e.target() == n);
                    if self_loop {
                        let node = &self.graph[n];
                        if Self::has_positive_delay(node) {
                            feedback.insert((n, n));
                            continue;
                        }
                        return Err(ValidationIssue::new(
                            format!("/nodes/{}", node.id),
                            "cycle (self-loop) without a positive-delay delay_line",
                        ));
                    }
                }
                continue;
            }

            let members: HashSet<NodeIndex> = scc.iter().copied().collect();
            let mut broke_cycle = false;
            for &n in scc {
                if Self::has_positive_delay(&self.graph[n]) {
                    for e in self.graph.edges(n) {
                        if members.contains(&e.target()) {
                            feedback.insert((n, e.target()));
                            broke_cycle = true;
                        }
                    }
                }
            }
            if !broke_cycle {
                let ids: Vec<String> = scc.iter().map(|n| self.graph[*n].id.clone()).collect();
                return Err(ValidationIssue::new(
                    "/edges",
                    format!(
                        "cycle among nodes {ids:?} with no positive-delay delay_line to break it"
                    ),
                ));
            }
        }

        let mut reduced = self.graph.clone();
        for &(src, dst) in &feedback {
            if let Some(e) = reduced.find_edge(src, dst) {
                reduced.remove_edge(e);
            }
        }

        let order = petgraph::algo::toposort(&reduced, None).map_err(|cycle| {
            let node = &self.graph[cycle.node_id()];
            ValidationIssue::new(
                format!("/nodes/{}", node.id),
                "cycle remains after removing feedback edges",
            )
        })?;

        Ok((order, feedback))
    }
}

pub fn find_start_nodes(g: &EirGraph) -> Vec<NodeIndex> {
    g.graph
        .node_indices()
        .filter(|&n| g.graph.edges_directed(n, petgraph::Direction::Incoming).next().is_none())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::{GraphMeta, Profile, TimeConfig, TimeMode, TimeUnitName};

    fn base_eir(nodes: Vec<Node>, edges: Vec<Edge>) -> Eir {
        Eir {
            version: "1.0".into(),
            profile: Profile::Base,
            seed: 0,
            time: TimeConfig {
                unit: TimeUnitName::Ns,
                mode: TimeMode::ExactEvent,
                fixed_step_dt_us: None,
                epsilon_time_us: 0.0,
                epsilon_numeric: 0.0,
            },
            graph: GraphMeta { name: "g".into() },
            nodes,
            edges,
            probes: vec![],
        }
    }

    fn plain_node(id: &str) -> Node {
        Node {
            id: id.into(),
            kind: NodeKind::Route,
            op: None,
            state: Default::default(),
            timing_constraints: None,
            security: None,
        }
    }

    #[test]
    fn linear_chain_topo_orders_correctly() {
        let eir = base_eir(
            vec![plain_node("a"), plain_node("b"), plain_node("c")],
            vec![
                Edge { src: "a".into(), dst: "b".into(), weight: None, delay_us: 0.0, plasticity: None },
                Edge { src: "b".into(), dst: "c".into(), weight: None, delay_us: 0.0, plasticity: None },
            ],
        );
        let (g, issues) = EirGraph::build(&eir);
        assert!(issues.is_empty());
        let (order, feedback) = g.topo_order_with_feedback().unwrap();
        assert!(feedback.is_empty());
        let ids: Vec<&str> = order.iter().map(|n| g.graph[*n].id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn dangling_edge_reports_issue() {
        let eir = base_eir(
            vec![plain_node("a")],
            vec![Edge { src: "a".into(), dst: "ghost".into(), weight: None, delay_us: 0.0, plasticity: None }],
        );
        let (_, issues) = EirGraph::build(&eir);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("ghost"));
    }

    #[test]
    fn cycle_without_delay_is_rejected() {
        let eir = base_eir(
            vec![plain_node("a"), plain_node("b")],
            vec![
                Edge { src: "a".into(), dst: "b".into(), weight: None, delay_us: 0.0, plasticity: None },
                Edge { src: "b".into(), dst: "a".into(), weight: None, delay_us: 0.0, plasticity: None },
            ],
        );
        let (g, issues) = EirGraph::build(&eir);
        assert!(issues.is_empty());
        assert!(g.topo_order_with_feedback().is_err());
    }

    #[test]
    fn cycle_through_positive_delay_is_allowed() {
        use crate::ir::types::DelayParams;
        use crate::time::TimeValue;

        let delay_node = Node {
            id: "d".into(),
            kind: NodeKind::DelayLine,
            op: Some(OpParams::Delay(DelayParams { delay: TimeValue::Ns(1000) })),
            state: Default::default(),
            timing_constraints: None,
            security: None,
        };
        let eir = base_eir(
            vec![plain_node("a"), delay_node, plain_node("b")],
            vec![
                Edge { src: "a".into(), dst: "b".into(), weight: None, delay_us: 0.0, plasticity: None },
                Edge { src: "b".into(), dst: "d".into(), weight: None, delay_us: 0.0, plasticity: None },
                Edge { src: "d".into(), dst: "a".into(), weight: None, delay_us: 0.0, plasticity: None },
            ],
        );
        let (g, issues) = EirGraph::build(&eir);
        assert!(issues.is_empty());
        let (order, feedback) = g.topo_order_with_feedback().unwrap();
        assert_eq!(order.len(), 3);
        assert!(!feedback.is_empty());
    }
}
