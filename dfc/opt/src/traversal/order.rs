use dfc_ir::{DesignUnit, NodeIdx};
use dfc_utils::{DfcResult, Error};
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// A topological order of a set of nodes: every node comes after all of
/// its inputs that belong to the set.
#[derive(Debug, Clone)]
pub struct DataflowOrder {
    order: Vec<NodeIdx>,
}

impl DataflowOrder {
    /// Order `nodes`. The result only depends on the order of `nodes` and
    /// of the edges between them.
    pub fn new(design: &DesignUnit, nodes: &[NodeIdx]) -> DfcResult<Self> {
        let mut graph: DiGraph<NodeIdx, ()> = DiGraph::new();
        let indices: HashMap<NodeIdx, NodeIndex> = nodes
            .iter()
            .map(|n| (*n, graph.add_node(*n)))
            .collect();
        for node in nodes {
            let from = indices[node];
            for out in design.node(*node).outs() {
                if let Some(to) = indices.get(out) {
                    graph.add_edge(from, *to, ());
                }
            }
        }
        let order = algo::toposort(&graph, None).map_err(|cycle| {
            Error::cycle(design.node(graph[cycle.node_id()]).unique_name())
        })?;
        Ok(Self {
            order: order.into_iter().map(|idx| graph[idx]).collect(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of `node` in the order.
    pub fn position(&self, node: NodeIdx) -> Option<usize> {
        self.order.iter().position(|n| *n == node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfc_ir::{ArithOp, NodeKind, PortDir};
    use dfc_utils::ErrorKind;

    #[test]
    fn inputs_come_first() {
        let mut design = DesignUnit::new("d");
        let add = design.add_node("add", 9, NodeKind::Arith(ArithOp::Add));
        let a = design.add_node("a", 8, NodeKind::ScalarPort(PortDir::In));
        let b = design.add_node("b", 8, NodeKind::ScalarPort(PortDir::In));
        let out = design.add_node("o", 9, NodeKind::ScalarPort(PortDir::Out));
        design.connect(add, out);
        design.connect(a, add);
        design.connect(b, add);
        let order = DataflowOrder::new(&design, &[add, out, a, b]).unwrap();
        assert_eq!(order.len(), 4);
        let pos = |n| order.position(n).unwrap();
        assert!(pos(a) < pos(add));
        assert!(pos(b) < pos(add));
        assert!(pos(add) < pos(out));
    }

    #[test]
    fn cycles_are_reported() {
        let mut design = DesignUnit::new("d");
        let x = design.add_node("x", 8, NodeKind::Arith(ArithOp::Add));
        let y = design.add_node("y", 8, NodeKind::Arith(ArithOp::Sub));
        design.connect(x, y);
        design.connect(y, x);
        let err = DataflowOrder::new(&design, &[x, y]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Cycle(_)));
    }
}
