use super::{Action, VisResult, Visitable, VisitedSet, Visitor};
use dfc_ir::{DesignUnit, NodeIdx};

/// Recursive walk along the outputs of nodes. Every node is visited at most
/// once per walker unless its visit asks to be retried.
#[derive(Debug, Default)]
pub struct DepthFirst {
    visited: VisitedSet,
}

impl DepthFirst {
    pub fn new(design: &DesignUnit) -> Self {
        Self {
            visited: VisitedSet::with_capacity(design.node_count()),
        }
    }

    /// Walk from every node in `seeds`, in order.
    pub fn run<V: Visitor>(
        &mut self,
        visitor: &mut V,
        design: &DesignUnit,
        seeds: &[NodeIdx],
    ) -> VisResult {
        for seed in seeds {
            if self.walk(visitor, design, *seed)? == Action::Stop {
                return Ok(Action::Stop);
            }
        }
        Ok(Action::Continue)
    }

    /// Visit `node` and then everything reachable from it. A node answering
    /// [Action::Again] is unmarked so that a later path can reach it again.
    pub fn walk<V: Visitor>(
        &mut self,
        visitor: &mut V,
        design: &DesignUnit,
        node: NodeIdx,
    ) -> VisResult {
        if !self.visited.insert(node) {
            return Ok(Action::Continue);
        }
        match node.accept(visitor, design)? {
            Action::Stop => Ok(Action::Stop),
            Action::Again => {
                self.visited.remove(node);
                Ok(Action::Continue)
            }
            action @ (Action::Continue | Action::SkipChildren) => {
                action.and_then(|| {
                    for out in design.node(node).outs() {
                        if self.walk(visitor, design, *out)? == Action::Stop {
                            return Ok(Action::Stop);
                        }
                    }
                    Ok(Action::Continue)
                })
                .map(Action::pop)
            }
        }
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }
}
