use super::{Action, VisResult, Visitable, VisitedSet, Visitor};
use dfc_ir::{DesignUnit, NodeIdx};
use dfc_utils::Error;
use itertools::Itertools;
use std::collections::VecDeque;

/// Work-queue traversal. Nodes are visited in queue order and the outputs
/// of every completed node are appended to the queue. A node answering
/// [Action::Again] is unmarked and moved to the back of the queue.
///
/// A full round of the queue in which every visit answers `Again` means no
/// visit can make progress any more and fails with a stall error.
#[derive(Debug, Default)]
pub struct BreadthFirst {
    visited: VisitedSet,
    queue: VecDeque<NodeIdx>,
}

impl BreadthFirst {
    pub fn new(design: &DesignUnit) -> Self {
        Self {
            visited: VisitedSet::with_capacity(design.node_count()),
            queue: VecDeque::new(),
        }
    }

    pub fn push(&mut self, node: NodeIdx) {
        self.queue.push_back(node);
    }

    pub fn extend<I: IntoIterator<Item = NodeIdx>>(&mut self, nodes: I) {
        self.queue.extend(nodes);
    }

    /// Visit nodes until the queue is empty.
    pub fn visit_all<V: Visitor>(
        &mut self,
        visitor: &mut V,
        design: &DesignUnit,
    ) -> VisResult {
        // Consecutive retries since the last visit that made progress.
        let mut retries = 0;
        while let Some(node) = self.queue.pop_front() {
            if !self.visited.insert(node) {
                continue;
            }
            match node.accept(visitor, design)? {
                Action::Stop => {
                    self.queue.clear();
                    return Ok(Action::Stop);
                }
                Action::Again => {
                    self.visited.remove(node);
                    self.queue.push_back(node);
                    retries += 1;
                    log::debug!(
                        "Retrying `{}'",
                        design.node(node).unique_name()
                    );
                    if retries >= self.queue.len() {
                        return Err(Error::stalled(format!(
                            "no progress on {}",
                            self.queue
                                .iter()
                                .unique()
                                .map(|n| format!("`{}'", design.node(*n).unique_name()))
                                .join(", ")
                        )));
                    }
                }
                Action::SkipChildren => retries = 0,
                Action::Continue => {
                    retries = 0;
                    self.queue.extend(design.node(node).outs());
                }
            }
        }
        Ok(Action::Continue)
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }
}
