//! Actions control the traversal of the dataflow graph.
use dfc_utils::DfcResult;

/// Result of performing a visit.
pub type VisResult = DfcResult<Action>;

/// Action performed at the end of visiting a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Continue traversal along the outputs of the node.
    Continue,
    /// Globally abort the traversal.
    Stop,
    /// Do not follow the outputs of this node but continue with the other
    /// pending nodes.
    SkipChildren,
    /// The preconditions of the node are not met yet. The node is marked
    /// unvisited and retried later.
    Again,
}

impl Action {
    /// Run the traversal specified by `next` if this traversal succeeds.
    /// If the result of this traversal is not `Action::Continue`, do not
    /// run `next()`.
    pub(super) fn and_then<F>(self, mut next: F) -> VisResult
    where
        F: FnMut() -> VisResult,
    {
        match self {
            Action::Continue => next(),
            Action::Stop | Action::SkipChildren | Action::Again => Ok(self),
        }
    }

    /// Changes a Action::SkipChildren to Action::Continue.
    /// Should be called to indicate the boundary of traversing the children
    /// of a node.
    pub(super) fn pop(self) -> Self {
        match self {
            Action::SkipChildren => Action::Continue,
            x => x,
        }
    }
}
