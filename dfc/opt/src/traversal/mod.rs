//! Helpers for traversing dataflow graphs
mod action;
mod breadth_first;
mod construct;
mod depth_first;
mod order;
mod visited;
mod visitor;

pub use action::{Action, VisResult};
pub use breadth_first::BreadthFirst;
pub use construct::{ConstructVisitor, Named, ParseVal, PassOpt};
pub use depth_first::DepthFirst;
pub use order::DataflowOrder;
pub use visited::VisitedSet;
pub use visitor::{Traversal, Visitable, Visitor};
