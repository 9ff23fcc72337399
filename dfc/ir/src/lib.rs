//! Dataflow representation of hardware kernels.
//!
//! A [DesignUnit] owns every node of a compilation in a single arena. Nodes
//! are addressed by [NodeIdx], which doubles as their UID, and edges are
//! stored as index lists on both endpoints. Nodes are grouped into the
//! [Block]s and [Kernel]s they were lowered from.

// Modules defining internal structures.
mod block;
mod builder;
mod design;
mod identity;
mod kernel;
mod kind;
mod node;
mod printer;

/// Lowering of SSA programs into the IR.
pub mod from_ssa;

// Re-export types at the module level.
pub use block::{Block, CondFlag};
pub use builder::{Builder, static_addr_width};
pub use design::{BackendConf, DesignUnit, MuxSelect};
pub use dfc_utils::{GetName, Id};
pub use identity::{BlockIdx, Identity, NodeIdx};
pub use kernel::Kernel;
pub use kind::{
    Access, ArithOp, ConstVal, Datatype, FpOp, MuxInput, NodeKind, Offset,
    PortDir, Predicate, StreamIndex, StreamPort,
};
pub use node::{EdgeList, Node};
pub use printer::Printer;
