use crate::{BlockIdx, Identity, NodeIdx, NodeKind};
use dfc_utils::Id;
use smallvec::SmallVec;

/// Ordered list of edges without duplicates.
pub type EdgeList = SmallVec<[NodeIdx; 4]>;

/// A node of the dataflow graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub ident: Identity,
    /// Width of the value the node produces. Only ever widened after
    /// construction.
    bitwidth: u64,
    /// The input value this node was lowered from. Used in diagnostics.
    pub source: Option<Id>,
    ins: EdgeList,
    outs: EdgeList,
    /// Inputs that are sign extended when widened to this node's width.
    signed_ins: SmallVec<[NodeIdx; 2]>,
    /// Block that owns this node. Kernel-level ports have none.
    pub block: Option<BlockIdx>,
    pub kind: NodeKind,
}

impl Node {
    pub fn new<S: Into<Id>>(
        uid: NodeIdx,
        name: S,
        bitwidth: u64,
        kind: NodeKind,
    ) -> Self {
        Self {
            ident: Identity::new(uid, name),
            bitwidth,
            source: None,
            ins: EdgeList::new(),
            outs: EdgeList::new(),
            signed_ins: SmallVec::new(),
            block: None,
            kind,
        }
    }

    pub fn uid(&self) -> NodeIdx {
        self.ident.uid()
    }

    pub fn name(&self) -> Id {
        self.ident.name()
    }

    pub fn unique_name(&self) -> String {
        self.ident.unique_name()
    }

    pub fn bitwidth(&self) -> u64 {
        self.bitwidth
    }

    /// Widen the node to `bitwidth`. Narrower widths are ignored.
    pub fn set_bitwidth(&mut self, bitwidth: u64) {
        self.bitwidth = self.bitwidth.max(bitwidth);
    }

    /// Sign extend `input` instead of zero extending it.
    pub fn sign_extend(&mut self, input: NodeIdx) {
        if !self.signed_ins.contains(&input) {
            self.signed_ins.push(input);
        }
    }

    pub fn sign_extends(&self, input: NodeIdx) -> bool {
        self.signed_ins.contains(&input)
    }

    /// Record `node` as an input. Returns `false` if it already was one.
    pub fn add_in(&mut self, node: NodeIdx) -> bool {
        Self::insert(&mut self.ins, node)
    }

    /// Record `node` as an output. Returns `false` if it already was one.
    pub fn add_out(&mut self, node: NodeIdx) -> bool {
        Self::insert(&mut self.outs, node)
    }

    pub fn get_in(&self, i: usize) -> Option<NodeIdx> {
        self.ins.get(i).copied()
    }

    pub fn get_out(&self, i: usize) -> Option<NodeIdx> {
        self.outs.get(i).copied()
    }

    pub fn ins(&self) -> &[NodeIdx] {
        &self.ins
    }

    pub fn outs(&self) -> &[NodeIdx] {
        &self.outs
    }

    /// Nodes whose values this node needs.
    pub fn dependencies(&self) -> &[NodeIdx] {
        &self.ins
    }

    fn insert(list: &mut EdgeList, node: NodeIdx) -> bool {
        if list.contains(&node) {
            false
        } else {
            list.push(node);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArithOp;
    use dfc_idx::IndexRef;

    #[test]
    fn edge_insertion_is_idempotent() {
        let mut node =
            Node::new(NodeIdx::new(0), "add", 8, NodeKind::Arith(ArithOp::Add));
        let a = NodeIdx::new(1);
        let b = NodeIdx::new(2);
        assert!(node.add_in(a));
        assert!(!node.add_in(a));
        assert!(node.add_in(b));
        assert_eq!(node.ins(), &[a, b]);
        assert!(node.add_out(b));
        assert!(!node.add_out(b));
        assert_eq!(node.outs(), &[b]);
        assert_eq!(node.get_in(1), Some(b));
        assert_eq!(node.get_in(2), None);
        assert_eq!(node.get_out(5), None);
    }

    #[test]
    fn widths_only_grow() {
        let mut node =
            Node::new(NodeIdx::new(0), "add", 8, NodeKind::Arith(ArithOp::Add));
        node.set_bitwidth(12);
        assert_eq!(node.bitwidth(), 12);
        node.set_bitwidth(4);
        assert_eq!(node.bitwidth(), 12);
    }

    #[test]
    fn sign_extension_is_per_input() {
        let mut node =
            Node::new(NodeIdx::new(0), "add", 8, NodeKind::Arith(ArithOp::Add));
        let (a, b) = (NodeIdx::new(1), NodeIdx::new(2));
        node.sign_extend(a);
        node.sign_extend(a);
        assert!(node.sign_extends(a));
        assert!(!node.sign_extends(b));
    }
}
