//! The design unit is the top-level object of the dataflow IR. It owns every
//! node, block and kernel of a compilation.
use crate::{Block, BlockIdx, CondFlag, Kernel, Node, NodeIdx, NodeKind};
use dfc_idx::maps::IndexedMap;
use dfc_utils::Id;

/// Configuration information for the backends.
#[derive(Debug, Default, Clone)]
pub struct BackendConf {
    /// Name of the top-level wrapper entity.
    pub top_name: Option<Id>,
    /// Also write a Makefile rendering the Dot output.
    pub emit_makefile: bool,
}

/// How a multiplexer input is selected relative to the consuming block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxSelect {
    pub producer: NodeIdx,
    pub pred: BlockIdx,
    /// Branch outcome of `pred` that leads to the consuming block.
    pub flag: CondFlag,
    /// Condition port of `pred`.
    pub condition: Option<NodeIdx>,
}

/// The compilation root.
#[derive(Debug, Default)]
pub struct DesignUnit {
    pub name: Id,
    nodes: IndexedMap<NodeIdx, Node>,
    blocks: IndexedMap<BlockIdx, Block>,
    pub kernels: Vec<Kernel>,
    /// Configuration flags for backends.
    pub bc: BackendConf,
    /// Extra options provided to the command line.
    /// Interpreted by individual passes
    pub extra_opts: Vec<String>,
}

impl DesignUnit {
    pub fn new<S: Into<Id>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Allocate a node. Its UID is the next free arena slot.
    pub fn add_node<S: Into<Id>>(
        &mut self,
        name: S,
        bitwidth: u64,
        kind: NodeKind,
    ) -> NodeIdx {
        let uid = self.nodes.peek_next_idx();
        self.nodes.push(Node::new(uid, name, bitwidth, kind))
    }

    pub fn add_block<S: Into<Id>>(&mut self, name: S, kernel: usize) -> BlockIdx {
        let idx = self.blocks.peek_next_idx();
        self.blocks.push(Block::new(idx, name, kernel))
    }

    pub fn node(&self, idx: NodeIdx) -> &Node {
        &self.nodes[idx]
    }

    pub fn node_mut(&mut self, idx: NodeIdx) -> &mut Node {
        &mut self.nodes[idx]
    }

    pub fn get_node(&self, idx: NodeIdx) -> Option<&Node> {
        self.nodes.get(idx)
    }

    pub fn block(&self, idx: BlockIdx) -> &Block {
        &self.blocks[idx]
    }

    pub fn block_mut(&mut self, idx: BlockIdx) -> &mut Block {
        &mut self.blocks[idx]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, &Node)> {
        self.nodes.iter()
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockIdx, &Block)> {
        self.blocks.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Add the edge `from -> to`: `to` becomes an output of `from` and `from`
    /// an input of `to`. Adding an existing edge does nothing.
    /// # Panics
    /// On a self edge or an unknown node.
    pub fn connect(&mut self, from: NodeIdx, to: NodeIdx) {
        let Some((src, dst)) = self.nodes.split_mut_indices(from, to) else {
            panic!("Cannot connect node {from} to node {to}");
        };
        src.add_out(to);
        dst.add_in(from);
    }

    /// Name of the top-level wrapper.
    pub fn top_name(&self) -> Id {
        self.bc
            .top_name
            .unwrap_or_else(|| Id::new(format!("{}_top", self.name)))
    }

    /// Resolve the inputs of the multiplexer `mux` relative to the consuming
    /// `block`: every input comes with the branch outcome of its
    /// predecessor block that leads into `block`.
    /// # Panics
    /// If `mux` is not a multiplexer or one of its predecessors does not
    /// branch to `block`.
    pub fn mux_selection(&self, mux: NodeIdx, block: BlockIdx) -> Vec<MuxSelect> {
        let NodeKind::Mux(inputs) = &self.node(mux).kind else {
            panic!("Node `{}' is not a multiplexer", self.node(mux).unique_name());
        };
        inputs
            .iter()
            .map(|input| {
                let pred = self.block(input.block);
                MuxSelect {
                    producer: input.node,
                    pred: input.block,
                    flag: pred.successor_flag(block),
                    condition: pred.condition,
                }
            })
            .collect()
    }

    /// Every node of the kernel at position `kernel`.
    pub fn kernel_nodes(&self, kernel: usize) -> &[NodeIdx] {
        &self.kernels[kernel].nodes
    }
}
