use crate::{BlockIdx, NodeIdx};
use dfc_utils::Id;
use linked_hash_map::LinkedHashMap;

/// Branch outcome that leads from a block to one of its successors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CondFlag {
    True,
    False,
    /// Unconditional transfer.
    None,
}

impl CondFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            CondFlag::True => "true",
            CondFlag::False => "false",
            CondFlag::None => "none",
        }
    }
}

/// The lowered operators of one basic block together with the ports that
/// carry values across its boundary.
#[derive(Debug, Clone)]
pub struct Block {
    idx: BlockIdx,
    pub name: Id,
    /// Position of the owning kernel in [crate::DesignUnit::kernels].
    pub kernel: usize,
    pub ops: Vec<NodeIdx>,
    pub consts: Vec<NodeIdx>,
    pub in_scalars: Vec<NodeIdx>,
    pub out_scalars: Vec<NodeIdx>,
    /// Load accesses performed by this block.
    pub in_streams: Vec<NodeIdx>,
    /// Store accesses performed by this block.
    pub out_streams: Vec<NodeIdx>,
    /// Boolean port selecting between the successors flagged TRUE and FALSE.
    pub condition: Option<NodeIdx>,
    successors: LinkedHashMap<BlockIdx, CondFlag>,
}

impl Block {
    pub fn new<S: Into<Id>>(idx: BlockIdx, name: S, kernel: usize) -> Self {
        Self {
            idx,
            name: name.into(),
            kernel,
            ops: vec![],
            consts: vec![],
            in_scalars: vec![],
            out_scalars: vec![],
            in_streams: vec![],
            out_streams: vec![],
            condition: None,
            successors: LinkedHashMap::new(),
        }
    }

    pub fn idx(&self) -> BlockIdx {
        self.idx
    }

    pub fn unique_name(&self) -> String {
        format!("{}_{}", self.name, self.idx)
    }

    /// Record `block` as a successor. A previously recorded flag for the
    /// same successor is replaced.
    pub fn add_successor(&mut self, block: BlockIdx, flag: CondFlag) {
        self.successors.insert(block, flag);
    }

    /// The flag leading to `block`.
    /// # Panics
    /// If `block` is not a successor of this block.
    pub fn successor_flag(&self, block: BlockIdx) -> CondFlag {
        self.try_successor_flag(block).unwrap_or_else(|| {
            panic!(
                "Block `{}' is not a successor of `{}'",
                block,
                self.unique_name()
            )
        })
    }

    pub fn try_successor_flag(&self, block: BlockIdx) -> Option<CondFlag> {
        self.successors.get(&block).copied()
    }

    /// Successors in the order they were first recorded.
    pub fn successors(&self) -> impl Iterator<Item = (BlockIdx, CondFlag)> + '_ {
        self.successors.iter().map(|(b, f)| (*b, *f))
    }

    /// Every node owned by this block.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        self.in_scalars
            .iter()
            .chain(self.consts.iter())
            .chain(self.in_streams.iter())
            .chain(self.ops.iter())
            .chain(self.out_streams.iter())
            .chain(self.out_scalars.iter())
            .copied()
    }
}
