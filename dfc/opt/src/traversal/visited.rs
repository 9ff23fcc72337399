use bitvec::vec::BitVec;
use dfc_idx::IndexRef;
use dfc_ir::NodeIdx;

/// Set of visited nodes indexed by UID. The underlying bitset doubles in
/// size whenever a UID beyond its end is marked.
#[derive(Debug, Default, Clone)]
pub struct VisitedSet {
    bits: BitVec,
}

impl VisitedSet {
    pub fn with_capacity(nodes: usize) -> Self {
        let mut bits = BitVec::new();
        bits.resize(nodes, false);
        Self { bits }
    }

    fn grow(&mut self, idx: usize) {
        if idx < self.bits.len() {
            return;
        }
        let mut len = self.bits.len().max(1);
        while len <= idx {
            len *= 2;
        }
        self.bits.resize(len, false);
    }

    /// Mark `node` visited. Returns `false` if it already was.
    pub fn insert(&mut self, node: NodeIdx) -> bool {
        let idx = node.index();
        self.grow(idx);
        !self.bits.replace(idx, true)
    }

    pub fn remove(&mut self, node: NodeIdx) {
        if node.index() < self.bits.len() {
            self.bits.set(node.index(), false);
        }
    }

    pub fn contains(&self, node: NodeIdx) -> bool {
        self.bits.get(node.index()).is_some_and(|bit| *bit)
    }

    /// Number of visited nodes.
    pub fn len(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Current size of the bitset.
    pub fn capacity(&self) -> usize {
        self.bits.len()
    }
}
