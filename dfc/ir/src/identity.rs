use dfc_idx::impl_index;
use dfc_utils::Id;

/// Index of a node in the arena of a [crate::DesignUnit]. The numeric value
/// is the node's UID: handed out in increasing order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(u32);
impl_index!(NodeIdx);

/// Index of a [crate::Block] in its design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockIdx(u32);
impl_index!(BlockIdx);

impl std::fmt::Display for NodeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for BlockIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The UID and display name of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    uid: NodeIdx,
    name: Id,
}

impl Identity {
    pub fn new<S: Into<Id>>(uid: NodeIdx, name: S) -> Self {
        Self {
            uid,
            name: name.into(),
        }
    }

    pub fn uid(&self) -> NodeIdx {
        self.uid
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn set_name<S: Into<Id>>(&mut self, name: S) {
        self.name = name.into();
    }

    /// `<name>_<uid>`: unique within a design since UIDs are.
    pub fn unique_name(&self) -> String {
        format!("{}_{}", self.name, self.uid)
    }
}
