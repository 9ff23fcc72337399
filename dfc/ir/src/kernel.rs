use crate::{BlockIdx, NodeIdx};
use dfc_utils::{GetName, Id};

/// A kernel entry point lowered into hardware.
#[derive(Debug, Clone)]
pub struct Kernel {
    pub name: Id,
    pub in_scalars: Vec<NodeIdx>,
    pub out_scalars: Vec<NodeIdx>,
    /// Stream ports that are read.
    pub in_streams: Vec<NodeIdx>,
    /// Stream ports that are written.
    pub out_streams: Vec<NodeIdx>,
    pub consts: Vec<NodeIdx>,
    pub blocks: Vec<BlockIdx>,
    /// Every node of the kernel in creation order.
    pub nodes: Vec<NodeIdx>,
    work_item: bool,
}

impl Kernel {
    pub fn new<S: Into<Id>>(name: S, work_item: bool) -> Self {
        Self {
            name: name.into(),
            in_scalars: vec![],
            out_scalars: vec![],
            in_streams: vec![],
            out_streams: vec![],
            consts: vec![],
            blocks: vec![],
            nodes: vec![],
            work_item,
        }
    }

    /// Is the kernel executed once per work-item (as opposed to once per
    /// task)?
    pub fn is_work_item(&self) -> bool {
        self.work_item
    }

    /// Kernel-level ports: inputs first, then outputs.
    pub fn ports(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        self.in_scalars
            .iter()
            .chain(self.in_streams.iter())
            .chain(self.out_scalars.iter())
            .chain(self.out_streams.iter().filter(|p| !self.in_streams.contains(p)))
            .copied()
    }
}

impl GetName for Kernel {
    fn name(&self) -> Id {
        self.name
    }
}
