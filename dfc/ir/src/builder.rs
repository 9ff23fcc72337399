//! IR Builder. Provides convenience methods to add nodes to a kernel of a
//! design, registering them with the kernel and the current block.
use crate::{
    Access, ArithOp, BlockIdx, ConstVal, Datatype, DesignUnit, FpOp, MuxInput,
    NodeIdx, NodeKind, Offset, PortDir, Predicate, StreamIndex, StreamPort,
};
use dfc_utils::Id;

/// An IR builder for one kernel.
pub struct Builder<'a> {
    pub design: &'a mut DesignUnit,
    /// Position of the kernel being built.
    kernel: usize,
    /// Block new operators are added to.
    block: Option<BlockIdx>,
}

impl<'a> Builder<'a> {
    pub fn new(design: &'a mut DesignUnit, kernel: usize) -> Self {
        Self {
            design,
            kernel,
            block: None,
        }
    }

    pub fn kernel(&self) -> usize {
        self.kernel
    }

    pub fn set_block(&mut self, block: Option<BlockIdx>) {
        self.block = block;
    }

    pub fn block(&self) -> Option<BlockIdx> {
        self.block
    }

    /// Add a block to the kernel.
    pub fn add_block<S: Into<Id>>(&mut self, name: S) -> BlockIdx {
        let idx = self.design.add_block(name, self.kernel);
        self.design.kernels[self.kernel].blocks.push(idx);
        idx
    }

    fn add_node<S: Into<Id>>(
        &mut self,
        name: S,
        bitwidth: u64,
        kind: NodeKind,
    ) -> NodeIdx {
        let idx = self.design.add_node(name, bitwidth, kind);
        self.design.node_mut(idx).block = self.block;
        self.design.kernels[self.kernel].nodes.push(idx);
        idx
    }

    /// Add an operator to the current block.
    fn add_op<S: Into<Id>>(
        &mut self,
        name: S,
        bitwidth: u64,
        kind: NodeKind,
    ) -> NodeIdx {
        let idx = self.add_node(name, bitwidth, kind);
        if let Some(block) = self.block {
            self.design.block_mut(block).ops.push(idx);
        }
        idx
    }

    pub fn add_arith(&mut self, op: ArithOp, bitwidth: u64) -> NodeIdx {
        self.add_op(op.as_str(), bitwidth, NodeKind::Arith(op))
    }

    pub fn add_fp_arith(
        &mut self,
        op: FpOp,
        mantissa: u32,
        exponent: u32,
    ) -> NodeIdx {
        self.add_op(
            op.as_str(),
            (mantissa + exponent + 1) as u64,
            NodeKind::FpArith {
                op,
                mantissa,
                exponent,
            },
        )
    }

    pub fn add_compare(&mut self, pred: Predicate) -> NodeIdx {
        self.add_op(pred.as_str(), 1, NodeKind::Compare(pred))
    }

    /// Add a constant to the current block and the kernel. Constants are
    /// never shared: every call creates a new node.
    pub fn add_const(
        &mut self,
        literal: &str,
        bitwidth: u64,
        datatype: Datatype,
    ) -> NodeIdx {
        let name = ConstVal::display_name(literal);
        let idx = self.add_node(
            name,
            bitwidth,
            NodeKind::Const(ConstVal::new(literal, datatype)),
        );
        if let Some(block) = self.block {
            self.design.block_mut(block).consts.push(idx);
        }
        self.design.kernels[self.kernel].consts.push(idx);
        idx
    }

    /// Add a multiplexer over `inputs` and connect every input to it.
    pub fn add_mux<S: Into<Id>>(
        &mut self,
        name: S,
        inputs: Vec<MuxInput>,
        bitwidth: u64,
    ) -> NodeIdx {
        let producers: Vec<_> = inputs.iter().map(|i| i.node).collect();
        let idx = self.add_op(name, bitwidth, NodeKind::Mux(inputs));
        for producer in producers {
            self.design.connect(producer, idx);
        }
        idx
    }

    pub fn add_reg<S: Into<Id>>(&mut self, name: S, bitwidth: u64) -> NodeIdx {
        self.add_op(name, bitwidth, NodeKind::Reg)
    }

    pub fn add_ram<S: Into<Id>>(
        &mut self,
        name: S,
        depth: u64,
        bitwidth: u64,
        address: Option<NodeIdx>,
    ) -> NodeIdx {
        let idx = self.add_op(name, bitwidth, NodeKind::Ram { depth, address });
        if let Some(addr) = address {
            self.design.connect(addr, idx);
        }
        idx
    }

    pub fn add_fifo<S: Into<Id>>(
        &mut self,
        name: S,
        depth: u64,
        bitwidth: u64,
    ) -> NodeIdx {
        self.add_op(name, bitwidth, NodeKind::Fifo { depth })
    }

    /// Add a scalar port. Kernel-level ports are registered with the kernel,
    /// internal ones are registered by [Builder::add_boundary_port].
    pub fn add_scalar_port<S: Into<Id>>(
        &mut self,
        name: S,
        bitwidth: u64,
        dir: PortDir,
    ) -> NodeIdx {
        let saved = self.block.take();
        let idx = self.add_node(name, bitwidth, NodeKind::ScalarPort(dir));
        self.block = saved;
        let kernel = &mut self.design.kernels[self.kernel];
        match dir {
            PortDir::In => kernel.in_scalars.push(idx),
            PortDir::Out => kernel.out_scalars.push(idx),
            PortDir::Internal => (),
        }
        idx
    }

    /// Add a port carrying a value across the edge `from -> to`. The port is
    /// an output of `from` and an input of `to`.
    pub fn add_boundary_port<S: Into<Id>>(
        &mut self,
        name: S,
        bitwidth: u64,
        from: BlockIdx,
        to: BlockIdx,
    ) -> NodeIdx {
        let idx = self.add_scalar_port(name, bitwidth, PortDir::Internal);
        self.design.node_mut(idx).block = Some(from);
        self.design.block_mut(from).out_scalars.push(idx);
        self.design.block_mut(to).in_scalars.push(idx);
        idx
    }

    /// Add a port exposing a value of the current block at its boundary.
    pub fn add_block_output<S: Into<Id>>(
        &mut self,
        name: S,
        bitwidth: u64,
    ) -> NodeIdx {
        let idx = self.add_scalar_port(name, bitwidth, PortDir::Internal);
        if let Some(block) = self.block {
            self.design.node_mut(idx).block = Some(block);
            self.design.block_mut(block).out_scalars.push(idx);
        }
        idx
    }

    /// Add a stream port. It is classified as kernel input or output once
    /// its accesses are known.
    pub fn add_stream_port<S: Into<Id>>(
        &mut self,
        name: S,
        bitwidth: u64,
    ) -> NodeIdx {
        let saved = self.block.take();
        let idx = self.add_node(
            name,
            bitwidth,
            NodeKind::StreamPort(StreamPort::default()),
        );
        self.block = saved;
        idx
    }

    /// Append an access to `port`. A load is connected to the port and
    /// produces the loaded value. A store consumes `stored` as its first
    /// input. A dynamic offset is connected after the stored value.
    pub fn add_stream_index(
        &mut self,
        port: NodeIdx,
        access: Access,
        offset: Offset,
        bitwidth: u64,
        stored: Option<NodeIdx>,
    ) -> NodeIdx {
        let addr_width = match offset {
            Offset::Static(off) => static_addr_width(off),
            Offset::Dynamic(addr) => self.design.node(addr).bitwidth(),
        };
        let name = format!("{}_{}", self.design.node(port).name(), access.as_str());
        let idx = self.add_node(
            name,
            bitwidth,
            NodeKind::StreamIndex(StreamIndex {
                port,
                access,
                offset,
                addr_width,
            }),
        );
        match access {
            Access::Load => self.design.connect(port, idx),
            Access::Store => {
                if let Some(value) = stored {
                    self.design.connect(value, idx);
                }
            }
        }
        if let Offset::Dynamic(addr) = offset {
            self.design.connect(addr, idx);
        }
        if let NodeKind::StreamPort(sp) = &mut self.design.node_mut(port).kind {
            sp.push(idx, access);
        }
        if let Some(block) = self.block {
            let block = self.design.block_mut(block);
            match access {
                Access::Load => block.in_streams.push(idx),
                Access::Store => block.out_streams.push(idx),
            }
        }
        idx
    }
}

/// Minimal width of a static byte offset.
pub fn static_addr_width(offset: i64) -> u64 {
    let width = dfc_utils::bits_to_store(offset.unsigned_abs());
    if offset < 0 { width + 1 } else { width }
}
