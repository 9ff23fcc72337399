//! Implements a visitor for dataflow graphs.
//! Passes implemented as a Visitor are directly invoked on a [DesignUnit]
//! and visit every node of every [Kernel](dfc_ir::Kernel).
use super::action::{Action, VisResult};
use super::{BreadthFirst, ConstructVisitor, DataflowOrder, DepthFirst, Named};
use dfc_ir::{
    ArithOp, ConstVal, DesignUnit, FpOp, MuxInput, NodeIdx, NodeKind,
    PortDir, Predicate, StreamIndex, StreamPort,
};
use dfc_utils::DfcResult;

/// Strategy used to walk the nodes of a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Recurse along the outputs of every node, visiting each node once.
    DepthFirst,
    /// Visit nodes from a queue seeded in dataflow order. Nodes answering
    /// [Action::Again] are moved to the back of the queue.
    BreadthFirst,
}

/// The visiting interface for dataflow graphs. Contains one `visit_<kind>`
/// method per node kind. Every method defaults to [Action::Continue], so a
/// pass only overrides the kinds it cares about.
///
/// Visit methods only get shared access to the design. Passes that change
/// the graph record their changes and apply them in
/// [Visitor::finish_kernel] or [Visitor::finish_design].
pub trait Visitor {
    /// Precondition for this pass to run on the design. If this function
    /// returns None, the pass triggers. Otherwise it is skipped and the
    /// string is logged as the reason.
    fn precondition(_design: &DesignUnit) -> Option<String>
    where
        Self: Sized,
    {
        None
    }

    /// How the nodes of each kernel are walked.
    fn traversal() -> Traversal
    where
        Self: Sized,
    {
        Traversal::DepthFirst
    }

    /// Transform the design before visiting the kernels.
    fn start_design(&mut self, _design: &mut DesignUnit) -> VisResult {
        Ok(Action::Continue)
    }

    /// Transform the design after visiting the kernels.
    fn finish_design(&mut self, _design: &mut DesignUnit) -> VisResult {
        Ok(Action::Continue)
    }

    /// Executed before the nodes of kernel `kernel` are visited.
    fn start_kernel(
        &mut self,
        _kernel: usize,
        _design: &mut DesignUnit,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    /// Executed after the nodes of kernel `kernel` were visited.
    fn finish_kernel(
        &mut self,
        _kernel: usize,
        _design: &mut DesignUnit,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    /// Define the traversal over a kernel.
    /// Calls [Visitor::start_kernel], walks the nodes with the strategy of
    /// [Visitor::traversal] and finally calls [Visitor::finish_kernel].
    fn traverse_kernel(
        &mut self,
        kernel: usize,
        design: &mut DesignUnit,
    ) -> VisResult
    where
        Self: Sized,
    {
        self.start_kernel(kernel, design)?
            .and_then(|| {
                let design = &*design;
                let seeds = design.kernel_nodes(kernel);
                match Self::traversal() {
                    Traversal::DepthFirst => {
                        DepthFirst::new(design).run(self, design, seeds)
                    }
                    Traversal::BreadthFirst => {
                        let order = DataflowOrder::new(design, seeds)?;
                        let mut bf = BreadthFirst::new(design);
                        bf.extend(order.iter());
                        bf.visit_all(self, design)
                    }
                }
            })?
            .and_then(|| self.finish_kernel(kernel, design))
    }

    /// Run the visitor on every kernel of `design`.
    ///
    /// After visiting a kernel, [ConstructVisitor::clear_data] resets the
    /// visitor. An [Action::Stop] skips the remaining kernels.
    fn do_pass(&mut self, design: &mut DesignUnit) -> DfcResult<()>
    where
        Self: Sized + ConstructVisitor + Named,
    {
        if let Some(msg) = Self::precondition(design) {
            log::info!("Skipping `{}': {msg}", Self::name());
            return Ok(());
        }

        self.start_design(design)?;
        for kernel in 0..design.kernels.len() {
            let action = self.traverse_kernel(kernel, design)?;
            self.clear_data();
            if action == Action::Stop {
                break;
            }
        }
        self.finish_design(design)?;
        Ok(())
    }

    /// Build a visitor with [ConstructVisitor::from] and call
    /// [Visitor::do_pass] using it.
    fn do_pass_default(design: &mut DesignUnit) -> DfcResult<Self>
    where
        Self: ConstructVisitor + Sized + Named,
    {
        let mut visitor = Self::from(&*design)?;
        visitor.do_pass(design)?;
        Ok(visitor)
    }

    fn visit_arith(
        &mut self,
        _node: NodeIdx,
        _op: ArithOp,
        _design: &DesignUnit,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    fn visit_fp_arith(
        &mut self,
        _node: NodeIdx,
        _op: FpOp,
        _design: &DesignUnit,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    fn visit_compare(
        &mut self,
        _node: NodeIdx,
        _pred: Predicate,
        _design: &DesignUnit,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    fn visit_const(
        &mut self,
        _node: NodeIdx,
        _val: &ConstVal,
        _design: &DesignUnit,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    fn visit_mux(
        &mut self,
        _node: NodeIdx,
        _inputs: &[MuxInput],
        _design: &DesignUnit,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    fn visit_reg(&mut self, _node: NodeIdx, _design: &DesignUnit) -> VisResult {
        Ok(Action::Continue)
    }

    fn visit_ram(
        &mut self,
        _node: NodeIdx,
        _depth: u64,
        _design: &DesignUnit,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    fn visit_fifo(
        &mut self,
        _node: NodeIdx,
        _depth: u64,
        _design: &DesignUnit,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    fn visit_scalar_port(
        &mut self,
        _node: NodeIdx,
        _dir: PortDir,
        _design: &DesignUnit,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    fn visit_stream_port(
        &mut self,
        _node: NodeIdx,
        _port: &StreamPort,
        _design: &DesignUnit,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    fn visit_stream_index(
        &mut self,
        _node: NodeIdx,
        _index: &StreamIndex,
        _design: &DesignUnit,
    ) -> VisResult {
        Ok(Action::Continue)
    }
}

/// Describes types that can be visited by things implementing [Visitor].
pub trait Visitable {
    /// Dispatch to the visit method matching the kind of this node.
    fn accept<V: Visitor>(&self, visitor: &mut V, design: &DesignUnit)
    -> VisResult;
}

impl Visitable for NodeIdx {
    fn accept<V: Visitor>(
        &self,
        visitor: &mut V,
        design: &DesignUnit,
    ) -> VisResult {
        let node = *self;
        match &design.node(node).kind {
            NodeKind::Arith(op) => visitor.visit_arith(node, *op, design),
            NodeKind::FpArith { op, .. } => {
                visitor.visit_fp_arith(node, *op, design)
            }
            NodeKind::Compare(pred) => visitor.visit_compare(node, *pred, design),
            NodeKind::Const(val) => visitor.visit_const(node, val, design),
            NodeKind::Mux(inputs) => visitor.visit_mux(node, inputs, design),
            NodeKind::Reg => visitor.visit_reg(node, design),
            NodeKind::Ram { depth, .. } => visitor.visit_ram(node, *depth, design),
            NodeKind::Fifo { depth } => visitor.visit_fifo(node, *depth, design),
            NodeKind::ScalarPort(dir) => {
                visitor.visit_scalar_port(node, *dir, design)
            }
            NodeKind::StreamPort(port) => {
                visitor.visit_stream_port(node, port, design)
            }
            NodeKind::StreamIndex(index) => {
                visitor.visit_stream_index(node, index, design)
            }
        }
    }
}
