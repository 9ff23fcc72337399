use crate::traversal::{Action, Named, VisResult, Visitor};
use dfc_ir::{
    Access, CondFlag, DesignUnit, MuxInput, NodeIdx, NodeKind, Offset,
    StreamIndex,
};
use dfc_utils::{DfcResult, Error};

/// Pass to check that the dataflow graph is well-formed.
///
/// Catches the following errors:
/// 1. Edges recorded on only one of their endpoints.
/// 2. Stream accesses that are not listed by their port, or whose port is
///    not a stream port.
/// 3. Loads not connected to their port and dynamic accesses not connected
///    to their address.
/// 4. Blocks with `true`/`false` successors but no condition port.
/// 5. Multiplexer inputs that are not inputs of the multiplexer, or whose
///    block does not branch to the block of the multiplexer.
#[derive(Default, Debug)]
pub struct WellFormed;

impl Named for WellFormed {
    fn name() -> &'static str {
        "well-formed"
    }

    fn description() -> &'static str {
        "Check invariants of the dataflow graph"
    }
}

impl WellFormed {
    fn check_edges(node: NodeIdx, design: &DesignUnit) -> DfcResult<()> {
        let n = design.node(node);
        for out in n.outs() {
            if !design.node(*out).ins().contains(&node) {
                return Err(Error::malformed(format!(
                    "`{}' lists `{}' as output but is not one of its inputs",
                    n.unique_name(),
                    design.node(*out).unique_name()
                )));
            }
        }
        for inp in n.ins() {
            if !design.node(*inp).outs().contains(&node) {
                return Err(Error::malformed(format!(
                    "`{}' lists `{}' as input but is not one of its outputs",
                    n.unique_name(),
                    design.node(*inp).unique_name()
                )));
            }
        }
        Ok(())
    }
}

impl Visitor for WellFormed {
    fn start_kernel(
        &mut self,
        kernel: usize,
        design: &mut DesignUnit,
    ) -> VisResult {
        let k = &design.kernels[kernel];
        for block in &k.blocks {
            let block = design.block(*block);
            let conditional = block
                .successors()
                .any(|(_, flag)| matches!(flag, CondFlag::True | CondFlag::False));
            if conditional && block.condition.is_none() {
                return Err(Error::malformed(format!(
                    "block `{}' branches conditionally without a condition",
                    block.unique_name()
                ))
                .with_loc(format!("kernel {}", k.name)));
            }
        }
        Ok(Action::Continue)
    }

    fn visit_arith(
        &mut self,
        node: NodeIdx,
        _op: dfc_ir::ArithOp,
        design: &DesignUnit,
    ) -> VisResult {
        Self::check_edges(node, design)?;
        Ok(Action::Continue)
    }

    fn visit_fp_arith(
        &mut self,
        node: NodeIdx,
        _op: dfc_ir::FpOp,
        design: &DesignUnit,
    ) -> VisResult {
        Self::check_edges(node, design)?;
        Ok(Action::Continue)
    }

    fn visit_compare(
        &mut self,
        node: NodeIdx,
        _pred: dfc_ir::Predicate,
        design: &DesignUnit,
    ) -> VisResult {
        Self::check_edges(node, design)?;
        Ok(Action::Continue)
    }

    fn visit_const(
        &mut self,
        node: NodeIdx,
        _val: &dfc_ir::ConstVal,
        design: &DesignUnit,
    ) -> VisResult {
        Self::check_edges(node, design)?;
        if !design.node(node).ins().is_empty() {
            return Err(Error::malformed(format!(
                "constant `{}' has inputs",
                design.node(node).unique_name()
            )));
        }
        Ok(Action::Continue)
    }

    fn visit_mux(
        &mut self,
        node: NodeIdx,
        inputs: &[MuxInput],
        design: &DesignUnit,
    ) -> VisResult {
        Self::check_edges(node, design)?;
        let mux = design.node(node);
        let Some(block) = mux.block else {
            return Err(Error::malformed(format!(
                "multiplexer `{}' belongs to no block",
                mux.unique_name()
            )));
        };
        for input in inputs {
            if !mux.ins().contains(&input.node) {
                return Err(Error::malformed(format!(
                    "`{}' is not connected to multiplexer `{}'",
                    design.node(input.node).unique_name(),
                    mux.unique_name()
                )));
            }
            let pred = design.block(input.block);
            if pred.try_successor_flag(block).is_none() {
                return Err(Error::malformed(format!(
                    "block `{}' selecting `{}' does not branch to `{}'",
                    pred.unique_name(),
                    mux.unique_name(),
                    design.block(block).unique_name()
                )));
            }
        }
        Ok(Action::Continue)
    }

    fn visit_reg(&mut self, node: NodeIdx, design: &DesignUnit) -> VisResult {
        Self::check_edges(node, design)?;
        Ok(Action::Continue)
    }

    fn visit_ram(
        &mut self,
        node: NodeIdx,
        _depth: u64,
        design: &DesignUnit,
    ) -> VisResult {
        Self::check_edges(node, design)?;
        Ok(Action::Continue)
    }

    fn visit_fifo(
        &mut self,
        node: NodeIdx,
        _depth: u64,
        design: &DesignUnit,
    ) -> VisResult {
        Self::check_edges(node, design)?;
        Ok(Action::Continue)
    }

    fn visit_scalar_port(
        &mut self,
        node: NodeIdx,
        _dir: dfc_ir::PortDir,
        design: &DesignUnit,
    ) -> VisResult {
        Self::check_edges(node, design)?;
        Ok(Action::Continue)
    }

    fn visit_stream_port(
        &mut self,
        node: NodeIdx,
        port: &dfc_ir::StreamPort,
        design: &DesignUnit,
    ) -> VisResult {
        Self::check_edges(node, design)?;
        for (idx, access) in port.accesses() {
            let consistent = matches!(
                &design.node(*idx).kind,
                NodeKind::StreamIndex(index)
                    if index.port == node && index.access == *access
            );
            if !consistent {
                return Err(Error::malformed(format!(
                    "stream port `{}' lists `{}' as {} access",
                    design.node(node).unique_name(),
                    design.node(*idx).unique_name(),
                    access.as_str()
                )));
            }
        }
        Ok(Action::Continue)
    }

    fn visit_stream_index(
        &mut self,
        node: NodeIdx,
        index: &StreamIndex,
        design: &DesignUnit,
    ) -> VisResult {
        Self::check_edges(node, design)?;
        let n = design.node(node);
        let NodeKind::StreamPort(port) = &design.node(index.port).kind else {
            return Err(Error::malformed(format!(
                "`{}' accesses `{}', which is not a stream port",
                n.unique_name(),
                design.node(index.port).unique_name()
            )));
        };
        if !port.accesses().contains(&(node, index.access)) {
            return Err(Error::malformed(format!(
                "`{}' is not listed by stream port `{}'",
                n.unique_name(),
                design.node(index.port).unique_name()
            )));
        }
        if index.access == Access::Load && !n.ins().contains(&index.port) {
            return Err(Error::malformed(format!(
                "load `{}' is not connected to its port",
                n.unique_name()
            )));
        }
        if let Offset::Dynamic(addr) = index.offset {
            if !n.ins().contains(&addr) {
                return Err(Error::malformed(format!(
                    "`{}' is not connected to its address `{}'",
                    n.unique_name(),
                    design.node(addr).unique_name()
                )));
            }
        }
        Ok(Action::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfc_frontend::{
        AddressSpace, Argument, BasicBlock, BinOp, Function, Instruction,
        Module, Operand, Type,
    };
    use dfc_ir::{ArithOp, Kernel, PortDir, from_ssa};
    use dfc_utils::ErrorKind;

    #[test]
    fn lowered_kernels_are_well_formed() {
        let entry = BasicBlock::new(
            "entry",
            vec![
                Instruction::binary(
                    "sum",
                    BinOp::Add,
                    Type::i32(),
                    Operand::value("a"),
                    Operand::int(1, 32),
                ),
                Instruction::store(Operand::value("sum"), Operand::value("out")),
                Instruction::ret(),
            ],
        );
        let mut module = Module::new("m");
        module.functions.push(Function {
            name: "k".into(),
            args: vec![
                Argument::new("a", Type::i32()),
                Argument::new(
                    "out",
                    Type::ptr(Type::i32(), AddressSpace::Global),
                ),
            ],
            blocks: vec![entry],
            kernel: true,
            work_item: false,
        });
        let mut design = from_ssa::ssa_to_ir_default(&module).unwrap();
        WellFormed::do_pass_default(&mut design).unwrap();
    }

    #[test]
    fn conditional_branch_needs_condition() {
        let mut design = DesignUnit::new("d");
        design.kernels.push(Kernel::new("k", false));
        let a = design.add_block("a", 0);
        let b = design.add_block("b", 0);
        design.kernels[0].blocks.extend([a, b]);
        design.block_mut(a).add_successor(b, CondFlag::True);
        let err = WellFormed::do_pass_default(&mut design).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Malformed(_)));
        assert_eq!(err.location(), Some("kernel k"));
    }

    #[test]
    fn one_sided_edges_are_rejected() {
        let mut design = DesignUnit::new("d");
        design.kernels.push(Kernel::new("k", false));
        let x = design.add_node("x", 8, NodeKind::ScalarPort(PortDir::In));
        let add = design.add_node("add", 9, NodeKind::Arith(ArithOp::Add));
        design.node_mut(x).add_out(add);
        design.kernels[0].nodes.extend([x, add]);
        let err = WellFormed::do_pass_default(&mut design).unwrap_err();
        assert!(err.message().contains("x_0"));
    }
}
