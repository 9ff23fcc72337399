//! Branches and PHI nodes.
use super::KernelLowering;
use crate::{CondFlag, MuxInput, PortDir};
use dfc_frontend::{Incoming, InstrRef, Instruction, Operand};
use dfc_utils::{DfcResult, Error};

impl KernelLowering<'_, '_> {
    pub(super) fn lower_br(&mut self, b: usize, dest: &str) -> DfcResult<()> {
        let target = self.blocks[self.block_by_name(dest)?];
        let block = self.builder.design.block_mut(self.blocks[b]);
        block.condition = None;
        block.add_successor(target, CondFlag::None);
        Ok(())
    }

    /// The condition leaves the block through a boundary port so that it is
    /// observable from outside.
    pub(super) fn lower_cond_br(
        &mut self,
        at: InstrRef,
        cond: &Operand,
        then_dest: &str,
        else_dest: &str,
    ) -> DfcResult<()> {
        let then_block = self.blocks[self.block_by_name(then_dest)?];
        let else_block = self.blocks[self.block_by_name(else_dest)?];
        let node = self.operand(cond, at)?;
        let name = cond.as_value().unwrap_or("cond");
        let port = self.builder.add_block_output(name, 1);
        self.builder.design.connect(node, port);
        let block = self.builder.design.block_mut(self.blocks[at.block]);
        block.condition = Some(port);
        block.add_successor(then_block, CondFlag::True);
        block.add_successor(else_block, CondFlag::False);
        Ok(())
    }

    /// One multiplexer input per incoming edge. Values reach the PHI block
    /// through the port of their edge; constants are created in the PHI
    /// block itself.
    pub(super) fn lower_phi(
        &mut self,
        at: InstrRef,
        inst: &Instruction,
        incoming: &[Incoming],
    ) -> DfcResult<()> {
        let mut inputs = Vec::with_capacity(incoming.len());
        for inc in incoming {
            let pred = self.block_by_name(&inc.block)?;
            let node = match self.dealias(&inc.value) {
                Operand::Const(c) => self.materialize(&c, &inc.value, at),
                Operand::Value(name) => {
                    if self.streams.contains_key(&name)
                        || self.addresses.contains_key(&name)
                    {
                        return Err(Error::unsupported(format!(
                            "PHI over pointer `{name}'"
                        )));
                    }
                    let src = self.resolve(&name, pred)?;
                    self.edge_port(&name, src, pred, at.block)
                }
            };
            inputs.push(MuxInput {
                node,
                block: self.blocks[pred],
            });
        }
        let width = Self::width_of_type(&inst.ty)?;
        let name = inst.result.as_deref().unwrap_or("phi");
        let mux = self.builder.add_mux(name, inputs, width);
        self.define(inst, at.block, mux);
        Ok(())
    }

    /// Returned values leave the kernel through one `return` port. When
    /// several blocks return, they all continue to an exit block whose
    /// multiplexer picks the value of the block that ran.
    pub(super) fn lower_returns(&mut self) {
        let value = match self.returns.as_slice() {
            [] => return,
            [(node, _)] => *node,
            returns => {
                let mut returns = returns.to_vec();
                returns.sort_by_key(|(_, b)| *b);
                let exit = self.builder.add_block("exit");
                let mut inputs = Vec::with_capacity(returns.len());
                for (node, b) in returns {
                    let from = self.blocks[b];
                    self.builder
                        .design
                        .block_mut(from)
                        .add_successor(exit, CondFlag::None);
                    let width = self.width(node);
                    let port =
                        self.builder.add_boundary_port("return", width, from, exit);
                    self.builder.design.connect(node, port);
                    inputs.push(MuxInput { node: port, block: from });
                }
                let width = inputs
                    .iter()
                    .map(|i| self.width(i.node))
                    .max()
                    .unwrap_or(1);
                self.builder.set_block(Some(exit));
                let mux = self.builder.add_mux("return", inputs, width);
                self.builder.set_block(None);
                mux
            }
        };
        let width = self.width(value);
        let port = self.builder.add_scalar_port("return", width, PortDir::Out);
        self.builder.design.connect(value, port);
    }
}
