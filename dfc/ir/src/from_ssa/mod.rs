//! Lowering of SSA kernels into the dataflow IR.
//!
//! Blocks are visited in a topological order of the control-flow graph and
//! every instruction is turned into nodes of the block it lives in. Values
//! crossing a block boundary travel through explicit ports, PHI nodes
//! become multiplexers and memory accesses become stream indices.
mod address;
mod control;
mod operands;

use crate::{Builder, BlockIdx, DesignUnit, Kernel, NodeIdx, NodeKind, PortDir};
use address::Address;
use dfc_frontend::{
    BitWidthOracle, CfgPaths, Function, InstKind, InstrRef, Instruction,
    Module, Operand, PathOracle, Type, TypeWidths,
};
use dfc_utils::{DfcResult, Error};
use linked_hash_map::LinkedHashMap;
use std::collections::HashMap;
use std::time::Instant;

/// Calls that read work-item coordinates. They become kernel inputs.
const BUILTINS: [&str; 7] = [
    "get_global_id",
    "get_local_id",
    "get_group_id",
    "get_global_size",
    "get_local_size",
    "get_num_groups",
    "get_work_dim",
];

/// Lower every kernel of `module`. Fails on the first construct that has
/// no dataflow equivalent; nothing of a failing module is returned.
pub fn ssa_to_ir(
    module: &Module,
    widths: &dyn BitWidthOracle,
    paths: &dyn PathOracle,
) -> DfcResult<DesignUnit> {
    let mut design = DesignUnit::new(module.name.as_str());
    for func in module.kernels() {
        let time = Instant::now();
        let kernel = design.kernels.len();
        design
            .kernels
            .push(Kernel::new(func.name.as_str(), func.work_item));
        KernelLowering::new(func, &mut design, kernel, widths, paths)
            .lower()
            .map_err(|err| err.with_loc(format!("kernel {}", func.name)))?;
        log::info!("Lowered kernel `{}' in {:?}", func.name, time.elapsed());
    }
    Ok(design)
}

/// [ssa_to_ir] with widths taken from the types and paths enumerated over
/// the control-flow graph.
pub fn ssa_to_ir_default(module: &Module) -> DfcResult<DesignUnit> {
    ssa_to_ir(module, &TypeWidths, &CfgPaths)
}

/// State of the lowering of one kernel.
struct KernelLowering<'a, 'b> {
    func: &'a Function,
    builder: Builder<'b>,
    widths: &'a dyn BitWidthOracle,
    paths: &'a dyn PathOracle,
    /// Defining instruction of every value.
    defs: HashMap<&'a str, InstrRef>,
    /// IR block of every input block, by position.
    blocks: Vec<BlockIdx>,
    /// Values available everywhere in the kernel: scalar arguments and
    /// builtin results.
    kernel_values: HashMap<String, NodeIdx>,
    /// Builtin ports by port name.
    builtins: HashMap<String, NodeIdx>,
    /// Stream ports of the pointer arguments, in argument order.
    streams: LinkedHashMap<String, NodeIdx>,
    /// Results of casts that do not change the value.
    aliases: HashMap<String, Operand>,
    /// The node carrying a value inside a block.
    values: HashMap<(String, usize), NodeIdx>,
    /// Port carrying a value along a control-flow edge.
    edge_ports: HashMap<(String, usize, usize), NodeIdx>,
    /// Addresses computed by GEP instructions.
    addresses: HashMap<String, Address>,
    /// Returned values and the blocks returning them.
    returns: Vec<(NodeIdx, usize)>,
}

impl<'a, 'b> KernelLowering<'a, 'b> {
    fn new(
        func: &'a Function,
        design: &'b mut DesignUnit,
        kernel: usize,
        widths: &'a dyn BitWidthOracle,
        paths: &'a dyn PathOracle,
    ) -> Self {
        Self {
            func,
            builder: Builder::new(design, kernel),
            widths,
            paths,
            defs: func.definitions(),
            blocks: vec![],
            kernel_values: HashMap::new(),
            builtins: HashMap::new(),
            streams: LinkedHashMap::new(),
            aliases: HashMap::new(),
            values: HashMap::new(),
            edge_ports: HashMap::new(),
            addresses: HashMap::new(),
            returns: vec![],
        }
    }

    fn lower(mut self) -> DfcResult<()> {
        let func = self.func;
        let order = func.block_order()?;
        if let Some(ty) = func.mentioned_types().find(|ty| ty.contains_vector())
        {
            return Err(Error::unsupported(format!("vector type `{ty}'")));
        }
        self.lower_args()?;
        for block in &func.blocks {
            let idx = self.builder.add_block(block.name.as_str());
            self.blocks.push(idx);
        }
        for b in order {
            let block = &func.blocks[b];
            self.builder.set_block(Some(self.blocks[b]));
            for (i, inst) in block.instrs.iter().enumerate() {
                self.lower_instr(InstrRef::new(b, i), inst).map_err(|err| {
                    err.with_loc(format!(
                        "kernel {}, block {}",
                        func.name, block.name
                    ))
                })?;
            }
        }
        self.lower_returns();
        self.builder.set_block(None);
        self.classify_streams();
        Ok(())
    }

    /// Scalar arguments become kernel inputs, pointer arguments stream
    /// ports.
    fn lower_args(&mut self) -> DfcResult<()> {
        let func = self.func;
        for arg in &func.args {
            let port = match &arg.ty {
                Type::Ptr { pointee, addrspace } => {
                    if !addrspace.is_streamable() {
                        return Err(Error::unsupported(format!(
                            "pointer argument `{}' in {addrspace} address space",
                            arg.name
                        )));
                    }
                    let width = pointee.bit_width().unwrap_or(8);
                    let port =
                        self.builder.add_stream_port(arg.name.as_str(), width);
                    self.streams.insert(arg.name.clone(), port);
                    port
                }
                ty => {
                    let width = Self::width_of_type(ty)?;
                    let port = self.builder.add_scalar_port(
                        arg.name.as_str(),
                        width,
                        PortDir::In,
                    );
                    self.kernel_values.insert(arg.name.clone(), port);
                    port
                }
            };
            self.builder.design.node_mut(port).source =
                Some(arg.name.as_str().into());
        }
        Ok(())
    }

    /// Sort the stream ports into kernel inputs and outputs by their
    /// accesses. Ports that are never accessed count as inputs.
    fn classify_streams(&mut self) {
        let kernel = self.builder.kernel();
        for port in self.streams.values() {
            let NodeKind::StreamPort(sp) = &self.builder.design.node(*port).kind
            else {
                unreachable!("stream argument lowered to a non-stream node");
            };
            let (reads, writes) = (sp.has_loads(), sp.has_stores());
            let k = &mut self.builder.design.kernels[kernel];
            if writes {
                k.out_streams.push(*port);
            }
            if reads || !writes {
                k.in_streams.push(*port);
            }
        }
    }

    fn lower_instr(&mut self, at: InstrRef, inst: &'a Instruction) -> DfcResult<()> {
        let b = at.block;
        match &inst.op {
            InstKind::Binary { op, lhs, rhs } => {
                self.lower_binary(at, inst, *op, lhs, rhs)
            }
            InstKind::ICmp { pred, lhs, rhs } => {
                self.lower_compare(at, inst, operands::int_predicate(*pred), lhs, rhs)
            }
            InstKind::FCmp { pred, lhs, rhs } => {
                self.lower_compare(at, inst, operands::float_predicate(*pred), lhs, rhs)
            }
            InstKind::Cast { op, value } => {
                if !op.is_integer_resize() {
                    return Err(Error::unsupported(format!("cast {op:?}")));
                }
                if let Some(result) = &inst.result {
                    self.aliases.insert(result.clone(), value.clone());
                }
                Ok(())
            }
            InstKind::Gep { base, indices } => {
                self.lower_gep(at, inst, base, indices)
            }
            InstKind::Load { ptr } => self.lower_load(at, inst, ptr),
            InstKind::Store { value, ptr } => self.lower_store(at, value, ptr),
            InstKind::Phi { incoming } => self.lower_phi(at, inst, incoming),
            InstKind::Call { callee, args } => {
                self.lower_call(inst, callee, args)
            }
            InstKind::Br { dest } => self.lower_br(b, dest),
            InstKind::CondBr {
                cond,
                then_dest,
                else_dest,
            } => self.lower_cond_br(at, cond, then_dest, else_dest),
            InstKind::Ret { value: Some(value) } => {
                let node = self.operand(value, at)?;
                self.returns.push((node, b));
                Ok(())
            }
            InstKind::Ret { value: None } => Ok(()),
        }
    }

    /// Work-item builtins become one kernel input per builtin and
    /// dimension.
    fn lower_call(
        &mut self,
        inst: &Instruction,
        callee: &str,
        args: &[Operand],
    ) -> DfcResult<()> {
        if !BUILTINS.contains(&callee) {
            return Err(Error::unsupported(format!("call to `{callee}'")));
        }
        let name = if callee == "get_work_dim" {
            callee.to_string()
        } else {
            let dim = args
                .first()
                .map(|arg| self.dealias(arg))
                .and_then(|arg| arg.as_const().and_then(|c| c.as_int()))
                .ok_or_else(|| {
                    Error::unsupported(format!(
                        "non-constant dimension in call to `{callee}'"
                    ))
                })?;
            format!("{callee}{dim}")
        };
        let port = match self.builtins.get(&name) {
            Some(port) => *port,
            None => {
                let width = inst.ty.bit_width().unwrap_or(64);
                let port = self.builder.add_scalar_port(
                    name.as_str(),
                    width,
                    PortDir::In,
                );
                self.builtins.insert(name, port);
                port
            }
        };
        if let Some(result) = &inst.result {
            self.kernel_values.insert(result.clone(), port);
        }
        Ok(())
    }

    /// Record `node` as the value defined by `inst` in block `b`.
    fn define(&mut self, inst: &Instruction, b: usize, node: NodeIdx) {
        if let Some(result) = &inst.result {
            self.builder.design.node_mut(node).source =
                Some(result.as_str().into());
            self.values.insert((result.clone(), b), node);
        }
    }

    fn width(&self, node: NodeIdx) -> u64 {
        self.builder.design.node(node).bitwidth()
    }

    fn width_of_type(ty: &Type) -> DfcResult<u64> {
        ty.bit_width()
            .ok_or_else(|| Error::unsupported(format!("value of type `{ty}'")))
    }

    fn block_name(&self, b: usize) -> &'a str {
        self.func.blocks[b].name.as_str()
    }

    fn block_by_name(&self, name: &str) -> DfcResult<usize> {
        self.func
            .block_index(name)
            .ok_or_else(|| Error::undefined(name))
    }
}

#[cfg(test)]
mod tests;
