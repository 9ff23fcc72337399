//! Operand resolution: constants, block-local values and values crossing
//! block boundaries.
use super::KernelLowering;
use crate::{ArithOp, Datatype, FpOp, MuxInput, NodeIdx, Predicate};
use dfc_frontend::{
    BinOp, Constant, Extension, FloatPredicate, InstrRef, Instruction,
    IntPredicate, Operand, Type,
};
use dfc_utils::{DfcResult, Error};
use itertools::Itertools;

pub(super) fn arith_op(op: BinOp) -> Option<ArithOp> {
    Some(match op {
        BinOp::Add => ArithOp::Add,
        BinOp::Sub => ArithOp::Sub,
        BinOp::Mul => ArithOp::Mul,
        BinOp::UDiv => ArithOp::UDiv,
        BinOp::SDiv => ArithOp::SDiv,
        BinOp::URem => ArithOp::URem,
        BinOp::SRem => ArithOp::SRem,
        BinOp::Shl => ArithOp::Shl,
        BinOp::LShr => ArithOp::LShr,
        BinOp::AShr => ArithOp::AShr,
        BinOp::And => ArithOp::And,
        BinOp::Or => ArithOp::Or,
        BinOp::Xor => ArithOp::Xor,
        BinOp::FAdd | BinOp::FSub | BinOp::FMul | BinOp::FDiv | BinOp::FRem => {
            return None;
        }
    })
}

pub(super) fn fp_op(op: BinOp) -> Option<FpOp> {
    match op {
        BinOp::FAdd => Some(FpOp::FAdd),
        BinOp::FSub => Some(FpOp::FSub),
        BinOp::FMul => Some(FpOp::FMul),
        BinOp::FDiv => Some(FpOp::FDiv),
        BinOp::FRem => Some(FpOp::FRem),
        _ => None,
    }
}

pub(super) fn int_predicate(pred: IntPredicate) -> Predicate {
    match pred {
        IntPredicate::Eq => Predicate::Eq,
        IntPredicate::Ne => Predicate::Ne,
        IntPredicate::Ugt => Predicate::Ugt,
        IntPredicate::Uge => Predicate::Uge,
        IntPredicate::Ult => Predicate::Ult,
        IntPredicate::Ule => Predicate::Ule,
        IntPredicate::Sgt => Predicate::Sgt,
        IntPredicate::Sge => Predicate::Sge,
        IntPredicate::Slt => Predicate::Slt,
        IntPredicate::Sle => Predicate::Sle,
    }
}

pub(super) fn float_predicate(pred: FloatPredicate) -> Predicate {
    match pred {
        FloatPredicate::Oeq => Predicate::FOeq,
        FloatPredicate::One => Predicate::FOne,
        FloatPredicate::Ogt => Predicate::FOgt,
        FloatPredicate::Oge => Predicate::FOge,
        FloatPredicate::Olt => Predicate::FOlt,
        FloatPredicate::Ole => Predicate::FOle,
        FloatPredicate::Ord => Predicate::FOrd,
        FloatPredicate::Uno => Predicate::FUno,
        FloatPredicate::Ueq => Predicate::FUeq,
        FloatPredicate::Une => Predicate::FUne,
        FloatPredicate::Ugt => Predicate::FUgt,
        FloatPredicate::Uge => Predicate::FUge,
        FloatPredicate::Ult => Predicate::FUlt,
        FloatPredicate::Ule => Predicate::FUle,
    }
}

impl KernelLowering<'_, '_> {
    /// Follow value-preserving casts back to the operand they started from.
    pub(super) fn dealias(&self, operand: &Operand) -> Operand {
        let mut current = operand;
        while let Operand::Value(name) = current {
            match self.aliases.get(name) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.clone()
    }

    /// The node providing a data operand to the instruction `user`, inside
    /// the block of `user`.
    pub(super) fn operand(
        &mut self,
        operand: &Operand,
        user: InstrRef,
    ) -> DfcResult<NodeIdx> {
        match self.dealias(operand) {
            Operand::Const(c) => Ok(self.materialize(&c, operand, user)),
            Operand::Value(name) => {
                if self.streams.contains_key(&name)
                    || self.addresses.contains_key(&name)
                {
                    return Err(Error::unsupported(format!(
                        "pointer `{name}' used as a value"
                    )));
                }
                self.resolve(&name, user.block)
            }
        }
    }

    /// Create a constant for one use. Width and extension depend on the
    /// use, so constants are never shared between instructions.
    pub(super) fn materialize(
        &mut self,
        c: &Constant,
        operand: &Operand,
        user: InstrRef,
    ) -> NodeIdx {
        let bw = self.widths.bit_width(self.func, operand, user);
        let datatype = match c.ty() {
            Type::Half => Datatype::Half,
            Type::Float => Datatype::Float,
            Type::Double => Datatype::Double,
            Type::Int(1) => Datatype::Bool,
            _ if bw.ext == Extension::Sign => Datatype::Int,
            _ => Datatype::UInt,
        };
        self.builder.add_const(&c.literal(), bw.width, datatype)
    }

    /// Feed `input`, the node of `operand`, into `node`. The use decides
    /// whether it is sign extended.
    fn connect_operand(
        &mut self,
        input: NodeIdx,
        operand: &Operand,
        user: InstrRef,
        node: NodeIdx,
    ) {
        self.builder.design.connect(input, node);
        if self.widths.bit_width(self.func, operand, user).ext == Extension::Sign {
            self.builder.design.node_mut(node).sign_extend(input);
        }
    }

    /// The node carrying `name` inside block `b`. Values defined in another
    /// block arrive through one port per control-flow edge into `b`; when
    /// several edges carry the value a multiplexer joins them.
    pub(super) fn resolve(&mut self, name: &str, b: usize) -> DfcResult<NodeIdx> {
        if let Some(node) = self.kernel_values.get(name) {
            return Ok(*node);
        }
        if let Some(node) = self.values.get(&(name.to_string(), b)) {
            return Ok(*node);
        }
        let Some(def) = self.defs.get(name).copied() else {
            return Err(Error::undefined(name));
        };
        // Used before its definition.
        if def.block == b {
            return Err(Error::undefined(name));
        }
        let preds: Vec<usize> = self
            .paths
            .simple_paths(self.func, def.block, b)
            .iter()
            .filter(|path| path.len() >= 2)
            .map(|path| path[path.len() - 2])
            .unique()
            .collect();
        if preds.is_empty() {
            return Err(Error::no_path(
                name,
                self.block_name(def.block),
                self.block_name(b),
            ));
        }
        let mut incoming = Vec::with_capacity(preds.len());
        for p in preds {
            let src = self.resolve(name, p)?;
            let port = self.edge_port(name, src, p, b);
            incoming.push(MuxInput {
                node: port,
                block: self.blocks[p],
            });
        }
        let node = if incoming.len() == 1 {
            incoming[0].node
        } else {
            let width = incoming
                .iter()
                .map(|i| self.width(i.node))
                .max()
                .unwrap_or(1);
            let saved = self.builder.block();
            self.builder.set_block(Some(self.blocks[b]));
            let mux = self.builder.add_mux(name, incoming, width);
            self.builder.set_block(saved);
            self.builder.design.node_mut(mux).source = Some(name.into());
            mux
        };
        self.values.insert((name.to_string(), b), node);
        Ok(node)
    }

    /// The port carrying `name` along the edge `from -> to`, fed by `src`.
    pub(super) fn edge_port(
        &mut self,
        name: &str,
        src: NodeIdx,
        from: usize,
        to: usize,
    ) -> NodeIdx {
        let key = (name.to_string(), from, to);
        if let Some(port) = self.edge_ports.get(&key) {
            return *port;
        }
        let width = self.width(src);
        let port = self.builder.add_boundary_port(
            name,
            width,
            self.blocks[from],
            self.blocks[to],
        );
        self.builder.design.connect(src, port);
        self.builder.design.node_mut(port).source = Some(name.into());
        log::debug!(
            "port {} carries `{name}' from `{}' to `{}'",
            self.builder.design.node(port).unique_name(),
            self.block_name(from),
            self.block_name(to)
        );
        self.edge_ports.insert(key, port);
        port
    }

    pub(super) fn lower_binary(
        &mut self,
        at: InstrRef,
        inst: &Instruction,
        op: BinOp,
        lhs: &Operand,
        rhs: &Operand,
    ) -> DfcResult<()> {
        let l = self.operand(lhs, at)?;
        let r = self.operand(rhs, at)?;
        let node = match (arith_op(op), fp_op(op)) {
            (Some(op), _) => {
                let width = Self::width_of_type(&inst.ty)?;
                self.builder.add_arith(op, width)
            }
            (None, Some(op)) => {
                let (mantissa, exponent) = inst.ty.fp_format().ok_or_else(|| {
                    Error::unsupported(format!(
                        "floating point operation on `{}'",
                        inst.ty
                    ))
                })?;
                self.builder.add_fp_arith(op, mantissa, exponent)
            }
            (None, None) => unreachable!("{op:?} is neither integer nor float"),
        };
        self.connect_operand(l, lhs, at, node);
        self.connect_operand(r, rhs, at, node);
        self.define(inst, at.block, node);
        Ok(())
    }

    pub(super) fn lower_compare(
        &mut self,
        at: InstrRef,
        inst: &Instruction,
        pred: Predicate,
        lhs: &Operand,
        rhs: &Operand,
    ) -> DfcResult<()> {
        let l = self.operand(lhs, at)?;
        let r = self.operand(rhs, at)?;
        let node = self.builder.add_compare(pred);
        self.connect_operand(l, lhs, at, node);
        self.connect_operand(r, rhs, at, node);
        self.define(inst, at.block, node);
        Ok(())
    }
}
