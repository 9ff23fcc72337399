//! Concurrent statements of a kernel architecture.
use super::entity::{Interface, Signal, ident, slv};
use super::guard::Guard;
use dfc_ir::{
    Access, ArithOp, BlockIdx, CondFlag, ConstVal, Datatype, DesignUnit, FpOp,
    MuxInput, NodeIdx, NodeKind, Offset, PortDir, Predicate, StreamIndex,
};
use dfc_opt::traversal::{Action, VisResult, Visitor};
use dfc_utils::{DfcResult, Error};
use std::collections::HashMap;

/// `(mantissa, exponent)` of the IEEE format that is `width` bits wide.
pub(super) fn fp_format(width: u64) -> Option<(u32, u32)> {
    match width {
        16 => Some((10, 5)),
        32 => Some((23, 8)),
        64 => Some((52, 11)),
        _ => None,
    }
}

/// `value` as a VHDL bit string literal of `width` bits, two's complement.
pub(super) fn bit_string(value: i64, width: u64) -> String {
    let bits: String = (0..width)
        .rev()
        .map(|i| {
            let bit = if i >= 64 { value < 0 } else { (value >> i) & 1 == 1 };
            if bit { '1' } else { '0' }
        })
        .collect();
    format!("\"{bits}\"")
}

/// `value` as a VHDL real literal, which needs a decimal point.
pub(super) fn real_literal(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    let text = format!("{value:?}");
    if text.contains('.') {
        return Some(text);
    }
    Some(match text.split_once('e') {
        Some((mantissa, exp)) => format!("{mantissa}.0e{exp}"),
        None => format!("{text}.0"),
    })
}

fn numeric(signed: bool) -> &'static str {
    if signed { "signed" } else { "unsigned" }
}

/// `sig` as a numeric value of `width` bits.
fn num(sig: &Signal, width: u64, signed: bool) -> String {
    format!("resize({}({}), {width})", numeric(signed), sig.name)
}

/// `sig` widened to `width` bits as an `unsigned` value.
fn ext(sig: &Signal, width: u64, sign_extend: bool) -> String {
    if sign_extend {
        format!("unsigned(resize(signed({}), {width}))", sig.name)
    } else {
        num(sig, width, false)
    }
}

/// Does `node` sign extend its input `input`? Signed constants always are.
fn sign_extended(design: &DesignUnit, node: NodeIdx, input: NodeIdx) -> bool {
    design.node(node).sign_extends(input)
        || matches!(
            design.node(input).kind,
            NodeKind::Const(ConstVal {
                datatype: Datatype::Int,
                ..
            })
        )
}

/// `sig` as a vector of `width` bits.
fn fit(sig: &Signal, width: u64) -> String {
    if sig.width == width {
        sig.name.clone()
    } else {
        format!("std_logic_vector({})", num(sig, width, false))
    }
}

/// Generates the declarations and statements of one kernel. Nodes are
/// visited in dataflow order, but a statement is only written once signals
/// exist for everything it reads. Until then the visit answers
/// [Action::Again].
pub(super) struct Statements<'a> {
    iface: &'a Interface,
    kernel: usize,
    /// Signal of every node seen so far. Entries are never replaced.
    signals: HashMap<NodeIdx, Signal>,
    /// Condition under which control reaches each block.
    reach: HashMap<BlockIdx, Guard>,
    pub decls: Vec<String>,
    pub body: Vec<String>,
    pub uses_float: bool,
}

impl<'a> Statements<'a> {
    pub fn new(iface: &'a Interface, kernel: usize) -> Self {
        Self {
            iface,
            kernel,
            signals: iface.inputs.clone(),
            reach: HashMap::new(),
            decls: Vec::new(),
            body: Vec::new(),
            uses_float: false,
        }
    }

    fn signal(&self, node: NodeIdx) -> Option<&Signal> {
        self.signals.get(&node)
    }

    /// The signal of `node`, declared on first reference.
    fn declare(&mut self, node: NodeIdx, design: &DesignUnit) -> Signal {
        let n = design.node(node);
        let decls = &mut self.decls;
        self.signals
            .entry(node)
            .or_insert_with(|| {
                let sig = Signal {
                    name: ident(&n.unique_name()),
                    width: n.bitwidth(),
                };
                decls.push(format!("signal {} : {};", sig.name, slv(sig.width)));
                sig
            })
            .clone()
    }

    /// Bind `node` to an existing entity port instead of a signal.
    fn bind(&mut self, node: NodeIdx, name: &str, width: u64) {
        self.signals.entry(node).or_insert_with(|| Signal {
            name: name.to_string(),
            width,
        });
    }

    /// The two operands of a binary operator. An operator using the same
    /// value twice has a single input.
    fn operand_nodes(node: NodeIdx, design: &DesignUnit) -> Option<(NodeIdx, NodeIdx)> {
        let n = design.node(node);
        let lhs = n.get_in(0)?;
        Some((lhs, n.get_in(1).unwrap_or(lhs)))
    }

    /// Signals of the two operands of a binary operator.
    fn operands(&self, node: NodeIdx, design: &DesignUnit) -> Option<(Signal, Signal)> {
        let (lhs, rhs) = Self::operand_nodes(node, design)?;
        Some((self.signal(lhs)?.clone(), self.signal(rhs)?.clone()))
    }

    fn fp_instance(
        &mut self,
        node: NodeIdx,
        op: &str,
        (mantissa, exponent): (u32, u32),
        (lhs, rhs): (Signal, Signal),
        design: &DesignUnit,
    ) {
        let out = self.declare(node, design);
        let width = (mantissa + exponent + 1) as u64;
        self.uses_float = true;
        self.body.push(format!(
            "{0}_inst : entity work.fp_{op}\n    \
             generic map (MANTISSA => {mantissa}, EXPONENT => {exponent})\n    \
             port map (clk => clk, rst => rst, a => {1}, b => {2}, result => {0});",
            out.name,
            fit(&lhs, width),
            fit(&rhs, width),
        ));
    }

    /// The condition under which control reaches `block`: the disjunction
    /// over its incoming edges. Blocks without predecessors always run.
    fn reach_guard(&mut self, block: BlockIdx, design: &DesignUnit) -> DfcResult<Guard> {
        self.reach_within(block, design, design.kernels[self.kernel].blocks.len())
    }

    fn reach_within(
        &mut self,
        block: BlockIdx,
        design: &DesignUnit,
        depth: usize,
    ) -> DfcResult<Guard> {
        if let Some(guard) = self.reach.get(&block) {
            return Ok(guard.clone());
        }
        let Some(depth) = depth.checked_sub(1) else {
            return Err(Error::malformed(format!(
                "control flow into `{}' is cyclic",
                design.block(block).unique_name()
            )));
        };
        let preds: Vec<BlockIdx> = design.kernels[self.kernel]
            .blocks
            .iter()
            .copied()
            .filter(|b| design.block(*b).try_successor_flag(block).is_some())
            .collect();
        let guard = if preds.is_empty() {
            Guard::always()
        } else {
            let mut guard = Guard::never();
            for pred in preds {
                let reach = self.reach_within(pred, design, depth)?;
                guard = guard.or(Self::edge_guard(&reach, pred, block, design)?);
            }
            guard
        };
        self.reach.insert(block, guard.clone());
        Ok(guard)
    }

    /// The condition under which control moves from `pred`, reached under
    /// `reach`, to `succ`.
    fn edge_guard(
        reach: &Guard,
        pred: BlockIdx,
        succ: BlockIdx,
        design: &DesignUnit,
    ) -> DfcResult<Guard> {
        let block = design.block(pred);
        let taken = match block.try_successor_flag(succ) {
            Some(CondFlag::True) => true,
            Some(CondFlag::False) => false,
            Some(CondFlag::None) => return Ok(reach.clone()),
            None => return Ok(Guard::never()),
        };
        let Some(cond) = block.condition else {
            return Err(Error::malformed(format!(
                "block `{}' branches without a condition",
                block.unique_name()
            )));
        };
        Ok(reach.and((cond, taken)))
    }
}

impl Visitor for Statements<'_> {
    fn visit_arith(
        &mut self,
        node: NodeIdx,
        op: ArithOp,
        design: &DesignUnit,
    ) -> VisResult {
        let Some((a, b)) = self.operands(node, design) else {
            return Ok(Action::Again);
        };
        let Some((ia, ib)) = Self::operand_nodes(node, design) else {
            return Ok(Action::Again);
        };
        let (sa, sb) = (
            sign_extended(design, node, ia),
            sign_extended(design, node, ib),
        );
        let out = self.declare(node, design);
        let (w, signed) = (out.width, op.is_signed());
        let ty = numeric(signed);
        let expr = match op {
            ArithOp::Add | ArithOp::Sub => {
                let sym = if op == ArithOp::Add { "+" } else { "-" };
                format!("{} {sym} {}", ext(&a, w, sa), ext(&b, w, sb))
            }
            ArithOp::Mul if sa || sb => {
                format!("resize({} * {}, {w})", ext(&a, w, sa), ext(&b, w, sb))
            }
            ArithOp::Mul => {
                format!("resize({ty}({}) * {ty}({}), {w})", a.name, b.name)
            }
            ArithOp::UDiv | ArithOp::SDiv => {
                format!("resize({ty}({}) / {ty}({}), {w})", a.name, b.name)
            }
            ArithOp::URem | ArithOp::SRem => {
                format!("resize({ty}({}) rem {ty}({}), {w})", a.name, b.name)
            }
            ArithOp::Shl => format!(
                "shift_left({}, to_integer(unsigned({})))",
                ext(&a, w, sa),
                b.name
            ),
            ArithOp::LShr | ArithOp::AShr => format!(
                "shift_right({}, to_integer(unsigned({})))",
                num(&a, w, signed),
                b.name
            ),
            ArithOp::And | ArithOp::Or | ArithOp::Xor => format!(
                "{} {} {}",
                ext(&a, w, sa),
                op.as_str(),
                ext(&b, w, sb)
            ),
        };
        self.body
            .push(format!("{} <= std_logic_vector({expr});", out.name));
        Ok(Action::Continue)
    }

    fn visit_fp_arith(
        &mut self,
        node: NodeIdx,
        op: FpOp,
        design: &DesignUnit,
    ) -> VisResult {
        let Some(operands) = self.operands(node, design) else {
            return Ok(Action::Again);
        };
        let NodeKind::FpArith {
            mantissa, exponent, ..
        } = design.node(node).kind
        else {
            unreachable!("visited as floating point operator")
        };
        let name = &op.as_str()[1..];
        self.fp_instance(node, name, (mantissa, exponent), operands, design);
        Ok(Action::Continue)
    }

    fn visit_compare(
        &mut self,
        node: NodeIdx,
        pred: Predicate,
        design: &DesignUnit,
    ) -> VisResult {
        let Some((a, b)) = self.operands(node, design) else {
            return Ok(Action::Again);
        };
        if pred.is_float() {
            let Some(format) = fp_format(a.width) else {
                return Err(Error::unsupported(format!(
                    "{}-bit floating point comparison `{}'",
                    a.width,
                    design.node(node).unique_name()
                )));
            };
            self.fp_instance(node, &format!("cmp_{}", pred.as_str()), format, (a, b), design);
            return Ok(Action::Continue);
        }
        let sym = match pred {
            Predicate::Eq => "=",
            Predicate::Ne => "/=",
            Predicate::Ugt | Predicate::Sgt => ">",
            Predicate::Uge | Predicate::Sge => ">=",
            Predicate::Ult | Predicate::Slt => "<",
            _ => "<=",
        };
        let ty = numeric(pred.is_signed());
        let out = self.declare(node, design);
        self.body.push(format!(
            "{} <= \"1\" when {ty}({}) {sym} {ty}({}) else \"0\";",
            out.name, a.name, b.name
        ));
        Ok(Action::Continue)
    }

    fn visit_const(
        &mut self,
        node: NodeIdx,
        val: &ConstVal,
        design: &DesignUnit,
    ) -> VisResult {
        let out = self.declare(node, design);
        let invalid = || {
            Error::malformed(format!(
                "constant `{}' has literal `{}'",
                design.node(node).unique_name(),
                val.literal
            ))
        };
        let value = match val.datatype {
            Datatype::Half | Datatype::Float | Datatype::Double => {
                let real = val
                    .literal
                    .parse::<f64>()
                    .ok()
                    .and_then(real_literal)
                    .ok_or_else(invalid)?;
                let (mantissa, exponent) = fp_format(out.width).ok_or_else(invalid)?;
                self.uses_float = true;
                format!(
                    "to_slv(to_float({real}, exponent_width => {exponent}, fraction_width => {mantissa}))"
                )
            }
            Datatype::Bool => {
                let bit = match val.literal.as_str() {
                    "true" | "1" => 1,
                    "false" | "0" => 0,
                    _ => return Err(invalid()),
                };
                bit_string(bit, out.width)
            }
            Datatype::Int | Datatype::UInt => {
                let value: i64 = match val.literal.parse::<i64>() {
                    Ok(v) => v,
                    // Unsigned literals above `i64::MAX` keep their bits.
                    Err(_) => val.literal.parse::<u64>().map_err(|_| invalid())? as i64,
                };
                bit_string(value, out.width)
            }
        };
        self.body.push(format!("{} <= {value};", out.name));
        Ok(Action::Continue)
    }

    fn visit_mux(
        &mut self,
        node: NodeIdx,
        inputs: &[MuxInput],
        design: &DesignUnit,
    ) -> VisResult {
        let mux = design.node(node);
        let Some(block) = mux.block else {
            return Err(Error::malformed(format!(
                "multiplexer `{}' belongs to no block",
                mux.unique_name()
            )));
        };
        if let Some(input) = inputs
            .iter()
            .find(|i| design.block(i.block).try_successor_flag(block).is_none())
        {
            return Err(Error::malformed(format!(
                "block `{}' selecting `{}' does not branch to `{}'",
                design.block(input.block).unique_name(),
                mux.unique_name(),
                design.block(block).unique_name()
            )));
        }
        let selection = design.mux_selection(node, block);
        let mut choices = Vec::with_capacity(selection.len());
        for sel in &selection {
            let Some(value) = self.signal(sel.producer) else {
                return Ok(Action::Again);
            };
            let value = value.clone();
            let reach = self.reach_guard(sel.pred, design)?;
            let guard = Self::edge_guard(&reach, sel.pred, block, design)?;
            if guard.conditions().any(|c| self.signal(c).is_none()) {
                return Ok(Action::Again);
            }
            choices.push((value, guard));
        }
        let out = self.declare(node, design);
        let fallback = choices
            .iter()
            .rposition(|(_, g)| g.is_always())
            .unwrap_or(choices.len().saturating_sub(1));
        let unconditioned = choices.iter().filter(|(_, g)| g.is_always()).count();
        if unconditioned > 1 {
            log::warn!(
                "`{}': {unconditioned} inputs have no branch condition, using `{}'",
                mux.unique_name(),
                choices[fallback].0.name
            );
        }
        let mut stmt = format!("{} <= ", out.name);
        for (i, (value, guard)) in choices.iter().enumerate() {
            if i == fallback || guard.is_always() || guard.is_never() {
                continue;
            }
            let cond = guard.render(|c| {
                self.signal(c).map(|s| s.name.clone()).unwrap_or_default()
            });
            stmt.push_str(&format!(
                "{} when {cond} else\n    ",
                fit(value, out.width)
            ));
        }
        match choices.get(fallback) {
            Some((value, _)) => stmt.push_str(&fit(value, out.width)),
            None => stmt.push_str("(others => '0')"),
        }
        stmt.push(';');
        self.body.push(stmt);
        Ok(Action::Continue)
    }

    fn visit_reg(&mut self, node: NodeIdx, design: &DesignUnit) -> VisResult {
        let input = match design.node(node).get_in(0) {
            Some(i) => match self.signal(i) {
                Some(sig) => Some(sig.clone()),
                None => return Ok(Action::Again),
            },
            None => None,
        };
        let out = self.declare(node, design);
        let next = input
            .map(|i| fit(&i, out.width))
            .unwrap_or_else(|| out.name.clone());
        self.body.push(format!(
            "{0}_reg : process (clk)\n  \
             begin\n    \
             if rising_edge(clk) then\n      \
             if rst = '1' then\n        \
             {0} <= (others => '0');\n      \
             else\n        \
             {0} <= {next};\n      \
             end if;\n    \
             end if;\n  \
             end process;",
            out.name
        ));
        Ok(Action::Continue)
    }

    fn visit_ram(
        &mut self,
        node: NodeIdx,
        depth: u64,
        design: &DesignUnit,
    ) -> VisResult {
        let n = design.node(node);
        let NodeKind::Ram { address, .. } = n.kind else {
            unreachable!("visited as ram")
        };
        let addr = match address {
            Some(a) => match self.signal(a) {
                Some(sig) => sig.name.clone(),
                None => return Ok(Action::Again),
            },
            None => "(others => '0')".to_string(),
        };
        let data = n.ins().iter().find(|i| Some(**i) != address);
        let write = match data {
            Some(d) => match self.signal(*d) {
                Some(sig) => sig.clone(),
                None => return Ok(Action::Again),
            },
            None => Signal {
                name: "(others => '0')".to_string(),
                width: n.bitwidth(),
            },
        };
        let out = self.declare(node, design);
        self.body.push(format!(
            "{0}_inst : entity work.ram\n    \
             generic map (DEPTH => {depth}, WIDTH => {1})\n    \
             port map (clk => clk, we => '{2}', addr => {addr}, din => {3}, dout => {0});",
            out.name,
            out.width,
            u8::from(data.is_some()),
            fit(&write, out.width),
        ));
        Ok(Action::Continue)
    }

    fn visit_fifo(
        &mut self,
        node: NodeIdx,
        depth: u64,
        design: &DesignUnit,
    ) -> VisResult {
        let input = match design.node(node).get_in(0) {
            Some(i) => match self.signal(i) {
                Some(sig) => fit(sig, design.node(node).bitwidth()),
                None => return Ok(Action::Again),
            },
            None => "(others => '0')".to_string(),
        };
        let out = self.declare(node, design);
        self.body.push(format!(
            "{0}_inst : entity work.fifo\n    \
             generic map (DEPTH => {depth}, WIDTH => {1})\n    \
             port map (clk => clk, rst => rst, din => {input}, dout => {0});",
            out.name, out.width
        ));
        Ok(Action::Continue)
    }

    fn visit_scalar_port(
        &mut self,
        node: NodeIdx,
        dir: PortDir,
        design: &DesignUnit,
    ) -> VisResult {
        let n = design.node(node);
        let out = match dir {
            PortDir::In => return Ok(Action::Continue),
            PortDir::Out => {
                let name = ident(&n.unique_name());
                self.bind(node, &name, n.bitwidth());
                Signal {
                    name,
                    width: n.bitwidth(),
                }
            }
            PortDir::Internal => self.declare(node, design),
        };
        let value = match n.get_in(0) {
            Some(i) => match self.signal(i) {
                Some(sig) => fit(sig, out.width),
                None => return Ok(Action::Again),
            },
            None => "(others => '0')".to_string(),
        };
        self.body.push(format!("{} <= {value};", out.name));
        Ok(Action::Continue)
    }

    fn visit_stream_index(
        &mut self,
        node: NodeIdx,
        index: &StreamIndex,
        design: &DesignUnit,
    ) -> VisResult {
        let n = design.node(node);
        let Some(ports) = self.iface.accesses.get(&node) else {
            return Err(Error::malformed(format!(
                "`{}' is not an access of a kernel port",
                n.unique_name()
            )));
        };
        let addr = match index.offset {
            Offset::Static(off) => bit_string(off, index.addr_width),
            Offset::Dynamic(a) => match self.signal(a) {
                Some(sig) => fit(sig, index.addr_width),
                None => return Ok(Action::Again),
            },
        };
        let data = match index.access {
            Access::Load => None,
            Access::Store => Some(match n.get_in(0) {
                Some(v) => match self.signal(v) {
                    Some(sig) => fit(sig, n.bitwidth()),
                    None => return Ok(Action::Again),
                },
                None => "(others => '0')".to_string(),
            }),
        };
        let (addr_port, data_port) = (ports.addr.clone(), ports.data.clone());
        self.body.push(format!("{addr_port} <= {addr};"));
        if let Some(data) = data {
            self.body.push(format!("{data_port} <= {data};"));
            self.bind(node, &data_port, n.bitwidth());
        }
        Ok(Action::Continue)
    }
}

impl Statements<'_> {
    /// Signals that were declared, for diagnostics.
    pub fn signal_count(&self) -> usize {
        self.decls.len()
    }

    /// Fail if a node that produces a value never got a signal.
    pub fn check_complete(&self, design: &DesignUnit) -> DfcResult<()> {
        for node in design.kernel_nodes(self.kernel) {
            let n = design.node(*node);
            let produces = !matches!(
                n.kind,
                NodeKind::StreamPort(_)
                    | NodeKind::ScalarPort(PortDir::Internal)
                    | NodeKind::StreamIndex(StreamIndex {
                        access: Access::Store,
                        ..
                    })
            );
            if produces && !self.signals.contains_key(node) {
                return Err(Error::malformed(format!(
                    "no statement was generated for `{}'",
                    n.unique_name()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_strings_are_twos_complement() {
        assert_eq!(bit_string(5, 4), "\"0101\"");
        assert_eq!(bit_string(-1, 3), "\"111\"");
        assert_eq!(bit_string(-2, 66).len(), 68);
        assert!(bit_string(-2, 66).starts_with("\"111"));
        assert!(bit_string(-2, 66).ends_with("10\""));
        assert_eq!(bit_string(0, 0), "\"\"");
    }

    #[test]
    fn formats_of_ieee_widths() {
        assert_eq!(fp_format(32), Some((23, 8)));
        assert_eq!(fp_format(16), Some((10, 5)));
        assert_eq!(fp_format(24), None);
    }

    #[test]
    fn reals_have_a_decimal_point() {
        assert_eq!(real_literal(1.5).as_deref(), Some("1.5"));
        assert_eq!(real_literal(2.0).as_deref(), Some("2.0"));
        assert_eq!(real_literal(1e20).as_deref(), Some("1.0e20"));
        assert_eq!(real_literal(f64::NAN), None);
    }
}
