//! Implements a formatter for the in-memory representation of a design.
use crate::{Block, DesignUnit, Kernel, Node, NodeIdx, NodeKind, Offset};
use itertools::Itertools;
use std::io;

/// Printer for the IR.
pub struct Printer;

impl Printer {
    fn format_list(design: &DesignUnit, nodes: &[NodeIdx]) -> String {
        nodes
            .iter()
            .map(|n| design.node(*n).unique_name())
            .join(", ")
    }

    /// Formats the operation performed by a node, e.g. `add(a_1, b_2)`.
    pub fn format_node(design: &DesignUnit, node: &Node) -> String {
        let args = Self::format_list(design, node.ins());
        let op = match &node.kind {
            NodeKind::Arith(op) => op.as_str().to_string(),
            NodeKind::FpArith {
                op,
                mantissa,
                exponent,
            } => format!("{}<{mantissa}, {exponent}>", op.as_str()),
            NodeKind::Compare(pred) => format!("cmp {}", pred.as_str()),
            NodeKind::Const(c) => {
                return format!("const {} {}", c.datatype, c.literal);
            }
            NodeKind::Mux(inputs) => {
                let inputs = inputs
                    .iter()
                    .map(|i| {
                        format!(
                            "{} from {}",
                            design.node(i.node).unique_name(),
                            design.block(i.block).unique_name()
                        )
                    })
                    .join(", ");
                return format!("mux({inputs})");
            }
            NodeKind::Reg => "reg".to_string(),
            NodeKind::Ram { depth, .. } => format!("ram<{depth}>"),
            NodeKind::Fifo { depth } => format!("fifo<{depth}>"),
            NodeKind::ScalarPort(dir) => format!("scalar {}", dir.as_str()),
            NodeKind::StreamPort(sp) => {
                return format!(
                    "stream [{}]",
                    Self::format_list(design, &sp.index_list())
                );
            }
            NodeKind::StreamIndex(index) => {
                let offset = match index.offset {
                    Offset::Static(off) => off.to_string(),
                    Offset::Dynamic(addr) => design.node(addr).unique_name(),
                };
                format!(
                    "{} {}[{}]",
                    index.access.as_str(),
                    design.node(index.port).unique_name(),
                    offset
                )
            }
        };
        if args.is_empty() {
            op
        } else {
            format!("{op}({args})")
        }
    }

    fn write_node<F: io::Write>(
        design: &DesignUnit,
        idx: NodeIdx,
        indent: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let node = design.node(idx);
        writeln!(
            f,
            "{}{}: {} = {};",
            " ".repeat(indent),
            node.unique_name(),
            node.bitwidth(),
            Self::format_node(design, node)
        )
    }

    /// Formats and writes a block.
    pub fn write_block<F: io::Write>(
        design: &DesignUnit,
        block: &Block,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(f, "  block {} {{", block.unique_name())?;
        for node in block.nodes() {
            Self::write_node(design, node, 4, f)?;
        }
        if let Some(cond) = block.condition {
            writeln!(f, "    condition {};", design.node(cond).unique_name())?;
        }
        let succs = block
            .successors()
            .map(|(b, flag)| {
                format!("{}:{}", design.block(b).unique_name(), flag.as_str())
            })
            .join(", ");
        if !succs.is_empty() {
            writeln!(f, "    next {succs};")?;
        }
        writeln!(f, "  }}")
    }

    /// Formats and writes a kernel.
    pub fn write_kernel<F: io::Write>(
        design: &DesignUnit,
        kernel: &Kernel,
        f: &mut F,
    ) -> io::Result<()> {
        let attr = if kernel.is_work_item() { "@work_item " } else { "" };
        writeln!(f, "{attr}kernel {} {{", kernel.name)?;
        for port in kernel.ports() {
            Self::write_node(design, port, 2, f)?;
        }
        for block in &kernel.blocks {
            Self::write_block(design, design.block(*block), f)?;
        }
        writeln!(f, "}}")
    }

    /// Formats and writes the whole design.
    pub fn write_design<F: io::Write>(
        design: &DesignUnit,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(f, "// design {}", design.name)?;
        for kernel in &design.kernels {
            Self::write_kernel(design, kernel, f)?;
        }
        Ok(())
    }
}
