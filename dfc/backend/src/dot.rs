//! Graphviz backend. Renders every kernel into its own `<kernel>.dot`.
use crate::traits::Backend;
use dfc_ir::{
    Access, ArithOp, ConstVal, DesignUnit, FpOp, Kernel, MuxInput, NodeIdx,
    NodeKind, Offset, PortDir, Predicate, StreamIndex, StreamPort,
};
use dfc_opt::traversal::{Action, DepthFirst, VisResult, Visitor};
use dfc_utils::{DfcResult, OutputDir};
use itertools::Itertools;
use std::io::{self, Write as _};
use std::time::Instant;

/// Emits one Graphviz digraph per kernel.
#[derive(Default)]
pub struct DotBackend;

/// Shape and colour of the nodes of each kind.
fn style(kind: &NodeKind) -> (&'static str, &'static str) {
    match kind {
        NodeKind::Arith(_) => ("box", "black"),
        NodeKind::FpArith { .. } => ("box", "blue"),
        NodeKind::Compare(_) => ("diamond", "black"),
        NodeKind::Const(_) => ("plaintext", "gray40"),
        NodeKind::Mux(_) => ("trapezium", "purple"),
        NodeKind::Reg => ("box3d", "black"),
        NodeKind::Ram { .. } => ("cylinder", "brown"),
        NodeKind::Fifo { .. } => ("cds", "brown"),
        NodeKind::ScalarPort(_) => ("ellipse", "darkgreen"),
        NodeKind::StreamPort(_) => ("doubleoctagon", "red"),
        NodeKind::StreamIndex(_) => ("invhouse", "orange"),
    }
}

/// Collects the statements of one kernel graph. Boundary nodes are also
/// gathered per class so that each class can be ranked together.
#[derive(Default)]
struct DotWriter {
    nodes: Vec<String>,
    edges: Vec<String>,
    scalars: Vec<String>,
    streams: Vec<String>,
}

impl DotWriter {
    fn id(node: NodeIdx) -> String {
        format!("n{node}")
    }

    fn node(&mut self, node: NodeIdx, label: String, design: &DesignUnit) {
        let n = design.node(node);
        let (shape, color) = style(&n.kind);
        self.nodes.push(format!(
            "{} [label=\"{}\\n{}\", shape={shape}, color={color}];",
            Self::id(node),
            label.replace('"', "\\\""),
            n.bitwidth()
        ));
        for out in n.outs() {
            self.edges
                .push(format!("{} -> {};", Self::id(node), Self::id(*out)));
        }
    }

    fn write<F: io::Write>(&self, kernel: &Kernel, f: &mut F) -> io::Result<()> {
        writeln!(f, "digraph \"{}\" {{", kernel.name)?;
        writeln!(f, "  subgraph \"cluster_{}\" {{", kernel.name)?;
        writeln!(f, "    label=\"{}\";", kernel.name)?;
        for line in self.nodes.iter().chain(&self.edges) {
            writeln!(f, "    {line}")?;
        }
        writeln!(f, "  }}")?;
        for class in [&self.scalars, &self.streams] {
            if !class.is_empty() {
                writeln!(f, "  {{ rank=same; {}; }}", class.join("; "))?;
            }
        }
        writeln!(f, "}}")
    }
}

impl Visitor for DotWriter {
    fn visit_arith(
        &mut self,
        node: NodeIdx,
        op: ArithOp,
        design: &DesignUnit,
    ) -> VisResult {
        self.node(node, op.as_str().to_string(), design);
        Ok(Action::Continue)
    }

    fn visit_fp_arith(
        &mut self,
        node: NodeIdx,
        op: FpOp,
        design: &DesignUnit,
    ) -> VisResult {
        self.node(node, op.as_str().to_string(), design);
        Ok(Action::Continue)
    }

    fn visit_compare(
        &mut self,
        node: NodeIdx,
        pred: Predicate,
        design: &DesignUnit,
    ) -> VisResult {
        self.node(node, format!("cmp {}", pred.as_str()), design);
        Ok(Action::Continue)
    }

    fn visit_const(
        &mut self,
        node: NodeIdx,
        val: &ConstVal,
        design: &DesignUnit,
    ) -> VisResult {
        self.node(node, format!("{} {}", val.datatype, val.literal), design);
        Ok(Action::Continue)
    }

    fn visit_mux(
        &mut self,
        node: NodeIdx,
        _inputs: &[MuxInput],
        design: &DesignUnit,
    ) -> VisResult {
        self.node(node, design.node(node).unique_name(), design);
        Ok(Action::Continue)
    }

    fn visit_reg(&mut self, node: NodeIdx, design: &DesignUnit) -> VisResult {
        self.node(node, design.node(node).unique_name(), design);
        Ok(Action::Continue)
    }

    fn visit_ram(
        &mut self,
        node: NodeIdx,
        depth: u64,
        design: &DesignUnit,
    ) -> VisResult {
        let label = format!("{}[{depth}]", design.node(node).unique_name());
        self.node(node, label, design);
        Ok(Action::Continue)
    }

    fn visit_fifo(
        &mut self,
        node: NodeIdx,
        depth: u64,
        design: &DesignUnit,
    ) -> VisResult {
        let label = format!("{}[{depth}]", design.node(node).unique_name());
        self.node(node, label, design);
        Ok(Action::Continue)
    }

    fn visit_scalar_port(
        &mut self,
        node: NodeIdx,
        dir: PortDir,
        design: &DesignUnit,
    ) -> VisResult {
        self.node(node, design.node(node).unique_name(), design);
        if dir != PortDir::Internal {
            self.scalars.push(Self::id(node));
        }
        Ok(Action::Continue)
    }

    fn visit_stream_port(
        &mut self,
        node: NodeIdx,
        _port: &StreamPort,
        design: &DesignUnit,
    ) -> VisResult {
        self.node(node, design.node(node).unique_name(), design);
        self.streams.push(Self::id(node));
        Ok(Action::Continue)
    }

    fn visit_stream_index(
        &mut self,
        node: NodeIdx,
        index: &StreamIndex,
        design: &DesignUnit,
    ) -> VisResult {
        let offset = match index.offset {
            Offset::Static(off) => off.to_string(),
            Offset::Dynamic(addr) => design.node(addr).unique_name(),
        };
        let port = design.node(index.port).unique_name();
        self.node(
            node,
            format!("{} {port}[{offset}]", index.access.as_str()),
            design,
        );
        // Stores have no edge to their port.
        if index.access == Access::Store {
            self.edges.push(format!(
                "{} -> {} [style=dashed];",
                Self::id(node),
                Self::id(index.port)
            ));
        }
        Ok(Action::Continue)
    }
}

impl DotBackend {
    /// Render kernel `kernel` of `design` into `f`.
    pub fn write_kernel<F: io::Write>(
        design: &DesignUnit,
        kernel: usize,
        f: &mut F,
    ) -> DfcResult<()> {
        let mut writer = DotWriter::default();
        DepthFirst::new(design).run(
            &mut writer,
            design,
            design.kernel_nodes(kernel),
        )?;
        writer.write(&design.kernels[kernel], f)?;
        Ok(())
    }
}

impl Backend for DotBackend {
    fn name(&self) -> &'static str {
        "dot"
    }

    fn validate(design: &DesignUnit) -> DfcResult<()> {
        let dups = design.kernels.iter().map(|k| k.name).duplicates().collect_vec();
        if let Some(name) = dups.first() {
            return Err(dfc_utils::Error::misc(format!(
                "two kernels named `{name}' would write the same file"
            )));
        }
        Ok(())
    }

    fn emit(design: &DesignUnit, out: &OutputDir) -> DfcResult<()> {
        for (idx, kernel) in design.kernels.iter().enumerate() {
            let time = Instant::now();
            let file = format!("{}.dot", kernel.name);
            let mut f = out.create(&file)?;
            Self::write_kernel(design, idx, &mut f)?;
            f.flush()?;
            log::info!("Generated `{file}` in {:?}", time.elapsed());
        }
        Ok(())
    }
}
