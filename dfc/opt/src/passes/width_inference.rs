use crate::traversal::{
    Action, ConstructVisitor, Named, ParseVal, PassOpt, Traversal, VisResult,
    Visitor,
};
use dfc_ir::{Access, DesignUnit, MuxInput, NodeIdx, PortDir, StreamIndex};
use dfc_utils::DfcResult;
use linked_hash_map::LinkedHashMap;

/// Widens nodes that only forward a value to the width of that value.
///
/// Boundary ports and kernel outputs take the width of their producer,
/// multiplexers the widest of their inputs, and stores the width of the
/// stored value. Widths are never narrowed.
///
/// Nodes are visited in dataflow order so a widened port is seen by its
/// consumers in the same run.
pub struct WidthInference {
    /// Widths to apply once the kernel has been visited.
    pending: LinkedHashMap<NodeIdx, u64>,
    /// Only report the widths that would change.
    dry_run: bool,
}

impl Named for WidthInference {
    fn name() -> &'static str {
        "width-inference"
    }

    fn description() -> &'static str {
        "Widen ports, multiplexers and stores to the width of their inputs"
    }

    fn opts() -> Vec<PassOpt> {
        vec![PassOpt::new(
            "dry-run",
            "Log the inferred widths without changing the graph",
            ParseVal::Bool(false),
            PassOpt::parse_bool,
        )]
    }
}

impl ConstructVisitor for WidthInference {
    fn from(design: &DesignUnit) -> DfcResult<Self> {
        let opts = Self::get_opts(design);
        Ok(WidthInference {
            pending: LinkedHashMap::new(),
            dry_run: opts["dry-run"].bool(),
        })
    }

    fn clear_data(&mut self) {
        self.pending.clear();
    }
}

impl WidthInference {
    /// Width of `node`, including widenings not applied yet.
    fn width(&self, node: NodeIdx, design: &DesignUnit) -> u64 {
        self.pending
            .get(&node)
            .copied()
            .unwrap_or_else(|| design.node(node).bitwidth())
    }

    fn widen(&mut self, node: NodeIdx, required: u64, design: &DesignUnit) {
        if required > self.width(node, design) {
            self.pending.insert(node, required);
        }
    }

    fn widest(&self, nodes: &[NodeIdx], design: &DesignUnit) -> u64 {
        nodes
            .iter()
            .map(|n| self.width(*n, design))
            .max()
            .unwrap_or(0)
    }
}

impl Visitor for WidthInference {
    fn traversal() -> Traversal {
        Traversal::BreadthFirst
    }

    fn finish_kernel(
        &mut self,
        kernel: usize,
        design: &mut DesignUnit,
    ) -> VisResult {
        for (node, width) in &self.pending {
            let n = design.node(*node);
            log::debug!(
                "{}: widening `{}' from {} to {width}",
                design.kernels[kernel].name,
                n.unique_name(),
                n.bitwidth()
            );
        }
        if !self.dry_run {
            for (node, width) in std::mem::take(&mut self.pending) {
                design.node_mut(node).set_bitwidth(width);
            }
        }
        Ok(Action::Continue)
    }

    fn visit_scalar_port(
        &mut self,
        node: NodeIdx,
        dir: PortDir,
        design: &DesignUnit,
    ) -> VisResult {
        if dir != PortDir::In {
            let required = self.widest(design.node(node).ins(), design);
            self.widen(node, required, design);
        }
        Ok(Action::Continue)
    }

    fn visit_mux(
        &mut self,
        node: NodeIdx,
        inputs: &[MuxInput],
        design: &DesignUnit,
    ) -> VisResult {
        let producers: Vec<_> = inputs.iter().map(|i| i.node).collect();
        let required = self.widest(&producers, design);
        self.widen(node, required, design);
        Ok(Action::Continue)
    }

    fn visit_stream_index(
        &mut self,
        node: NodeIdx,
        index: &StreamIndex,
        design: &DesignUnit,
    ) -> VisResult {
        if index.access == Access::Store {
            if let Some(value) = design.node(node).get_in(0) {
                let required = self.width(value, design);
                self.widen(node, required, design);
            }
        }
        Ok(Action::Continue)
    }
}
