//! Verilog backend. Not implemented: the visitor accepts every node and no
//! file is written.
use crate::traits::Backend;
use dfc_ir::DesignUnit;
use dfc_opt::traversal::{DepthFirst, Visitor};
use dfc_utils::{DfcResult, OutputDir};

#[derive(Default)]
pub struct VerilogBackend;

/// Relies on the default visit methods, which all continue.
struct VerilogWriter;

impl Visitor for VerilogWriter {}

impl VerilogBackend {
    /// Walk every kernel and return the number of nodes reached.
    fn walk(design: &DesignUnit) -> DfcResult<usize> {
        let mut walk = DepthFirst::new(design);
        for kernel in 0..design.kernels.len() {
            walk.run(&mut VerilogWriter, design, design.kernel_nodes(kernel))?;
        }
        Ok(walk.visited().len())
    }
}

impl Backend for VerilogBackend {
    fn name(&self) -> &'static str {
        "verilog"
    }

    fn validate(_design: &DesignUnit) -> DfcResult<()> {
        Ok(())
    }

    fn emit(design: &DesignUnit, _out: &OutputDir) -> DfcResult<()> {
        let visited = Self::walk(design)?;
        log::warn!(
            "Verilog emission is not implemented, skipped {visited} nodes of `{}'",
            design.name
        );
        Ok(())
    }
}
