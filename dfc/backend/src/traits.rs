use dfc_ir::DesignUnit;
use dfc_utils::{DfcResult, OutputDir};

/// A backend for the dataflow compiler.
pub trait Backend {
    /// The name of this backend.
    fn name(&self) -> &'static str;
    /// Validate the design for emitting using this backend. Returns an
    /// Err(..) if the design has unexpected constructs.
    fn validate(design: &DesignUnit) -> DfcResult<()>
    where
        Self: Sized;
    /// Write the files of this backend for `design` into `out`.
    fn emit(design: &DesignUnit, out: &OutputDir) -> DfcResult<()>
    where
        Self: Sized;
    /// Convenience function to validate and emit the design.
    fn run(&self, design: &DesignUnit, out: &OutputDir) -> DfcResult<()>
    where
        Self: Sized,
    {
        Self::validate(design)?;
        Self::emit(design, out)
    }
}
