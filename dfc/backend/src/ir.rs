use crate::traits::Backend;
use dfc_ir::{DesignUnit, Printer};
use dfc_utils::{DfcResult, OutputDir};
use std::io::Write as _;

/// Dumps the dataflow IR in its textual form to `<design>.ir`.
#[derive(Default)]
pub struct IrBackend;

impl Backend for IrBackend {
    fn name(&self) -> &'static str {
        "ir"
    }

    fn validate(_design: &DesignUnit) -> DfcResult<()> {
        Ok(())
    }

    fn emit(design: &DesignUnit, out: &OutputDir) -> DfcResult<()> {
        let mut f = out.create(&format!("{}.ir", design.name))?;
        Printer::write_design(design, &mut f)?;
        f.flush()?;
        Ok(())
    }
}
