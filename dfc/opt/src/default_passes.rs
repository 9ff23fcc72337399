//! Defines the default passes available to [PassManager].
use crate::passes::{WellFormed, WidthInference};
use crate::traversal::Named;
use crate::{pass_manager::PassManager, register_alias};
use dfc_utils::DfcResult;

impl PassManager {
    pub fn default_passes() -> DfcResult<Self> {
        // Construct the pass manager and register all passes.
        let mut pm = PassManager::default();

        // Validation passes
        pm.register_pass::<WellFormed>()?;

        // Refinement passes
        pm.register_pass::<WidthInference>()?;

        // Register aliases
        register_alias!(pm, "all", [WellFormed, WidthInference, WellFormed]);
        register_alias!(pm, "none", []);

        Ok(pm)
    }
}
