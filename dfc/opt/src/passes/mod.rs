//! Passes over the dataflow graph
mod well_formed;
mod width_inference;

pub use well_formed::WellFormed;
pub use width_inference::WidthInference;
