//! Shared utilities for the dataflow compiler.
mod errors;
mod id;
mod math;
mod out_file;

pub use errors::{DfcResult, Error, ErrorKind};
pub use id::{GetName, Id};
pub use math::{bits_needed_for, bits_to_store, exact_log2};
pub use out_file::OutputDir;
