//! Passes over the dataflow IR and the machinery to run them.
//!
//! Passes are [traversal::Visitor]s registered with a
//! [pass_manager::PassManager], which runs them in the order given by a
//! plan of pass names and aliases.
pub mod default_passes;
pub mod pass_manager;
pub mod passes;
pub mod traversal;
