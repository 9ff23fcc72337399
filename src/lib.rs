//! # The Dataflow Compiler
//!
//! This crate plumbs together the dataflow compiler crates and provides its
//! command-line interface. Depend on [`dfc_frontend`], [`dfc_ir`],
//! [`dfc_opt`] and [`dfc_backend`] instead to use the compiler as a library.
pub mod cmdline;
pub mod driver;
