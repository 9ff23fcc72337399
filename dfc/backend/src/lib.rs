//! Backends for the dataflow compiler.
mod backend_opt;
mod dot;
mod ir;
mod makefile;
mod traits;
mod verilog;
mod vhdl;

pub use backend_opt::BackendOpt;
pub use dot::DotBackend;
pub use ir::IrBackend;
pub use makefile::write_makefile;
pub use traits::Backend;
pub use verilog::VerilogBackend;
pub use vhdl::VhdlBackend;
