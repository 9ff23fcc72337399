//! Input side of the dataflow compiler: the SSA program model, its
//! control-flow helpers and the oracles lowering consults.
mod cfg;
pub mod oracle;
pub mod ssa;
pub mod types;
mod workspace;

pub use oracle::{
    BitWidth, BitWidthOracle, CfgPaths, Extension, PathOracle, TypeWidths,
};
pub use ssa::{
    Argument, BasicBlock, BinOp, CastOp, Constant, FloatPredicate, Function,
    Incoming, InstKind, InstrRef, Instruction, IntPredicate, Module, Operand,
};
pub use types::{AddressSpace, Type};
