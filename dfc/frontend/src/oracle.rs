//! Query interfaces the lowering consults, with default implementations
//! derived from the program itself.
use crate::ssa::{BinOp, CastOp, Function, InstKind, InstrRef, Operand};
use petgraph::algo::all_simple_paths;
use petgraph::graph::NodeIndex;

/// How a value is extended to the width its user expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Extension {
    #[default]
    None,
    Zero,
    Sign,
}

/// Answer of a [BitWidthOracle] query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitWidth {
    pub width: u64,
    pub ext: Extension,
}

impl BitWidth {
    pub fn new(width: u64, ext: Extension) -> Self {
        Self { width, ext }
    }
}

/// Width and extension of `operand` as seen by the instruction `user`.
/// The answer is use-site specific: the same value may be seen at different
/// widths by different users.
pub trait BitWidthOracle {
    fn bit_width(
        &self,
        func: &Function,
        operand: &Operand,
        user: InstrRef,
    ) -> BitWidth;
}

/// Every simple control-flow path from block `from` to block `to`, each
/// given as the sequence of blocks it visits, both ends included.
pub trait PathOracle {
    fn simple_paths(
        &self,
        func: &Function,
        from: usize,
        to: usize,
    ) -> Vec<Vec<usize>>;
}

/// Widths straight from the operand types. The extension follows the
/// signedness of the using operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeWidths;

impl TypeWidths {
    fn extension_for(op: &InstKind) -> Extension {
        match op {
            InstKind::Binary { op, .. } if op.is_signed() => Extension::Sign,
            InstKind::Binary { op, .. } if op.is_unsigned() => Extension::Zero,
            InstKind::ICmp { pred, .. } if pred.is_signed() => Extension::Sign,
            InstKind::ICmp { pred, .. } if pred.is_unsigned() => {
                Extension::Zero
            }
            InstKind::Cast {
                op: CastOp::SExt, ..
            } => Extension::Sign,
            InstKind::Cast {
                op: CastOp::ZExt, ..
            } => Extension::Zero,
            _ => Extension::None,
        }
    }
}

impl BitWidthOracle for TypeWidths {
    fn bit_width(
        &self,
        func: &Function,
        operand: &Operand,
        user: InstrRef,
    ) -> BitWidth {
        let width = func
            .type_of(operand)
            .and_then(|ty| ty.bit_width())
            .unwrap_or(1);
        let user = func.instr(user);
        // Shift amounts are never sign extended.
        let ext = match &user.op {
            InstKind::Binary {
                op: BinOp::AShr,
                rhs,
                ..
            } if rhs == operand => Extension::Zero,
            op => Self::extension_for(op),
        };
        BitWidth::new(width, ext)
    }
}

/// Paths enumerated over the control-flow graph of the function.
#[derive(Debug, Default, Clone, Copy)]
pub struct CfgPaths;

impl PathOracle for CfgPaths {
    fn simple_paths(
        &self,
        func: &Function,
        from: usize,
        to: usize,
    ) -> Vec<Vec<usize>> {
        let Ok(graph) = func.cfg() else {
            log::warn!("cannot build the control-flow graph of `{}'", func.name);
            return vec![];
        };
        if from == to {
            return vec![vec![from]];
        }
        all_simple_paths::<Vec<NodeIndex>, _>(
            &graph,
            NodeIndex::new(from),
            NodeIndex::new(to),
            0,
            None,
        )
        .map(|path| path.into_iter().map(|n| graph[n]).collect())
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssa::*;
    use crate::types::Type;

    fn chain() -> Function {
        Function {
            name: "chain".into(),
            args: vec![Argument::new("a", Type::i32())],
            blocks: vec![
                BasicBlock::new(
                    "b0",
                    vec![
                        Instruction::binary(
                            "d",
                            BinOp::SDiv,
                            Type::i32(),
                            Operand::value("a"),
                            Operand::int(3, 32),
                        ),
                        Instruction::br("b1"),
                    ],
                ),
                BasicBlock::new("b1", vec![Instruction::br("b2")]),
                BasicBlock::new("b2", vec![Instruction::ret()]),
            ],
            kernel: true,
            work_item: false,
        }
    }

    #[test]
    fn signed_users_sign_extend() {
        let f = chain();
        let w = TypeWidths.bit_width(&f, &Operand::value("a"), InstrRef::new(0, 0));
        assert_eq!(w, BitWidth::new(32, Extension::Sign));
        let w = TypeWidths.bit_width(&f, &Operand::int(3, 8), InstrRef::new(0, 0));
        assert_eq!(w.width, 8);
    }

    #[test]
    fn straight_line_has_one_path() {
        let f = chain();
        assert_eq!(CfgPaths.simple_paths(&f, 0, 2), vec![vec![0, 1, 2]]);
        assert!(CfgPaths.simple_paths(&f, 2, 0).is_empty());
    }
}
