//! In-memory representation of the SSA input program.
//!
//! A [Module] holds functions; functions flagged as kernels are lowered into
//! hardware. Every function is a list of basic blocks whose last instruction
//! is a terminator. Values are referred to by name.
use crate::types::Type;
use serde::{Deserialize, Serialize};

/// A compilation unit: the functions of one input program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new<S: ToString>(name: S) -> Self {
        Self {
            name: name.to_string(),
            functions: vec![],
        }
    }

    /// Functions carrying kernel-entry metadata, in input order.
    pub fn kernels(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| f.kernel)
    }
}

/// A formal argument of a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub ty: Type,
}

impl Argument {
    pub fn new<S: ToString>(name: S, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}

/// A function with its basic blocks. The first block is the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Argument>,
    #[serde(default)]
    pub blocks: Vec<BasicBlock>,
    /// Kernel-entry metadata: only kernels are lowered.
    #[serde(default)]
    pub kernel: bool,
    /// Kernel-entry metadata: the kernel is executed once per work-item.
    #[serde(default)]
    pub work_item: bool,
}

/// A straight-line sequence of instructions ending in a terminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub name: String,
    #[serde(default)]
    pub instrs: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new<S: ToString>(name: S, instrs: Vec<Instruction>) -> Self {
        Self {
            name: name.to_string(),
            instrs,
        }
    }

    /// The terminator of this block, if the block is well formed.
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instrs.last().filter(|i| i.op.is_terminator())
    }
}

/// Position of an instruction inside a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrRef {
    pub block: usize,
    pub instr: usize,
}

impl InstrRef {
    pub fn new(block: usize, instr: usize) -> Self {
        Self { block, instr }
    }
}

/// An instruction, optionally defining the value `result` of type `ty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default = "void")]
    pub ty: Type,
    pub op: InstKind,
}

fn void() -> Type {
    Type::Void
}

/// A literal operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constant {
    Int { value: i64, ty: Type },
    Float { value: f64, ty: Type },
    Undef(Type),
}

impl Constant {
    pub fn ty(&self) -> &Type {
        match self {
            Constant::Int { ty, .. }
            | Constant::Float { ty, .. }
            | Constant::Undef(ty) => ty,
        }
    }

    /// Integer value of the constant, undefined values read as zero.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Constant::Int { value, .. } => Some(*value),
            Constant::Undef(ty) if !ty.is_float() => Some(0),
            _ => None,
        }
    }

    /// Textual form of the literal.
    pub fn literal(&self) -> String {
        match self {
            Constant::Int { value, .. } => value.to_string(),
            Constant::Float { value, .. } => format!("{value:?}"),
            Constant::Undef(_) => "0".to_string(),
        }
    }
}

/// An instruction operand: a named value or a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Value(String),
    Const(Constant),
}

impl Operand {
    pub fn value<S: ToString>(name: S) -> Self {
        Operand::Value(name.to_string())
    }

    pub fn int(value: i64, bits: u32) -> Self {
        Operand::Const(Constant::Int {
            value,
            ty: Type::Int(bits),
        })
    }

    pub fn float(value: f64, ty: Type) -> Self {
        Operand::Const(Constant::Float { value, ty })
    }

    pub fn as_value(&self) -> Option<&str> {
        match self {
            Operand::Value(name) => Some(name),
            Operand::Const(_) => None,
        }
    }

    pub fn as_const(&self) -> Option<&Constant> {
        match self {
            Operand::Const(c) => Some(c),
            Operand::Value(_) => None,
        }
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Value(name) => write!(f, "%{name}"),
            Operand::Const(c) => write!(f, "{} {}", c.ty(), c.literal()),
        }
    }
}

/// Integer and floating point binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl BinOp {
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            BinOp::FAdd | BinOp::FSub | BinOp::FMul | BinOp::FDiv | BinOp::FRem
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, BinOp::SDiv | BinOp::SRem | BinOp::AShr)
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, BinOp::UDiv | BinOp::URem | BinOp::LShr)
    }
}

/// Integer comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntPredicate {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl IntPredicate {
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            IntPredicate::Sgt
                | IntPredicate::Sge
                | IntPredicate::Slt
                | IntPredicate::Sle
        )
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            IntPredicate::Ugt
                | IntPredicate::Uge
                | IntPredicate::Ult
                | IntPredicate::Ule
        )
    }
}

/// Floating point comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloatPredicate {
    Oeq,
    One,
    Ogt,
    Oge,
    Olt,
    Ole,
    Ord,
    Uno,
    Ueq,
    Une,
    Ugt,
    Uge,
    Ult,
    Ule,
}

/// Conversion operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastOp {
    ZExt,
    SExt,
    Trunc,
    BitCast,
    FpToSi,
    FpToUi,
    SiToFp,
    UiToFp,
    FpExt,
    FpTrunc,
    PtrToInt,
    IntToPtr,
}

impl CastOp {
    /// Casts that only reinterpret or resize integer bits.
    pub fn is_integer_resize(&self) -> bool {
        matches!(
            self,
            CastOp::ZExt | CastOp::SExt | CastOp::Trunc | CastOp::BitCast
        )
    }
}

/// One incoming value of a PHI node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incoming {
    pub value: Operand,
    pub block: String,
}

/// The operation performed by an instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstKind {
    Binary {
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    },
    ICmp {
        pred: IntPredicate,
        lhs: Operand,
        rhs: Operand,
    },
    FCmp {
        pred: FloatPredicate,
        lhs: Operand,
        rhs: Operand,
    },
    Cast {
        op: CastOp,
        value: Operand,
    },
    /// Address computation. The first index steps over the pointee of
    /// `base`, the following ones step into arrays and structs.
    Gep {
        base: Operand,
        indices: Vec<Operand>,
    },
    Load {
        ptr: Operand,
    },
    Store {
        value: Operand,
        ptr: Operand,
    },
    Phi {
        incoming: Vec<Incoming>,
    },
    Call {
        callee: String,
        #[serde(default)]
        args: Vec<Operand>,
    },
    Br {
        dest: String,
    },
    CondBr {
        cond: Operand,
        then_dest: String,
        else_dest: String,
    },
    Ret {
        #[serde(default)]
        value: Option<Operand>,
    },
}

impl InstKind {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstKind::Br { .. } | InstKind::CondBr { .. } | InstKind::Ret { .. }
        )
    }

    /// Names of the blocks this terminator transfers control to.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            InstKind::Br { dest } => vec![dest],
            InstKind::CondBr {
                then_dest,
                else_dest,
                ..
            } => vec![then_dest, else_dest],
            _ => vec![],
        }
    }

    /// All value operands read by this instruction.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            InstKind::Binary { lhs, rhs, .. }
            | InstKind::ICmp { lhs, rhs, .. }
            | InstKind::FCmp { lhs, rhs, .. } => vec![lhs, rhs],
            InstKind::Cast { value, .. } => vec![value],
            InstKind::Gep { base, indices } => {
                std::iter::once(base).chain(indices.iter()).collect()
            }
            InstKind::Load { ptr } => vec![ptr],
            InstKind::Store { value, ptr } => vec![value, ptr],
            InstKind::Phi { incoming } => {
                incoming.iter().map(|i| &i.value).collect()
            }
            InstKind::Call { args, .. } => args.iter().collect(),
            InstKind::CondBr { cond, .. } => vec![cond],
            InstKind::Ret { value } => value.iter().collect(),
            InstKind::Br { .. } => vec![],
        }
    }
}

/// Convenience constructors used by tests and tools that build programs
/// in memory.
impl Instruction {
    pub fn new(result: Option<&str>, ty: Type, op: InstKind) -> Self {
        Self {
            result: result.map(str::to_string),
            ty,
            op,
        }
    }

    pub fn binary(
        result: &str,
        op: BinOp,
        ty: Type,
        lhs: Operand,
        rhs: Operand,
    ) -> Self {
        Self::new(Some(result), ty, InstKind::Binary { op, lhs, rhs })
    }

    pub fn icmp(
        result: &str,
        pred: IntPredicate,
        lhs: Operand,
        rhs: Operand,
    ) -> Self {
        Self::new(Some(result), Type::i1(), InstKind::ICmp { pred, lhs, rhs })
    }

    pub fn cast(result: &str, op: CastOp, ty: Type, value: Operand) -> Self {
        Self::new(Some(result), ty, InstKind::Cast { op, value })
    }

    pub fn gep(
        result: &str,
        ty: Type,
        base: Operand,
        indices: Vec<Operand>,
    ) -> Self {
        Self::new(Some(result), ty, InstKind::Gep { base, indices })
    }

    pub fn load(result: &str, ty: Type, ptr: Operand) -> Self {
        Self::new(Some(result), ty, InstKind::Load { ptr })
    }

    pub fn store(value: Operand, ptr: Operand) -> Self {
        Self::new(None, Type::Void, InstKind::Store { value, ptr })
    }

    pub fn phi(result: &str, ty: Type, incoming: Vec<(Operand, &str)>) -> Self {
        let incoming = incoming
            .into_iter()
            .map(|(value, block)| Incoming {
                value,
                block: block.to_string(),
            })
            .collect();
        Self::new(Some(result), ty, InstKind::Phi { incoming })
    }

    pub fn call(
        result: &str,
        ty: Type,
        callee: &str,
        args: Vec<Operand>,
    ) -> Self {
        Self::new(
            Some(result),
            ty,
            InstKind::Call {
                callee: callee.to_string(),
                args,
            },
        )
    }

    pub fn br(dest: &str) -> Self {
        Self::new(
            None,
            Type::Void,
            InstKind::Br {
                dest: dest.to_string(),
            },
        )
    }

    pub fn cond_br(cond: Operand, then_dest: &str, else_dest: &str) -> Self {
        Self::new(
            None,
            Type::Void,
            InstKind::CondBr {
                cond,
                then_dest: then_dest.to_string(),
                else_dest: else_dest.to_string(),
            },
        )
    }

    pub fn ret() -> Self {
        Self::new(None, Type::Void, InstKind::Ret { value: None })
    }

    pub fn ret_value(value: Operand) -> Self {
        Self::new(None, Type::Void, InstKind::Ret { value: Some(value) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AddressSpace;

    #[test]
    fn parse_json_kernel() {
        let src = r#"{
            "name": "store42",
            "functions": [{
                "name": "k",
                "kernel": true,
                "args": [{"name": "out", "ty": {"ptr": {"pointee": {"int": 32}, "addrspace": "global"}}}],
                "blocks": [{
                    "name": "entry",
                    "instrs": [
                        {"op": {"store": {
                            "value": {"const": {"int": {"value": 42, "ty": {"int": 32}}}},
                            "ptr": {"value": "out"}}}},
                        {"op": {"ret": {}}}
                    ]
                }]
            }]
        }"#;
        let module: Module = serde_json::from_str(src).unwrap();
        let kernel = module.kernels().next().unwrap();
        assert!(!kernel.work_item);
        assert_eq!(
            kernel.args[0].ty,
            Type::ptr(Type::i32(), AddressSpace::Global)
        );
        let entry = &kernel.blocks[0];
        assert_eq!(entry.instrs[0], Instruction::store(Operand::int(42, 32), Operand::value("out")));
        assert!(entry.terminator().is_some());
    }

    #[test]
    fn operands_and_targets() {
        let br = Instruction::cond_br(Operand::value("c"), "then", "else");
        assert_eq!(br.op.targets(), vec!["then", "else"]);
        assert_eq!(br.op.operands(), vec![&Operand::value("c")]);
        let gep = Instruction::gep(
            "p",
            Type::ptr(Type::i32(), AddressSpace::Global),
            Operand::value("a"),
            vec![Operand::int(1, 64), Operand::value("i")],
        );
        assert_eq!(gep.op.operands().len(), 3);
        assert!(!gep.op.is_terminator());
    }

    #[test]
    fn literal_text() {
        let c = Constant::Int {
            value: -7,
            ty: Type::i32(),
        };
        assert_eq!(c.literal(), "-7");
        assert_eq!(Constant::Undef(Type::i32()).as_int(), Some(0));
        assert_eq!(
            Constant::Float {
                value: 1.5,
                ty: Type::Float
            }
            .literal(),
            "1.5"
        );
    }
}
