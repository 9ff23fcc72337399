//! The closed catalogue of hardware node kinds.
use crate::{BlockIdx, NodeIdx};

/// Integer operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
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
}

impl ArithOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::UDiv => "udiv",
            ArithOp::SDiv => "sdiv",
            ArithOp::URem => "urem",
            ArithOp::SRem => "srem",
            ArithOp::Shl => "shl",
            ArithOp::LShr => "lshr",
            ArithOp::AShr => "ashr",
            ArithOp::And => "and",
            ArithOp::Or => "or",
            ArithOp::Xor => "xor",
        }
    }

    /// Does the operator interpret its operands as signed numbers?
    pub fn is_signed(&self) -> bool {
        matches!(self, ArithOp::SDiv | ArithOp::SRem | ArithOp::AShr)
    }

    pub fn is_shift(&self) -> bool {
        matches!(self, ArithOp::Shl | ArithOp::LShr | ArithOp::AShr)
    }
}

/// Floating point operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FpOp {
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl FpOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FpOp::FAdd => "fadd",
            FpOp::FSub => "fsub",
            FpOp::FMul => "fmul",
            FpOp::FDiv => "fdiv",
            FpOp::FRem => "frem",
        }
    }
}

/// Comparison predicates. The `F` variants compare floating point numbers,
/// `O` meaning ordered and `U` unordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
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
    FOeq,
    FOne,
    FOgt,
    FOge,
    FOlt,
    FOle,
    FOrd,
    FUno,
    FUeq,
    FUne,
    FUgt,
    FUge,
    FUlt,
    FUle,
}

impl Predicate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Predicate::Eq => "eq",
            Predicate::Ne => "ne",
            Predicate::Ugt => "ugt",
            Predicate::Uge => "uge",
            Predicate::Ult => "ult",
            Predicate::Ule => "ule",
            Predicate::Sgt => "sgt",
            Predicate::Sge => "sge",
            Predicate::Slt => "slt",
            Predicate::Sle => "sle",
            Predicate::FOeq => "foeq",
            Predicate::FOne => "fone",
            Predicate::FOgt => "fogt",
            Predicate::FOge => "foge",
            Predicate::FOlt => "folt",
            Predicate::FOle => "fole",
            Predicate::FOrd => "ford",
            Predicate::FUno => "funo",
            Predicate::FUeq => "fueq",
            Predicate::FUne => "fune",
            Predicate::FUgt => "fugt",
            Predicate::FUge => "fuge",
            Predicate::FUlt => "fult",
            Predicate::FUle => "fule",
        }
    }

    pub fn is_float(&self) -> bool {
        !matches!(
            self,
            Predicate::Eq
                | Predicate::Ne
                | Predicate::Ugt
                | Predicate::Uge
                | Predicate::Ult
                | Predicate::Ule
                | Predicate::Sgt
                | Predicate::Sge
                | Predicate::Slt
                | Predicate::Sle
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            Predicate::Sgt | Predicate::Sge | Predicate::Slt | Predicate::Sle
        )
    }
}

/// Interpretation of the bits of a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datatype {
    Int,
    UInt,
    Half,
    Float,
    Double,
    Bool,
}

impl Datatype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datatype::Int => "int",
            Datatype::UInt => "uint",
            Datatype::Half => "half",
            Datatype::Float => "float",
            Datatype::Double => "double",
            Datatype::Bool => "bool",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Datatype::Half | Datatype::Float | Datatype::Double)
    }
}

impl std::fmt::Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstVal {
    pub literal: String,
    pub datatype: Datatype,
}

impl ConstVal {
    pub fn new<S: ToString>(literal: S, datatype: Datatype) -> Self {
        Self {
            literal: literal.to_string(),
            datatype,
        }
    }

    /// Display name of a constant: the literal without its trailing `0`
    /// characters, always keeping the first character.
    pub fn display_name(literal: &str) -> String {
        let Some(first) = literal.chars().next() else {
            return String::new();
        };
        let rest = literal[first.len_utf8()..].trim_end_matches('0');
        format!("{first}{rest}")
    }
}

/// Direction of a scalar port. `Internal` ports carry values across the
/// boundary between two blocks of the same kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDir {
    In,
    Out,
    Internal,
}

impl PortDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortDir::In => "in",
            PortDir::Out => "out",
            PortDir::Internal => "internal",
        }
    }
}

/// One input of a multiplexer: the value produced in `block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MuxInput {
    pub node: NodeIdx,
    pub block: BlockIdx,
}

/// Direction of a stream access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Load,
    Store,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Load => "ld",
            Access::Store => "st",
        }
    }
}

/// Byte offset of a stream access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Offset {
    /// Known at compile time.
    Static(i64),
    /// Computed at run time by the given node.
    Dynamic(NodeIdx),
}

/// An indexable memory-mapped port. Accesses are kept in program order,
/// which encodes the required memory ordering: the list is append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamPort {
    accesses: Vec<(NodeIdx, Access)>,
}

impl StreamPort {
    pub fn push(&mut self, index: NodeIdx, access: Access) {
        self.accesses.push((index, access));
    }

    pub fn loads(&self) -> Vec<NodeIdx> {
        self.filtered(Access::Load)
    }

    pub fn stores(&self) -> Vec<NodeIdx> {
        self.filtered(Access::Store)
    }

    /// Every access in program order.
    pub fn index_list(&self) -> Vec<NodeIdx> {
        self.accesses.iter().map(|(idx, _)| *idx).collect()
    }

    pub fn accesses(&self) -> &[(NodeIdx, Access)] {
        &self.accesses
    }

    pub fn has_loads(&self) -> bool {
        self.accesses.iter().any(|(_, a)| *a == Access::Load)
    }

    pub fn has_stores(&self) -> bool {
        self.accesses.iter().any(|(_, a)| *a == Access::Store)
    }

    fn filtered(&self, access: Access) -> Vec<NodeIdx> {
        self.accesses
            .iter()
            .filter(|(_, a)| *a == access)
            .map(|(idx, _)| *idx)
            .collect()
    }
}

/// A single access to a [StreamPort]. A load produces the loaded value,
/// a store consumes the stored value through its first input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamIndex {
    pub port: NodeIdx,
    pub access: Access,
    pub offset: Offset,
    /// Width of the address.
    pub addr_width: u64,
}

impl StreamIndex {
    pub fn is_static(&self) -> bool {
        matches!(self.offset, Offset::Static(_))
    }
}

/// The kind of a node together with its kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Arith(ArithOp),
    FpArith {
        op: FpOp,
        mantissa: u32,
        exponent: u32,
    },
    Compare(Predicate),
    Const(ConstVal),
    Mux(Vec<MuxInput>),
    Reg,
    Ram {
        depth: u64,
        address: Option<NodeIdx>,
    },
    Fifo {
        depth: u64,
    },
    ScalarPort(PortDir),
    StreamPort(StreamPort),
    StreamIndex(StreamIndex),
}

impl NodeKind {
    /// Short name of the kind, used in diagnostics and dumps.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Arith(_) => "arith",
            NodeKind::FpArith { .. } => "fparith",
            NodeKind::Compare(_) => "compare",
            NodeKind::Const(_) => "const",
            NodeKind::Mux(_) => "mux",
            NodeKind::Reg => "reg",
            NodeKind::Ram { .. } => "ram",
            NodeKind::Fifo { .. } => "fifo",
            NodeKind::ScalarPort(_) => "scalar",
            NodeKind::StreamPort(_) => "stream",
            NodeKind::StreamIndex(_) => "index",
        }
    }

    pub fn is_port(&self) -> bool {
        matches!(self, NodeKind::ScalarPort(_) | NodeKind::StreamPort(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfc_idx::IndexRef;

    #[test]
    fn const_display_names() {
        assert_eq!(ConstVal::display_name("100"), "1");
        assert_eq!(ConstVal::display_name("120"), "12");
        assert_eq!(ConstVal::display_name("0"), "0");
        assert_eq!(ConstVal::display_name("5"), "5");
        assert_eq!(ConstVal::display_name("000"), "0");
        assert_eq!(ConstVal::display_name("-40"), "-4");
    }

    #[test]
    fn datatype_strings_are_distinct() {
        let all = [
            Datatype::Int,
            Datatype::UInt,
            Datatype::Half,
            Datatype::Float,
            Datatype::Double,
            Datatype::Bool,
        ];
        let names: std::collections::HashSet<_> =
            all.iter().map(Datatype::as_str).collect();
        assert_eq!(names.len(), all.len());
        assert_eq!(Datatype::UInt.to_string(), "uint");
    }

    #[test]
    fn loads_and_stores_partition_accesses() {
        let mut port = StreamPort::default();
        let idx = |i| NodeIdx::new(i);
        port.push(idx(3), Access::Load);
        port.push(idx(5), Access::Store);
        port.push(idx(4), Access::Load);
        port.push(idx(9), Access::Store);
        let (loads, stores) = (port.loads(), port.stores());
        assert_eq!(loads, vec![idx(3), idx(4)]);
        assert_eq!(stores, vec![idx(5), idx(9)]);
        assert!(loads.iter().all(|l| !stores.contains(l)));
        let mut union: Vec<_> = port
            .index_list()
            .into_iter()
            .filter(|i| loads.contains(i) || stores.contains(i))
            .collect();
        assert_eq!(union, port.index_list());
        union.sort();
        assert_eq!(union, vec![idx(3), idx(4), idx(5), idx(9)]);
    }
}
