//! Types of the SSA input program.
use serde::{Deserialize, Serialize};

/// Address space a pointer refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressSpace {
    #[default]
    Private,
    Global,
    Constant,
    Local,
}

impl AddressSpace {
    /// Numeric address space as used by OpenCL targets.
    pub fn number(&self) -> u32 {
        match self {
            AddressSpace::Private => 0,
            AddressSpace::Global => 1,
            AddressSpace::Constant => 2,
            AddressSpace::Local => 3,
        }
    }

    /// Can a kernel pointer argument in this address space become a stream?
    pub fn is_streamable(&self) -> bool {
        matches!(self, AddressSpace::Global | AddressSpace::Constant)
    }
}

impl std::fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AddressSpace::Private => "private",
            AddressSpace::Global => "global",
            AddressSpace::Constant => "constant",
            AddressSpace::Local => "local",
        };
        f.write_str(name)
    }
}

/// A first-class type of the input program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Void,
    Int(u32),
    Half,
    Float,
    Double,
    Ptr {
        pointee: Box<Type>,
        #[serde(default)]
        addrspace: AddressSpace,
    },
    Array {
        elem: Box<Type>,
        len: u64,
    },
    Struct {
        fields: Vec<Type>,
    },
    Vector {
        elem: Box<Type>,
        len: u64,
    },
}

impl Type {
    pub fn i1() -> Self {
        Type::Int(1)
    }

    pub fn i32() -> Self {
        Type::Int(32)
    }

    pub fn i64() -> Self {
        Type::Int(64)
    }

    pub fn ptr(pointee: Type, addrspace: AddressSpace) -> Self {
        Type::Ptr {
            pointee: Box::new(pointee),
            addrspace,
        }
    }

    pub fn array(elem: Type, len: u64) -> Self {
        Type::Array {
            elem: Box::new(elem),
            len,
        }
    }

    pub fn structure(fields: Vec<Type>) -> Self {
        Type::Struct { fields }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Half | Type::Float | Type::Double)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Ptr { .. })
    }

    /// Bit width of a scalar type, `None` for aggregates and void.
    pub fn bit_width(&self) -> Option<u64> {
        match self {
            Type::Int(n) => Some(*n as u64),
            Type::Half => Some(16),
            Type::Float => Some(32),
            Type::Double => Some(64),
            Type::Ptr { .. } => Some(64),
            Type::Void
            | Type::Array { .. }
            | Type::Struct { .. }
            | Type::Vector { .. } => None,
        }
    }

    /// Mantissa and exponent widths of floating point types.
    pub fn fp_format(&self) -> Option<(u32, u32)> {
        match self {
            Type::Half => Some((10, 5)),
            Type::Float => Some((23, 8)),
            Type::Double => Some((52, 11)),
            _ => None,
        }
    }

    /// Storage size in bytes. Aggregates are packed: struct fields are laid
    /// out back to back without padding.
    pub fn size_in_bytes(&self) -> u64 {
        match self {
            Type::Void => 0,
            Type::Int(n) => (*n as u64).div_ceil(8),
            Type::Half => 2,
            Type::Float => 4,
            Type::Double => 8,
            Type::Ptr { .. } => 8,
            Type::Array { elem, len } | Type::Vector { elem, len } => {
                elem.size_in_bytes() * len
            }
            Type::Struct { fields } => {
                fields.iter().map(Type::size_in_bytes).sum()
            }
        }
    }

    /// Byte offset of field `idx` inside a struct: the summed size of all
    /// preceding fields.
    pub fn field_offset(&self, idx: usize) -> Option<u64> {
        match self {
            Type::Struct { fields } if idx < fields.len() => {
                Some(fields[..idx].iter().map(Type::size_in_bytes).sum())
            }
            _ => None,
        }
    }

    /// Does this type mention a vector type anywhere?
    pub fn contains_vector(&self) -> bool {
        match self {
            Type::Vector { .. } => true,
            Type::Ptr { pointee, .. } => pointee.contains_vector(),
            Type::Array { elem, .. } => elem.contains_vector(),
            Type::Struct { fields } => fields.iter().any(Type::contains_vector),
            Type::Void
            | Type::Int(_)
            | Type::Half
            | Type::Float
            | Type::Double => false,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(n) => write!(f, "i{n}"),
            Type::Half => write!(f, "half"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Ptr { pointee, addrspace } => {
                write!(f, "{pointee} addrspace({})*", addrspace.number())
            }
            Type::Array { elem, len } => write!(f, "[{len} x {elem}]"),
            Type::Struct { fields } => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, "}}")
            }
            Type::Vector { elem, len } => write!(f, "<{len} x {elem}>"),
        }
    }
}
