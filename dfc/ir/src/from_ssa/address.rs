//! Address computation and memory accesses.
use super::KernelLowering;
use crate::builder::static_addr_width;
use crate::{Access, ArithOp, ConstVal, Datatype, NodeIdx, NodeKind, Offset};
use dfc_frontend::{InstrRef, Instruction, Operand, Type};
use dfc_utils::{DfcResult, Error, bits_to_store, exact_log2};

/// A byte address into a stream port, computed in block `block`.
#[derive(Debug, Clone, Copy)]
pub(super) struct Address {
    port: NodeIdx,
    offset: Offset,
    block: usize,
}

/// How one GEP index moves through the indexed type.
enum Step {
    /// Scale the index by the element size and continue in `elem`.
    Scale { size: u64, elem: Type },
    /// A struct field at a fixed offset.
    Field { offset: u64, field: Type },
}

impl Step {
    /// The step taken by the `k`-th index into a value of type `ty`. The
    /// first index steps over whole values of the pointee type.
    fn of(ty: &Type, k: usize, index: &Operand) -> DfcResult<Self> {
        if k == 0 {
            return Ok(Step::Scale {
                size: ty.size_in_bytes(),
                elem: ty.clone(),
            });
        }
        match ty {
            Type::Array { elem, .. } => Ok(Step::Scale {
                size: elem.size_in_bytes(),
                elem: (**elem).clone(),
            }),
            Type::Struct { fields } => {
                let idx = index
                    .as_const()
                    .and_then(|c| c.as_int())
                    .ok_or_else(|| {
                        Error::unsupported(format!(
                            "non-constant index {index} into struct `{ty}'"
                        ))
                    })?;
                let offset = usize::try_from(idx)
                    .ok()
                    .and_then(|i| ty.field_offset(i).map(|o| (i, o)));
                let Some((i, offset)) = offset else {
                    return Err(Error::malformed(format!(
                        "field {idx} out of range for struct `{ty}'"
                    )));
                };
                Ok(Step::Field {
                    offset,
                    field: fields[i].clone(),
                })
            }
            _ => Err(Error::unsupported(format!(
                "index into non-aggregate type `{ty}'"
            ))),
        }
    }
}

impl KernelLowering<'_, '_> {
    /// The stream port and byte offset `ptr` refers to, as seen from the
    /// block of `user`.
    fn address_of(
        &mut self,
        ptr: &Operand,
        user: InstrRef,
    ) -> DfcResult<(NodeIdx, Offset)> {
        let name = match self.dealias(ptr) {
            Operand::Value(name) => name,
            Operand::Const(c) => {
                return Err(Error::unsupported(format!(
                    "access through constant pointer `{}'",
                    c.literal()
                )));
            }
        };
        if let Some(port) = self.streams.get(&name) {
            return Ok((*port, Offset::Static(0)));
        }
        let Some(addr) = self.addresses.get(&name).copied() else {
            return Err(Error::unsupported(format!(
                "`{name}' does not address a stream argument"
            )));
        };
        match addr.offset {
            Offset::Dynamic(_) if addr.block != user.block => {
                let node = self.resolve(&name, user.block)?;
                Ok((addr.port, Offset::Dynamic(node)))
            }
            offset => Ok((addr.port, offset)),
        }
    }

    /// Fold the indices of a GEP into a static offset when all of them are
    /// constant. Otherwise scale every runtime index and sum the terms.
    pub(super) fn lower_gep(
        &mut self,
        at: InstrRef,
        inst: &Instruction,
        base: &Operand,
        indices: &[Operand],
    ) -> DfcResult<()> {
        let (port, base_offset) = self.address_of(base, at)?;
        let mut ty = match self.func.type_of(base) {
            Some(Type::Ptr { pointee, .. }) => *pointee,
            Some(other) => {
                return Err(Error::unsupported(format!(
                    "address computation on non-pointer type `{other}'"
                )));
            }
            None => return Err(Error::undefined(base.to_string().as_str())),
        };
        let mut static_off: i64 = 0;
        let mut terms: Vec<NodeIdx> = vec![];
        match base_offset {
            Offset::Static(off) => static_off = off,
            Offset::Dynamic(node) => terms.push(node),
        }
        for (k, index) in indices.iter().enumerate() {
            let index_val = self.dealias(index);
            match Step::of(&ty, k, &index_val)? {
                Step::Field { offset, field } => {
                    static_off = i64::try_from(offset)
                        .ok()
                        .and_then(|offset| static_off.checked_add(offset))
                        .ok_or_else(|| {
                            Error::unsupported(format!(
                                "offset of field {index} overflows"
                            ))
                        })?;
                    ty = field;
                }
                Step::Scale { size, elem } => {
                    match index_val.as_const() {
                        Some(c) => {
                            let idx = c.as_int().ok_or_else(|| {
                                Error::unsupported(format!(
                                    "non-integer index {index}"
                                ))
                            })?;
                            static_off = i64::try_from(size)
                                .ok()
                                .and_then(|size| idx.checked_mul(size))
                                .and_then(|term| static_off.checked_add(term))
                                .ok_or_else(|| {
                                    Error::unsupported(format!(
                                        "offset of index {index} overflows"
                                    ))
                                })?;
                        }
                        None => {
                            let node = self.operand(index, at)?;
                            terms.push(self.scale(node, size));
                        }
                    }
                    ty = elem;
                }
            }
        }
        let offset = if terms.is_empty() {
            Offset::Static(static_off)
        } else {
            if static_off != 0 {
                let datatype = if static_off < 0 {
                    Datatype::Int
                } else {
                    Datatype::UInt
                };
                let c = self.builder.add_const(
                    &static_off.to_string(),
                    static_addr_width(static_off),
                    datatype,
                );
                terms.push(c);
            }
            Offset::Dynamic(self.sum(terms))
        };
        log::debug!(
            "address of `{}' is {:?} into {}",
            inst.result.as_deref().unwrap_or("_"),
            offset,
            self.builder.design.node(port).unique_name()
        );
        if let Some(result) = &inst.result {
            let addr = Address {
                port,
                offset,
                block: at.block,
            };
            self.addresses.insert(result.clone(), addr);
            if let Offset::Dynamic(node) = offset {
                self.values.insert((result.clone(), at.block), node);
            }
        }
        Ok(())
    }

    /// Multiply `node` by the element size. Power-of-two sizes use a left
    /// shift instead of a multiplier.
    fn scale(&mut self, node: NodeIdx, size: u64) -> NodeIdx {
        if size == 1 {
            return node;
        }
        let width = self.width(node);
        let (op, amount, result_width) = match exact_log2(size) {
            Some(shift) => {
                (ArithOp::Shl, shift as u64, width + shift as u64)
            }
            None => (ArithOp::Mul, size, width + bits_to_store(size)),
        };
        let c = self.builder.add_const(
            &amount.to_string(),
            bits_to_store(amount),
            Datatype::UInt,
        );
        let scaled = self.builder.add_arith(op, result_width);
        self.builder.design.connect(node, scaled);
        self.builder.design.connect(c, scaled);
        // Indices are signed.
        self.builder.design.node_mut(scaled).sign_extend(node);
        scaled
    }

    /// Adder chain over `terms`. Every adder is one bit wider than its
    /// widest operand. Terms are two's complement, except for unsigned
    /// constants.
    fn sum(&mut self, terms: Vec<NodeIdx>) -> NodeIdx {
        let mut terms = terms.into_iter();
        let Some(mut acc) = terms.next() else {
            unreachable!("sum of no terms");
        };
        for term in terms {
            let width = self.width(acc).max(self.width(term)) + 1;
            let add = self.builder.add_arith(ArithOp::Add, width);
            for input in [acc, term] {
                self.builder.design.connect(input, add);
                if !self.is_unsigned_const(input) {
                    self.builder.design.node_mut(add).sign_extend(input);
                }
            }
            acc = add;
        }
        acc
    }

    fn is_unsigned_const(&self, node: NodeIdx) -> bool {
        matches!(
            &self.builder.design.node(node).kind,
            NodeKind::Const(ConstVal {
                datatype: Datatype::UInt,
                ..
            })
        )
    }

    pub(super) fn lower_load(
        &mut self,
        at: InstrRef,
        inst: &Instruction,
        ptr: &Operand,
    ) -> DfcResult<()> {
        let (port, offset) = self.address_of(ptr, at)?;
        let width = Self::width_of_type(&inst.ty)?;
        let idx = self.builder.add_stream_index(
            port,
            Access::Load,
            offset,
            width,
            None,
        );
        self.define(inst, at.block, idx);
        Ok(())
    }

    pub(super) fn lower_store(
        &mut self,
        at: InstrRef,
        value: &Operand,
        ptr: &Operand,
    ) -> DfcResult<()> {
        let stored = self.operand(value, at)?;
        let (port, offset) = self.address_of(ptr, at)?;
        let width = match self.func.type_of(value).and_then(|ty| ty.bit_width()) {
            Some(width) => width,
            None => self.width(stored),
        };
        self.builder.add_stream_index(
            port,
            Access::Store,
            offset,
            width,
            Some(stored),
        );
        Ok(())
    }
}
