use super::*;
use crate::{Access, ArithOp, CondFlag, Datatype, Offset};
use dfc_frontend::{
    AddressSpace, Argument, BasicBlock, BinOp, Constant, IntPredicate,
    Operand,
};
use dfc_utils::{ErrorKind, Id};

fn global(pointee: Type) -> Type {
    Type::ptr(pointee, AddressSpace::Global)
}

fn kernel(args: Vec<Argument>, blocks: Vec<BasicBlock>) -> Module {
    let mut module = Module::new("test");
    module.functions.push(Function {
        name: "k".into(),
        args,
        blocks,
        kernel: true,
        work_item: false,
    });
    module
}

fn lower(module: &Module) -> DesignUnit {
    ssa_to_ir_default(module).unwrap()
}

fn lower_err(module: &Module) -> ErrorKind {
    ssa_to_ir_default(module).unwrap_err().kind().clone()
}

fn count(design: &DesignUnit, pred: impl Fn(&NodeKind) -> bool) -> usize {
    design.nodes().filter(|(_, n)| pred(&n.kind)).count()
}

fn internal_ports(design: &DesignUnit) -> Vec<NodeIdx> {
    design
        .nodes()
        .filter(|(_, n)| n.kind == NodeKind::ScalarPort(PortDir::Internal))
        .map(|(idx, _)| idx)
        .collect()
}

/// The stream index of the only store in the design.
fn only_store(design: &DesignUnit) -> (NodeIdx, crate::StreamIndex) {
    let stores: Vec<_> = design
        .nodes()
        .filter_map(|(idx, n)| match &n.kind {
            NodeKind::StreamIndex(si) if si.access == Access::Store => {
                Some((idx, *si))
            }
            _ => None,
        })
        .collect();
    assert_eq!(stores.len(), 1);
    stores[0]
}

#[test]
fn store_constant_to_output_stream() {
    let module = kernel(
        vec![Argument::new("out", global(Type::i32()))],
        vec![BasicBlock::new(
            "entry",
            vec![
                Instruction::store(Operand::int(42, 32), Operand::value("out")),
                Instruction::ret(),
            ],
        )],
    );
    let design = lower(&module);
    let k = &design.kernels[0];
    assert_eq!(k.out_streams.len(), 1);
    assert!(k.in_streams.is_empty());
    let port = k.out_streams[0];
    let NodeKind::StreamPort(sp) = &design.node(port).kind else {
        panic!("expected a stream port");
    };
    assert!(sp.loads().is_empty());
    assert_eq!(sp.stores().len(), 1);
    let (store, index) = only_store(&design);
    assert_eq!(sp.stores(), vec![store]);
    assert_eq!(index.offset, Offset::Static(0));
    assert_eq!(index.port, port);
    let ins = design.node(store).ins();
    assert_eq!(ins.len(), 1);
    match &design.node(ins[0]).kind {
        NodeKind::Const(c) => assert_eq!(c.literal, "42"),
        other => panic!("store fed by {other:?}"),
    }
    assert_eq!(count(&design, |k| matches!(k, NodeKind::Mux(_))), 0);
    assert!(internal_ports(&design).is_empty());
}

#[test]
fn constant_indices_fold_into_static_offset() {
    let pair = Type::structure(vec![Type::i32(), Type::i32()]);
    let module = kernel(
        vec![Argument::new("pairs", global(pair.clone()))],
        vec![BasicBlock::new(
            "entry",
            vec![
                Instruction::gep(
                    "p",
                    global(Type::i32()),
                    Operand::value("pairs"),
                    vec![Operand::int(2, 64), Operand::int(1, 32)],
                ),
                Instruction::store(Operand::int(7, 32), Operand::value("p")),
                Instruction::ret(),
            ],
        )],
    );
    let design = lower(&module);
    let (_, index) = only_store(&design);
    assert_eq!(index.offset, Offset::Static(20));
    assert_eq!(index.addr_width, 5);
    assert_eq!(count(&design, |k| matches!(k, NodeKind::Arith(_))), 0);
}

#[test]
fn chained_geps_compose() {
    let row = Type::array(Type::i32(), 4);
    let module = kernel(
        vec![Argument::new("m", global(row))],
        vec![BasicBlock::new(
            "entry",
            vec![
                Instruction::gep(
                    "r",
                    global(Type::array(Type::i32(), 4)),
                    Operand::value("m"),
                    vec![Operand::int(1, 64)],
                ),
                Instruction::gep(
                    "e",
                    global(Type::i32()),
                    Operand::value("r"),
                    vec![Operand::int(0, 64), Operand::int(3, 64)],
                ),
                Instruction::load("v", Type::i32(), Operand::value("e")),
                Instruction::store(Operand::value("v"), Operand::value("m")),
                Instruction::ret(),
            ],
        )],
    );
    let design = lower(&module);
    let loads: Vec<_> = design
        .nodes()
        .filter_map(|(_, n)| match &n.kind {
            NodeKind::StreamIndex(si) if si.access == Access::Load => Some(*si),
            _ => None,
        })
        .collect();
    assert_eq!(loads[0].offset, Offset::Static(16 + 12));
    let k = &design.kernels[0];
    assert_eq!(k.in_streams, k.out_streams);
}

fn dynamic_index_module(elem: Type) -> Module {
    kernel(
        vec![
            Argument::new("a", global(elem.clone())),
            Argument::new("i", Type::i32()),
        ],
        vec![BasicBlock::new(
            "entry",
            vec![
                Instruction::gep(
                    "p",
                    global(elem),
                    Operand::value("a"),
                    vec![Operand::value("i")],
                ),
                Instruction::store(Operand::int(1, 32), Operand::value("p")),
                Instruction::ret(),
            ],
        )],
    )
}

#[test]
fn power_of_two_stride_uses_shift() {
    let design = lower(&dynamic_index_module(Type::i32()));
    let is = |op| move |k: &NodeKind| *k == NodeKind::Arith(op);
    assert_eq!(count(&design, is(ArithOp::Shl)), 1);
    assert_eq!(count(&design, is(ArithOp::Mul)), 0);
    let (store, index) = only_store(&design);
    let Offset::Dynamic(addr) = index.offset else {
        panic!("expected a dynamic offset");
    };
    assert_eq!(design.node(addr).kind, NodeKind::Arith(ArithOp::Shl));
    assert_eq!(design.node(addr).bitwidth(), 34);
    // The stored value comes first, the address second.
    assert_eq!(design.node(store).get_in(1), Some(addr));
}

#[test]
fn odd_stride_uses_multiplier() {
    let triple = Type::structure(vec![Type::i32(), Type::i32(), Type::i32()]);
    let design = lower(&dynamic_index_module(triple));
    let is = |op| move |k: &NodeKind| *k == NodeKind::Arith(op);
    assert_eq!(count(&design, is(ArithOp::Mul)), 1);
    assert_eq!(count(&design, is(ArithOp::Shl)), 0);
}

#[test]
fn mixed_indices_sum_with_growing_adders() {
    let pair = Type::structure(vec![Type::i32(), Type::i32()]);
    let module = kernel(
        vec![
            Argument::new("a", global(pair.clone())),
            Argument::new("i", Type::i32()),
        ],
        vec![BasicBlock::new(
            "entry",
            vec![
                Instruction::gep(
                    "p",
                    global(Type::i32()),
                    Operand::value("a"),
                    vec![Operand::value("i"), Operand::int(1, 32)],
                ),
                Instruction::store(Operand::int(1, 32), Operand::value("p")),
                Instruction::ret(),
            ],
        )],
    );
    let design = lower(&module);
    let (_, index) = only_store(&design);
    let Offset::Dynamic(addr) = index.offset else {
        panic!("expected a dynamic offset");
    };
    let add = design.node(addr);
    assert_eq!(add.kind, NodeKind::Arith(ArithOp::Add));
    // shl(i, 3) is 35 bits wide, the constant 4 needs 3 bits.
    assert_eq!(add.bitwidth(), 36);
    let NodeKind::Const(c) = &design.node(add.ins()[1]).kind else {
        panic!("expected the constant part of the offset");
    };
    assert_eq!(c.literal, "4");
}

#[test]
fn non_constant_struct_index_is_rejected() {
    let pair = Type::structure(vec![Type::i32(), Type::i32()]);
    let module = kernel(
        vec![
            Argument::new("a", global(pair)),
            Argument::new("i", Type::i32()),
        ],
        vec![BasicBlock::new(
            "entry",
            vec![
                Instruction::gep(
                    "p",
                    global(Type::i32()),
                    Operand::value("a"),
                    vec![Operand::int(0, 64), Operand::value("i")],
                ),
                Instruction::ret(),
            ],
        )],
    );
    assert!(matches!(lower_err(&module), ErrorKind::Unsupported(_)));
}

#[test]
fn values_cross_every_block_boundary() {
    let module = kernel(
        vec![
            Argument::new("out", global(Type::i32())),
            Argument::new("a", Type::i32()),
        ],
        vec![
            BasicBlock::new(
                "b0",
                vec![
                    Instruction::binary(
                        "x",
                        BinOp::Add,
                        Type::i32(),
                        Operand::value("a"),
                        Operand::int(1, 32),
                    ),
                    Instruction::br("b1"),
                ],
            ),
            BasicBlock::new("b1", vec![Instruction::br("b2")]),
            BasicBlock::new(
                "b2",
                vec![
                    Instruction::store(Operand::value("x"), Operand::value("out")),
                    Instruction::ret(),
                ],
            ),
        ],
    );
    let design = lower(&module);
    let ports = internal_ports(&design);
    assert_eq!(ports.len(), 2);
    let blocks = &design.kernels[0].blocks;
    let (b0, b1, b2) = (
        design.block(blocks[0]),
        design.block(blocks[1]),
        design.block(blocks[2]),
    );
    assert_eq!(b0.out_scalars, vec![ports[0]]);
    assert_eq!(b1.in_scalars, vec![ports[0]]);
    assert_eq!(b1.out_scalars, vec![ports[1]]);
    assert_eq!(b2.in_scalars, vec![ports[1]]);
    assert_eq!(design.node(ports[1]).ins(), &[ports[0]]);
    let (store, _) = only_store(&design);
    assert_eq!(design.node(store).ins(), &[ports[1]]);
    assert_eq!(b0.successor_flag(blocks[1]), CondFlag::None);
    assert_eq!(b0.condition, None);
}

fn triangle() -> Module {
    kernel(
        vec![
            Argument::new("out", global(Type::i32())),
            Argument::new("a", Type::i32()),
        ],
        vec![
            BasicBlock::new(
                "entry",
                vec![
                    Instruction::icmp(
                        "c",
                        IntPredicate::Slt,
                        Operand::value("a"),
                        Operand::int(0, 32),
                    ),
                    Instruction::cond_br(Operand::value("c"), "neg", "join"),
                ],
            ),
            BasicBlock::new(
                "neg",
                vec![
                    Instruction::binary(
                        "n",
                        BinOp::Sub,
                        Type::i32(),
                        Operand::int(0, 32),
                        Operand::value("a"),
                    ),
                    Instruction::br("join"),
                ],
            ),
            BasicBlock::new(
                "join",
                vec![
                    Instruction::phi(
                        "r",
                        Type::i32(),
                        vec![
                            (Operand::value("a"), "entry"),
                            (Operand::value("n"), "neg"),
                        ],
                    ),
                    Instruction::store(Operand::value("r"), Operand::value("out")),
                    Instruction::ret(),
                ],
            ),
        ],
    )
}

#[test]
fn phi_becomes_mux_selected_by_branch() {
    let design = lower(&triangle());
    let blocks = design.kernels[0].blocks.clone();
    let (entry, neg, join) = (blocks[0], blocks[1], blocks[2]);
    let muxes: Vec<_> = design
        .nodes()
        .filter(|(_, n)| matches!(n.kind, NodeKind::Mux(_)))
        .map(|(idx, _)| idx)
        .collect();
    assert_eq!(muxes.len(), 1);
    let sel = design.mux_selection(muxes[0], join);
    assert_eq!(sel.len(), 2);
    assert_eq!((sel[0].pred, sel[0].flag), (entry, CondFlag::False));
    assert_eq!((sel[1].pred, sel[1].flag), (neg, CondFlag::None));
    let cond = design.block(entry).condition.unwrap();
    assert_eq!(sel[0].condition, Some(cond));
    assert_eq!(design.node(cond).kind, NodeKind::ScalarPort(PortDir::Internal));
    assert!(design.block(entry).out_scalars.contains(&cond));
    assert_eq!(design.block(entry).successor_flag(neg), CondFlag::True);
}

#[test]
fn constants_are_created_per_use() {
    let module = kernel(
        vec![Argument::new("a", Type::i32()), Argument::new("b", Type::i32())],
        vec![BasicBlock::new(
            "entry",
            vec![
                Instruction::binary(
                    "x",
                    BinOp::SDiv,
                    Type::i32(),
                    Operand::value("a"),
                    Operand::int(5, 32),
                ),
                Instruction::binary(
                    "y",
                    BinOp::UDiv,
                    Type::i32(),
                    Operand::value("b"),
                    Operand::int(5, 32),
                ),
                Instruction::ret(),
            ],
        )],
    );
    let design = lower(&module);
    let consts = &design.kernels[0].consts;
    assert_eq!(consts.len(), 2);
    let datatypes: Vec<_> = consts
        .iter()
        .map(|c| match &design.node(*c).kind {
            NodeKind::Const(c) => c.datatype,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(datatypes, vec![crate::Datatype::Int, crate::Datatype::UInt]);
}

#[test]
fn builtins_become_kernel_inputs() {
    let call = |r| {
        Instruction::call(r, Type::i64(), "get_global_id", vec![Operand::int(0, 32)])
    };
    let module = kernel(
        vec![Argument::new("out", global(Type::i64()))],
        vec![BasicBlock::new(
            "entry",
            vec![
                call("g0"),
                call("g1"),
                Instruction::binary(
                    "s",
                    BinOp::Add,
                    Type::i64(),
                    Operand::value("g0"),
                    Operand::value("g1"),
                ),
                Instruction::store(Operand::value("s"), Operand::value("out")),
                Instruction::ret(),
            ],
        )],
    );
    let design = lower(&module);
    let inputs = &design.kernels[0].in_scalars;
    assert_eq!(inputs.len(), 1);
    assert_eq!(design.node(inputs[0]).name(), dfc_utils::Id::from("get_global_id0"));
}

#[test]
fn other_calls_are_rejected() {
    let module = kernel(
        vec![],
        vec![BasicBlock::new(
            "entry",
            vec![
                Instruction::call("b", Type::Void, "barrier", vec![]),
                Instruction::ret(),
            ],
        )],
    );
    assert!(matches!(lower_err(&module), ErrorKind::Unsupported(_)));
}

#[test]
fn loops_are_rejected() {
    let module = kernel(
        vec![],
        vec![
            BasicBlock::new("entry", vec![Instruction::br("body")]),
            BasicBlock::new("body", vec![Instruction::br("entry")]),
        ],
    );
    assert!(matches!(lower_err(&module), ErrorKind::Loop(_)));
}

#[test]
fn vectors_and_private_pointers_are_rejected() {
    let vec4 = Type::Vector {
        elem: Box::new(Type::Float),
        len: 4,
    };
    let module = kernel(
        vec![Argument::new("v", global(vec4))],
        vec![BasicBlock::new("entry", vec![Instruction::ret()])],
    );
    assert!(matches!(lower_err(&module), ErrorKind::Unsupported(_)));
    let module = kernel(
        vec![Argument::new("p", Type::ptr(Type::i32(), AddressSpace::Private))],
        vec![BasicBlock::new("entry", vec![Instruction::ret()])],
    );
    assert!(matches!(lower_err(&module), ErrorKind::Unsupported(_)));
}

#[test]
fn integer_casts_alias_their_operand() {
    let module = kernel(
        vec![
            Argument::new("out", global(Type::i64())),
            Argument::new("a", Type::i32()),
        ],
        vec![BasicBlock::new(
            "entry",
            vec![
                Instruction::cast("w", dfc_frontend::CastOp::SExt, Type::i64(), Operand::value("a")),
                Instruction::store(Operand::value("w"), Operand::value("out")),
                Instruction::ret(),
            ],
        )],
    );
    let design = lower(&module);
    let (store, _) = only_store(&design);
    assert_eq!(design.node(store).ins(), &[design.kernels[0].in_scalars[0]]);
}

#[test]
fn work_item_flag_reaches_the_kernel() {
    let mut module = kernel(
        vec![],
        vec![BasicBlock::new("entry", vec![Instruction::ret()])],
    );
    module.functions[0].work_item = true;
    module.functions.push(Function {
        name: "helper".into(),
        args: vec![],
        blocks: vec![],
        kernel: false,
        work_item: false,
    });
    let design = lower(&module);
    assert_eq!(design.kernels.len(), 1);
    assert!(design.kernels[0].is_work_item());
}

#[test]
fn unreachable_use_has_no_path() {
    let module = kernel(
        vec![Argument::new("out", global(Type::i32()))],
        vec![
            BasicBlock::new(
                "entry",
                vec![Instruction::cond_br(
                    Operand::Const(Constant::Int {
                        value: 1,
                        ty: Type::i1(),
                    }),
                    "left",
                    "right",
                )],
            ),
            BasicBlock::new(
                "left",
                vec![
                    Instruction::binary(
                        "x",
                        BinOp::Add,
                        Type::i32(),
                        Operand::int(1, 32),
                        Operand::int(2, 32),
                    ),
                    Instruction::ret(),
                ],
            ),
            BasicBlock::new(
                "right",
                vec![
                    Instruction::store(Operand::value("x"), Operand::value("out")),
                    Instruction::ret(),
                ],
            ),
        ],
    );
    assert!(matches!(lower_err(&module), ErrorKind::NoPath { .. }));
}

#[test]
fn negative_offsets_are_sign_extended() {
    let module = kernel(
        vec![
            Argument::new("out", global(Type::i32())),
            Argument::new("i", Type::i32()),
        ],
        vec![BasicBlock::new(
            "entry",
            vec![
                Instruction::gep(
                    "q",
                    global(Type::i32()),
                    Operand::value("out"),
                    vec![Operand::int(-1, 32)],
                ),
                Instruction::gep(
                    "p",
                    global(Type::i32()),
                    Operand::value("q"),
                    vec![Operand::value("i")],
                ),
                Instruction::store(Operand::int(7, 32), Operand::value("p")),
                Instruction::ret(),
            ],
        )],
    );
    let design = lower(&module);
    let (_, index) = only_store(&design);
    let Offset::Dynamic(addr) = index.offset else {
        panic!("expected a dynamic offset");
    };
    let add = design.node(addr);
    assert_eq!(add.kind, NodeKind::Arith(ArithOp::Add));
    let (shl, off) = (add.ins()[0], add.ins()[1]);
    let NodeKind::Const(c) = &design.node(off).kind else {
        panic!("expected the constant part of the offset");
    };
    assert_eq!((c.literal.as_str(), c.datatype), ("-4", Datatype::Int));
    assert!(add.sign_extends(shl));
    assert!(add.sign_extends(off));
    let i = design.kernels[0].in_scalars[0];
    assert!(design.node(shl).sign_extends(i));
}

#[test]
fn overflowing_offsets_are_rejected() {
    let module = kernel(
        vec![Argument::new("out", global(Type::i32()))],
        vec![BasicBlock::new(
            "entry",
            vec![
                Instruction::gep(
                    "p",
                    global(Type::i32()),
                    Operand::value("out"),
                    vec![Operand::int(i64::MAX, 64)],
                ),
                Instruction::store(Operand::int(7, 32), Operand::value("p")),
                Instruction::ret(),
            ],
        )],
    );
    assert!(matches!(lower_err(&module), ErrorKind::Unsupported(_)));
}

#[test]
fn signed_operators_sign_extend_their_operands() {
    let module = kernel(
        vec![
            Argument::new("out", global(Type::i32())),
            Argument::new("a", Type::i32()),
            Argument::new("b", Type::i32()),
        ],
        vec![BasicBlock::new(
            "entry",
            vec![
                Instruction::binary(
                    "q",
                    BinOp::SDiv,
                    Type::i32(),
                    Operand::value("a"),
                    Operand::value("b"),
                ),
                Instruction::binary(
                    "s",
                    BinOp::Add,
                    Type::i32(),
                    Operand::value("q"),
                    Operand::value("a"),
                ),
                Instruction::store(Operand::value("s"), Operand::value("out")),
                Instruction::ret(),
            ],
        )],
    );
    let design = lower(&module);
    let (a, b) = (design.kernels[0].in_scalars[0], design.kernels[0].in_scalars[1]);
    let find = |op| {
        design
            .nodes()
            .find(|(_, n)| n.kind == NodeKind::Arith(op))
            .map(|(idx, _)| idx)
            .unwrap()
    };
    let (div, add) = (find(ArithOp::SDiv), find(ArithOp::Add));
    assert!(design.node(div).sign_extends(a));
    assert!(design.node(div).sign_extends(b));
    assert!(!design.node(add).sign_extends(a));
    assert!(!design.node(add).sign_extends(div));
}

#[test]
fn returning_blocks_share_one_port() {
    let module = kernel(
        vec![Argument::new("a", Type::i32())],
        vec![
            BasicBlock::new(
                "entry",
                vec![
                    Instruction::icmp(
                        "c",
                        IntPredicate::Slt,
                        Operand::value("a"),
                        Operand::int(0, 32),
                    ),
                    Instruction::cond_br(Operand::value("c"), "neg", "pos"),
                ],
            ),
            BasicBlock::new(
                "neg",
                vec![Instruction::ret_value(Operand::int(0, 32))],
            ),
            BasicBlock::new(
                "pos",
                vec![Instruction::ret_value(Operand::value("a"))],
            ),
        ],
    );
    let design = lower(&module);
    let k = &design.kernels[0];
    assert_eq!(k.out_scalars.len(), 1);
    let port = design.node(k.out_scalars[0]);
    assert_eq!(port.name(), Id::from("return"));
    assert_eq!(port.bitwidth(), 32);
    let mux = port.ins()[0];
    let NodeKind::Mux(inputs) = &design.node(mux).kind else {
        panic!("expected the returned values to be joined");
    };
    let (neg, pos, exit) = (k.blocks[1], k.blocks[2], k.blocks[3]);
    assert_eq!(design.node(mux).block, Some(exit));
    assert_eq!(
        inputs.iter().map(|i| i.block).collect::<Vec<_>>(),
        vec![neg, pos]
    );
    let sel = design.mux_selection(mux, exit);
    assert!(sel.iter().all(|s| s.flag == CondFlag::None));
}

#[test]
fn single_return_feeds_the_port_directly() {
    let module = kernel(
        vec![Argument::new("a", Type::i32())],
        vec![BasicBlock::new(
            "entry",
            vec![Instruction::ret_value(Operand::value("a"))],
        )],
    );
    let design = lower(&module);
    let k = &design.kernels[0];
    assert_eq!(k.out_scalars.len(), 1);
    assert_eq!(k.blocks.len(), 1);
    assert_eq!(design.node(k.out_scalars[0]).ins(), &[k.in_scalars[0]]);
}
