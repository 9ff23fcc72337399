//! VHDL backend. Every kernel becomes an entity in `<kernel>.vhd` and a
//! top-level wrapper in `<top>.vhd` instantiates all of them.
mod entity;
mod guard;
mod statements;

use crate::traits::Backend;
use dfc_ir::{DesignUnit, Kernel};
use dfc_opt::traversal::{BreadthFirst, DataflowOrder};
use dfc_utils::{DfcResult, Error, OutputDir};
use entity::{Interface, ident};
use itertools::Itertools;
use statements::Statements;
use std::io::{self, Write as _};
use std::time::Instant;

#[derive(Default)]
pub struct VhdlBackend;

fn write_header<F: io::Write>(float: bool, f: &mut F) -> io::Result<()> {
    writeln!(f, "library ieee;")?;
    writeln!(f, "use ieee.std_logic_1164.all;")?;
    writeln!(f, "use ieee.numeric_std.all;")?;
    if float {
        writeln!(f, "use ieee.float_pkg.all;")?;
    }
    writeln!(f)
}

impl VhdlBackend {
    /// Write the entity and architecture of kernel `kernel` into `f`.
    pub fn write_kernel<F: io::Write>(
        design: &DesignUnit,
        kernel: usize,
        f: &mut F,
    ) -> DfcResult<()> {
        let k = &design.kernels[kernel];
        let name = ident(&k.name.as_str());
        let iface = Interface::new(design, k);

        let mut stmts = Statements::new(&iface, kernel);
        let order = DataflowOrder::new(design, design.kernel_nodes(kernel))?;
        let mut bf = BreadthFirst::new(design);
        bf.extend(order.iter());
        bf.visit_all(&mut stmts, design)
            .map_err(|e| e.with_loc(format!("kernel {}", k.name)))?;
        stmts.check_complete(design)?;
        log::debug!(
            "{}: {} signals, {} statements",
            k.name,
            stmts.signal_count(),
            stmts.body.len()
        );

        write_header(stmts.uses_float, f)?;
        if k.is_work_item() {
            writeln!(f, "-- executed once per work-item")?;
        }
        writeln!(f, "entity {name} is")?;
        iface.write_ports("", f)?;
        writeln!(f, "end entity {name};\n")?;
        writeln!(f, "architecture dataflow of {name} is")?;
        for decl in &stmts.decls {
            writeln!(f, "  {decl}")?;
        }
        writeln!(f, "begin")?;
        for stmt in &stmts.body {
            writeln!(f, "  {stmt}")?;
        }
        writeln!(f, "end architecture dataflow;")?;
        Ok(())
    }

    /// Write the wrapper entity that instantiates every kernel. Kernel ports
    /// are exposed as `<kernel>_<port>` and clock and reset are shared.
    pub fn write_top<F: io::Write>(
        design: &DesignUnit,
        f: &mut F,
    ) -> DfcResult<()> {
        let top = ident(&design.top_name().as_str());
        let kernels = design
            .kernels
            .iter()
            .map(|k: &Kernel| (ident(&k.name.as_str()), Interface::new(design, k)))
            .collect_vec();

        write_header(false, f)?;
        writeln!(f, "entity {top} is")?;
        writeln!(f, "  port (")?;
        write!(f, "    clk : in std_logic;\n    rst : in std_logic")?;
        for (name, iface) in &kernels {
            for port in &iface.ports {
                write!(
                    f,
                    ";\n    {name}_{} : {} {}",
                    port.name,
                    port.dir,
                    entity::slv(port.width)
                )?;
            }
        }
        writeln!(f, "\n  );")?;
        writeln!(f, "end entity {top};\n")?;
        writeln!(f, "architecture structure of {top} is")?;
        writeln!(f, "begin")?;
        for (name, iface) in &kernels {
            writeln!(f, "  {name}_inst : entity work.{name}")?;
            writeln!(f, "    port map (")?;
            write!(f, "      clk => clk,\n      rst => rst")?;
            for port in &iface.ports {
                write!(f, ",\n      {0} => {name}_{0}", port.name)?;
            }
            writeln!(f, "\n    );")?;
        }
        writeln!(f, "end architecture structure;")?;
        Ok(())
    }
}

impl Backend for VhdlBackend {
    fn name(&self) -> &'static str {
        "vhdl"
    }

    fn validate(design: &DesignUnit) -> DfcResult<()> {
        let top = ident(&design.top_name().as_str());
        let names = design
            .kernels
            .iter()
            .map(|k| ident(&k.name.as_str()))
            .collect_vec();
        if let Some(name) = names.iter().duplicates().next() {
            return Err(Error::misc(format!(
                "two kernels map to the VHDL entity `{name}'"
            )));
        }
        if names.contains(&top) {
            return Err(Error::misc(format!(
                "top-level entity `{top}' has the name of a kernel"
            )));
        }
        Ok(())
    }

    fn emit(design: &DesignUnit, out: &OutputDir) -> DfcResult<()> {
        for (idx, kernel) in design.kernels.iter().enumerate() {
            let time = Instant::now();
            let file = format!("{}.vhd", ident(&kernel.name.as_str()));
            let mut f = out.create(&file)?;
            Self::write_kernel(design, idx, &mut f)?;
            f.flush()?;
            log::info!("Generated `{file}` in {:?}", time.elapsed());
        }
        let time = Instant::now();
        let file = format!("{}.vhd", ident(&design.top_name().as_str()));
        let mut f = out.create(&file)?;
        Self::write_top(design, &mut f)?;
        f.flush()?;
        log::info!("Generated `{file}` in {:?}", time.elapsed());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfc_ir::{
        Access, ArithOp, Builder, CondFlag, Datatype, MuxInput, Offset,
        PortDir, Predicate,
    };
    use dfc_utils::ErrorKind;

    fn render(design: &DesignUnit, kernel: usize) -> String {
        let mut buf = Vec::new();
        VhdlBackend::write_kernel(design, kernel, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    /// `out[8] = a + 1`, with the operator added before its operands so
    /// that it has to wait for them.
    fn store_sum() -> DesignUnit {
        let mut design = DesignUnit::new("d");
        design.kernels.push(Kernel::new("k", false));
        let mut b = Builder::new(&mut design, 0);
        let entry = b.add_block("entry");
        b.set_block(Some(entry));
        let add = b.add_arith(ArithOp::Add, 33);
        let a = b.add_scalar_port("a", 32, PortDir::In);
        let one = b.add_const("1", 32, Datatype::UInt);
        b.design.connect(a, add);
        b.design.connect(one, add);
        let out = b.add_stream_port("out", 32);
        b.add_stream_index(out, Access::Store, Offset::Static(8), 33, Some(add));
        b.design.kernels[0].out_streams.push(out);
        design
    }

    #[test]
    fn kernel_entity_and_statements() {
        let text = render(&store_sum(), 0);
        assert!(text.starts_with("library ieee;\nuse ieee.std_logic_1164.all;"));
        assert!(!text.contains("float_pkg"));
        assert!(text.contains("entity k is\n  port (\n    clk : in std_logic;"));
        assert!(text.contains("    a_1 : in std_logic_vector(31 downto 0);"));
        assert!(text.contains("    out_3_st0_addr : out std_logic_vector(3 downto 0);"));
        assert!(text.contains("    out_3_st0_data : out std_logic_vector(32 downto 0)\n  );"));
        assert!(text.contains("  signal add_0 : std_logic_vector(32 downto 0);"));
        assert!(text.contains("  n_1_2 <= \"00000000000000000000000000000001\";"));
        assert!(text.contains(
            "  add_0 <= std_logic_vector(resize(unsigned(a_1), 33) + resize(unsigned(n_1_2), 33));"
        ));
        assert!(text.contains("  out_3_st0_addr <= \"1000\";"));
        assert!(text.contains("  out_3_st0_data <= add_0;"));
        assert!(text.ends_with("end architecture dataflow;\n"));
    }

    #[test]
    fn operators_follow_their_opcode() {
        let mut design = DesignUnit::new("d");
        design.kernels.push(Kernel::new("k", false));
        let mut b = Builder::new(&mut design, 0);
        let x = b.add_scalar_port("x", 8, PortDir::In);
        let y = b.add_scalar_port("y", 8, PortDir::In);
        for op in [ArithOp::SDiv, ArithOp::URem, ArithOp::Xor, ArithOp::AShr] {
            let n = b.add_arith(op, 8);
            b.design.connect(x, n);
            b.design.connect(y, n);
        }
        let cmp = b.add_compare(Predicate::Slt);
        b.design.connect(x, cmp);
        b.design.connect(y, cmp);
        let text = render(&design, 0);
        assert!(text.contains("resize(signed(x_0) / signed(y_1), 8)"));
        assert!(text.contains("resize(unsigned(x_0) rem unsigned(y_1), 8)"));
        assert!(text.contains("resize(unsigned(x_0), 8) xor resize(unsigned(y_1), 8)"));
        assert!(text.contains("shift_right(resize(signed(x_0), 8), to_integer(unsigned(y_1)))"));
        assert!(text.contains("slt_6 <= \"1\" when signed(x_0) < signed(y_1) else \"0\";"));
    }

    #[test]
    fn muxes_select_on_branch_conditions() {
        let mut design = DesignUnit::new("d");
        design.kernels.push(Kernel::new("k", false));
        let mut b = Builder::new(&mut design, 0);
        let entry = b.add_block("entry");
        let then = b.add_block("then");
        let join = b.add_block("join");
        let x = b.add_scalar_port("x", 8, PortDir::In);
        let y = b.add_scalar_port("y", 8, PortDir::In);
        b.set_block(Some(entry));
        let cmp = b.add_compare(Predicate::Eq);
        b.design.connect(x, cmp);
        b.design.connect(y, cmp);
        let cond = b.add_block_output("cond", 1);
        b.design.connect(cmp, cond);
        b.design.block_mut(entry).condition = Some(cond);
        b.design.block_mut(entry).add_successor(then, CondFlag::True);
        b.design.block_mut(entry).add_successor(join, CondFlag::False);
        b.design.block_mut(then).add_successor(join, CondFlag::None);
        b.set_block(Some(join));
        let mux = b.add_mux(
            "v",
            vec![
                MuxInput { node: x, block: entry },
                MuxInput { node: y, block: then },
            ],
            8,
        );
        let out = b.add_scalar_port("o", 8, PortDir::Out);
        b.design.connect(mux, out);
        let text = render(&design, 0);
        // The input from `then` inherits the condition of `entry`.
        assert!(text.contains("v_4 <= x_0 when cond_3 = \"0\" else\n    y_1;"));
        assert!(text.contains("o_5 <= v_4;"));
    }

    #[test]
    fn nested_branches_guard_every_input() {
        let mut design = DesignUnit::new("d");
        design.kernels.push(Kernel::new("k", false));
        let mut b = Builder::new(&mut design, 0);
        let [entry, left, right, b3, b4, join] =
            ["entry", "left", "right", "b3", "b4", "join"].map(|n| b.add_block(n));
        let c0 = b.add_scalar_port("c0", 1, PortDir::In);
        let c1 = b.add_scalar_port("c1", 1, PortDir::In);
        let x2 = b.add_scalar_port("x2", 8, PortDir::In);
        let x3 = b.add_scalar_port("x3", 8, PortDir::In);
        let x4 = b.add_scalar_port("x4", 8, PortDir::In);
        b.design.block_mut(entry).condition = Some(c0);
        b.design.block_mut(entry).add_successor(left, CondFlag::True);
        b.design.block_mut(entry).add_successor(right, CondFlag::False);
        b.design.block_mut(left).condition = Some(c1);
        b.design.block_mut(left).add_successor(b3, CondFlag::True);
        b.design.block_mut(left).add_successor(b4, CondFlag::False);
        for from in [b3, b4, right] {
            b.design.block_mut(from).add_successor(join, CondFlag::None);
        }
        b.set_block(Some(join));
        let mux = b.add_mux(
            "r",
            vec![
                MuxInput { node: x3, block: b3 },
                MuxInput { node: x4, block: b4 },
                MuxInput { node: x2, block: right },
            ],
            8,
        );
        let out = b.add_scalar_port("o", 8, PortDir::Out);
        b.design.connect(mux, out);
        let text = render(&design, 0);
        assert!(text.contains(
            "r_5 <= x3_3 when c0_0 = \"1\" and c1_1 = \"1\" else\n    \
             x4_4 when c0_0 = \"1\" and c1_1 = \"0\" else\n    \
             x2_2;"
        ));
    }

    #[test]
    fn joins_after_a_diamond_are_unconditional() {
        let mut design = DesignUnit::new("d");
        design.kernels.push(Kernel::new("k", false));
        let mut b = Builder::new(&mut design, 0);
        let [entry, then, other, mid, next, join] =
            ["entry", "then", "else", "mid", "next", "join"].map(|n| b.add_block(n));
        let c0 = b.add_scalar_port("c0", 1, PortDir::In);
        let c1 = b.add_scalar_port("c1", 1, PortDir::In);
        let x = b.add_scalar_port("x", 8, PortDir::In);
        let y = b.add_scalar_port("y", 8, PortDir::In);
        b.design.block_mut(entry).condition = Some(c0);
        b.design.block_mut(entry).add_successor(then, CondFlag::True);
        b.design.block_mut(entry).add_successor(other, CondFlag::False);
        b.design.block_mut(then).add_successor(mid, CondFlag::None);
        b.design.block_mut(other).add_successor(mid, CondFlag::None);
        b.design.block_mut(mid).condition = Some(c1);
        b.design.block_mut(mid).add_successor(next, CondFlag::True);
        b.design.block_mut(mid).add_successor(join, CondFlag::False);
        b.design.block_mut(next).add_successor(join, CondFlag::None);
        b.set_block(Some(join));
        b.add_mux(
            "v",
            vec![
                MuxInput { node: x, block: mid },
                MuxInput { node: y, block: next },
            ],
            8,
        );
        let text = render(&design, 0);
        assert!(text.contains("v_4 <= x_2 when c1_1 = \"0\" else\n    y_3;"));
    }

    #[test]
    fn signed_terms_are_sign_extended() {
        let mut design = DesignUnit::new("d");
        design.kernels.push(Kernel::new("k", false));
        let mut b = Builder::new(&mut design, 0);
        // out[(i << 2) - 4] = i
        let i = b.add_scalar_port("i", 32, PortDir::In);
        let two = b.add_const("2", 2, Datatype::UInt);
        let shl = b.add_arith(ArithOp::Shl, 34);
        b.design.connect(i, shl);
        b.design.connect(two, shl);
        b.design.node_mut(shl).sign_extend(i);
        let off = b.add_const("-4", 4, Datatype::Int);
        let add = b.add_arith(ArithOp::Add, 35);
        b.design.connect(shl, add);
        b.design.connect(off, add);
        b.design.node_mut(add).sign_extend(shl);
        let out = b.add_stream_port("out", 32);
        b.add_stream_index(out, Access::Store, Offset::Dynamic(add), 32, Some(i));
        b.design.kernels[0].out_streams.push(out);
        let text = render(&design, 0);
        assert!(text.contains("n_4_3 <= \"1100\";"));
        assert!(text.contains(
            "shl_2 <= std_logic_vector(shift_left(unsigned(resize(signed(i_0), 34)), \
             to_integer(unsigned(n_2_1))));"
        ));
        assert!(text.contains(
            "add_4 <= std_logic_vector(unsigned(resize(signed(shl_2), 35)) + \
             unsigned(resize(signed(n_4_3), 35)));"
        ));
    }

    #[test]
    fn float_operators_instantiate_primitives() {
        let mut design = DesignUnit::new("d");
        design.kernels.push(Kernel::new("k", false));
        let mut b = Builder::new(&mut design, 0);
        let x = b.add_scalar_port("x", 32, PortDir::In);
        let half = b.add_const("0.5", 32, Datatype::Float);
        let mul = b.add_fp_arith(dfc_ir::FpOp::FMul, 23, 8);
        b.design.connect(x, mul);
        b.design.connect(half, mul);
        let text = render(&design, 0);
        assert!(text.contains("use ieee.float_pkg.all;"));
        assert!(text.contains(
            "n_0_5_1 <= to_slv(to_float(0.5, exponent_width => 8, fraction_width => 23));"
        ));
        assert!(text.contains("fmul_2_inst : entity work.fp_mul"));
        assert!(text.contains("generic map (MANTISSA => 23, EXPONENT => 8)"));
        assert!(text.contains("a => x_0, b => n_0_5_1, result => fmul_2"));
    }

    #[test]
    fn cyclic_kernels_are_rejected() {
        let mut design = DesignUnit::new("d");
        design.kernels.push(Kernel::new("k", false));
        let mut b = Builder::new(&mut design, 0);
        let x = b.add_arith(ArithOp::Add, 8);
        let y = b.add_arith(ArithOp::Sub, 8);
        b.design.connect(x, y);
        b.design.connect(y, x);
        let mut buf = Vec::new();
        let err = VhdlBackend::write_kernel(&design, 0, &mut buf).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Cycle(_)));
    }

    #[test]
    fn top_instantiates_every_kernel() {
        let mut design = store_sum();
        design.kernels.push(Kernel::new("other", false));
        let mut buf = Vec::new();
        VhdlBackend::write_top(&design, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("entity d_top is"));
        assert!(text.contains("    k_a_1 : in std_logic_vector(31 downto 0);"));
        assert!(text.contains("  k_inst : entity work.k\n    port map (\n      clk => clk,"));
        assert!(text.contains("      a_1 => k_a_1,"));
        assert!(text.contains("  other_inst : entity work.other"));
    }

    #[test]
    fn files_are_written_per_kernel_and_top() {
        let design = store_sum();
        let dir = tempfile::tempdir().unwrap();
        let out = OutputDir::Dir(dir.path().to_path_buf());
        VhdlBackend.run(&design, &out).unwrap();
        assert!(dir.path().join("k.vhd").exists());
        assert!(dir.path().join("d_top.vhd").exists());
    }

    #[test]
    fn top_must_not_shadow_a_kernel() {
        let mut design = store_sum();
        design.bc.top_name = Some("k".into());
        assert!(VhdlBackend::validate(&design).is_err());
    }
}
