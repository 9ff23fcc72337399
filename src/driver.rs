//! Driver for the dataflow compiler.
use crate::cmdline::Opts;
use dfc_backend::{
    Backend, BackendOpt, DotBackend, IrBackend, VerilogBackend, VhdlBackend,
    write_makefile,
};
use dfc_frontend::Module;
use dfc_ir::{self as ir, DesignUnit};
use dfc_opt::pass_manager::PassManager;
use dfc_utils::{DfcResult, Id, OutputDir};

/// Run a single backend over the design.
pub fn run_backend(
    backend: BackendOpt,
    design: &DesignUnit,
    out: &OutputDir,
) -> DfcResult<()> {
    match backend {
        BackendOpt::Dot => DotBackend.run(design, out),
        BackendOpt::Vhdl => VhdlBackend.run(design, out),
        BackendOpt::Verilog => VerilogBackend.run(design, out),
        BackendOpt::Ir => IrBackend.run(design, out),
        BackendOpt::None => Ok(()),
    }
}

/// Lower `module`, run the pass plan and every requested backend.
pub fn compile(module: &Module, opts: &Opts) -> DfcResult<DesignUnit> {
    let pm = PassManager::default_passes()?;

    let mut design = ir::from_ssa::ssa_to_ir_default(module)?;
    // Configuration for the backends
    design.bc = ir::BackendConf {
        top_name: opts.top.as_deref().map(Id::new),
        emit_makefile: opts.makefile,
    };
    // Extra options for the passes
    design.extra_opts = opts.extra_opts.clone();

    pm.execute_plan(&mut design, &opts.pass, &opts.disable_pass)?;

    for backend in &opts.backend {
        log::info!("Running backend `{backend}'");
        run_backend(*backend, &design, &opts.output)?;
    }
    if design.bc.emit_makefile {
        write_makefile(&opts.output)?;
    }
    Ok(design)
}

/// Run the compiler from the command line.
pub fn run_compiler() -> DfcResult<()> {
    // parse the command line arguments into Opts struct
    let opts = Opts::get_opts();

    // enable tracing
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    // list all the avaliable pass options when flag --list-passes is enabled
    if opts.list_passes {
        let pm = PassManager::default_passes()?;
        println!("{}", pm.complete_help());
        return Ok(());
    }

    let module = Module::construct(&opts.file)?;
    compile(&module, &opts)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use argh::FromArgs;
    use dfc_frontend::{
        AddressSpace, Argument, BasicBlock, BinOp, Function, Instruction,
        Operand, Type,
    };

    fn add_one() -> Module {
        let entry = BasicBlock::new(
            "entry",
            vec![
                Instruction::binary(
                    "sum",
                    BinOp::Add,
                    Type::i32(),
                    Operand::value("a"),
                    Operand::int(1, 32),
                ),
                Instruction::store(Operand::value("sum"), Operand::value("out")),
                Instruction::ret(),
            ],
        );
        let mut module = Module::new("m");
        module.functions.push(Function {
            name: "k".into(),
            args: vec![
                Argument::new("a", Type::i32()),
                Argument::new("out", Type::ptr(Type::i32(), AddressSpace::Global)),
            ],
            blocks: vec![entry],
            kernel: true,
            work_item: false,
        });
        module
    }

    /// `out[i - 1] = 7`, through two address computations.
    fn negative_offset() -> Module {
        let out_ty = Type::ptr(Type::i32(), AddressSpace::Global);
        let entry = BasicBlock::new(
            "entry",
            vec![
                Instruction::gep(
                    "q",
                    out_ty.clone(),
                    Operand::value("out"),
                    vec![Operand::int(-1, 32)],
                ),
                Instruction::gep(
                    "p",
                    out_ty.clone(),
                    Operand::value("q"),
                    vec![Operand::value("i")],
                ),
                Instruction::store(Operand::int(7, 32), Operand::value("p")),
                Instruction::ret(),
            ],
        );
        let mut module = Module::new("m");
        module.functions.push(Function {
            name: "k".into(),
            args: vec![
                Argument::new("out", out_ty),
                Argument::new("i", Type::i32()),
            ],
            blocks: vec![entry],
            kernel: true,
            work_item: false,
        });
        module
    }

    fn opts(dir: &std::path::Path, extra: &[&str]) -> Opts {
        let out = dir.to_string_lossy().to_string();
        let mut args = vec!["-o", out.as_str()];
        args.extend_from_slice(extra);
        Opts::from_args(&["dfc"], &args).unwrap().with_defaults()
    }

    #[test]
    fn every_backend_writes_its_files() {
        let dir = tempfile::tempdir().unwrap();
        let opts = opts(
            dir.path(),
            &["-b", "dot", "-b", "vhdl", "-b", "ir", "--makefile", "--top", "chip"],
        );
        compile(&add_one(), &opts).unwrap();
        for file in ["k.dot", "k.vhd", "chip.vhd", "m.ir", "Makefile"] {
            assert!(dir.path().join(file).exists(), "missing {file}");
        }
    }

    #[test]
    fn negative_offsets_stay_negative_in_vhdl() {
        let dir = tempfile::tempdir().unwrap();
        let opts = opts(dir.path(), &["-b", "vhdl"]);
        compile(&negative_offset(), &opts).unwrap();
        let text = std::fs::read_to_string(dir.path().join("k.vhd")).unwrap();
        assert!(text.contains("n_4_4 <= \"1100\";"));
        assert!(text.contains("shift_left(unsigned(resize(signed(i_1), 34))"));
        assert!(text.contains(
            "add_5 <= std_logic_vector(unsigned(resize(signed(shl_3), 35)) + \
             unsigned(resize(signed(n_4_4), 35)));"
        ));
    }

    #[test]
    fn none_backend_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let opts = opts(dir.path(), &["-b", "none", "-p", "none"]);
        compile(&add_one(), &opts).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn unknown_passes_abort() {
        let dir = tempfile::tempdir().unwrap();
        let opts = opts(dir.path(), &["-p", "no-such-pass"]);
        assert!(compile(&add_one(), &opts).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
