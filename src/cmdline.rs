//! Command line parsing for the dataflow compiler.
use argh::FromArgs;
use dfc_backend::BackendOpt;
use dfc_utils::OutputDir;
use std::path::PathBuf;

#[derive(FromArgs, Debug)]
#[argh(help_triggers("-h", "--help"))]
/// Lowers loop-free SSA kernels into dataflow hardware graphs.
pub struct Opts {
    /// input SSA program in JSON. Read from stdin when omitted
    #[argh(positional)]
    pub file: Option<PathBuf>,

    /// output directory, default is the current directory
    #[argh(option, short = 'o', long = "output", default = "OutputDir::default()")]
    pub output: OutputDir,

    /// backends to run: dot, vhdl, verilog, ir or none. Default is dot
    #[argh(option, short = 'b', long = "backend")]
    pub backend: Vec<BackendOpt>,

    /// run this pass during execution
    #[argh(option, short = 'p', long = "pass")]
    pub pass: Vec<String>,

    /// disable pass during execution
    #[argh(option, short = 'd', long = "disable-pass")]
    pub disable_pass: Vec<String>,

    /// extra options passed to the passes, as `pass:opt` or `pass:opt=val`
    #[argh(option, short = 'x', long = "extra-opt")]
    pub extra_opts: Vec<String>,

    /// list all registered passes and aliases
    #[argh(switch, long = "list-passes")]
    pub list_passes: bool,

    /// also write a Makefile rendering the Dot files
    #[argh(switch, long = "makefile")]
    pub makefile: bool,

    /// name of the top-level VHDL entity, default is `<design>_top`
    #[argh(option, long = "top")]
    pub top: Option<String>,

    /// logging level: off, error, warn, info, debug or trace
    #[argh(option, long = "log", default = "log::LevelFilter::Warn")]
    pub log_level: log::LevelFilter,
}

impl Opts {
    /// Parse the process arguments and fill in the defaults of repeatable
    /// options.
    pub fn get_opts() -> Self {
        let opts: Opts = argh::from_env();
        opts.with_defaults()
    }

    pub(crate) fn with_defaults(mut self) -> Self {
        if self.backend.is_empty() {
            self.backend.push(BackendOpt::default());
        }
        if self.pass.is_empty() {
            self.pass.push("all".to_string());
        }
        self
    }
}
