use itertools::Itertools;
use std::str::FromStr;

/// Enumeration of valid backends
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOpt {
    #[default]
    Dot,
    Vhdl,
    Verilog,
    Ir,
    None,
}

/// Return a vector that maps strings to Backends.
#[inline(always)]
fn backends() -> Vec<(&'static str, BackendOpt)> {
    vec![
        ("dot", BackendOpt::Dot),
        ("vhdl", BackendOpt::Vhdl),
        ("verilog", BackendOpt::Verilog),
        ("ir", BackendOpt::Ir),
        ("none", BackendOpt::None),
    ]
}

/// Command line parsing for the Backend enum
impl FromStr for BackendOpt {
    type Err = String;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let backends = backends();
        if let Some((_, opt)) = backends.iter().find(|(name, _)| *name == input) {
            return Ok(*opt);
        }
        let backend_str = backends.iter().map(|(name, _)| *name).join(", ");
        Err(format!(
            "`{input}` is not a valid backend.\nValid backends: {backend_str}"
        ))
    }
}

impl std::fmt::Display for BackendOpt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Dot => "dot",
            Self::Vhdl => "vhdl",
            Self::Verilog => "verilog",
            Self::Ir => "ir",
            Self::None => "none",
        };
        f.write_str(name)
    }
}
