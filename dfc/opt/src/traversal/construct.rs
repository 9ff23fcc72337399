use dfc_ir::DesignUnit;
use dfc_utils::DfcResult;
use itertools::Itertools;
use linked_hash_map::LinkedHashMap;

/// The value returned from parsing an option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseVal {
    Bool(bool),
    Num(i64),
}

impl ParseVal {
    pub fn bool(&self) -> bool {
        let ParseVal::Bool(b) = self else {
            panic!("Expected bool, got {self}");
        };
        *b
    }

    pub fn num(&self) -> i64 {
        let ParseVal::Num(n) = self else {
            panic!("Expected number, got {self}");
        };
        *n
    }
}

impl std::fmt::Display for ParseVal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseVal::Bool(b) => write!(f, "{b}"),
            ParseVal::Num(n) => write!(f, "{n}"),
        }
    }
}

/// Option that can be passed to a pass.
pub struct PassOpt {
    name: &'static str,
    description: &'static str,
    default: ParseVal,
    parse: fn(&str) -> Option<ParseVal>,
}

impl PassOpt {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        default: ParseVal,
        parse: fn(&str) -> Option<ParseVal>,
    ) -> Self {
        Self {
            name,
            description,
            default,
            parse,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn description(&self) -> &'static str {
        self.description
    }

    pub const fn default(&self) -> &ParseVal {
        &self.default
    }

    pub fn parse_bool(s: &str) -> Option<ParseVal> {
        match s {
            "true" => Some(ParseVal::Bool(true)),
            "false" => Some(ParseVal::Bool(false)),
            _ => None,
        }
    }

    pub fn parse_num(s: &str) -> Option<ParseVal> {
        s.parse::<i64>().ok().map(ParseVal::Num)
    }
}

/// Named things. Passes must implement this to be registered with the
/// [PassManager](crate::pass_manager::PassManager).
///
/// Kept apart from [Visitor](super::Visitor) because none of these methods
/// take `self`.
pub trait Named {
    /// The name of a pass. Is used for identifying passes.
    fn name() -> &'static str;
    /// A short description of the pass.
    fn description() -> &'static str;
    /// Options accepted through `-x <pass>:<opt>[=<value>]`.
    fn opts() -> Vec<PassOpt> {
        vec![]
    }
}

/// Construct a visitor from a [DesignUnit] before visiting its kernels.
///
/// Passes that need nothing from the design get this for free from
/// [Default].
pub trait ConstructVisitor {
    /// Values of the pass options, read from the extra options of the
    /// design. Options that were not given take their default.
    fn get_opts(design: &DesignUnit) -> LinkedHashMap<&'static str, ParseVal>
    where
        Self: Named,
    {
        let opts = Self::opts();
        let n = Self::name();
        let mut values: LinkedHashMap<&'static str, ParseVal> = design
            .extra_opts
            .iter()
            .filter_map(|opt| {
                let (pass, rest) = opt.split_once(':')?;
                if pass != n {
                    return None;
                }
                let (key, val) = match rest.split_once('=') {
                    Some((key, val)) => (key, Some(val)),
                    None => (rest, None),
                };
                let Some(opt) = opts.iter().find(|o| o.name == key) else {
                    log::warn!("Ignoring unknown option for pass `{n}`: {key}");
                    return None;
                };
                let val = match val {
                    Some(v) => {
                        let Some(parsed) = (opt.parse)(v) else {
                            log::warn!(
                                "Ignoring invalid value for option `{n}:{}`: {v}",
                                opt.name()
                            );
                            return None;
                        };
                        parsed
                    }
                    None => ParseVal::Bool(true),
                };
                Some((opt.name(), val))
            })
            .collect();

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Extra options for {n}: {}",
                values.iter().map(|(o, v)| format!("{o}->{v}")).join(", ")
            );
        }

        for opt in opts {
            if !values.contains_key(opt.name()) {
                values.insert(opt.name(), opt.default.clone());
            }
        }
        values
    }

    /// Construct the visitor using information from the design.
    fn from(design: &DesignUnit) -> DfcResult<Self>
    where
        Self: Sized;

    /// Clear the data stored in the visitor. Called after each kernel.
    fn clear_data(&mut self);
}

impl<T: Default + Sized> ConstructVisitor for T {
    fn from(_design: &DesignUnit) -> DfcResult<Self> {
        Ok(T::default())
    }

    fn clear_data(&mut self) {
        *self = T::default();
    }
}
