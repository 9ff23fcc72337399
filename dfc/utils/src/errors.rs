//! Errors generated by the compiler.
use crate::Id;
use thiserror::Error as ThisError;

/// Convience wrapper to represent success or meaningul compiler error.
pub type DfcResult<T> = std::result::Result<T, Error>;

/// Errors generated by the compiler.
/// The kind is boxed so that results stay small on the happy path.
#[derive(Clone)]
pub struct Error {
    kind: Box<ErrorKind>,
    /// Where the error happened, e.g. `kernel foo, block entry`.
    loc: Option<String>,
}

/// The different classes of compiler errors.
#[derive(ThisError, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The control-flow graph of a kernel contains a back edge.
    #[error("loop detected: back edge into block `{0}'. Loops must be unrolled before lowering")]
    Loop(Id),
    /// The program uses a construct that has no dataflow lowering.
    #[error("unsupported construct: {0}")]
    Unsupported(String),
    /// A value is used but never defined.
    #[error("undefined value `{0}'")]
    UndefinedValue(Id),
    /// A value is used in a block that no control-flow path from its
    /// definition reaches.
    #[error("no control-flow path carries `{value}' from `{from}' to `{to}'")]
    NoPath { value: Id, from: Id, to: Id },
    /// The dataflow graph violates a structural invariant.
    #[error("malformed graph: {0}")]
    Malformed(String),
    /// A retry traversal went through its whole queue without progress.
    #[error("traversal stalled: {0}")]
    Stalled(String),
    /// The dataflow graph is not acyclic.
    #[error("cycle in dataflow graph through `{0}'")]
    Cycle(String),
    /// The input program could not be read.
    #[error("parse error: {0}")]
    Parse(String),
    /// An output resource could not be written.
    #[error("write error: {0}")]
    Write(String),
    /// Miscellaneous error message.
    #[error("{0}")]
    Misc(String),
}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
            loc: None,
        }
    }

    /// Attach a location to this error. The innermost location wins so that
    /// the most specific context is reported.
    pub fn with_loc<S: ToString>(mut self, loc: S) -> Self {
        if self.loc.is_none() {
            self.loc = Some(loc.to_string());
        }
        self
    }

    pub fn loop_detected<S: Into<Id>>(block: S) -> Self {
        Self::new(ErrorKind::Loop(block.into()))
    }
    pub fn unsupported<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Unsupported(msg.to_string()))
    }
    pub fn undefined<S: Into<Id>>(value: S) -> Self {
        Self::new(ErrorKind::UndefinedValue(value.into()))
    }
    pub fn no_path<V, F, T>(value: V, from: F, to: T) -> Self
    where
        V: Into<Id>,
        F: Into<Id>,
        T: Into<Id>,
    {
        Self::new(ErrorKind::NoPath {
            value: value.into(),
            from: from.into(),
            to: to.into(),
        })
    }
    pub fn malformed<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Malformed(msg.to_string()))
    }
    pub fn stalled<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Stalled(msg.to_string()))
    }
    pub fn cycle<S: ToString>(node: S) -> Self {
        Self::new(ErrorKind::Cycle(node.to_string()))
    }
    pub fn parse_error<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Parse(msg.to_string()))
    }
    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Write(msg.to_string()))
    }
    pub fn misc<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Misc(msg.to_string()))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn location(&self) -> Option<&str> {
        self.loc.as_deref()
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.loc {
            Some(loc) => write!(f, "[{loc}] {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

// Conversions from other error types to our error type so that
// we can use `?` in all the places.
impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::parse_error(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::write_error(format!("IO Error: {err}"))
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Error::write_error(format!("formatting failed: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::parse_error(err)
    }
}
