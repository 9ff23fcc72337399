//! Reading input programs.
use crate::ssa::Module;
use dfc_utils::{DfcResult, Error};
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

impl Module {
    /// Construct a module from a file or the input stream.
    /// If no file is provided, the input stream must not be a TTY.
    pub fn construct(file: &Option<PathBuf>) -> DfcResult<Self> {
        match file {
            Some(file) => Self::from_file(file),
            None => {
                if !std::io::stdin().is_terminal() {
                    Self::from_reader(std::io::stdin())
                } else {
                    Err(Error::parse_error(
                        "No file provided and terminal not a TTY",
                    ))
                }
            }
        }
    }

    /// Parse the JSON program stored at `path`.
    pub fn from_file(path: &Path) -> DfcResult<Self> {
        let time = std::time::Instant::now();
        let content = std::fs::read(path).map_err(|err| {
            Error::parse_error(format!(
                "Failed to read {}: {err}",
                path.to_string_lossy(),
            ))
        })?;
        let module = Self::from_str(std::str::from_utf8(&content)?)
            .map_err(|err| err.with_loc(path.to_string_lossy()))?;
        log::info!("Parsed `{}' in {:?}", path.to_string_lossy(), time.elapsed());
        Ok(module)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> DfcResult<Self> {
        let mut buf = String::new();
        reader
            .read_to_string(&mut buf)
            .map_err(|err| Error::parse_error(format!("Failed to read input: {err}")))?;
        Self::from_str(&buf)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(input: &str) -> DfcResult<Self> {
        serde_json::from_str(input).map_err(Error::from)
    }
}
