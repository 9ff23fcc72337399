use crate::{DfcResult, Error};
use std::{
    io::{self, BufWriter},
    path::PathBuf,
    str::FromStr,
};

/// Possible choices for the place backends write their files to. Used by the
/// `-o` option to the compiler.
/// * "-" and "<out>" write every file to stdout, one after the other.
/// * "<null>" discards all output.
/// * All other strings are treated as directory paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDir {
    Null,
    Stdout,
    Dir(PathBuf),
}

impl OutputDir {
    pub fn dir(path: PathBuf) -> Self {
        OutputDir::Dir(path)
    }

    pub fn as_path_string(&self) -> String {
        match self {
            OutputDir::Null => "<null>".to_string(),
            OutputDir::Stdout => "<stdout>".to_string(),
            OutputDir::Dir(path) => path.to_string_lossy().to_string(),
        }
    }

    /// Path of the file `name` inside this directory, if it is a directory.
    pub fn path_of(&self, name: &str) -> Option<PathBuf> {
        match self {
            OutputDir::Dir(path) => Some(path.join(name)),
            OutputDir::Null | OutputDir::Stdout => None,
        }
    }

    /// Open the file `name` for writing. Creates the directory when needed.
    pub fn create(&self, name: &str) -> DfcResult<Box<dyn io::Write>> {
        match self {
            OutputDir::Stdout => {
                Ok(Box::new(BufWriter::new(std::io::stdout())))
            }
            OutputDir::Null => Ok(Box::new(io::sink())),
            OutputDir::Dir(dir) => {
                std::fs::create_dir_all(dir).map_err(|err| {
                    Error::write_error(format!(
                        "cannot create directory {}: {err}",
                        dir.display()
                    ))
                })?;
                let path = dir.join(name);
                let file = std::fs::File::create(&path).map_err(|err| {
                    Error::write_error(format!(
                        "cannot open {}: {err}",
                        path.display()
                    ))
                })?;
                Ok(Box::new(BufWriter::new(file)))
            }
        }
    }
}

impl Default for OutputDir {
    fn default() -> Self {
        OutputDir::Dir(PathBuf::from("."))
    }
}

impl FromStr for OutputDir {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "-" | "<out>" => Ok(OutputDir::Stdout),
            "<null>" => Ok(OutputDir::Null),
            _ => Ok(OutputDir::dir(PathBuf::from(s))),
        }
    }
}

impl std::fmt::Display for OutputDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputDir::Stdout => write!(f, "-"),
            OutputDir::Null => write!(f, "<null>"),
            OutputDir::Dir(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_special_names() {
        assert_eq!("-".parse::<OutputDir>(), Ok(OutputDir::Stdout));
        assert_eq!("<null>".parse::<OutputDir>(), Ok(OutputDir::Null));
        assert_eq!(
            "build/hw".parse::<OutputDir>(),
            Ok(OutputDir::Dir(PathBuf::from("build/hw")))
        );
        assert_eq!(OutputDir::Null.path_of("a.dot"), None);
    }
}
