//! Running a source file as a Danfe module.
//!
//! The only module-system surface is the `__module__` variable: it holds
//! `"main"` in the file handed to `danfe run` and the module's own name in
//! any file evaluated as an imported unit.

use crate::expr::Val;
use crate::interpreter::{InterpretErr, Interpreter};
use std::{
    fs, io,
    io::Write,
    path::{Path, PathBuf},
    rc::Rc,
};
use thiserror::Error;

pub const ENTRY_VARIABLE: &str = "__module__";
pub const ENTRY_NAME: &str = "main";

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("{}: {source}", path.display())]
    Program { path: PathBuf, source: InterpretErr },
}

impl RunError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Program { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub path: PathBuf,
    pub entry: bool,
}

impl Module {
    /// The file passed directly to the runner.
    pub fn entry(path: impl Into<PathBuf>) -> Self {
        Module {
            path: path.into(),
            entry: true,
        }
    }

    /// A file reached some other way than as the program's entry point.
    pub fn imported(path: impl Into<PathBuf>) -> Self {
        Module {
            path: path.into(),
            entry: false,
        }
    }

    /// Value bound to `__module__` while this module runs.
    pub fn name(&self) -> Rc<str> {
        if self.entry {
            return ENTRY_NAME.into();
        }
        match self.path.file_stem() {
            Some(stem) => stem.to_string_lossy().into(),
            None => self.path.to_string_lossy().into(),
        }
    }

    pub fn load_source(&self) -> Result<String, RunError> {
        fs::read_to_string(&self.path).map_err(|source| RunError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Binds `__module__` in the interpreter's root frame and runs `source`.
    pub fn run_source<W: Write>(
        &self,
        source: &str,
        interpreter: &mut Interpreter<W>,
    ) -> Result<(), RunError> {
        let name = self.name();
        tracing::debug!(path = %self.path.display(), module = %name, "running module");
        interpreter.define_global(ENTRY_VARIABLE, Val::Str(name));

        match interpreter.run(source) {
            Ok(_) => {
                tracing::debug!(path = %self.path.display(), "module finished");
                Ok(())
            }
            Err(err) => {
                tracing::debug!(path = %self.path.display(), error = %err, "module failed");
                Err(RunError::Program {
                    path: self.path.clone(),
                    source: err,
                })
            }
        }
    }

    /// Loads and runs this module in a fresh interpreter writing to `out`.
    pub fn run_with<W: Write>(&self, out: W, step_limit: Option<u64>) -> Result<W, RunError> {
        let source = self.load_source()?;
        let mut interpreter = Interpreter::with_output(out);
        interpreter.set_step_limit(step_limit);
        self.run_source(&source, &mut interpreter)?;
        Ok(interpreter.into_output())
    }
}

/// Runs the file at `path` as the program's entry module, printing to stdout.
pub fn run(path: &Path, step_limit: Option<u64>) -> Result<(), RunError> {
    Module::entry(path).run_with(io::stdout(), step_limit).map(|_| ())
}
