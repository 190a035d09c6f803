use std::path::PathBuf;

use thiserror::Error;

pub type ExecResult<T> = Result<T, ExecError>;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("missing program")]
    MissingProgram,
    #[error("program not found: {}", .0.display())]
    ProgramNotFound(PathBuf),
    #[error("not an executable file: {}", .0.display())]
    NotExecutable(PathBuf),
    #[error("script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),
    #[error("spawn failed: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("wait failed: {0}")]
    Wait(#[source] std::io::Error),
    #[error("cancelled")]
    Cancelled,
}
