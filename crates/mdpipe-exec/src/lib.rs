mod error;
pub use error::{ExecError, ExecResult};

pub mod utils;
pub use utils::limits::RlimitConfig;

#[cfg(feature = "proc")]
pub mod proc;
#[cfg(feature = "proc")]
pub use proc::{ExecConfig, ProcExecutor};
