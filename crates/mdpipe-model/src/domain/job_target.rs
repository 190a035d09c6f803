use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Executable reference of a job.
///
/// The orchestrator never looks inside a job; a target only says which process
/// to start. Resolution (PATH lookup, existence checks) is up to the executor.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobTarget {
    /// Execute a program directly.
    Program {
        /// Bare name (looked up on `PATH`) or path to the executable.
        command: PathBuf,
        /// Command-line arguments.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
    },
    /// Execute a script file through an interpreter (`python3 script.py`).
    Script {
        /// Interpreter program, resolved like [`JobTarget::Program::command`].
        interpreter: String,
        /// Path to the script file.
        script: PathBuf,
        /// Arguments passed after the script path.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
    },
}

impl JobTarget {
    pub fn program(command: impl Into<PathBuf>) -> Self {
        JobTarget::Program {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn script(interpreter: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        JobTarget::Script {
            interpreter: interpreter.into(),
            script: script.into(),
            args: Vec::new(),
        }
    }

    /// Replace the argument list.
    pub fn with_args<I, S>(mut self, new_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let collected = new_args.into_iter().map(Into::into).collect();
        match &mut self {
            JobTarget::Program { args, .. } | JobTarget::Script { args, .. } => *args = collected,
        }
        self
    }

    /// Short symbolic identifier, for logging and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            JobTarget::Program { .. } => "program",
            JobTarget::Script { .. } => "script",
        }
    }

    pub fn args(&self) -> &[String] {
        match self {
            JobTarget::Program { args, .. } | JobTarget::Script { args, .. } => args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_args_replaces_arguments() {
        let target = JobTarget::program("sh").with_args(["-c", "exit 0"]);
        assert_eq!(target.args(), ["-c".to_string(), "exit 0".to_string()]);
        assert_eq!(target.kind(), "program");
    }

    #[test]
    fn script_serializes_camel_case() {
        let target = JobTarget::script("python3", "01_thermo.py");
        let json = serde_json::to_string(&target).unwrap();
        assert!(json.contains("\"script\""));
        assert!(!json.contains("args"));

        let back: JobTarget = serde_json::from_str(&json).unwrap();
        assert_eq!(back, target);
    }
}
