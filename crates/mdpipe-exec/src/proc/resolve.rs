use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};

use mdpipe_model::JobTarget;

use crate::error::{ExecError, ExecResult};

/// A target resolved to a concrete program and argv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

/// Resolve `target` against `base` (the job working directory) and `PATH`.
///
/// Never spawns anything; an `Err` means the target is a configuration problem.
pub fn resolve(target: &JobTarget, base: &Path) -> ExecResult<Invocation> {
    match target {
        JobTarget::Program { command, args } => Ok(Invocation {
            program: resolve_program(command, base)?,
            args: args.iter().map(OsString::from).collect(),
        }),
        JobTarget::Script {
            interpreter,
            script,
            args,
        } => {
            let program = resolve_program(Path::new(interpreter), base)?;
            let script = anchor(script, base);
            if !script.is_file() {
                return Err(ExecError::ScriptNotFound(script));
            }

            let mut argv = Vec::with_capacity(args.len() + 1);
            argv.push(script.into_os_string());
            argv.extend(args.iter().map(OsString::from));
            Ok(Invocation {
                program,
                args: argv,
            })
        }
    }
}

fn resolve_program(command: &Path, base: &Path) -> ExecResult<PathBuf> {
    if command.as_os_str().is_empty() {
        return Err(ExecError::MissingProgram);
    }

    // Bare names go through PATH, anything with a separator is a path.
    if !command.is_absolute() && command.components().count() == 1 {
        return search_path(command).ok_or_else(|| ExecError::ProgramNotFound(command.to_path_buf()));
    }

    let path = anchor(command, base);
    if !path.exists() {
        return Err(ExecError::ProgramNotFound(path));
    }
    if !is_executable(&path) {
        return Err(ExecError::NotExecutable(path));
    }
    Ok(path)
}

fn anchor(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn search_path(name: &Path) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use std::{fs, os::unix::fs::PermissionsExt};

    use super::*;

    #[test]
    fn bare_name_is_found_on_path() {
        let inv = resolve(&JobTarget::program("sh").with_args(["-c", "true"]), Path::new("/")).unwrap();
        assert!(inv.program.is_absolute());
        assert!(inv.program.ends_with("sh"));
        assert_eq!(inv.args, vec![OsString::from("-c"), OsString::from("true")]);
    }

    #[test]
    fn unknown_bare_name_is_not_found() {
        let err = resolve(&JobTarget::program("mdpipe-no-such-tool-4711"), Path::new("/")).unwrap_err();
        assert!(matches!(err, ExecError::ProgramNotFound(_)));
    }

    #[test]
    fn missing_absolute_path() {
        let err = resolve(&JobTarget::program("/nonexistent/analysis"), Path::new("/")).unwrap_err();
        assert!(matches!(err, ExecError::ProgramNotFound(p) if p == Path::new("/nonexistent/analysis")));
    }

    #[test]
    fn relative_program_is_anchored_at_base() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("bin/run.sh");
        fs::create_dir_all(tool.parent().unwrap()).unwrap();
        fs::write(&tool, "#!/bin/sh\nexit 0\n").unwrap();

        let err = resolve(&JobTarget::program("bin/run.sh"), dir.path()).unwrap_err();
        assert!(matches!(err, ExecError::NotExecutable(_)));

        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        let inv = resolve(&JobTarget::program("bin/run.sh"), dir.path()).unwrap();
        assert_eq!(inv.program, tool);
    }

    #[test]
    fn script_is_passed_as_first_argument() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("01_thermo.sh"), "exit 0\n").unwrap();

        let target = JobTarget::script("sh", "01_thermo.sh").with_args(["--fast"]);
        let inv = resolve(&target, dir.path()).unwrap();

        assert!(inv.program.ends_with("sh"));
        assert_eq!(inv.args[0], dir.path().join("01_thermo.sh").into_os_string());
        assert_eq!(inv.args[1], OsString::from("--fast"));
    }

    #[test]
    fn missing_script_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(&JobTarget::script("sh", "gone.py"), dir.path()).unwrap_err();
        assert!(matches!(err, ExecError::ScriptNotFound(_)));
    }

    #[test]
    fn empty_command_is_missing() {
        let err = resolve(&JobTarget::program(""), Path::new("/")).unwrap_err();
        assert!(matches!(err, ExecError::MissingProgram));
    }
}
