//! Subprocess seam: run an external tool and get a structured outcome.
//!
//! The [`CommandRunner`] trait is the only place bookpress touches another
//! process. Callers hand over a program name and an argument vector; no shell
//! is involved anywhere, so there is no quoting or word-splitting to get
//! wrong. The call blocks until the tool exits and returns a [`RunOutput`]
//! with the exit code and captured streams.
//!
//! The production implementation is [`ProcessRunner`]. Tests use the
//! recording mock in [`tests`], so every command a step would run can be
//! asserted on without pandoc or esbuild installed.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    /// The tool could not be started at all (binary missing, permissions).
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },
}

/// Render an exit code for error messages: `exit code 3`, or a note that
/// the process died to a signal.
pub fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "killed by signal".to_string(),
    }
}

/// Structured outcome of one tool invocation.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// An all-quiet success, the mock default.
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Trait for running external tools.
///
/// One blocking call per invocation. A non-zero exit is not an `Err`: the
/// caller inspects [`RunOutput::success`] and decides how to report it.
/// Only a spawn-level failure (the binary cannot be started) is an error.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<RunOutput, ExecError>;
}

/// Real runner over [`std::process::Command`].
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<RunOutput, ExecError> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|source| ExecError::Launch {
                program: program.to_string(),
                source,
            })?;

        Ok(RunOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// One recorded invocation, for assertions in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Mock runner that records invocations without executing anything.
    ///
    /// Scripted results are popped front-to-back; when the script runs out,
    /// every further invocation succeeds quietly.
    #[derive(Default)]
    pub struct MockRunner {
        pub results: Mutex<VecDeque<Result<RunOutput, String>>>,
        pub invocations: Mutex<Vec<Invocation>>,
    }

    impl MockRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the next invocations to return these outputs in order.
        pub fn with_outputs(outputs: Vec<RunOutput>) -> Self {
            Self {
                results: Mutex::new(outputs.into_iter().map(Ok).collect()),
                invocations: Mutex::new(Vec::new()),
            }
        }

        /// Script the next invocation to fail at spawn time.
        pub fn with_launch_failure(message: &str) -> Self {
            let mut results = VecDeque::new();
            results.push_back(Err(message.to_string()));
            Self {
                results: Mutex::new(results),
                invocations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_invocations(&self) -> Vec<Invocation> {
            self.invocations.lock().unwrap().clone()
        }
    }

    impl CommandRunner for MockRunner {
        fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<RunOutput, ExecError> {
            self.invocations.lock().unwrap().push(Invocation {
                program: program.to_string(),
                args: args.to_vec(),
                cwd: cwd.to_path_buf(),
            });

            match self.results.lock().unwrap().pop_front() {
                Some(Ok(output)) => Ok(output),
                Some(Err(message)) => Err(ExecError::Launch {
                    program: program.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, message),
                }),
                None => Ok(RunOutput::ok()),
            }
        }
    }

    #[test]
    fn mock_records_invocation() {
        let runner = MockRunner::new();
        let output = runner
            .run(
                "pandoc",
                &["--version".to_string()],
                Path::new("/tmp/book"),
            )
            .unwrap();
        assert!(output.success());

        let invocations = runner.get_invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].program, "pandoc");
        assert_eq!(invocations[0].args, vec!["--version".to_string()]);
        assert_eq!(invocations[0].cwd, Path::new("/tmp/book"));
    }

    #[test]
    fn mock_pops_scripted_outputs_in_order() {
        let runner = MockRunner::with_outputs(vec![
            RunOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: "boom".to_string(),
            },
            RunOutput::ok(),
        ]);

        let first = runner.run("pandoc", &[], Path::new(".")).unwrap();
        assert_eq!(first.code, Some(1));
        assert_eq!(first.stderr, "boom");

        let second = runner.run("pandoc", &[], Path::new(".")).unwrap();
        assert!(second.success());
    }

    #[test]
    fn mock_launch_failure_is_exec_error() {
        let runner = MockRunner::with_launch_failure("no such binary");
        let result = runner.run("pandoc", &[], Path::new("."));
        assert!(matches!(result, Err(ExecError::Launch { .. })));
    }

    #[test]
    fn process_runner_captures_exit_code() {
        // `false` exists on every unix CI box this runs on.
        let runner = ProcessRunner::new();
        let output = runner.run("false", &[], Path::new(".")).unwrap();
        assert_eq!(output.code, Some(1));
        assert!(!output.success());
    }

    #[test]
    fn process_runner_missing_binary_is_launch_error() {
        let runner = ProcessRunner::new();
        let result = runner.run("bookpress-no-such-tool", &[], Path::new("."));
        assert!(matches!(result, Err(ExecError::Launch { .. })));
    }
}
