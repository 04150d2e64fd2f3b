//! Process execution for the CLI backend.

use xshell::Shell;

use crate::error::DirectoryError;

/// Captured result of one process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if terminated by a signal.
    pub status: Option<i32>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed run with the given exit code and stderr.
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited with status 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external programs and captures their output.
///
/// A non-zero exit is not an error at this level; it is returned in
/// [`CommandOutput`] so the caller can classify stderr. Only a failure to
/// start the process is an error.
pub trait CommandRunner {
    /// Run `program` with `args` and wait for it to exit.
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, DirectoryError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, DirectoryError> {
        (**self).run(program, args)
    }
}

/// Runs commands through an [`xshell::Shell`].
pub struct XshellRunner {
    shell: Shell,
}

impl XshellRunner {
    /// Create a runner rooted at the current directory.
    ///
    /// # Errors
    ///
    /// Fails if the current directory cannot be determined.
    pub fn new() -> Result<Self, DirectoryError> {
        let shell = Shell::new().map_err(|e| DirectoryError::CliUnavailable(e.to_string()))?;
        Ok(Self { shell })
    }
}

impl std::fmt::Debug for XshellRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XshellRunner").finish_non_exhaustive()
    }
}

impl CommandRunner for XshellRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, DirectoryError> {
        let output = self
            .shell
            .cmd(program)
            .args(args)
            .quiet()
            .ignore_status()
            .output()
            .map_err(|e| DirectoryError::CliUnavailable(e.to_string()))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_constructors() {
        assert!(CommandOutput::ok("{}").success());
        let failed = CommandOutput::failed(1, "ERROR: boom");
        assert!(!failed.success());
        assert_eq!(failed.stderr, "ERROR: boom");
    }

    #[test]
    fn test_missing_program_is_cli_unavailable() {
        let Ok(runner) = XshellRunner::new() else {
            return;
        };
        let result = runner.run("entra-appreg-definitely-not-installed", &[]);
        assert!(matches!(result, Err(DirectoryError::CliUnavailable(_))));
    }
}
