use std::io::Read;
use std::process::Command;

use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::invocation::Invocation;
use crate::verdict::Verdict;

/// Captured output and exit status of one probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// stdout and stderr merged through a single pipe, in write order.
    pub combined: Vec<u8>,
    pub exit_code: i32,
}

/// A finished run: what the child produced and how it was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub result: ExecutionResult,
    pub verdict: Verdict,
}

/// Extract an exit code from a process status, mapping signals to 128+N on Unix.
///
/// A probe that aborts on heap corruption (SIGABRT) therefore reports 134.
fn exit_code_from_status(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status
            .code()
            .unwrap_or_else(|| status.signal().map_or(1, |s| 128 + s))
    }
    #[cfg(not(unix))]
    {
        status.code().unwrap_or(1)
    }
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(line);
    cmd
}

/// Build the child command for `argv`.
///
/// In shell mode the words are joined with single spaces and handed to the
/// platform shell unescaped, so `"exit 134"` works as a single argument.
fn build_command(argv: &[String], shell: bool) -> Result<(String, Command), ProbeError> {
    let (program, args) = argv.split_first().ok_or(ProbeError::EmptyCommand)?;
    if shell {
        let line = argv.join(" ");
        let cmd = shell_command(&line);
        return Ok((line, cmd));
    }
    let mut cmd = Command::new(program);
    cmd.args(args);
    Ok((program.clone(), cmd))
}

/// Spawn `command` with stderr pointed at the same pipe as stdout, read the
/// pipe to EOF and wait for the child.
fn run_merged(mut command: Command, program: &str) -> Result<ExecutionResult, ProbeError> {
    let capture_err = |source: std::io::Error| ProbeError::Capture {
        program: program.to_string(),
        source,
    };

    let (mut reader, writer) = std::io::pipe().map_err(capture_err)?;
    let stderr_writer = writer.try_clone().map_err(capture_err)?;
    command.stdout(writer).stderr(stderr_writer);

    let spawned = command.spawn();
    // The Command still owns our copies of the write end; drop it or the
    // read below never sees EOF.
    drop(command);
    let mut child = spawned.map_err(|source| ProbeError::Launch {
        program: program.to_string(),
        source,
    })?;

    let mut combined = Vec::new();
    reader.read_to_end(&mut combined).map_err(capture_err)?;
    let status = child.wait().map_err(capture_err)?;

    Ok(ExecutionResult {
        combined,
        exit_code: exit_code_from_status(status),
    })
}

/// Execute `argv` and capture its combined output.
///
/// Blocks until the child exits. There is no timeout.
///
/// # Errors
///
/// Returns [`ProbeError::EmptyCommand`] for an empty `argv`,
/// [`ProbeError::Launch`] if the program cannot be spawned, and
/// [`ProbeError::Capture`] if reading its output or waiting fails.
pub fn execute(argv: &[String], shell: bool) -> Result<ExecutionResult, ProbeError> {
    let (program, command) = build_command(argv, shell)?;
    tracing::debug!(program = %program, args = ?argv.get(1..), shell, "spawning probe");
    let result = run_merged(command, &program)?;
    tracing::debug!(
        exit_code = result.exit_code,
        bytes = result.combined.len(),
        "probe exited"
    );
    Ok(result)
}

/// Runs a probe once and classifies its exit code.
#[derive(Debug, Clone)]
pub struct Runner {
    benign_exit_codes: Vec<i32>,
    shell: bool,
}

impl Runner {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            benign_exit_codes: config.benign_exit_codes.clone(),
            shell: config.shell,
        }
    }

    /// Launch the invocation's command, wait for it and classify the result.
    ///
    /// # Errors
    ///
    /// Propagates [`execute`] errors. A launch failure produces no verdict.
    pub fn run(&self, invocation: &Invocation) -> Result<Outcome, ProbeError> {
        let result = execute(&invocation.command, self.shell)?;
        let verdict = Verdict::classify(result.exit_code, &self.benign_exit_codes);
        Ok(Outcome { result, verdict })
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(ToString::to_string).collect()
    }

    fn sh(script: &str) -> Vec<String> {
        argv(&["sh", "-c", script])
    }

    // --- execute ---

    #[test]
    fn execute_captures_stdout() {
        let result = execute(&argv(&["echo", "hello"]), false).unwrap();
        assert_eq!(result.combined, b"hello\n");
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn execute_specific_exit_code() {
        let result = execute(&sh("exit 42"), false).unwrap();
        assert_eq!(result.exit_code, 42);
    }

    #[test]
    fn execute_merges_stderr_in_order() {
        let result = execute(
            &sh("echo out1; echo err1 >&2; echo out2; echo err2 >&2"),
            false,
        )
        .unwrap();
        assert_eq!(result.combined, b"out1\nerr1\nout2\nerr2\n");
    }

    #[test]
    fn execute_preserves_bytes_verbatim() {
        let result = execute(&sh("printf 'a\\r\\nb\\377'"), false).unwrap();
        assert_eq!(result.combined, b"a\r\nb\xff");
    }

    #[test]
    fn execute_empty_command() {
        let err = execute(&[], false).unwrap_err();
        assert!(matches!(err, ProbeError::EmptyCommand));
        assert!(err.is_launch_failure());
    }

    #[test]
    fn execute_nonexistent_command() {
        let err = execute(&argv(&["nonexistent_cmd_xyz"]), false).unwrap_err();
        assert!(matches!(err, ProbeError::Launch { .. }), "got {err:?}");
    }

    #[test]
    fn execute_args_are_not_shell_interpreted() {
        let result = execute(&argv(&["echo", "a;", "echo", "b"]), false).unwrap();
        assert_eq!(result.combined, b"a; echo b\n");
    }

    #[test]
    fn execute_signal_exit_code() {
        // SIGABRT = 6, expected exit code = 128 + 6 = 134
        let result = execute(&sh("kill -ABRT $$"), false).unwrap();
        assert_eq!(result.exit_code, 134);
    }

    // --- shell mode ---

    #[test]
    fn shell_mode_joins_words() {
        let result = execute(&argv(&["echo", "hello;", "exit", "3"]), true).unwrap();
        assert_eq!(result.combined, b"hello\n");
        assert_eq!(result.exit_code, 3);
    }

    #[test]
    fn shell_mode_missing_program_is_exit_127() {
        let result = execute(&argv(&["nonexistent_cmd_xyz"]), true).unwrap();
        assert_eq!(result.exit_code, 127);
    }

    // --- Runner ---

    #[test]
    fn runner_classifies_exit_codes() {
        let runner = Runner::new(&ProbeConfig::default());
        for (script, expected) in [
            ("exit 0", Verdict::NotVulnerable),
            ("exit 1", Verdict::NotVulnerable),
            ("exit 134", Verdict::Vulnerable(134)),
        ] {
            let outcome = runner.run(&Invocation::new(None, sh(script))).unwrap();
            assert_eq!(outcome.verdict, expected, "{script}");
        }
    }

    #[test]
    fn runner_is_repeatable() {
        let runner = Runner::new(&ProbeConfig::default());
        let inv = Invocation::new(None, sh("echo probe; exit 7"));
        let first = runner.run(&inv).unwrap();
        let second = runner.run(&inv).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn runner_honours_custom_benign_codes() {
        let config = ProbeConfig {
            benign_exit_codes: vec![0],
            ..ProbeConfig::default()
        };
        let outcome = Runner::new(&config)
            .run(&Invocation::new(None, sh("exit 1")))
            .unwrap();
        assert_eq!(outcome.verdict, Verdict::Vulnerable(1));
    }
}
