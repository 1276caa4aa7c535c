//! Backend that launches each execution as an external process.
//!
//! Config options:
//! - `command` (required): program to launch
//! - `args`: whitespace-separated template; `{entry}`, `{fixture_dir}`,
//!   `{fixture_id}`, `{config}` and `{mode}` are substituted
//! - `env.<NAME>`: extra environment variables
//! - `cwd`: working directory (defaults to the fixture directory)
//! - `mode`: exported as `DH_MODE`

use super::{CancelToken, ExecutionBackend};
use crate::error::{HarnessError, Result};
use crate::model::{ExecutionConfig, ExecutionResult, FixtureDescriptor};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Default cap on captured bytes per stream.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const READ_CHUNK: usize = 8192;

/// Runs fixtures as child processes.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    max_output_bytes: usize,
}

impl Default for ProcessBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_BYTES)
    }
}

impl ProcessBackend {
    pub const KIND: &'static str = "process";

    #[must_use]
    pub const fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }

    fn build_command(fixture: &FixtureDescriptor, config: &ExecutionConfig) -> Command {
        let mode = config.mode();
        let substitute = |token: &str| {
            token
                .replace("{entry}", &fixture.entry_point)
                .replace("{fixture_dir}", &fixture.dir.to_string_lossy())
                .replace("{fixture_id}", &fixture.id)
                .replace("{config}", &config.name)
                .replace("{mode}", mode.as_str())
        };

        let program = substitute(config.option("command").unwrap_or_default());
        let mut cmd = Command::new(program);
        if let Some(template) = config.option("args") {
            cmd.args(template.split_whitespace().map(substitute));
        }
        cmd.args(&fixture.args);

        let cwd = config
            .option("cwd")
            .map_or_else(|| fixture.dir.clone(), |dir| PathBuf::from(substitute(dir)));
        cmd.current_dir(cwd)
            .env("DH_MODE", mode.as_str())
            .env("DH_CONFIG", &config.name)
            .envs(config.env_vars())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }
}

impl ExecutionBackend for ProcessBackend {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn validate(&self, config: &ExecutionConfig) -> Result<()> {
        if config.option("command").is_none() {
            return Err(HarnessError::config(format!(
                "execution config '{}' has no `command`",
                config.name
            )));
        }
        Ok(())
    }

    fn run(
        &self,
        fixture: &FixtureDescriptor,
        config: &ExecutionConfig,
        cancel: &CancelToken,
    ) -> ExecutionResult {
        if cancel.is_cancelled() {
            return ExecutionResult::cancelled(&fixture.id, &config.name);
        }

        let started = Instant::now();
        let mut cmd = Self::build_command(fixture, config);
        trace!(fixture = %fixture.id, config = %config.name, command = ?cmd, "Launching");

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(fixture = %fixture.id, config = %config.name, error = %err, "Launch failed");
                let mut result =
                    ExecutionResult::launch_failed(&fixture.id, &config.name, err.to_string());
                result.duration_ms = elapsed_ms(started);
                return result;
            }
        };

        let mut guard = ChildGuard::new(child);
        let stdout = guard.child.stdout.take().map(|s| spawn_reader(s, self.max_output_bytes));
        let stderr = guard.child.stderr.take().map(|s| spawn_reader(s, self.max_output_bytes));

        let timeout = fixture.timeout();
        let mut timed_out = false;
        let mut cancelled = false;

        let status = loop {
            match guard.child.try_wait() {
                Ok(Some(status)) => {
                    guard.reaped = true;
                    break Some(status);
                }
                Ok(None) => {
                    if started.elapsed() >= timeout {
                        timed_out = true;
                        break guard.terminate();
                    }
                    if cancel.is_cancelled() {
                        cancelled = true;
                        break guard.terminate();
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(err) => {
                    warn!(fixture = %fixture.id, config = %config.name, error = %err, "Wait failed");
                    break guard.terminate();
                }
            }
        };
        // Stragglers in the group would hold the pipes open.
        guard.kill_group();

        let (stdout, stdout_truncated) = join_reader(stdout);
        let (stderr, _) = join_reader(stderr);

        let mut result = ExecutionResult::new(&fixture.id, &config.name);
        result.duration_ms = elapsed_ms(started);
        result.stdout = stdout;
        result.stderr = stderr;
        result.stdout_truncated = stdout_truncated;
        result.timed_out = timed_out;
        result.cancelled = cancelled;

        match status {
            Some(status) => {
                let signal = exit_signal(&status);
                result.signal = signal;
                result.exit_code = signal.map_or_else(|| status.code().unwrap_or(-1), |sig| 128 + sig);
                if !timed_out && !cancelled && !status.success() {
                    result.crashed = true;
                    result.crash_signature =
                        Some(crash_signature(signal, result.exit_code, &result.stderr));
                }
            }
            None => {
                result.exit_code = -1;
                result.launch_error = Some("process status could not be collected".to_string());
            }
        }

        debug!(
            fixture = %fixture.id,
            config = %config.name,
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            timed_out,
            cancelled,
            "Execution finished"
        );
        result
    }
}

/// Reaps the child on every exit path, killing its process group first.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    const fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn kill_group(&self) {
        #[cfg(unix)]
        {
            let _ = Command::new("kill")
                .arg("-KILL")
                .arg(format!("-{}", self.child.id()))
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
        }
    }

    fn terminate(&mut self) -> Option<ExitStatus> {
        self.kill_group();
        let _ = self.child.kill();
        let status = self.child.wait().ok();
        self.reaped = status.is_some();
        status
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.terminate();
        }
    }
}

type Reader = thread::JoinHandle<(Vec<u8>, bool)>;

/// Drain `stream` on its own thread, keeping at most `cap` bytes.
fn spawn_reader<R: Read + Send + 'static>(mut stream: R, cap: usize) -> Reader {
    thread::spawn(move || {
        let mut captured = Vec::new();
        let mut truncated = false;
        let mut buf = [0_u8; READ_CHUNK];
        loop {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let room = cap.saturating_sub(captured.len());
                    if n > room {
                        truncated = true;
                    }
                    captured.extend_from_slice(&buf[..n.min(room)]);
                }
            }
        }
        (captured, truncated)
    })
}

fn join_reader(reader: Option<Reader>) -> (Vec<u8>, bool) {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Stable description of an abnormal exit.
#[must_use]
pub fn crash_signature(signal: Option<i32>, exit_code: i32, stderr: &[u8]) -> String {
    if let Some(signal) = signal {
        return format!("signal {signal}");
    }
    match exception_class(&String::from_utf8_lossy(stderr)) {
        Some(class) => format!("exit {exit_code}: {class}"),
        None => format!("exit {exit_code}"),
    }
}

/// Uncaught exception class named in a runtime's stderr, if any.
///
/// Recognises `Exception in thread "main" java.lang.ArithmeticException: / by zero`
/// and bare `java.lang.ArithmeticException: ...` lines.
#[must_use]
pub fn exception_class(stderr: &str) -> Option<String> {
    stderr.lines().find_map(|line| {
        let line = line.trim();
        let rest = line
            .strip_prefix("Exception in thread")
            .and_then(|rest| rest.trim_start().strip_prefix('"'))
            .and_then(|rest| rest.split_once('"'))
            .map_or(line, |(_, after)| after.trim_start());
        let token = rest
            .split(|c: char| c == ':' || c.is_whitespace())
            .next()?;
        let looks_like_class = token.contains('.')
            && (token.ends_with("Exception") || token.ends_with("Error"))
            && token
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '.' | '$' | '_'));
        looks_like_class.then(|| token.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_from_thread_banner() {
        let stderr = "Exception in thread \"main\" java.lang.ArithmeticException: / by zero\n\tat Main.main(Main.java:10)\n";
        assert_eq!(
            exception_class(stderr).as_deref(),
            Some("java.lang.ArithmeticException")
        );
    }

    #[test]
    fn exception_bare_line() {
        let stderr = "warning: something\njava.lang.StackOverflowError\n";
        assert_eq!(
            exception_class(stderr).as_deref(),
            Some("java.lang.StackOverflowError")
        );
        assert_eq!(exception_class("Segmentation fault"), None);
    }

    #[test]
    fn signature_prefers_signal() {
        assert_eq!(crash_signature(Some(11), 139, b""), "signal 11");
        assert_eq!(crash_signature(None, 3, b"boom"), "exit 3");
    }

    #[test]
    fn reader_caps_output() {
        let data = vec![b'x'; 100];
        let (captured, truncated) = join_reader(Some(spawn_reader(std::io::Cursor::new(data), 10)));
        assert_eq!(captured.len(), 10);
        assert!(truncated);
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use crate::backend::CancelToken;
        use std::fs;
        use tempfile::TempDir;

        fn fixture(dir: &std::path::Path, timeout_ms: u64) -> FixtureDescriptor {
            FixtureDescriptor {
                id: "probe".to_string(),
                entry_point: "pkg.Main".to_string(),
                args: vec!["threshold=10".to_string()],
                timeout_ms,
                nondeterministic_expected: false,
                category: None,
                dir: dir.to_path_buf(),
            }
        }

        fn sh_config(script: &str) -> ExecutionConfig {
            ExecutionConfig::new("baseline")
                .with_option("command", "sh")
                .with_option("args", format!("{{fixture_dir}}/{script} {{entry}} {{config}}"))
                .with_option("mode", "interpreted")
                .with_option("env.EXTRA", "yes")
        }

        fn script(dir: &std::path::Path, name: &str, body: &str) {
            fs::write(dir.join(name), format!("#!/bin/sh\n{body}\n")).unwrap();
        }

        #[test]
        fn captures_stdout_args_and_env() {
            let temp = TempDir::new().unwrap();
            script(
                temp.path(),
                "run.sh",
                "echo \"$1 $2 $3 $DH_MODE $DH_CONFIG $EXTRA\"",
            );
            let result = ProcessBackend::default().run(
                &fixture(temp.path(), 5_000),
                &sh_config("run.sh"),
                &CancelToken::new(),
            );
            assert_eq!(
                String::from_utf8_lossy(&result.stdout),
                "pkg.Main baseline threshold=10 interpreted baseline yes\n"
            );
            assert_eq!(result.exit_code, 0);
            assert!(!result.crashed);
        }

        #[test]
        fn nonzero_exit_is_crash_with_exception() {
            let temp = TempDir::new().unwrap();
            script(
                temp.path(),
                "throw.sh",
                "echo 'Exception in thread \"main\" java.lang.ArithmeticException: / by zero' >&2\nexit 1",
            );
            let result = ProcessBackend::default().run(
                &fixture(temp.path(), 5_000),
                &sh_config("throw.sh"),
                &CancelToken::new(),
            );
            assert!(result.crashed);
            assert_eq!(result.exit_code, 1);
            assert_eq!(
                result.crash_signature.as_deref(),
                Some("exit 1: java.lang.ArithmeticException")
            );
        }

        #[test]
        fn timeout_kills_process() {
            let temp = TempDir::new().unwrap();
            script(temp.path(), "hang.sh", "exec sleep 30");
            let started = Instant::now();
            let result = ProcessBackend::default().run(
                &fixture(temp.path(), 100),
                &sh_config("hang.sh"),
                &CancelToken::new(),
            );
            assert!(result.timed_out);
            assert!(!result.crashed);
            assert!(started.elapsed() < Duration::from_secs(10));
        }

        #[test]
        fn missing_program_is_launch_error() {
            let temp = TempDir::new().unwrap();
            let config = ExecutionConfig::new("baseline")
                .with_option("command", "/nonexistent/runtime-binary");
            let result = ProcessBackend::default().run(
                &fixture(temp.path(), 1_000),
                &config,
                &CancelToken::new(),
            );
            assert!(result.launch_error.is_some());
        }

        #[test]
        fn cancelled_before_start() {
            let temp = TempDir::new().unwrap();
            let token = CancelToken::new();
            token.cancel();
            let result =
                ProcessBackend::default().run(&fixture(temp.path(), 1_000), &sh_config("x.sh"), &token);
            assert!(result.cancelled);
        }

        #[test]
        fn truncates_large_output() {
            let temp = TempDir::new().unwrap();
            script(temp.path(), "big.sh", "i=0\nwhile [ $i -lt 100 ]; do echo 0123456789; i=$((i+1)); done");
            let result = ProcessBackend::new(64).run(
                &fixture(temp.path(), 5_000),
                &sh_config("big.sh"),
                &CancelToken::new(),
            );
            assert!(result.stdout_truncated);
            assert_eq!(result.stdout.len(), 64);
        }
    }
}
