use assert_cmd::Command;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

#[derive(Debug)]
pub struct DhRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

impl DhRun {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&extract_json_payload(&self.stdout))
            .unwrap_or_else(|err| panic!("stdout is not JSON ({err}):\n{}", self.stdout))
    }

    /// The structured error printed last on stderr, after any log lines.
    pub fn stderr_json(&self) -> serde_json::Value {
        let lines: Vec<&str> = self.stderr.lines().collect();
        let start = lines
            .iter()
            .rposition(|line| *line == "{")
            .unwrap_or_else(|| panic!("stderr has no JSON error:\n{}", self.stderr));
        serde_json::from_str(&lines[start..].join("\n"))
            .unwrap_or_else(|err| panic!("stderr error is not JSON ({err}):\n{}", self.stderr))
    }
}

/// A temp directory holding a fixture root and per-invocation logs.
pub struct DhWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub log_dir: PathBuf,
}

impl DhWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().join("fixtures");
        let log_dir = temp_dir.path().join("logs");
        fs::create_dir_all(&root).expect("fixture root");
        fs::create_dir_all(&log_dir).expect("log dir");
        Self {
            temp_dir,
            root,
            log_dir,
        }
    }

    pub fn root_arg(&self) -> String {
        self.root.display().to_string()
    }
}

pub fn run_dh<I, S>(workspace: &DhWorkspace, args: I, label: &str) -> DhRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_dh_with_env(
        workspace,
        args,
        std::iter::empty::<(String, String)>(),
        label,
    )
}

pub fn run_dh_with_env<I, S, E, K, V>(
    workspace: &DhWorkspace,
    args: I,
    env_vars: E,
    label: &str,
) -> DhRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dh"));
    cmd.current_dir(workspace.temp_dir.path());
    cmd.args(args);
    cmd.env_remove("DH_ROOT");
    cmd.envs(env_vars);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "diffharness=debug");
    cmd.env("RUST_BACKTRACE", "1");
    cmd.timeout(Duration::from_secs(60));

    let start = Instant::now();
    let output = cmd.output().expect("run dh");
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_path = workspace.log_dir.join(format!("{label}.log"));
    let log_body = format!(
        "label: {label}\nstarted: {:?}\nduration: {:?}\nstatus: {}\nargs: {:?}\n\nstdout:\n{}\n\nstderr:\n{}\n",
        SystemTime::now(),
        duration,
        output.status,
        cmd.get_args().collect::<Vec<_>>(),
        stdout,
        stderr
    );
    fs::write(&log_path, log_body).expect("write log");

    DhRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}

pub fn extract_json_payload(stdout: &str) -> String {
    let lines: Vec<&str> = stdout.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            return lines[idx..].join("\n").trim().to_string();
        }
    }
    stdout.trim().to_string()
}
