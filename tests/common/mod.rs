//! Shared test infrastructure for integration tests.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

/// Environment variables the binary reads; cleared so the host never leaks in.
const RELAY_ENV: &[&str] = &[
    "PLM_IS_SANDBOX",
    "PLM_CREDS",
    "SF_API_VERSION",
    "METAMAN_STATE_MACHINE_ARN",
];

/// Result of one binary run.
#[derive(Debug)]
pub struct RunResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for RunResult {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl RunResult {
    pub fn stdout_json(&self) -> serde_json::Value {
        serde_json::from_str(self.stdout.trim())
            .unwrap_or_else(|err| panic!("stdout is not JSON ({err}): {}", self.stdout))
    }
}

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_metaman-relay"))
}

/// Command with the relay configuration removed from its environment.
pub fn relay_command() -> Command {
    let mut command = Command::new(binary());
    for name in RELAY_ENV {
        command.env_remove(name);
    }
    command.env("RUST_LOG", "info");
    command
}

/// Write `event` to a temp file that lives as long as the returned handle.
pub fn event_file(event: &serde_json::Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create event file");
    file.write_all(event.to_string().as_bytes())
        .expect("write event file");
    file
}

/// Run `metaman-relay invoke <function> --event <file>` with extra env vars.
pub fn invoke(function: &str, event: &serde_json::Value, env: &[(&str, &str)]) -> RunResult {
    let file = event_file(event);
    let mut command = relay_command();
    command
        .args(["invoke", function, "--event"])
        .arg(file.path());
    for (name, value) in env {
        command.env(name, value);
    }
    command.output().expect("run metaman-relay").into()
}
