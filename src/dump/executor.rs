use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{DumpError, Result};

/// Upper bound on a single dump pipeline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Runs an assembled shell script.
pub trait CommandRunner {
    /// Runs the script to completion and returns its stdout.
    fn run(&self, script: &str) -> impl Future<Output = Result<String>> + Send;
}

// This is the runner backed by `sh -c`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    /// Shell used to interpret the script
    shell: String,
    /// Time after which the pipeline is killed
    timeout: Duration,
}

impl ShellRunner {
    pub fn new() -> Self {
        ShellRunner {
            shell: "sh".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ShellRunner {
    async fn run(&self, script: &str) -> Result<String> {
        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The shell leads its own group so the whole pipeline can be killed.
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(DumpError::Spawn)?;
        let pid = child.id();
        debug!(pid = ?pid, "Shell started");

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(DumpError::Spawn)?,
            Err(_) => {
                // Pipeline stages outlive the shell; kill the whole group.
                kill_process_group(pid);
                warn!(pid = ?pid, "Shell killed after {:?}", self.timeout);
                return Err(DumpError::Timeout(self.timeout));
            }
        };

        if !output.status.success() {
            debug!(status = ?output.status.code(), "Shell failed");
            return Err(DumpError::Execution(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pgid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(pgid, error = %std::io::Error::last_os_error(), "Failed to kill process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
