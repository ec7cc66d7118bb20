//! Runs an external profiling command under a timeout.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use fuseprobe_common::ProfileError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Spawns a program, waits at most `timeout` and returns its stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Run to completion. The child is killed when `timeout` elapses.
    pub fn run(&self, timeout: Duration) -> Result<String, ProfileError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProfileError::Io(format!("failed to start `{}`: {e}", self.program)))?;

        // Drain both pipes on their own threads so a chatty child cannot block.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait_with_timeout(&mut child, timeout)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            let detail = stderr.trim();
            return Err(ProfileError::Device(if detail.is_empty() {
                format!("`{}` exited with {status}", self.program)
            } else {
                format!("`{}` exited with {status}: {detail}", self.program)
            }));
        }
        Ok(stdout)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buf) {
                tracing::warn!(error = %e, bytes = buf.len(), "failed to read profiler output");
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> Result<std::process::ExitStatus, ProfileError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if start.elapsed() >= timeout => {
                if let Err(e) = child.kill() {
                    tracing::warn!(error = %e, "failed to kill timed-out profiler process");
                }
                let _ = child.wait();
                return Err(ProfileError::Timeout(timeout));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(ProfileError::Io(e.to_string())),
        }
    }
}
