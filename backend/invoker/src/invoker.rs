use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};

use cligate_core::{Engine, ExecutionMode, FragmentSender, FragmentStream, GateError};

use crate::fragments::Utf8Carry;

/// Read size for stdout. Fragment boundaries are whatever the pipe delivers;
/// nothing downstream may rely on them.
const READ_BUF_SIZE: usize = 4096;

/// Capacity of the fragment channel between the pump task and the consumer.
const FRAGMENT_BUFFER: usize = 32;

/// Budget for the `--version` health probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// How the external CLI is launched.
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Command name or path of the CLI binary.
    pub command: String,
    /// Arguments for current-mode invocations.
    pub args_current: Vec<String>,
    /// Arguments for general-mode invocations.
    pub args_general: Vec<String>,
    /// Wall-clock budget per invocation, measured from launch.
    pub timeout: Duration,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            command: "aicli".to_string(),
            args_current: vec!["--mode".into(), "current".into(), "--print".into()],
            args_general: vec!["--mode".into(), "general".into(), "--print".into()],
            timeout: Duration::from_secs(60),
        }
    }
}

/// Launches one external process per invocation and exposes its stdout as a
/// fragment stream. Invocations share nothing with each other.
pub struct CliInvoker {
    config: InvokerConfig,
}

impl CliInvoker {
    pub fn new(config: InvokerConfig) -> Self {
        Self { config }
    }

    fn args_for(&self, mode: ExecutionMode) -> &[String] {
        match mode {
            ExecutionMode::Current => &self.config.args_current,
            ExecutionMode::General => &self.config.args_general,
        }
    }

    /// Launch the CLI in the given mode and stream its output.
    ///
    /// The returned stream yields fragments in read order; a timeout or
    /// nonzero exit arrives as the final `Err` item. Dropping the stream
    /// kills the child.
    pub async fn invoke(
        &self,
        mode: ExecutionMode,
        prompt: &str,
    ) -> Result<FragmentStream, GateError> {
        let mut child = Command::new(&self.config.command)
            .args(self.args_for(mode))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                GateError::execution(format!("failed to launch {}: {e}", self.config.command))
            })?;

        debug!(command = %self.config.command, %mode, "CLI process launched");

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| GateError::execution("child stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GateError::execution("child stdout not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| GateError::execution("child stderr not captured"))?;

        // Dedicated writer task: writing the whole prompt inline could
        // deadlock against a child that fills its stdout pipe before
        // consuming stdin.
        let prompt = prompt.to_string();
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                debug!(error = %e, "CLI closed stdin before the prompt was fully written");
            }
            // Dropping stdin closes the pipe so the CLI sees EOF.
        });

        // Drain stderr concurrently; it is only consulted on failure.
        let stderr_task: JoinHandle<Vec<u8>> = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        let deadline = Instant::now() + self.config.timeout;
        let budget_secs = self.config.timeout.as_secs();
        let (tx, stream) = FragmentStream::channel(FRAGMENT_BUFFER);

        tokio::spawn(pump(child, stdout, stderr_task, tx, deadline, budget_secs));

        Ok(stream)
    }

    /// Run the CLI with `--version` to confirm the binary is present and
    /// responsive. Used by the health endpoint and the doctor command.
    pub async fn probe(&self) -> Result<String, GateError> {
        let run = Command::new(&self.config.command)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(PROBE_TIMEOUT, run)
            .await
            .map_err(|_| GateError::Timeout {
                budget_secs: PROBE_TIMEOUT.as_secs(),
            })?
            .map_err(|e| {
                GateError::execution(format!("failed to launch {}: {e}", self.config.command))
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(GateError::execution(format!(
                "version probe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

#[async_trait]
impl Engine for CliInvoker {
    async fn invoke(
        &self,
        mode: ExecutionMode,
        prompt: &str,
    ) -> Result<FragmentStream, GateError> {
        CliInvoker::invoke(self, mode, prompt).await
    }

    async fn probe(&self) -> Result<String, GateError> {
        CliInvoker::probe(self).await
    }
}

enum PumpExit {
    Eof,
    Timeout,
    Cancelled,
    ReadError(std::io::Error),
}

/// Forward stdout to the fragment channel until EOF, timeout, read error, or
/// consumer cancellation. Every path out of here leaves the child dead.
async fn pump(
    mut child: Child,
    mut stdout: ChildStdout,
    stderr_task: JoinHandle<Vec<u8>>,
    tx: FragmentSender,
    deadline: Instant,
    budget_secs: u64,
) {
    let mut carry = Utf8Carry::new();
    let mut buf = [0u8; READ_BUF_SIZE];

    let exit = loop {
        tokio::select! {
            read = stdout.read(&mut buf) => match read {
                Ok(0) => break PumpExit::Eof,
                Ok(n) => {
                    let text = carry.push(&buf[..n]);
                    if !text.is_empty() && tx.send(Ok(text)).await.is_err() {
                        break PumpExit::Cancelled;
                    }
                }
                Err(e) => break PumpExit::ReadError(e),
            },
            // Consumer dropped the stream (client disconnect): stop reading
            // immediately instead of waiting for output that nobody wants.
            _ = tx.closed() => break PumpExit::Cancelled,
            _ = sleep_until(deadline) => break PumpExit::Timeout,
        }
    };

    match exit {
        PumpExit::Eof => {
            if let Some(rest) = carry.flush() {
                let _ = tx.send(Ok(rest)).await;
            }
            match timeout_at(deadline, child.wait()).await {
                Ok(Ok(status)) if status.success() => {
                    debug!("CLI process exited cleanly");
                    stderr_task.abort();
                }
                Ok(Ok(status)) => {
                    let diagnostic = collect_stderr(stderr_task).await;
                    warn!(%status, diagnostic = %diagnostic, "CLI process failed");
                    let _ = tx
                        .send(Err(GateError::execution(format!(
                            "CLI exited with {status}: {diagnostic}"
                        ))))
                        .await;
                }
                Ok(Err(e)) => {
                    stderr_task.abort();
                    let _ = tx
                        .send(Err(GateError::execution(format!(
                            "waiting for CLI exit: {e}"
                        ))))
                        .await;
                }
                Err(_) => {
                    // Output ended but the process lingered past the budget.
                    kill_child(&mut child).await;
                    stderr_task.abort();
                    let _ = tx.send(Err(GateError::Timeout { budget_secs })).await;
                }
            }
        }
        PumpExit::Timeout => {
            warn!(budget_secs, "CLI invocation timed out, killing process");
            kill_child(&mut child).await;
            stderr_task.abort();
            let _ = tx.send(Err(GateError::Timeout { budget_secs })).await;
        }
        PumpExit::Cancelled => {
            info!("fragment consumer went away, killing CLI process");
            kill_child(&mut child).await;
            stderr_task.abort();
        }
        PumpExit::ReadError(e) => {
            kill_child(&mut child).await;
            stderr_task.abort();
            let _ = tx
                .send(Err(GateError::execution(format!(
                    "reading CLI output: {e}"
                ))))
                .await;
        }
    }
}

async fn kill_child(child: &mut Child) {
    if let Err(e) = child.kill().await {
        // Already gone is fine; anything else is worth a line.
        debug!(error = %e, "kill after shutdown path");
    }
}

async fn collect_stderr(stderr_task: JoinHandle<Vec<u8>>) -> String {
    match tokio::time::timeout(Duration::from_secs(1), stderr_task).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).trim().to_string(),
        _ => String::new(),
    }
}
