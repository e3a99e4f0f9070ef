//! Builder for executing external tool commands.
//!
//! Standard output and standard error are drained line by line into the log
//! by dedicated tasks while the caller waits for the process to exit, so a
//! chatty tool can never stall on a full pipe.

use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::tools::ToolConfig;

/// Number of trailing stderr lines kept for error messages.
const STDERR_TAIL_LINES: usize = 10;

/// Summary of a finished tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Number of lines the tool wrote to stdout.
    pub stdout_lines: usize,
    /// Number of lines the tool wrote to stderr.
    pub stderr_lines: usize,
    /// The last few stderr lines (lossy UTF-8).
    pub stderr_tail: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    fn as_str(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

#[derive(Debug, Default)]
struct Drained {
    lines: usize,
    tail: VecDeque<String>,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use sc_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> sc_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-i").arg("/path/to/input.mp3")
///     .args(["-f", "s16le", "/tmp/out.pcm"])
///     .execute()
///     .await?;
/// assert!(output.status.success());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    name: String,
    args: Vec<OsString>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| program.to_string_lossy().to_string());
        Self {
            program,
            name,
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Create a command for a resolved tool, inheriting its name and timeout.
    pub fn for_tool(tool: &ToolConfig) -> Self {
        Self {
            program: tool.path.clone(),
            name: tool.name.clone(),
            args: Vec::new(),
            timeout: tool.timeout,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(s.as_ref().to_os_string());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl AsRef<OsStr>>) -> &mut Self {
        self.args
            .extend(iter.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = Some(d);
        self
    }

    /// The program and its arguments as a single display string.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Execute the command, logging its output as it is produced.
    ///
    /// # Errors
    ///
    /// Returns [`sc_core::Error::Tool`] if spawning fails, if waiting fails,
    /// if the configured timeout expires (the process is killed), or if the
    /// process exits with a non-zero status (message includes the tail of
    /// stderr).
    pub async fn execute(&self) -> sc_core::Result<ToolOutput> {
        tracing::debug!(tool = %self.name, "Running: {}", self.command_line());

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| sc_core::Error::tool(&self.name, format!("failed to spawn: {e}")))?;

        let stdout_task = child
            .stdout
            .take()
            .map(|s| spawn_drain(s, self.name.clone(), StreamKind::Stdout));
        let stderr_task = child
            .stderr
            .take()
            .map(|s| spawn_drain(s, self.name.clone(), StreamKind::Stderr));

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(result) => result,
                Err(_elapsed) => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(tool = %self.name, "Failed to kill timed-out process: {e}");
                    }
                    return Err(sc_core::Error::tool(
                        &self.name,
                        format!("timed out after {limit:?}"),
                    ));
                }
            },
            None => child.wait().await,
        };

        let status = waited.map_err(|e| {
            sc_core::Error::tool(&self.name, format!("I/O error waiting for process: {e}"))
        })?;

        let stdout = join_drain(stdout_task).await;
        let stderr = join_drain(stderr_task).await;

        let output = ToolOutput {
            status,
            stdout_lines: stdout.lines,
            stderr_lines: stderr.lines,
            stderr_tail: stderr.tail.into_iter().collect(),
        };

        if !status.success() {
            return Err(sc_core::Error::tool(
                &self.name,
                format!("exited with {}: {}", status, output.stderr_tail.join(" | ")),
            ));
        }

        tracing::debug!(tool = %self.name, %status, "Process finished");
        Ok(output)
    }
}

fn spawn_drain<R>(reader: R, tool: String, kind: StreamKind) -> JoinHandle<Drained>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut drained = Drained::default();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    drained.lines += 1;
                    tracing::debug!(tool = %tool, stream = kind.as_str(), "{line}");
                    if matches!(kind, StreamKind::Stderr) {
                        if drained.tail.len() == STDERR_TAIL_LINES {
                            drained.tail.pop_front();
                        }
                        drained.tail.push_back(line.to_string());
                    }
                }
                Err(e) => {
                    tracing::debug!(tool = %tool, stream = kind.as_str(), "Read error: {e}");
                    break;
                }
            }
        }

        drained
    })
}

async fn join_drain(task: Option<JoinHandle<Drained>>) -> Drained {
    match task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Drained::default(),
    }
}
