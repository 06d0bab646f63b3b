//! Builder for executing external tool commands.
//!
//! Arguments are always passed as a list, never through a shell. Spawned
//! processes are killed when the owning future is dropped, so cancelling a
//! request cannot leak an encoder.

use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use plexclip::transcode::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> std::io::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .arg("-v").arg("quiet")
///     .arg("-print_format").arg("json")
///     .arg("-show_streams")
///     .arg("/path/to/video.mkv")
///     .capture()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, s: impl Into<String>) -> Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set a maximum execution time. Encodes run without one; probes should
    /// not hang forever on a dead source.
    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = Some(d);
        self
    }

    /// The program plus its arguments, for logging.
    pub fn display_line(&self) -> String {
        format!("{} {}", self.program.display(), self.args.join(" "))
    }

    /// Run the command to completion, capturing stdout and stderr.
    ///
    /// A non-zero exit is NOT an error here: callers inspect
    /// [`ToolOutput::status`] and decide what the failure means. Errors are
    /// reserved for spawn failures, I/O failures and timeouts.
    pub async fn capture(&self) -> io::Result<ToolOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn()?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("{} timed out after {:?}", self.program.display(), limit),
                    )
                })??,
            None => child.wait_with_output().await?,
        };

        Ok(ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Spawn the command with stdout and stderr piped, for callers that
    /// consume output incrementally. The child is killed if dropped.
    pub fn spawn_streaming(&self) -> io::Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }
}
