//! Subprocess execution with bounded, concurrent capture of stdout and
//! stderr.
//!
//! Both output pipes are drained on dedicated threads while the caller waits
//! for the child, so neither stream can fill its pipe buffer and stall the
//! process. Each stream is capped at a byte budget; exceeding it yields
//! [`InvokeError::OutputLimit`] once the child has exited.

mod error;
mod pipes;

pub use error::{InvokeError, OutputStream};

use std::{
    fmt,
    io::{self, Read},
    process::{Child, Command, ExitStatus, Stdio},
    time::Duration,
};

use camino::Utf8Path;
use wait_timeout::ChildExt;

use pipes::{
    PipeLimit, cleanup, join_reader, settle_writer, spawn_pipe_reader, spawn_stdin_writer,
};

/// Default per-stream capture budget (20 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: u64 = 20 * 1024 * 1024;

/// Data fed to the child's standard input.
#[derive(Default)]
pub enum StdinSource {
    /// Standard input is closed immediately.
    #[default]
    Null,
    /// A buffer written in full, then closed.
    Bytes(Vec<u8>),
    /// A reader copied to the child until end of file.
    Reader(Box<dyn Read + Send>),
}

impl fmt::Debug for StdinSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<Vec<u8>> for StdinSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<String> for StdinSource {
    fn from(text: String) -> Self {
        Self::Bytes(text.into_bytes())
    }
}

impl From<&str> for StdinSource {
    fn from(text: &str) -> Self {
        Self::Bytes(text.as_bytes().to_vec())
    }
}

/// How a single process run is supervised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    /// Per-stream capture budget in bytes.
    pub max_output_bytes: u64,
    /// Kill the child if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            timeout: None,
        }
    }
}

/// Captured result of a finished process.
#[derive(Debug)]
pub struct ProcessOutput {
    /// Exit status reported by the operating system.
    pub status: ExitStatus,
    /// Everything the child wrote to standard output.
    pub stdout: Vec<u8>,
    /// Everything the child wrote to standard error.
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Standard output decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Standard error decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run `program` with `args`, feeding `stdin` and capturing both outputs.
///
/// A non-zero exit status is not an error here; callers inspect
/// [`ProcessOutput::status`].
///
/// # Errors
///
/// Returns [`InvokeError::Spawn`] if the process cannot be started,
/// [`InvokeError::OutputLimit`] if either stream exceeds the byte budget,
/// [`InvokeError::Timeout`] if the child outlives `limits.timeout`, and
/// [`InvokeError::Io`] for other pipe or wait failures.
pub fn run_process(
    program: &Utf8Path,
    args: &[String],
    stdin: StdinSource,
    limits: RunLimits,
) -> Result<ProcessOutput, InvokeError> {
    let stdin_mode = if matches!(stdin, StdinSource::Null) {
        Stdio::null()
    } else {
        Stdio::piped()
    };
    let mut child = Command::new(program.as_std_path())
        .args(args)
        .stdin(stdin_mode)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| InvokeError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;
    tracing::debug!(pid = child.id(), %program, "spawned subprocess");

    let mut stdin_writer = spawn_stdin_writer(child.stdin.take(), stdin);
    let mut stdout_reader = spawn_pipe_reader(
        child.stdout.take(),
        PipeLimit::new(OutputStream::Stdout, limits.max_output_bytes),
    );
    let mut stderr_reader = spawn_pipe_reader(
        child.stderr.take(),
        PipeLimit::new(OutputStream::Stderr, limits.max_output_bytes),
    );

    let waited = match limits.timeout {
        Some(timeout) => wait_for_exit(&mut child, program, timeout),
        None => child.wait().map_err(InvokeError::Io),
    };
    let status = match waited {
        Ok(status) => status,
        Err(err) => {
            cleanup(&mut stdout_reader, &mut stderr_reader, &mut stdin_writer);
            return Err(err);
        }
    };

    let stdout = join_reader(stdout_reader.take());
    let stderr = join_reader(stderr_reader.take());
    let stdin_result = settle_writer(stdin_writer.take());
    let output = ProcessOutput {
        status,
        stdout: stdout?,
        stderr: stderr?,
    };
    stdin_result?;
    tracing::debug!(
        %program,
        status = ?output.status.code(),
        stdout_bytes = output.stdout.len(),
        stderr_bytes = output.stderr.len(),
        "subprocess finished"
    );
    Ok(output)
}

fn wait_for_exit(
    child: &mut Child,
    program: &Utf8Path,
    timeout: Duration,
) -> Result<ExitStatus, InvokeError> {
    if let Some(status) = child.wait_timeout(timeout)? {
        Ok(status)
    } else {
        if let Err(err) = child.kill()
            && err.kind() != io::ErrorKind::InvalidInput
        {
            return Err(InvokeError::Io(err));
        }
        if let Err(err) = child.wait() {
            tracing::warn!("failed to reap timed-out process: {err}");
        }
        Err(InvokeError::Timeout {
            program: program.to_path_buf(),
            timeout,
        })
    }
}
