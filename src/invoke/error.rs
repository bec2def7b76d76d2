//! Failures raised while running a subprocess.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::{fmt, io, time::Duration};

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Which pipe a capture limit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Child standard output.
    Stdout,
    /// Child standard error.
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        })
    }
}

/// Errors raised while spawning or supervising a subprocess.
#[derive(Debug, Error, Diagnostic)]
pub enum InvokeError {
    /// The process could not be spawned (executable missing, permission
    /// failure, etc.).
    #[error("failed to spawn {program}")]
    #[diagnostic(code(closurec::invoke::spawn))]
    Spawn {
        /// Program that was executed.
        program: Utf8PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// An I/O error occurred while interacting with the running process.
    #[error("I/O error while running subprocess")]
    #[diagnostic(code(closurec::invoke::io))]
    Io(#[from] io::Error),

    /// The process produced more data than the configured byte budget allows.
    #[error("{stream} exceeded the {limit} byte capture limit")]
    #[diagnostic(
        code(closurec::invoke::output_limit),
        help("raise --max-output-bytes or reduce compiler output")
    )]
    OutputLimit {
        /// Which pipe exceeded the budget.
        stream: OutputStream,
        /// The configured byte ceiling that was exceeded.
        limit: u64,
    },

    /// The process failed to exit before the timeout elapsed.
    #[error("{program} did not exit within {timeout:?}")]
    #[diagnostic(code(closurec::invoke::timeout))]
    Timeout {
        /// Program that was executed.
        program: Utf8PathBuf,
        /// Time allowed before the process was killed.
        timeout: Duration,
    },
}
