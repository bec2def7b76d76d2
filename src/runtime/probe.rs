//! Probing a Java executable for its version.

use std::{fmt, time::Duration};

use camino::Utf8Path;

use crate::invoke::{InvokeError, RunLimits, StdinSource, run_process};

/// Maximum time a `-version` probe may run.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

const PROBE_OUTPUT_LIMIT: u64 = 64 * 1024;
const VERSION_MARKER: &str = "version \"";

/// Runs a candidate runtime and returns what it printed.
#[cfg_attr(test, mockall::automock)]
pub trait RuntimeProbe: Send + Sync {
    /// Run `program -version` and return its combined stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns an [`InvokeError`] when the program cannot be run.
    fn version_output(&self, program: &Utf8Path) -> Result<String, InvokeError>;
}

/// Probe that spawns the candidate as a real subprocess.
#[derive(Debug, Clone, Copy)]
pub struct ProcessProbe {
    timeout: Duration,
}

impl ProcessProbe {
    /// Create a probe that kills the candidate after `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new(PROBE_TIMEOUT)
    }
}

impl RuntimeProbe for ProcessProbe {
    fn version_output(&self, program: &Utf8Path) -> Result<String, InvokeError> {
        let limits = RunLimits {
            max_output_bytes: PROBE_OUTPUT_LIMIT,
            timeout: Some(self.timeout),
        };
        let output = run_process(
            program,
            &[String::from("-version")],
            StdinSource::Null,
            limits,
        )?;
        // Java prints its banner on stderr; some wrappers use stdout.
        let mut text = output.stderr_text();
        text.push_str(&output.stdout_text());
        Ok(text)
    }
}

/// Version reported by a Java runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaVersion {
    raw: String,
    major: Option<u32>,
}

impl JavaVersion {
    /// Extract the quoted version from `-version` output.
    ///
    /// Returns `None` when the output carries no `version "..."` banner.
    ///
    /// # Examples
    ///
    /// ```
    /// use closurec::runtime::JavaVersion;
    ///
    /// let modern = JavaVersion::parse("openjdk version \"17.0.2\" 2022-01-18").unwrap();
    /// assert_eq!(modern.major(), Some(17));
    /// let legacy = JavaVersion::parse("java version \"1.8.0_292\"").unwrap();
    /// assert_eq!(legacy.major(), Some(8));
    /// ```
    #[must_use]
    pub fn parse(output: &str) -> Option<Self> {
        let start = output.find(VERSION_MARKER)? + VERSION_MARKER.len();
        let rest = output.get(start..)?;
        let raw = rest.split('"').next().unwrap_or_default().to_owned();
        let major = major_of(&raw);
        Some(Self { raw, major })
    }

    /// The version string exactly as reported.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Major feature release, with `1.x` mapped to `x`.
    #[must_use]
    pub const fn major(&self) -> Option<u32> {
        self.major
    }
}

impl fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn major_of(raw: &str) -> Option<u32> {
    let mut parts = raw
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .map(str::parse::<u32>);
    match parts.next()? {
        Ok(1) => parts.next().and_then(Result::ok),
        Ok(major) => Some(major),
        Err(_) => None,
    }
}
