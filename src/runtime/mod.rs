//! Java runtime resolution.
//!
//! Two candidates are considered, in order:
//!
//! 1. the environment runtime: `<JAVA_HOME>/bin/java` when that file exists,
//!    otherwise a bare `java` looked up on the search path;
//! 2. the bundled runtime under `<home>/jre/bin`.
//!
//! Each candidate is validated by running it with `-version` and looking for
//! a `version "..."` banner. The first callable candidate wins; when both
//! fail, resolution returns [`RuntimeError::NoCallableRuntime`] carrying both
//! diagnostics.

mod error;
mod probe;

pub use error::{RuntimeError, ValidationError};
pub use probe::{JavaVersion, PROBE_TIMEOUT, ProcessProbe, RuntimeProbe};

use std::{env, ffi::OsString, fmt, sync::Arc};

use camino::{Utf8Path, Utf8PathBuf};
use closurec_env::JAVA_HOME_ENV;

use crate::layout::{InstallLayout, JAVA_PROGRAM, java_file_name};

/// Explicit inputs for runtime resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Root of an environment-declared Java installation.
    pub java_home: Option<Utf8PathBuf>,
    /// Path to the bundled Java executable.
    pub bundled_java: Utf8PathBuf,
    /// Lowest acceptable major version, if any.
    pub minimum_major: Option<u32>,
}

impl RuntimeConfig {
    /// Configuration with no environment runtime and no version floor.
    #[must_use]
    pub fn new(bundled_java: impl Into<Utf8PathBuf>) -> Self {
        Self {
            java_home: None,
            bundled_java: bundled_java.into(),
            minimum_major: None,
        }
    }

    /// Read `JAVA_HOME` from the process environment.
    #[must_use]
    pub fn from_env(layout: &InstallLayout) -> Self {
        Self::from_env_with(|key| env::var_os(key), layout)
    }

    /// Build the configuration using `read_env` for environment lookups.
    ///
    /// Empty and non-UTF-8 values of `JAVA_HOME` are ignored.
    #[must_use]
    pub fn from_env_with<F>(mut read_env: F, layout: &InstallLayout) -> Self
    where
        F: FnMut(&str) -> Option<OsString>,
    {
        let java_home = read_env(JAVA_HOME_ENV)
            .filter(|value| !value.is_empty())
            .and_then(|value| Utf8PathBuf::from_path_buf(value.into()).ok());
        Self {
            java_home,
            bundled_java: layout.bundled_java(),
            minimum_major: None,
        }
    }

    /// Require at least `major` when validating candidates.
    #[must_use]
    pub const fn with_minimum_major(mut self, major: Option<u32>) -> Self {
        self.minimum_major = major;
        self
    }
}

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// `JAVA_HOME` or the search path.
    Environment,
    /// The runtime shipped under the closurec home.
    Bundled,
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Environment => "environment",
            Self::Bundled => "bundled",
        })
    }
}

/// Validity of a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateState {
    /// Not probed yet.
    Untested,
    /// Probed and usable.
    Callable(JavaVersion),
    /// Probed and rejected; holds the rendered diagnostic.
    NotCallable(String),
}

/// A Java executable that may be used to run the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    source: CandidateSource,
    program: Utf8PathBuf,
    state: CandidateState,
}

impl Candidate {
    /// Create an untested candidate.
    #[must_use]
    pub fn new(source: CandidateSource, program: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source,
            program: program.into(),
            state: CandidateState::Untested,
        }
    }

    /// Where this candidate came from.
    #[must_use]
    pub const fn source(&self) -> CandidateSource {
        self.source
    }

    /// Program to execute.
    #[must_use]
    pub fn program(&self) -> &Utf8Path {
        &self.program
    }

    /// Current validity state.
    #[must_use]
    pub const fn state(&self) -> &CandidateState {
        &self.state
    }

    /// Version of a callable candidate.
    #[must_use]
    pub const fn version(&self) -> Option<&JavaVersion> {
        match &self.state {
            CandidateState::Callable(version) => Some(version),
            _ => None,
        }
    }
}

/// Picks a callable Java runtime according to a [`RuntimeConfig`].
#[derive(Clone)]
pub struct RuntimeResolver {
    config: RuntimeConfig,
    probe: Arc<dyn RuntimeProbe>,
}

impl fmt::Debug for RuntimeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RuntimeResolver {
    /// Resolver that validates candidates through `probe`.
    #[must_use]
    pub fn new(config: RuntimeConfig, probe: Arc<dyn RuntimeProbe>) -> Self {
        Self { config, probe }
    }

    /// Resolver that spawns candidates as real subprocesses.
    #[must_use]
    pub fn with_process_probe(config: RuntimeConfig) -> Self {
        Self::new(config, Arc::new(ProcessProbe::default()))
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// `<JAVA_HOME>/bin/java` when it exists, else bare `java`.
    #[must_use]
    pub fn environment_candidate(&self) -> Candidate {
        let program = self
            .config
            .java_home
            .as_ref()
            .map(|home| home.join("bin").join(java_file_name()))
            .filter(|path| path.is_file())
            .unwrap_or_else(|| Utf8PathBuf::from(JAVA_PROGRAM));
        Candidate::new(CandidateSource::Environment, program)
    }

    /// The bundled runtime executable.
    #[must_use]
    pub fn bundled_candidate(&self) -> Candidate {
        Candidate::new(CandidateSource::Bundled, self.config.bundled_java.clone())
    }

    /// Probe `candidate`, recording the outcome in its state.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the probe fails, prints no version
    /// banner, or reports a version below the configured minimum.
    pub fn validate(&self, candidate: &mut Candidate) -> Result<JavaVersion, ValidationError> {
        match self.check(&candidate.program) {
            Ok(version) => {
                candidate.state = CandidateState::Callable(version.clone());
                Ok(version)
            }
            Err(err) => {
                candidate.state = CandidateState::NotCallable(err.to_string());
                Err(err)
            }
        }
    }

    /// Return the first callable candidate, environment before bundled.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NoCallableRuntime`] when neither candidate
    /// validates.
    pub fn select(&self) -> Result<Candidate, RuntimeError> {
        let mut rejected = Vec::with_capacity(2);
        for mut candidate in [self.environment_candidate(), self.bundled_candidate()] {
            match self.validate(&mut candidate) {
                Ok(version) => {
                    tracing::info!(
                        source = %candidate.source,
                        program = %candidate.program,
                        %version,
                        "using Java runtime"
                    );
                    return Ok(candidate);
                }
                Err(err) => {
                    tracing::debug!(
                        source = %candidate.source,
                        program = %candidate.program,
                        error = %err,
                        "Java runtime rejected"
                    );
                    rejected.push(err);
                }
            }
        }
        Err(RuntimeError::NoCallableRuntime { rejected })
    }

    fn check(&self, program: &Utf8Path) -> Result<JavaVersion, ValidationError> {
        let output = self
            .probe
            .version_output(program)
            .map_err(|source| ValidationError::ProbeFailed {
                program: program.to_path_buf(),
                source,
            })?;
        let version = JavaVersion::parse(&output).ok_or_else(|| ValidationError::NotCallable {
            program: program.to_path_buf(),
            output: output.trim().to_owned(),
        })?;
        if let Some(minimum) = self.config.minimum_major
            && version.major().is_none_or(|major| major < minimum)
        {
            return Err(ValidationError::Outdated {
                program: program.to_path_buf(),
                found: version.as_str().to_owned(),
                minimum,
            });
        }
        Ok(version)
    }
}
