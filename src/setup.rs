//! Post-install preparation and Java checks.
//!
//! [`run_setup`] makes sure a freshly staged install can compile: the
//! environment runtime is tried first; failing that, the bundled runtime
//! under `<home>/jre` gets its permissions fixed and is tried next, and the
//! environment runtime gets one more attempt. The compiler jar must exist.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use thiserror::Error;

use crate::layout::InstallLayout;
use crate::runtime::{Candidate, JavaVersion, RuntimeResolver, ValidationError};

/// Mode applied to the bundled runtime directories and executable.
#[cfg(unix)]
const EXECUTABLE_MODE: u32 = 0o755;

/// Errors raised by `closurec setup`.
#[derive(Debug, Error, Diagnostic)]
pub enum SetupError {
    /// Neither the environment nor the bundled runtime could be called.
    #[error("no callable Java runtime found; looked for a bundled runtime in {jre_bin}")]
    #[diagnostic(
        code(closurec::setup::no_java),
        help("install Java and set JAVA_HOME, or unpack a runtime into {jre_bin}")
    )]
    NoCallableRuntime {
        /// Bundled runtime `bin` directory that was inspected.
        jre_bin: Utf8PathBuf,
        /// Diagnostics for each rejected attempt, in order.
        #[related]
        rejected: Vec<ValidationError>,
    },

    /// The compiler jar is missing.
    #[error("compiler jar not found at {path}")]
    #[diagnostic(
        code(closurec::setup::missing_jar),
        help("unpack the Closure Compiler release into {path}")
    )]
    MissingJar {
        /// Expected jar location.
        path: Utf8PathBuf,
    },

    /// Permissions on the bundled runtime could not be fixed.
    #[error("failed to make {path} executable")]
    #[diagnostic(code(closurec::setup::permissions))]
    Permissions {
        /// Path whose mode could not be changed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Outcome of a successful setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    /// Runtime that passed validation.
    pub runtime: Candidate,
    /// Whether the bundled runtime's permissions were updated.
    pub permissions_fixed: bool,
    /// Location of the compiler jar.
    pub compiler_jar: Utf8PathBuf,
}

/// Mark the bundled runtime directories and executable as `0755`.
///
/// Returns `false` without touching anything when `<home>/jre/bin` does not
/// exist. On Windows this only checks for the directory.
///
/// # Errors
///
/// Returns [`SetupError::Permissions`] naming the first path that could not
/// be updated.
pub fn configure_bundled_runtime(layout: &InstallLayout) -> Result<bool, SetupError> {
    if !layout.jre_bin_dir().is_dir() {
        return Ok(false);
    }
    for path in [layout.jre_dir(), layout.jre_bin_dir(), layout.bundled_java()] {
        make_executable(&path)?;
    }
    Ok(true)
}

#[cfg(unix)]
fn make_executable(path: &Utf8Path) -> Result<(), SetupError> {
    use std::{fs, os::unix::fs::PermissionsExt};

    fs::set_permissions(path, fs::Permissions::from_mode(EXECUTABLE_MODE)).map_err(|source| {
        SetupError::Permissions {
            path: path.to_path_buf(),
            source,
        }
    })?;
    tracing::debug!(%path, "set mode 0755");
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Utf8Path) -> Result<(), SetupError> {
    Ok(())
}

/// Prepare the install rooted at `layout` and confirm a runtime is usable.
///
/// # Errors
///
/// Returns [`SetupError::NoCallableRuntime`] when no runtime validates,
/// [`SetupError::Permissions`] when the bundled runtime cannot be made
/// executable, and [`SetupError::MissingJar`] when the compiler jar is absent.
pub fn run_setup(layout: &InstallLayout, resolver: &RuntimeResolver) -> Result<SetupReport, SetupError> {
    let mut rejected = Vec::new();
    let mut permissions_fixed = false;

    let mut runtime = resolver.environment_candidate();
    let mut callable = record(resolver, &mut runtime, &mut rejected);

    if !callable && configure_bundled_runtime(layout)? {
        permissions_fixed = true;
        runtime = resolver.bundled_candidate();
        callable = record(resolver, &mut runtime, &mut rejected);
        if !callable {
            runtime = resolver.environment_candidate();
            callable = record(resolver, &mut runtime, &mut rejected);
        }
    }

    if !callable {
        return Err(SetupError::NoCallableRuntime {
            jre_bin: layout.jre_bin_dir(),
            rejected,
        });
    }

    let compiler_jar = layout.compiler_jar();
    if !compiler_jar.is_file() {
        return Err(SetupError::MissingJar { path: compiler_jar });
    }
    Ok(SetupReport {
        runtime,
        permissions_fixed,
        compiler_jar,
    })
}

fn record(
    resolver: &RuntimeResolver,
    candidate: &mut Candidate,
    rejected: &mut Vec<ValidationError>,
) -> bool {
    match resolver.validate(candidate) {
        Ok(version) => {
            tracing::info!(source = %candidate.source(), %version, "Java runtime is callable");
            true
        }
        Err(err) => {
            tracing::debug!(source = %candidate.source(), error = %err, "Java runtime rejected");
            rejected.push(err);
            false
        }
    }
}

/// Validate the environment runtime only.
///
/// # Errors
///
/// Returns the [`ValidationError`] explaining why the runtime is unusable.
pub fn check_java(resolver: &RuntimeResolver) -> Result<JavaVersion, ValidationError> {
    resolver.validate(&mut resolver.environment_candidate())
}
