//! Errors raised while locating and validating a Java runtime.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

use crate::invoke::InvokeError;

/// Why a single candidate runtime was rejected.
#[derive(Debug, Error, Diagnostic)]
pub enum ValidationError {
    /// `<program> -version` could not be run to completion.
    #[error("could not run {program} -version")]
    #[diagnostic(code(closurec::runtime::probe_failed))]
    ProbeFailed {
        /// Candidate program.
        program: Utf8PathBuf,
        /// Underlying process failure.
        #[source]
        source: InvokeError,
    },

    /// The probe ran but printed no recognisable version banner.
    #[error("{program} did not report a Java version")]
    #[diagnostic(code(closurec::runtime::not_callable))]
    NotCallable {
        /// Candidate program.
        program: Utf8PathBuf,
        /// Combined probe output, kept for diagnostics.
        output: String,
    },

    /// The runtime reports a major version below the configured minimum.
    #[error("{program} reports Java {found}, but at least Java {minimum} is required")]
    #[diagnostic(
        code(closurec::runtime::outdated),
        help("point JAVA_HOME at a newer runtime or lower minimum_java")
    )]
    Outdated {
        /// Candidate program.
        program: Utf8PathBuf,
        /// Version string reported by the runtime.
        found: String,
        /// Minimum acceptable major version.
        minimum: u32,
    },
}

/// Failure to resolve a runtime for a compile run.
#[derive(Debug, Error, Diagnostic)]
pub enum RuntimeError {
    /// Neither the environment nor the bundled runtime validated.
    #[error("no callable Java runtime found")]
    #[diagnostic(
        code(closurec::runtime::none_callable),
        help("install Java and set JAVA_HOME, or run `closurec setup` to prepare the bundled runtime")
    )]
    NoCallableRuntime {
        /// Diagnostics for each rejected candidate, environment first.
        #[related]
        rejected: Vec<ValidationError>,
    },
}
