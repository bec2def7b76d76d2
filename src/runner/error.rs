//! Error types for the runner module.
//!
//! This submodule isolates derive-macro-affected code to scope lint suppressions
//! narrowly. The `unused_assignments` lint fires in some Rust versions due to
//! thiserror/miette derive macro expansion.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros. The unused_assignments lint fires in some
// Rust versions but not others. Since `#[expect]` fails when the lint doesn't
// fire, and `unfulfilled_lint_expectations` cannot be expected, we must use
// `#[allow]` here.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

use crate::runtime::ValidationError;

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// `check-java` found no usable runtime.
    #[error("Java not found at {program}")]
    #[diagnostic(
        code(closurec::runner::java_missing),
        help(
            "add the jre/bin directory to PATH, or set JAVA_HOME to the JDK directory (not jdk/bin)"
        )
    )]
    JavaMissing {
        /// Program that was probed.
        program: Utf8PathBuf,
        /// Why validation failed.
        #[source]
        source: ValidationError,
    },

    /// An `--options-json` file did not hold a JSON object of options.
    #[error("invalid options file {path}")]
    #[diagnostic(code(closurec::runner::options_json))]
    OptionsJson {
        /// File that was parsed.
        path: Utf8PathBuf,
        /// Underlying JSON or option error.
        #[source]
        source: serde_json::Error,
    },
}
