//! Validation errors raised while building the compiler argument vector.
//!
//! These are reported synchronously, before any subprocess exists.

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
use std::io;
use thiserror::Error;

/// Errors raised while validating source files and options.
#[derive(Debug, Error, Diagnostic)]
pub enum ArgumentError {
    /// The source path is empty or contains characters that cannot be passed
    /// through to the tool.
    #[error("illegal source file: {path:?}")]
    #[diagnostic(code(closurec::args::illegal_source_file))]
    IllegalSourceFile {
        /// Offending path as supplied.
        path: String,
    },

    /// The source path does not name a regular file.
    #[error("source file not found: {path}")]
    #[diagnostic(
        code(closurec::args::source_not_found),
        help("check the path exists and is a regular file")
    )]
    SourceNotFound {
        /// Path that was checked.
        path: Utf8PathBuf,
    },

    /// An `externs` entry is empty or not a string.
    #[error("externs directive does not point to a file or directory: {entry:?}")]
    #[diagnostic(code(closurec::args::externs_not_path))]
    ExternsNotPath {
        /// Offending entry.
        entry: String,
    },

    /// An `externs` entry names neither a file nor a directory.
    #[error("externs file not found: {path}")]
    #[diagnostic(code(closurec::args::externs_not_found))]
    ExternsNotFound {
        /// Path that was checked.
        path: Utf8PathBuf,
    },

    /// An `externs` directory exists but could not be listed.
    #[error("failed to read externs directory {path}")]
    #[diagnostic(code(closurec::args::externs_unreadable))]
    ExternsUnreadable {
        /// Directory being listed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An option name is not a plain identifier.
    #[error("illegal option: {key:?}")]
    #[diagnostic(
        code(closurec::args::illegal_option),
        help("option names may only contain ASCII letters, digits and underscores")
    )]
    IllegalOption {
        /// Offending key (lower-cased).
        key: String,
    },

    /// An option value cannot be passed to the tool.
    #[error("illegal value for option {option}: {value:?}")]
    #[diagnostic(code(closurec::args::illegal_value))]
    IllegalValue {
        /// Option the value belongs to.
        option: String,
        /// Offending value, rendered as text.
        value: String,
    },
}
