//! Argument vector construction for the compiler subprocess.
//!
//! [`build_arguments`] turns a list of source files and an [`Options`]
//! mapping into an [`Invocation`]:
//!
//! ```text
//! [-Xms.. -Xmx.. -Xss..] -jar <compiler.jar> [--js <file>]... [--externs <file>]... [--<option> [<value>]]...
//! ```
//!
//! Building is synchronous. Apart from `stat` calls on the sources and
//! externs it has no side effects, so every failure surfaces before a
//! process is spawned.

mod error;

pub use error::ArgumentError;

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::layout::InstallLayout;
use crate::options::{OptionValue, Options, externs::expand_externs};

/// Fully validated command line for one compiler run, minus the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    jvm_args: Vec<String>,
    jar: Utf8PathBuf,
    tool_args: Vec<String>,
}

impl Invocation {
    /// Flags for the Java runtime itself.
    #[must_use]
    pub fn jvm_args(&self) -> &[String] {
        &self.jvm_args
    }

    /// The compiler jar passed to `-jar`.
    #[must_use]
    pub fn jar(&self) -> &Utf8Path {
        &self.jar
    }

    /// Arguments consumed by the compiler.
    #[must_use]
    pub fn tool_args(&self) -> &[String] {
        &self.tool_args
    }

    /// Complete argument vector to pass after the Java program.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.jvm_args.len() + self.tool_args.len() + 2);
        args.extend(self.jvm_args.iter().cloned());
        args.push(String::from("-jar"));
        args.push(self.jar.to_string());
        args.extend(self.tool_args.iter().cloned());
        args
    }

    /// Render `program` plus the argument vector as a shell-quoted line.
    ///
    /// Used for logging and `--dry-run`; the process itself is spawned
    /// without a shell.
    #[must_use]
    pub fn render(&self, program: &Utf8Path) -> String {
        let args = self.to_args();
        let words = std::iter::once(program.as_str()).chain(args.iter().map(String::as_str));
        shlex::try_join(words.clone()).unwrap_or_else(|_| words.collect::<Vec<_>>().join(" "))
    }
}

/// Validate `files` and `options` and build the compiler command line.
///
/// # Errors
///
/// Returns an [`ArgumentError`] when a source path is malformed or missing,
/// when an `externs` entry cannot be resolved, or when an option name or value
/// cannot be passed through to the compiler.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8PathBuf;
/// use closurec::{args::build_arguments, layout::InstallLayout, options::Options};
///
/// let layout = InstallLayout::new("/opt/closurec");
/// let options = Options::new().with("compilation_level", "ADVANCED");
/// let invocation = build_arguments(&[Utf8PathBuf::from("app.js")], &options, &layout)?;
/// assert_eq!(invocation.tool_args()[0], "--js");
/// # Ok::<(), closurec::args::ArgumentError>(())
/// ```
pub fn build_arguments(
    files: &[Utf8PathBuf],
    options: &Options,
    layout: &InstallLayout,
) -> Result<Invocation, ArgumentError> {
    let mut tool_args = Vec::new();
    for file in files {
        validate_source(file)?;
        tool_args.push(String::from("--js"));
        tool_args.push(file.to_string());
    }

    let parts = options.partition()?;
    for extern_file in expand_externs(&parts.externs, layout)? {
        tool_args.push(String::from("--externs"));
        tool_args.push(extern_file.into_string());
    }

    for (key, value) in parts.passthrough {
        push_option(&mut tool_args, &key, &value)?;
    }

    Ok(Invocation {
        jvm_args: parts.jvm_flags,
        jar: layout.compiler_jar(),
        tool_args,
    })
}

fn validate_source(path: &Utf8Path) -> Result<(), ArgumentError> {
    let raw = path.as_str();
    if raw.is_empty() || raw.contains(['"', '\0']) {
        return Err(ArgumentError::IllegalSourceFile {
            path: raw.to_owned(),
        });
    }
    match fs::metadata(path.as_std_path()) {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(ArgumentError::SourceNotFound {
            path: path.to_path_buf(),
        }),
    }
}

fn push_option(args: &mut Vec<String>, key: &str, value: &OptionValue) -> Result<(), ArgumentError> {
    if !is_option_name(key) {
        return Err(ArgumentError::IllegalOption {
            key: key.to_owned(),
        });
    }
    let flag = format!("--{key}");
    match value {
        OptionValue::Flag(true) => args.push(flag),
        OptionValue::Flag(false) => {}
        OptionValue::Value(_) | OptionValue::List(_) => {
            for item in value.values() {
                if !is_plain_value(item) {
                    return Err(ArgumentError::IllegalValue {
                        option: key.to_owned(),
                        value: item.clone(),
                    });
                }
                args.push(flag.clone());
                args.push(item.clone());
            }
        }
    }
    Ok(())
}

/// Option names are one or more ASCII letters, digits or underscores.
fn is_option_name(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
}

/// Values may not carry whitespace or NUL bytes.
fn is_plain_value(value: &str) -> bool {
    !value.chars().any(|c| c.is_whitespace() || c == '\0')
}
