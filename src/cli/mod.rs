//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. Values
//! that may also come from the environment (`CLOSUREC_HOME`, `JAVA_HOME`,
//! `CLOSUREC_CONFIG_PATH`) are read through clap's `env` support, so an
//! explicit flag always wins.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use closurec_env::{CONFIG_ENV, HOME_ENV, JAVA_HOME_ENV};

use crate::config::Settings;
use crate::options::Options;

mod parsing;

pub use parsing::OptionAssignment;
use parsing::{parse_major_version, parse_option_assignment};

/// Run the Closure Compiler jar on a resolved Java runtime.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON config file; defaults to `./closurec.json` when present.
    #[arg(long, value_name = "FILE", env = CONFIG_ENV, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Directory holding `compiler/compiler.jar`, `jre/` and `externs/`.
    #[arg(long, value_name = "DIR", env = HOME_ENV, global = true)]
    pub home: Option<Utf8PathBuf>,

    /// Root of the Java installation to prefer over the bundled runtime.
    #[arg(long, value_name = "DIR", env = JAVA_HOME_ENV, global = true)]
    pub java_home: Option<Utf8PathBuf>,

    /// Reject Java runtimes older than this major version.
    #[arg(long, value_name = "MAJOR", value_parser = parse_major_version, global = true)]
    pub minimum_java: Option<u32>,

    /// Enable verbose diagnostic logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Settings given on the command line or through the environment.
    ///
    /// Compile-specific values come from `compile` when that is the active
    /// command.
    #[must_use]
    pub fn settings(&self) -> Settings {
        let max_output_bytes = match &self.command {
            Commands::Compile(args) => args.max_output_bytes,
            Commands::Setup | Commands::CheckJava => None,
        };
        Settings {
            home: self.home.clone(),
            java_home: self.java_home.clone(),
            minimum_java: self.minimum_java,
            max_output_bytes,
            options: Options::new(),
        }
    }
}

/// Arguments accepted by the `compile` command.
#[derive(Debug, Args, PartialEq, Eq, Clone, Default)]
pub struct CompileArgs {
    /// JavaScript sources, in order. Reads standard input when none are given.
    #[arg(value_name = "FILE")]
    pub files: Vec<Utf8PathBuf>,

    /// Compiler option as `key`, `key=value`, `key=true` or `key=false`.
    ///
    /// Repeating a key with values passes each value in order.
    #[arg(
        short = 'O',
        long = "option",
        value_name = "KEY[=VALUE]",
        value_parser = parse_option_assignment
    )]
    pub options: Vec<OptionAssignment>,

    /// JSON object of compiler options, applied before `-O` flags.
    #[arg(long, value_name = "FILE")]
    pub options_json: Option<Utf8PathBuf>,

    /// Extern file or directory; `node` selects the bundled externs.
    #[arg(long, value_name = "PATH")]
    pub externs: Vec<String>,

    /// Forward this process's standard input to the compiler.
    #[arg(long)]
    pub stdin: bool,

    /// Write compiled output here instead of standard output (`-` for stdout).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<Utf8PathBuf>,

    /// Per-stream byte limit for captured compiler output.
    #[arg(long, value_name = "BYTES")]
    pub max_output_bytes: Option<u64>,

    /// Print the Java command line instead of running it.
    #[arg(long)]
    pub dry_run: bool,
}

impl CompileArgs {
    /// Apply `--externs` and `-O` flags on top of `base`.
    #[must_use]
    pub fn apply_to(&self, mut base: Options) -> Options {
        for path in &self.externs {
            base.push(crate::options::EXTERNS_KEY, path.clone());
        }
        for assignment in &self.options {
            assignment.apply(&mut base);
        }
        base
    }
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Compile JavaScript sources.
    Compile(CompileArgs),

    /// Prepare the bundled runtime and verify the install.
    Setup,

    /// Report whether a usable Java runtime is installed.
    CheckJava,
}
