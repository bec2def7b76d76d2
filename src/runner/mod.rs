//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! loads settings, dispatches the selected command and writes its output.

mod error;
mod output;

pub use error::RunnerError;
pub use output::{is_stdout_path, write_output_file, write_stderr, write_stdout};

use std::{fs, io};

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::debug;

use crate::cli::{Cli, Commands, CompileArgs};
use crate::compiler::CompileRequest;
use crate::config::Settings;
use crate::invoke::StdinSource;
use crate::options::Options;
use crate::runtime::RuntimeResolver;
use crate::setup::{check_java, run_setup};

/// Execute the parsed [`Cli`] commands.
///
/// # Errors
///
/// Returns an error if settings cannot be loaded or the command fails.
pub fn run(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    match &cli.command {
        Commands::Compile(args) => handle_compile(&settings, args),
        Commands::Setup => handle_setup(&settings),
        Commands::CheckJava => handle_check_java(&settings),
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let file = Settings::discover(cli.config.as_deref()).context("load configuration")?;
    let settings = file.layered_with(cli.settings());
    debug!(?settings, "effective settings");
    Ok(settings)
}

fn handle_compile(settings: &Settings, args: &CompileArgs) -> Result<()> {
    let base = match &args.options_json {
        Some(path) => load_options_json(path)?,
        None => Options::new(),
    };
    let options = args.apply_to(base);
    let compiler = settings.compiler()?;

    if args.dry_run {
        let prepared = compiler.prepare(&args.files, &options)?;
        return write_stdout(&format!("{}\n", prepared.command_line()));
    }

    let mut request = CompileRequest::new(args.files.iter().cloned()).with_options(options);
    if args.stdin || args.files.is_empty() {
        request = request.with_stdin(StdinSource::Reader(Box::new(io::stdin())));
    }
    let compiled = compiler.compile(request)?;

    if let Some(warnings) = &compiled.warnings {
        write_stderr(warnings)?;
    }
    match args.output.as_deref() {
        Some(path) if !is_stdout_path(path) => write_output_file(path, &compiled.code),
        _ => write_stdout(&compiled.code),
    }
}

fn load_options_json(path: &Utf8Path) -> Result<Options> {
    let text = fs::read_to_string(path).with_context(|| format!("read options file {path}"))?;
    let options = serde_json::from_str(&text).map_err(|source| RunnerError::OptionsJson {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(options)
}

fn handle_setup(settings: &Settings) -> Result<()> {
    let layout = settings.layout()?;
    write_stdout(&format!("Configuring closurec in {} ...\n", layout.home()))?;
    let resolver = RuntimeResolver::with_process_probe(settings.runtime_config(&layout));
    let report = run_setup(&layout, &resolver)?;
    let version = report
        .runtime
        .version()
        .map_or_else(String::new, |version| format!(" {version}"));
    let mut summary = String::new();
    if report.permissions_fixed {
        summary.push_str("  Bundled runtime prepared.\n");
    }
    summary.push_str(&format!(
        "  Java{version} ({} runtime) is available at {}.\n  Compiler jar found at {}.\n",
        report.runtime.source(),
        report.runtime.program(),
        report.compiler_jar,
    ));
    write_stdout(&summary)
}

fn handle_check_java(settings: &Settings) -> Result<()> {
    let layout = settings.layout()?;
    let resolver = RuntimeResolver::with_process_probe(settings.runtime_config(&layout));
    match check_java(&resolver) {
        Ok(version) => write_stdout(&format!("Java {version} is installed.\n")),
        Err(source) => {
            let program = resolver.environment_candidate().program().to_path_buf();
            write_stderr(&java_guidance(&program))?;
            Err(RunnerError::JavaMissing { program, source }.into())
        }
    }
}

fn java_guidance(program: &Utf8Path) -> String {
    format!(
        "\n  closurec cannot find Java at:\n\n    {program}\n\n  \
         Please install Java and make sure one of the following conditions is met:\n\n    \
         a) JRE: Add the jre/bin directory to your PATH environment variable\n    \
         b) JDK: Set the JAVA_HOME environment variable to point to the\n       \
         jdk directory (not jdk/bin)\n\n"
    )
}

#[cfg(test)]
mod tests;
