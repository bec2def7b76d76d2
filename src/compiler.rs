//! Compile orchestration.
//!
//! A run moves through a fixed sequence of stages:
//!
//! ```text
//! Idle -> BuildingArguments -> ResolvingRuntime -> Spawning -> Running -> Succeeded | Failed
//! ```
//!
//! Argument building and runtime resolution happen on the caller's thread, so
//! their errors are returned directly. Execution either blocks
//! ([`Compiler::compile`]) or moves to a worker thread whose outcome is
//! delivered to a callback exactly once ([`Compiler::compile_with_callback`]).

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::{
    fmt, io,
    sync::atomic::{AtomicU64, Ordering},
    thread,
};

use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use thiserror::Error;

use crate::args::{ArgumentError, Invocation, build_arguments};
use crate::invoke::{
    InvokeError, OutputStream, ProcessOutput, RunLimits, StdinSource, run_process,
};
use crate::layout::InstallLayout;
use crate::options::Options;
use crate::runtime::{Candidate, RuntimeConfig, RuntimeError, RuntimeResolver};

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// Sources, options and optional standard input for one run.
#[derive(Debug, Default)]
pub struct CompileRequest {
    files: Vec<Utf8PathBuf>,
    options: Options,
    stdin: StdinSource,
}

impl CompileRequest {
    /// Request compiling `files` with no options.
    #[must_use]
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Replace the option mapping.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Feed `stdin` to the compiler.
    #[must_use]
    pub fn with_stdin(mut self, stdin: impl Into<StdinSource>) -> Self {
        self.stdin = stdin.into();
        self
    }

    /// Source files, in order.
    #[must_use]
    pub fn files(&self) -> &[Utf8PathBuf] {
        &self.files
    }

    /// Option mapping for this run.
    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutput {
    /// Compiled JavaScript read from the tool's stdout.
    pub code: String,
    /// Diagnostics the tool printed on stderr while still succeeding.
    pub warnings: Option<String>,
}

/// Errors raised by a compile run.
#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    /// Sources or options were rejected before spawning.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Arguments(#[from] ArgumentError),

    /// No callable Java runtime was found.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Runtime(#[from] RuntimeError),

    /// The install layout could not be determined.
    #[error("failed to locate the closurec home directory")]
    #[diagnostic(
        code(closurec::compile::layout),
        help("set CLOSUREC_HOME to the directory holding compiler/compiler.jar")
    )]
    Layout(#[source] io::Error),

    /// The Java process could not be started.
    #[error("failed to start {program}")]
    #[diagnostic(code(closurec::compile::spawn))]
    Spawn {
        /// Java program that was executed.
        program: Utf8PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The compiler exited unsuccessfully or was killed by a signal.
    #[error("{}", exit_message(.status, .stderr))]
    #[diagnostic(code(closurec::compile::exit))]
    Exit {
        /// Exit code, or `None` when terminated by a signal.
        status: Option<i32>,
        /// Captured standard error.
        stderr: String,
        /// Captured standard output.
        stdout: String,
    },

    /// The compiler produced more output than allowed.
    #[error("compiler {stream} exceeded the {limit} byte limit")]
    #[diagnostic(
        code(closurec::compile::output_limit),
        help("raise --max-output-bytes")
    )]
    OutputLimit {
        /// Stream that overflowed.
        stream: OutputStream,
        /// Configured byte ceiling.
        limit: u64,
    },

    /// Communicating with the compiler process failed.
    #[error("compiler process failed")]
    #[diagnostic(code(closurec::compile::process))]
    Process(#[source] InvokeError),

    /// The worker stopped before reporting an outcome.
    #[error("compile worker stopped before reporting a result")]
    #[diagnostic(code(closurec::compile::aborted))]
    Aborted,
}

fn exit_message(status: &Option<i32>, stderr: &str) -> String {
    let head = match *status {
        Some(code) => format!("compiler exited with status {code}"),
        None => String::from("compiler was terminated by a signal"),
    };
    let detail = stderr.trim();
    if detail.is_empty() {
        head
    } else {
        format!("{head}:\n{detail}")
    }
}

impl From<InvokeError> for CompileError {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::Spawn { program, source } => Self::Spawn { program, source },
            InvokeError::OutputLimit { stream, limit } => Self::OutputLimit { stream, limit },
            other => Self::Process(other),
        }
    }
}

/// Per-run progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStage {
    /// Created, nothing done yet.
    Idle,
    /// Validating sources and options.
    BuildingArguments,
    /// Selecting a Java runtime.
    ResolvingRuntime,
    /// Starting the Java process.
    Spawning,
    /// Waiting for the process to exit.
    Running,
    /// Finished with output.
    Succeeded,
    /// Finished with an error.
    Failed,
}

impl fmt::Display for InvocationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug)]
struct StageTracker {
    run: u64,
    stage: InvocationStage,
}

impl StageTracker {
    fn start() -> Self {
        Self {
            run: NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed),
            stage: InvocationStage::Idle,
        }
    }

    fn advance(&mut self, next: InvocationStage) {
        tracing::debug!(run = self.run, from = %self.stage, to = %next, "compile stage");
        self.stage = next;
    }

    fn finish<T>(mut self, result: &Result<T, CompileError>) {
        self.advance(if result.is_ok() {
            InvocationStage::Succeeded
        } else {
            InvocationStage::Failed
        });
    }
}

/// A validated run: the chosen runtime plus its argument vector.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    runtime: Candidate,
    invocation: Invocation,
}

impl PreparedRun {
    /// Runtime chosen for this run.
    #[must_use]
    pub const fn runtime(&self) -> &Candidate {
        &self.runtime
    }

    /// Arguments passed to the runtime.
    #[must_use]
    pub const fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Shell-quoted command line, for logs and dry runs.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.invocation.render(self.program())
    }

    fn program(&self) -> &Utf8Path {
        self.runtime.program()
    }
}

/// Runs the Closure Compiler jar on a resolved Java runtime.
#[derive(Debug, Clone)]
pub struct Compiler {
    layout: InstallLayout,
    resolver: RuntimeResolver,
    default_options: Options,
    limits: RunLimits,
}

impl Compiler {
    /// Compiler using `layout` for the jar and externs and `resolver` for Java.
    #[must_use]
    pub fn new(layout: InstallLayout, resolver: RuntimeResolver) -> Self {
        Self {
            layout,
            resolver,
            default_options: Options::new(),
            limits: RunLimits::default(),
        }
    }

    /// Compiler configured from `CLOSUREC_HOME` and `JAVA_HOME`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Layout`] when the home directory cannot be
    /// determined.
    pub fn from_env() -> Result<Self, CompileError> {
        let layout = InstallLayout::from_env().map_err(CompileError::Layout)?;
        let resolver = RuntimeResolver::with_process_probe(RuntimeConfig::from_env(&layout));
        Ok(Self::new(layout, resolver))
    }

    /// Options applied under every request's own options.
    #[must_use]
    pub fn with_default_options(mut self, options: Options) -> Self {
        self.default_options = options;
        self
    }

    /// Per-stream capture budget; defaults to
    /// [`crate::invoke::DEFAULT_MAX_OUTPUT_BYTES`].
    #[must_use]
    pub const fn with_max_output_bytes(mut self, bytes: u64) -> Self {
        self.limits.max_output_bytes = bytes;
        self
    }

    /// Install layout in use.
    #[must_use]
    pub const fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// Runtime resolver in use.
    #[must_use]
    pub const fn resolver(&self) -> &RuntimeResolver {
        &self.resolver
    }

    /// Build the argument vector and pick a runtime without running anything.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Arguments`] or [`CompileError::Runtime`].
    pub fn prepare(&self, files: &[Utf8PathBuf], options: &Options) -> Result<PreparedRun, CompileError> {
        self.prepare_tracked(files, options, &mut StageTracker::start())
    }

    /// Run the compiler and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] describing the first failure encountered.
    pub fn compile(&self, request: CompileRequest) -> Result<CompileOutput, CompileError> {
        let mut tracker = StageTracker::start();
        let result = self
            .prepare_tracked(&request.files, &request.options, &mut tracker)
            .and_then(|prepared| execute(&prepared, request.stdin, self.limits, &mut tracker));
        tracker.finish(&result);
        result
    }

    /// Validate synchronously, then run the compiler on a worker thread and
    /// pass the outcome to `callback`.
    ///
    /// The callback is called exactly once, and only when this method
    /// returns `Ok`. If the worker unwinds before reporting, the callback
    /// receives [`CompileError::Aborted`].
    ///
    /// Runtime resolution happens before the worker starts, so this call
    /// blocks while each candidate answers `-version` (bounded by
    /// [`crate::runtime::PROBE_TIMEOUT`] per candidate). Only the compile
    /// itself runs off the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Arguments`] or [`CompileError::Runtime`]
    /// without calling `callback`, or [`CompileError::Process`] if the worker
    /// thread cannot be started.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use closurec::{CompileRequest, Compiler};
    ///
    /// let compiler = Compiler::from_env()?;
    /// let handle = compiler.compile_with_callback(CompileRequest::new(["app.js"]), |result| {
    ///     match result {
    ///         Ok(output) => print!("{}", output.code),
    ///         Err(err) => eprintln!("{err}"),
    ///     }
    /// })?;
    /// handle.join().ok();
    /// # Ok::<(), closurec::CompileError>(())
    /// ```
    pub fn compile_with_callback<F>(
        &self,
        request: CompileRequest,
        callback: F,
    ) -> Result<thread::JoinHandle<()>, CompileError>
    where
        F: FnOnce(Result<CompileOutput, CompileError>) + Send + 'static,
    {
        let mut tracker = StageTracker::start();
        let prepared = match self.prepare_tracked(&request.files, &request.options, &mut tracker) {
            Ok(prepared) => prepared,
            Err(err) => {
                tracker.advance(InvocationStage::Failed);
                return Err(err);
            }
        };
        let limits = self.limits;
        let stdin = request.stdin;
        thread::Builder::new()
            .name(format!("closurec-run-{}", tracker.run))
            .spawn(move || {
                let completion = Completion::new(callback);
                let result = execute(&prepared, stdin, limits, &mut tracker);
                tracker.finish(&result);
                completion.complete(result);
            })
            .map_err(|err| CompileError::Process(InvokeError::Io(err)))
    }

    fn prepare_tracked(
        &self,
        files: &[Utf8PathBuf],
        options: &Options,
        tracker: &mut StageTracker,
    ) -> Result<PreparedRun, CompileError> {
        tracker.advance(InvocationStage::BuildingArguments);
        let merged = options.merged_over(&self.default_options);
        let invocation = build_arguments(files, &merged, &self.layout)?;
        tracker.advance(InvocationStage::ResolvingRuntime);
        let runtime = self.resolver.select()?;
        Ok(PreparedRun {
            runtime,
            invocation,
        })
    }
}

fn execute(
    prepared: &PreparedRun,
    stdin: StdinSource,
    limits: RunLimits,
    tracker: &mut StageTracker,
) -> Result<CompileOutput, CompileError> {
    tracker.advance(InvocationStage::Spawning);
    tracing::debug!(run = tracker.run, command = %prepared.command_line(), "running compiler");
    tracker.advance(InvocationStage::Running);
    let output = run_process(
        prepared.program(),
        &prepared.invocation.to_args(),
        stdin,
        limits,
    )?;
    map_outcome(&output)
}

/// Exit status decides success; stderr on success becomes warnings.
fn map_outcome(output: &ProcessOutput) -> Result<CompileOutput, CompileError> {
    let stdout = output.stdout_text();
    let stderr = output.stderr_text();
    if output.status.success() {
        Ok(CompileOutput {
            code: stdout,
            warnings: (!stderr.is_empty()).then_some(stderr),
        })
    } else {
        Err(CompileError::Exit {
            status: output.status.code(),
            stderr,
            stdout,
        })
    }
}

/// Delivers a result to a callback exactly once, reporting
/// [`CompileError::Aborted`] if dropped unused.
struct Completion<F>
where
    F: FnOnce(Result<CompileOutput, CompileError>),
{
    callback: Option<F>,
}

impl<F> Completion<F>
where
    F: FnOnce(Result<CompileOutput, CompileError>),
{
    const fn new(callback: F) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    fn complete(mut self, result: Result<CompileOutput, CompileError>) {
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }
}

impl<F> Drop for Completion<F>
where
    F: FnOnce(Result<CompileOutput, CompileError>),
{
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            tracing::warn!("compile worker ended without a result");
            callback(Err(CompileError::Aborted));
        }
    }
}

/// Compile `request` with a [`Compiler`] configured from the environment,
/// delivering the outcome to `callback` on a worker thread.
///
/// # Errors
///
/// See [`Compiler::from_env`] and [`Compiler::compile_with_callback`].
pub fn compile<F>(request: CompileRequest, callback: F) -> Result<thread::JoinHandle<()>, CompileError>
where
    F: FnOnce(Result<CompileOutput, CompileError>) + Send + 'static,
{
    Compiler::from_env()?.compile_with_callback(request, callback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex, PoisonError};

    #[cfg(unix)]
    fn status(code: i32) -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(unix)]
    #[test]
    fn success_with_stderr_reports_warnings() {
        let output = ProcessOutput {
            status: status(0),
            stdout: b"var a=1;".to_vec(),
            stderr: b"WARNING - unused".to_vec(),
        };
        let mapped = map_outcome(&output).expect("success");
        assert_eq!(mapped.code, "var a=1;");
        assert_eq!(mapped.warnings.as_deref(), Some("WARNING - unused"));
    }

    #[cfg(unix)]
    #[test]
    fn clean_success_has_no_warnings() {
        let output = ProcessOutput {
            status: status(0),
            stdout: b"x".to_vec(),
            stderr: Vec::new(),
        };
        assert_eq!(map_outcome(&output).expect("success").warnings, None);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_fails_with_captured_streams() {
        let output = ProcessOutput {
            status: status(2),
            stdout: b"partial".to_vec(),
            stderr: b"ERROR - parse error".to_vec(),
        };
        let err = map_outcome(&output).expect_err("failure");
        match &err {
            CompileError::Exit {
                status,
                stderr,
                stdout,
            } => {
                assert_eq!(*status, Some(2));
                assert_eq!(stderr, "ERROR - parse error");
                assert_eq!(stdout, "partial");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "compiler exited with status 2:\nERROR - parse error"
        );
    }

    #[cfg(unix)]
    #[test]
    fn signal_termination_has_no_status() {
        use std::os::unix::process::ExitStatusExt;
        let output = ProcessOutput {
            status: std::process::ExitStatus::from_raw(9),
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        let err = map_outcome(&output).expect_err("killed");
        assert!(matches!(err, CompileError::Exit { status: None, .. }));
        assert_eq!(err.to_string(), "compiler was terminated by a signal");
    }

    #[test]
    fn spawn_and_limit_failures_keep_their_kind() {
        let spawn = CompileError::from(InvokeError::Spawn {
            program: Utf8PathBuf::from("java"),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert!(matches!(spawn, CompileError::Spawn { .. }));
        let limit = CompileError::from(InvokeError::OutputLimit {
            stream: OutputStream::Stdout,
            limit: 4,
        });
        assert!(matches!(limit, CompileError::OutputLimit { limit: 4, .. }));
    }

    #[test]
    fn completion_fires_once_with_result() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let completion = Completion::new(move |result: Result<CompileOutput, CompileError>| {
            sink.lock().expect("lock").push(result.is_ok());
        });
        completion.complete(Ok(CompileOutput {
            code: String::new(),
            warnings: None,
        }));
        assert_eq!(*calls.lock().expect("lock"), vec![true]);
    }

    #[test]
    fn completion_reports_abort_when_worker_unwinds() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let handle = thread::spawn(move || {
            let _completion = Completion::new(move |result: Result<CompileOutput, CompileError>| {
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(matches!(result, Err(CompileError::Aborted)));
            });
            panic!("worker failure");
        });
        assert!(handle.join().is_err());
        // The guard locks while unwinding, which poisons the mutex.
        let seen = calls.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(*seen, vec![true]);
    }
}
