//! Library-level tests for [`closurec::Compiler`] against a scripted runtime.
#![cfg(unix)]

use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, ensure};
use camino::Utf8PathBuf;
use closurec::layout::InstallLayout;
use closurec::options::Options;
use closurec::runtime::{RuntimeConfig, RuntimeResolver};
use closurec::{CompileError, CompileOutput, CompileRequest, Compiler};
use closurec_env::{HOME_ENV, JAVA_HOME_ENV};
use rstest::{fixture, rstest};
use serial_test::serial;
use test_support::{ARGS_LOG, EnvLock, EnvVarGuard, FAKE_WARNING, FakeInstall, FakeJava, display_error_chain, isolate_env};

const WAIT: Duration = Duration::from_secs(30);

struct Project {
    install: FakeInstall,
    source: Utf8PathBuf,
}

impl Project {
    fn compiler(&self, java_home: Option<Utf8PathBuf>) -> Compiler {
        let layout = InstallLayout::new(self.install.home());
        let mut config = RuntimeConfig::new(layout.bundled_java());
        config.java_home = java_home;
        Compiler::new(layout, RuntimeResolver::with_process_probe(config))
    }

    fn with_jdk(&self) -> Result<Compiler> {
        let jdk = self.install.java_home(&FakeJava::default())?;
        Ok(self.compiler(Some(jdk)))
    }
}

#[fixture]
fn project() -> Project {
    let install = FakeInstall::new().expect("create install");
    let source = install
        .write_file("lib/util.js", "var util = {};\n")
        .expect("write source");
    Project { install, source }
}

type Outcome = Result<CompileOutput, CompileError>;

fn run_with_callback(compiler: &Compiler, request: CompileRequest) -> Result<Vec<Outcome>> {
    let (tx, rx) = mpsc::channel();
    let handle = compiler
        .compile_with_callback(request, move |result| {
            tx.send(result).ok();
        })
        .context("start compile")?;
    handle
        .join()
        .map_err(|_| anyhow!("compile worker panicked"))?;
    let mut outcomes = Vec::new();
    while let Ok(outcome) = rx.recv_timeout(WAIT) {
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

#[rstest]
fn compile_returns_code_without_warnings(project: Project) -> Result<()> {
    let output = project
        .with_jdk()?
        .compile(CompileRequest::new([project.source.clone()]))?;
    ensure!(output.code == "var util = {};\n", "code: {:?}", output.code);
    ensure!(output.warnings.is_none(), "warnings: {:?}", output.warnings);
    Ok(())
}

#[rstest]
fn compile_reports_warnings_separately(project: Project) -> Result<()> {
    let request = CompileRequest::new([project.source.clone()])
        .with_options(Options::new().with("warn", true));
    let output = project.with_jdk()?.compile(request)?;
    ensure!(output.code == "var util = {};\n", "code: {:?}", output.code);
    ensure!(
        output
            .warnings
            .as_deref()
            .is_some_and(|text| text.contains(FAKE_WARNING)),
        "warnings: {:?}",
        output.warnings
    );
    Ok(())
}

#[rstest]
fn compile_feeds_stdin_to_the_tool(project: Project) -> Result<()> {
    let request = CompileRequest::new(Vec::<Utf8PathBuf>::new()).with_stdin("var piped;\n");
    let output = project.with_jdk()?.compile(request)?;
    ensure!(output.code == "var piped;\n", "code: {:?}", output.code);
    Ok(())
}

#[rstest]
fn callback_fires_exactly_once_on_success(project: Project) -> Result<()> {
    let compiler = project.with_jdk()?;
    let outcomes = run_with_callback(&compiler, CompileRequest::new([project.source.clone()]))?;
    ensure!(outcomes.len() == 1, "callback count: {}", outcomes.len());
    let Some(Ok(output)) = outcomes.into_iter().next() else {
        return Err(anyhow!("expected a successful compile"));
    };
    ensure!(output.code == "var util = {};\n", "code: {:?}", output.code);
    Ok(())
}

#[rstest]
fn callback_receives_tool_failure(project: Project) -> Result<()> {
    let compiler = project.with_jdk()?;
    let request = CompileRequest::new([project.source.clone()])
        .with_options(Options::new().with("fail", true));
    let outcomes = run_with_callback(&compiler, request)?;
    ensure!(outcomes.len() == 1, "callback count: {}", outcomes.len());
    match outcomes.into_iter().next() {
        Some(Err(CompileError::Exit { status, stderr, .. })) => {
            ensure!(status == Some(2), "status: {status:?}");
            ensure!(stderr.contains("fake failure"), "stderr: {stderr}");
            Ok(())
        }
        other => Err(anyhow!("expected an exit failure, got {other:?}")),
    }
}

#[rstest]
fn invalid_request_fails_before_the_callback(project: Project) -> Result<()> {
    let compiler = project.with_jdk()?;
    let (tx, rx) = mpsc::channel::<Outcome>();
    let request = CompileRequest::new(["lib/missing.js"]);
    let err = compiler
        .compile_with_callback(request, move |result| {
            tx.send(result).ok();
        })
        .err()
        .context("missing source should be rejected")?;
    ensure!(
        matches!(err, CompileError::Arguments(_)),
        "unexpected error: {err}"
    );
    ensure!(rx.recv_timeout(WAIT).is_err(), "callback must not run");
    Ok(())
}

#[rstest]
fn oversized_output_is_an_error(project: Project) -> Result<()> {
    let compiler = project.with_jdk()?.with_max_output_bytes(4);
    let err = compiler
        .compile(CompileRequest::new([project.source.clone()]))
        .err()
        .context("output limit should trip")?;
    ensure!(
        matches!(err, CompileError::OutputLimit { limit: 4, .. }),
        "unexpected error: {}",
        display_error_chain(&err)
    );
    Ok(())
}

#[rstest]
fn no_runtime_is_a_runtime_error(project: Project) -> Result<()> {
    let jdk = project.install.java_home(&FakeJava::broken())?;
    project.install.bundled_java(&FakeJava::broken())?;
    let err = project
        .compiler(Some(jdk))
        .compile(CompileRequest::new([project.source.clone()]))
        .err()
        .context("compile should fail without a runtime")?;
    ensure!(
        matches!(err, CompileError::Runtime(_)),
        "unexpected error: {}",
        display_error_chain(&err)
    );
    ensure!(
        !project.install.jdk_bin().join(ARGS_LOG).exists()
            && !project.install.jre_bin().join(ARGS_LOG).exists(),
        "no compiler run should start without a runtime"
    );
    Ok(())
}

#[rstest]
fn prepare_prefers_environment_runtime(project: Project) -> Result<()> {
    project.install.bundled_java(&FakeJava::default())?;
    let compiler = project.with_jdk()?;
    let prepared = compiler.prepare(&[project.source.clone()], &Options::new())?;
    ensure!(
        prepared.runtime().program() == project.install.jdk_bin().join("java"),
        "picked {}",
        prepared.runtime().program()
    );
    Ok(())
}

#[rstest]
#[serial]
fn compile_entry_point_reads_the_environment(project: Project) -> Result<()> {
    let jdk = project.install.java_home(&FakeJava::default())?;
    let home = project.install.home();
    let outcomes = {
        let _lock = EnvLock::acquire();
        let _cleared = isolate_env();
        let _home = EnvVarGuard::set(HOME_ENV, home.as_str());
        let _java = EnvVarGuard::set(JAVA_HOME_ENV, jdk.as_str());
        let (tx, rx) = mpsc::channel();
        let handle = closurec::compile(CompileRequest::new([project.source.clone()]), move |result| {
            tx.send(result).ok();
        })
        .context("start compile")?;
        handle
            .join()
            .map_err(|_| anyhow!("compile worker panicked"))?;
        rx.recv_timeout(WAIT).context("callback result")?
    };
    let output = outcomes.context("compile")?;
    ensure!(output.code == "var util = {};\n", "code: {:?}", output.code);
    Ok(())
}
