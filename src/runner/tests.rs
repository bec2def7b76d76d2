//! Unit tests for runner helpers.

use super::*;
use crate::options::OptionValue;
use anyhow::{Context, anyhow, ensure};
use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Workspace {
    root: Utf8PathBuf,
    _tempdir: TempDir,
}

#[fixture]
fn workspace() -> Workspace {
    let tempdir = TempDir::new().expect("create tempdir");
    let root = Utf8PathBuf::from_path_buf(tempdir.path().to_path_buf())
        .map_err(|path| anyhow!("utf8 path required, got {:?}", path))
        .expect("utf8 tempdir");
    Workspace {
        root,
        _tempdir: tempdir,
    }
}

#[rstest]
fn options_json_is_loaded_in_order(workspace: Workspace) -> Result<()> {
    let path = workspace.root.join("options.json");
    fs::write(
        &path,
        r#"{"Compilation_Level": "ADVANCED", "externs": ["node"], "debug": true}"#,
    )
    .context("write options")?;
    let options = load_options_json(&path)?;
    let keys: Vec<&str> = options.iter().map(|(key, _)| key).collect();
    ensure!(keys == ["compilation_level", "externs", "debug"], "keys: {keys:?}");
    ensure!(
        options.get("externs") == Some(&OptionValue::List(vec![String::from("node")])),
        "externs: {:?}",
        options.get("externs")
    );
    Ok(())
}

#[rstest]
#[case(r#"["not", "an", "object"]"#)]
#[case(r#"{"define": null}"#)]
#[case("{")]
fn malformed_options_json_is_rejected(workspace: Workspace, #[case] body: &str) -> Result<()> {
    let path = workspace.root.join("options.json");
    fs::write(&path, body).context("write options")?;
    let err = load_options_json(&path).expect_err("invalid options");
    ensure!(
        matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::OptionsJson { .. })
        ),
        "unexpected error: {err:#}"
    );
    Ok(())
}

#[rstest]
fn missing_options_json_names_the_file(workspace: Workspace) {
    let path = workspace.root.join("absent.json");
    let err = load_options_json(&path).expect_err("missing file");
    assert!(format!("{err:#}").contains("absent.json"));
}

#[test]
fn guidance_names_the_probed_program() {
    let text = java_guidance(Utf8Path::new("/usr/lib/jvm/bin/java"));
    assert!(text.contains("/usr/lib/jvm/bin/java"));
    assert!(text.contains("JAVA_HOME"));
}
