//! Expansion of the `externs` option into concrete extern files.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

use crate::args::ArgumentError;
use crate::layout::InstallLayout;

/// Alias selecting the externs directory shipped with closurec.
pub const NODE_ALIAS: &str = "node";

/// Extension of extern declaration files picked up from directories.
pub const EXTERN_EXTENSION: &str = "js";

/// Expand raw `externs` entries into the list of files passed to the tool.
///
/// Directories contribute their immediate `.js` children, sorted by name.
pub(crate) fn expand_externs(
    entries: &[String],
    layout: &InstallLayout,
) -> Result<Vec<Utf8PathBuf>, ArgumentError> {
    let mut externs = Vec::new();
    for entry in entries {
        if entry.is_empty() {
            return Err(ArgumentError::ExternsNotPath {
                entry: entry.clone(),
            });
        }
        let path = if entry.eq_ignore_ascii_case(NODE_ALIAS) {
            layout.externs_dir()
        } else {
            Utf8PathBuf::from(entry)
        };
        match fs::metadata(path.as_std_path()) {
            Ok(meta) if meta.is_dir() => externs.extend(scan_directory(&path)?),
            Ok(meta) if meta.is_file() => externs.push(path),
            _ => return Err(ArgumentError::ExternsNotFound { path }),
        }
    }
    Ok(externs)
}

fn scan_directory(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ArgumentError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir.as_std_path())
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for walk_entry in walker {
        let entry = match walk_entry {
            Ok(value) => value,
            Err(err) if err.depth() == 0 => {
                return Err(ArgumentError::ExternsUnreadable {
                    path: dir.to_path_buf(),
                    source: err.into(),
                });
            }
            Err(err) => {
                tracing::debug!(
                    directory = %dir,
                    error = %err,
                    "skipping unreadable externs entry"
                );
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
            tracing::warn!(directory = %dir, "skipping externs entry with non-UTF-8 name");
            continue;
        };
        if has_extern_extension(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

fn has_extern_extension(path: &Utf8Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EXTERN_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result, anyhow, ensure};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct TempWorkspace {
        root: Utf8PathBuf,
        _tempdir: TempDir,
    }

    impl TempWorkspace {
        fn new() -> Result<Self> {
            let tempdir = TempDir::new().context("create tempdir")?;
            let root = Utf8PathBuf::from_path_buf(tempdir.path().to_path_buf())
                .map_err(|path| anyhow!("utf8 path required, got {:?}", path))?;
            Ok(Self {
                root,
                _tempdir: tempdir,
            })
        }

        fn touch(&self, relative: &str) -> Result<Utf8PathBuf> {
            let path = self.root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| format!("mkdir {parent}"))?;
            }
            fs::write(&path, b"/** @externs */\n").with_context(|| format!("write {path}"))?;
            Ok(path)
        }
    }

    #[fixture]
    fn workspace() -> TempWorkspace {
        TempWorkspace::new().expect("create utf8 temp workspace")
    }

    #[rstest]
    fn directory_contributes_js_children_only(workspace: TempWorkspace) -> Result<()> {
        let a = workspace.touch("ext/a.js")?;
        let b = workspace.touch("ext/B.JS")?;
        workspace.touch("ext/readme.md")?;
        workspace.touch("ext/nested/deep.js")?;
        let layout = InstallLayout::new(workspace.root.clone());

        let mut found = expand_externs(&[workspace.root.join("ext").into_string()], &layout)?;
        found.sort();
        let mut expected = vec![a, b];
        expected.sort();
        ensure!(found == expected, "unexpected externs: {found:?}");
        Ok(())
    }

    #[rstest]
    fn file_entry_is_used_verbatim(workspace: TempWorkspace) -> Result<()> {
        let file = workspace.touch("types.txt")?;
        let layout = InstallLayout::new(workspace.root.clone());
        let found = expand_externs(&[file.to_string()], &layout)?;
        ensure!(found == vec![file], "file extern should pass through");
        Ok(())
    }

    #[rstest]
    fn node_alias_selects_bundled_directory(workspace: TempWorkspace) -> Result<()> {
        let bundled = workspace.touch("externs/process.js")?;
        let layout = InstallLayout::new(workspace.root.clone());
        let found = expand_externs(&[String::from("Node")], &layout)?;
        ensure!(found == vec![bundled], "alias should expand the bundled dir");
        Ok(())
    }

    #[rstest]
    fn missing_entry_is_reported(workspace: TempWorkspace) {
        let layout = InstallLayout::new(workspace.root.clone());
        let err = expand_externs(&[String::from("/no/such/path")], &layout)
            .expect_err("missing externs");
        assert!(
            matches!(&err, ArgumentError::ExternsNotFound { path } if *path == "/no/such/path"),
            "unexpected error: {err:?}"
        );
        assert!(err.to_string().starts_with("externs file not found"));
    }

    #[rstest]
    fn empty_entry_is_not_a_path(workspace: TempWorkspace) {
        let layout = InstallLayout::new(workspace.root.clone());
        let err = expand_externs(&[String::new()], &layout).expect_err("empty externs");
        assert!(matches!(err, ArgumentError::ExternsNotPath { .. }));
    }
}
