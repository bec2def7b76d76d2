//! Helpers for creating executable stubs in tests.
//!
//! These utilities write tiny shell scripts and mark them executable so tests
//! can exercise runtime resolution without depending on a real JVM. Callers
//! own the containing directory's lifetime to keep the stub on disk.
//!
//! # Examples
//!
//! ```rust
//! use camino::Utf8Path;
//! use tempfile::TempDir;
//! use test_support::write_exec;
//!
//! let temp = TempDir::new().expect("tempdir");
//! let root = Utf8Path::from_path(temp.path()).expect("utf8 path");
//! let path = write_exec(root, "java", "exit 0\n").expect("stub executable");
//! assert!(path.exists());
//! ```

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Write an executable `/bin/sh` script named `name` inside `root`.
///
/// `body` is appended after the shebang line. Missing parent directories of
/// `root` are created.
pub fn write_exec(root: &Utf8Path, name: &str, body: &str) -> Result<Utf8PathBuf> {
    fs::create_dir_all(root).with_context(|| format!("create {root}"))?;
    let path = root.join(name);
    fs::write(path.as_std_path(), format!("#!/bin/sh\n{body}"))
        .with_context(|| format!("write exec stub {name}"))?;
    make_executable(&path)?;
    Ok(path)
}

/// Mark an existing file as executable on Unix; no-op elsewhere.
pub fn make_executable(path: &Utf8Path) -> Result<()> {
    set_mode(path, 0o755)
}

/// Strip the execute bits from `path` on Unix; no-op elsewhere.
///
/// Used to simulate a bundled runtime unpacked without permissions.
pub fn make_non_executable(path: &Utf8Path) -> Result<()> {
    set_mode(path, 0o644)
}

fn set_mode(path: &Utf8Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let mut perms = fs::metadata(path.as_std_path())
            .with_context(|| format!("stat {path}"))?
            .permissions();
        perms.set_mode(mode);
        fs::set_permissions(path.as_std_path(), perms)
            .with_context(|| format!("chmod {path}"))?;
    }

    #[cfg(not(unix))]
    let _ = (path, mode);

    Ok(())
}
