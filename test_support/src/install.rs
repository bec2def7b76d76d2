//! Temporary closurec install trees.

use std::fs;

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use crate::java::FakeJava;

/// A throwaway install root with `compiler/compiler.jar` in place.
///
/// The tree is removed when the value is dropped.
#[derive(Debug)]
pub struct FakeInstall {
    root: Utf8PathBuf,
    _temp: TempDir,
}

impl FakeInstall {
    /// Create the install root and an empty compiler jar.
    pub fn new() -> Result<Self> {
        let temp = TempDir::new().context("create tempdir")?;
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
            .map_err(|path| anyhow!("utf8 path required, got {}", path.display()))?;
        let install = Self { root, _temp: temp };
        install.write_file("home/compiler/compiler.jar", "")?;
        Ok(install)
    }

    /// Directory scratch files live under.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The install root, suitable for `--home` or `CLOSUREC_HOME`.
    #[must_use]
    pub fn home(&self) -> Utf8PathBuf {
        self.root.join("home")
    }

    /// Bin directory of the bundled runtime.
    #[must_use]
    pub fn jre_bin(&self) -> Utf8PathBuf {
        self.home().join("jre/bin")
    }

    /// Bin directory of the `JAVA_HOME` runtime created by [`Self::java_home`].
    #[must_use]
    pub fn jdk_bin(&self) -> Utf8PathBuf {
        self.root.join("jdk/bin")
    }

    /// Install `java` as the bundled runtime and return its path.
    pub fn bundled_java(&self, java: &FakeJava) -> Result<Utf8PathBuf> {
        java.write(&self.jre_bin())
    }

    /// Install `java` under a separate JDK root and return that root.
    pub fn java_home(&self, java: &FakeJava) -> Result<Utf8PathBuf> {
        java.write(&self.jdk_bin())?;
        Ok(self.root.join("jdk"))
    }

    /// Remove the compiler jar.
    pub fn without_jar(&self) -> Result<()> {
        let jar = self.home().join("compiler/compiler.jar");
        fs::remove_file(&jar).with_context(|| format!("remove {jar}"))
    }

    /// Add a file to the shipped `externs/` directory.
    pub fn add_extern(&self, name: &str, body: &str) -> Result<Utf8PathBuf> {
        self.write_file(&format!("home/externs/{name}"), body)
    }

    /// Write `body` to `relative` under the scratch root.
    pub fn write_file(&self, relative: &str, body: &str) -> Result<Utf8PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {parent}"))?;
        }
        fs::write(&path, body).with_context(|| format!("write {path}"))?;
        Ok(path)
    }
}
