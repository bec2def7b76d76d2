//! Install layout for the compiler jar, bundled runtime and externs.
//!
//! Everything closurec ships next to itself lives under a single home
//! directory:
//!
//! ```text
//! <home>/compiler/compiler.jar
//! <home>/jre/bin/java[.exe]
//! <home>/externs/*.js
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use closurec_env::HOME_ENV;
use std::{env, ffi::OsString, io};

/// Platform extension for the Java executable.
#[cfg(windows)]
pub const JAVA_EXT: &str = ".exe";
/// Platform extension for the Java executable.
#[cfg(not(windows))]
pub const JAVA_EXT: &str = "";

/// Bare Java program name, resolved through the search path.
pub const JAVA_PROGRAM: &str = "java";

const COMPILER_DIR: &str = "compiler";
const COMPILER_JAR: &str = "compiler.jar";
const JRE_DIR: &str = "jre";
const EXTERNS_DIR: &str = "externs";

/// Return the Java executable file name for this platform.
#[must_use]
pub fn java_file_name() -> String {
    format!("{JAVA_PROGRAM}{JAVA_EXT}")
}

/// Paths derived from the closurec home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    home: Utf8PathBuf,
}

impl InstallLayout {
    /// Build a layout rooted at `home`.
    #[must_use]
    pub fn new(home: impl Into<Utf8PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Resolve the layout from `CLOSUREC_HOME`, falling back to the directory
    /// holding the running executable.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] when neither source yields a UTF-8 directory.
    pub fn from_env() -> io::Result<Self> {
        Self::from_env_with(|key| env::var_os(key), env::current_exe)
    }

    pub(crate) fn from_env_with<F, G>(mut read_env: F, current_exe: G) -> io::Result<Self>
    where
        F: FnMut(&str) -> Option<OsString>,
        G: FnOnce() -> io::Result<std::path::PathBuf>,
    {
        if let Some(home) = read_env(HOME_ENV).filter(|value| !value.is_empty()) {
            let path = Utf8PathBuf::from_path_buf(home.into()).map_err(|path| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{HOME_ENV} is not valid UTF-8: {}", path.display()),
                )
            })?;
            return Ok(Self::new(path));
        }
        let exe = current_exe()?;
        let utf8 = Utf8PathBuf::from_path_buf(exe).map_err(|path| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("executable path is not valid UTF-8: {}", path.display()),
            )
        })?;
        let home = utf8.parent().map_or_else(
            || Utf8PathBuf::from("."),
            Utf8Path::to_path_buf,
        );
        Ok(Self::new(home))
    }

    /// Root directory of the install.
    #[must_use]
    pub fn home(&self) -> &Utf8Path {
        &self.home
    }

    /// Directory holding the downloaded compiler archive contents.
    #[must_use]
    pub fn compiler_dir(&self) -> Utf8PathBuf {
        self.home.join(COMPILER_DIR)
    }

    /// Path of the compiler jar passed to `java -jar`.
    #[must_use]
    pub fn compiler_jar(&self) -> Utf8PathBuf {
        self.compiler_dir().join(COMPILER_JAR)
    }

    /// Root of the bundled Java runtime.
    #[must_use]
    pub fn jre_dir(&self) -> Utf8PathBuf {
        self.home.join(JRE_DIR)
    }

    /// `bin` directory of the bundled Java runtime.
    #[must_use]
    pub fn jre_bin_dir(&self) -> Utf8PathBuf {
        self.jre_dir().join("bin")
    }

    /// Java executable of the bundled runtime.
    #[must_use]
    pub fn bundled_java(&self) -> Utf8PathBuf {
        self.jre_bin_dir().join(java_file_name())
    }

    /// Directory selected by the `node` externs alias.
    #[must_use]
    pub fn externs_dir(&self) -> Utf8PathBuf {
        self.home.join(EXTERNS_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn paths_hang_off_home() {
        let layout = InstallLayout::new("/opt/closurec");
        assert_eq!(
            layout.compiler_jar(),
            Utf8PathBuf::from("/opt/closurec/compiler/compiler.jar")
        );
        assert_eq!(
            layout.bundled_java(),
            Utf8PathBuf::from(format!("/opt/closurec/jre/bin/java{JAVA_EXT}"))
        );
        assert_eq!(layout.externs_dir(), Utf8PathBuf::from("/opt/closurec/externs"));
    }

    #[test]
    fn home_env_overrides_executable_dir() {
        let layout = InstallLayout::from_env_with(
            |key| (key == HOME_ENV).then(|| OsString::from("/srv/cc")),
            || Ok(PathBuf::from("/usr/bin/closurec")),
        )
        .expect("layout from env");
        assert_eq!(layout.home(), Utf8Path::new("/srv/cc"));
    }

    #[test]
    fn empty_home_env_falls_back_to_executable_dir() {
        let layout = InstallLayout::from_env_with(
            |_| Some(OsString::new()),
            || Ok(PathBuf::from("/usr/lib/closurec/closurec")),
        )
        .expect("layout from exe");
        assert_eq!(layout.home(), Utf8Path::new("/usr/lib/closurec"));
    }
}
