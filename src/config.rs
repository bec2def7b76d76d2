//! Layered settings for the `closurec` binary.
//!
//! Layers, lowest precedence first:
//!
//! 1. built-in defaults;
//! 2. a JSON config file (`--config`, else `CLOSUREC_CONFIG_PATH`, else
//!    `./closurec.json` when present);
//! 3. environment variables and command-line flags, which clap merges with
//!    flags winning.
//!
//! ```json
//! {
//!   "home": "/opt/closurec",
//!   "java_home": "/usr/lib/jvm/17",
//!   "minimum_java": 11,
//!   "max_output_bytes": 41943040,
//!   "options": { "compilation_level": "ADVANCED" }
//! }
//! ```

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::{env, ffi::OsString, fs, io};

use camino::{Utf8Path, Utf8PathBuf};
use closurec_env::CONFIG_ENV;
use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::compiler::Compiler;
use crate::invoke::DEFAULT_MAX_OUTPUT_BYTES;
use crate::layout::InstallLayout;
use crate::options::Options;
use crate::runtime::{RuntimeConfig, RuntimeResolver};

/// Config file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "closurec.json";

/// Errors raised while loading settings.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}")]
    #[diagnostic(code(closurec::config::read))]
    Read {
        /// File that was read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The config file is not valid JSON or has unexpected keys.
    #[error("invalid config file {path}")]
    #[diagnostic(
        code(closurec::config::parse),
        help("expected keys: home, java_home, minimum_java, max_output_bytes, options")
    )]
    Parse {
        /// File that was parsed.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// No home directory was configured and the executable location is
    /// unusable.
    #[error("failed to determine the closurec home directory")]
    #[diagnostic(
        code(closurec::config::home),
        help("pass --home or set CLOSUREC_HOME")
    )]
    Home(#[source] io::Error),
}

/// Effective settings after layering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// closurec home holding the jar, bundled runtime and externs.
    pub home: Option<Utf8PathBuf>,
    /// Root of the Java installation to prefer.
    pub java_home: Option<Utf8PathBuf>,
    /// Lowest acceptable Java major version.
    pub minimum_java: Option<u32>,
    /// Per-stream capture budget for compiler output.
    pub max_output_bytes: Option<u64>,
    /// Options applied under every compile's own options.
    pub options: Options,
}

impl Settings {
    /// Parse settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the config file found by [`discover_config_path`], or defaults
    /// when there is none.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a discovered file cannot be loaded.
    pub fn discover(explicit: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let cwd = env::current_dir().ok().and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok());
        discover_config_path(explicit, |key| env::var_os(key), cwd.as_deref())
            .map_or_else(|| Ok(Self::default()), |path| Self::from_file(&path))
    }

    /// Overlay `upper` on `self`: values set in `upper` win and option
    /// mappings merge key by key.
    #[must_use]
    pub fn layered_with(self, upper: Self) -> Self {
        Self {
            home: upper.home.or(self.home),
            java_home: upper.java_home.or(self.java_home),
            minimum_java: upper.minimum_java.or(self.minimum_java),
            max_output_bytes: upper.max_output_bytes.or(self.max_output_bytes),
            options: upper.options.merged_over(&self.options),
        }
    }

    /// Install layout for these settings, falling back to the directory of
    /// the running executable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Home`] when no home is set and the executable
    /// path is unusable.
    pub fn layout(&self) -> Result<InstallLayout, ConfigError> {
        match &self.home {
            Some(home) => Ok(InstallLayout::new(home.clone())),
            None => InstallLayout::from_env_with(|_| None::<OsString>, env::current_exe)
                .map_err(ConfigError::Home),
        }
    }

    /// Runtime configuration for `layout`.
    #[must_use]
    pub fn runtime_config(&self, layout: &InstallLayout) -> RuntimeConfig {
        RuntimeConfig {
            java_home: self.java_home.clone(),
            bundled_java: layout.bundled_java(),
            minimum_major: self.minimum_java,
        }
    }

    /// Build a [`Compiler`] that probes candidates with real subprocesses.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Home`] when the layout cannot be determined.
    pub fn compiler(&self) -> Result<Compiler, ConfigError> {
        let layout = self.layout()?;
        let resolver = RuntimeResolver::with_process_probe(self.runtime_config(&layout));
        Ok(Compiler::new(layout, resolver)
            .with_default_options(self.options.clone())
            .with_max_output_bytes(self.max_output_bytes.unwrap_or(DEFAULT_MAX_OUTPUT_BYTES)))
    }
}

/// Locate the config file: `explicit`, else `CLOSUREC_CONFIG_PATH`, else
/// `closurec.json` in `cwd` when it exists.
#[must_use]
pub fn discover_config_path<F>(
    explicit: Option<&Utf8Path>,
    mut read_env: F,
    cwd: Option<&Utf8Path>,
) -> Option<Utf8PathBuf>
where
    F: FnMut(&str) -> Option<OsString>,
{
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = read_env(CONFIG_ENV)
        .filter(|value| !value.is_empty())
        .and_then(|value| Utf8PathBuf::from_path_buf(value.into()).ok())
    {
        return Some(path);
    }
    cwd.map(|dir| dir.join(DEFAULT_CONFIG_FILE))
        .filter(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionValue;
    use anyhow::{Context, Result, anyhow, ensure};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct ConfigDir {
        root: Utf8PathBuf,
        _tempdir: TempDir,
    }

    impl ConfigDir {
        fn write(&self, name: &str, body: &str) -> Result<Utf8PathBuf> {
            let path = self.root.join(name);
            fs::write(&path, body).with_context(|| format!("write {path}"))?;
            Ok(path)
        }
    }

    #[fixture]
    fn dir() -> ConfigDir {
        let tempdir = TempDir::new().expect("create tempdir");
        let root = Utf8PathBuf::from_path_buf(tempdir.path().to_path_buf())
            .map_err(|path| anyhow!("utf8 path required, got {:?}", path))
            .expect("utf8 tempdir");
        ConfigDir {
            root,
            _tempdir: tempdir,
        }
    }

    #[rstest]
    fn loads_every_key(dir: ConfigDir) -> Result<()> {
        let path = dir.write(
            "closurec.json",
            r#"{
                "home": "/opt/closurec",
                "java_home": "/usr/lib/jvm/17",
                "minimum_java": 11,
                "max_output_bytes": 1024,
                "options": {"Compilation_Level": "ADVANCED", "debug": true}
            }"#,
        )?;
        let settings = Settings::from_file(&path)?;
        ensure!(settings.home.as_deref() == Some(Utf8Path::new("/opt/closurec")), "home");
        ensure!(settings.minimum_java == Some(11), "minimum_java");
        ensure!(settings.max_output_bytes == Some(1024), "max_output_bytes");
        ensure!(
            settings.options.get("compilation_level") == Some(&OptionValue::from("ADVANCED")),
            "options: {:?}",
            settings.options
        );
        Ok(())
    }

    #[rstest]
    fn unknown_keys_are_rejected(dir: ConfigDir) -> Result<()> {
        let path = dir.write("bad.json", r#"{"jar": "x"}"#)?;
        let err = Settings::from_file(&path).expect_err("unknown key");
        ensure!(matches!(err, ConfigError::Parse { .. }), "unexpected: {err:?}");
        Ok(())
    }

    #[rstest]
    fn missing_file_is_a_read_error(dir: ConfigDir) {
        let err = Settings::from_file(&dir.root.join("absent.json")).expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn upper_layer_wins_and_options_merge() {
        let lower = Settings {
            home: Some(Utf8PathBuf::from("/file/home")),
            minimum_java: Some(8),
            options: Options::new().with("language_out", "ES5").with("debug", true),
            ..Settings::default()
        };
        let upper = Settings {
            minimum_java: Some(17),
            options: Options::new().with("debug", false),
            ..Settings::default()
        };
        let merged = lower.layered_with(upper);
        assert_eq!(merged.home.as_deref(), Some(Utf8Path::new("/file/home")));
        assert_eq!(merged.minimum_java, Some(17));
        assert_eq!(merged.options.get("language_out"), Some(&OptionValue::from("ES5")));
        assert_eq!(merged.options.get("debug"), Some(&OptionValue::Flag(false)));
    }

    #[rstest]
    fn explicit_path_beats_environment(dir: ConfigDir) {
        let explicit = dir.root.join("explicit.json");
        let found = discover_config_path(
            Some(explicit.as_path()),
            |_| Some(OsString::from("/env/config.json")),
            Some(dir.root.as_path()),
        );
        assert_eq!(found, Some(explicit));
    }

    #[rstest]
    fn environment_beats_working_directory(dir: ConfigDir) -> Result<()> {
        dir.write(DEFAULT_CONFIG_FILE, "{}")?;
        let found = discover_config_path(
            None,
            |key| (key == CONFIG_ENV).then(|| OsString::from("/env/config.json")),
            Some(dir.root.as_path()),
        );
        ensure!(found.as_deref() == Some(Utf8Path::new("/env/config.json")), "{found:?}");
        Ok(())
    }

    #[rstest]
    fn working_directory_file_is_optional(dir: ConfigDir) -> Result<()> {
        ensure!(discover_config_path(None, |_| None, Some(dir.root.as_path())).is_none(), "none");
        let path = dir.write(DEFAULT_CONFIG_FILE, "{}")?;
        ensure!(
            discover_config_path(None, |_| None, Some(dir.root.as_path())) == Some(path),
            "cwd config not found"
        );
        Ok(())
    }

    #[test]
    fn runtime_config_uses_layout_and_floor() {
        let settings = Settings {
            java_home: Some(Utf8PathBuf::from("/jdk")),
            minimum_java: Some(11),
            ..Settings::default()
        };
        let layout = InstallLayout::new("/opt/closurec");
        let config = settings.runtime_config(&layout);
        assert_eq!(config.java_home.as_deref(), Some(Utf8Path::new("/jdk")));
        assert_eq!(config.bundled_java, layout.bundled_java());
        assert_eq!(config.minimum_major, Some(11));
    }
}
