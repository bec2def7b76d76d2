//! A scripted stand-in for the Java runtime.
//!
//! The script answers `-version` with a configurable banner. Any other call
//! is treated as a compiler run: the argument vector is logged to `args.log`
//! next to the script, every `--js` file is echoed to stdout (or stdin when
//! no file is given), `--warn` emits a warning on stderr and `--fail` exits
//! with status 2.

use std::fs;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};

use crate::exec::write_exec;

/// Name of the file the fake runtime writes its arguments to.
pub const ARGS_LOG: &str = "args.log";

/// Warning printed by the fake runtime for `--warn`.
pub const FAKE_WARNING: &str = "WARNING - fake warning";

/// Error printed by the fake runtime for `--fail`.
pub const FAKE_FAILURE: &str = "ERROR - fake failure";

/// Builder for a fake `java` executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeJava {
    banner: String,
    version_status: i32,
}

impl Default for FakeJava {
    fn default() -> Self {
        Self::with_version("17.0.2")
    }
}

impl FakeJava {
    /// A runtime reporting `openjdk version "<version>"`.
    #[must_use]
    pub fn with_version(version: &str) -> Self {
        Self {
            banner: format!("openjdk version \"{version}\" 2022-01-18"),
            version_status: 0,
        }
    }

    /// A runtime whose `-version` probe fails.
    #[must_use]
    pub fn broken() -> Self {
        Self {
            banner: String::from("Error: could not find libjvm.so"),
            version_status: 1,
        }
    }

    /// Shell body of the script, without the shebang.
    #[must_use]
    pub fn script(&self) -> String {
        let banner = self.banner.replace('\'', "");
        let status = self.version_status;
        format!(
            r#"if [ "$1" = "-version" ]; then
  printf '%s\n' '{banner}' >&2
  exit {status}
fi
log="$(dirname "$0")/{ARGS_LOG}"
: > "$log"
for arg in "$@"; do
  printf '%s\n' "$arg" >> "$log"
done
had_js=0
while [ $# -gt 0 ]; do
  case "$1" in
    --js)
      shift
      cat "$1" || exit 3
      had_js=1
      ;;
    --warn)
      echo '{FAKE_WARNING}' >&2
      ;;
    --fail)
      echo '{FAKE_FAILURE}' >&2
      exit 2
      ;;
  esac
  shift
done
if [ "$had_js" = 0 ]; then
  cat
fi
exit 0
"#
        )
    }

    /// Write the script as `java` inside `bin_dir`.
    pub fn write(&self, bin_dir: &Utf8Path) -> Result<Utf8PathBuf> {
        write_exec(bin_dir, "java", &self.script())
    }
}

/// Read the argument vector logged by the fake runtime living in `bin_dir`.
pub fn read_args_log(bin_dir: &Utf8Path) -> Result<Vec<String>> {
    let path = bin_dir.join(ARGS_LOG);
    let text = fs::read_to_string(&path).with_context(|| format!("read {path}"))?;
    Ok(text.lines().map(str::to_owned).collect())
}
