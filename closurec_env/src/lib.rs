#![forbid(unsafe_code)]

//! Shared environment constants used across closurec crates (library, tests,
//! and helpers).

/// Environment variable naming the Java installation root.
///
/// The resolver looks for `<JAVA_HOME>/bin/java` before falling back to the
/// search path.
///
/// # Examples
///
/// ```
/// use closurec_env::JAVA_HOME_ENV;
/// assert_eq!(JAVA_HOME_ENV, "JAVA_HOME");
/// ```
pub const JAVA_HOME_ENV: &str = "JAVA_HOME";

/// Environment variable overriding the closurec install root.
///
/// The install root holds `compiler/compiler.jar`, the bundled `jre/` and the
/// `externs/` directory.
///
/// # Examples
///
/// ```
/// use closurec_env::HOME_ENV;
/// assert_eq!(HOME_ENV, "CLOSUREC_HOME");
/// ```
pub const HOME_ENV: &str = "CLOSUREC_HOME";

/// Environment variable naming a JSON configuration file.
pub const CONFIG_ENV: &str = "CLOSUREC_CONFIG_PATH";
