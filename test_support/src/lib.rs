//! Test utilities for closurec.
//!
//! Provides fake Java runtimes, throwaway install trees and guards for the
//! environment variables closurec reads.

pub mod env_lock;
pub mod env_var_guard;
pub mod error;
pub mod exec;
pub mod install;
pub mod java;

pub use env_lock::EnvLock;
pub use env_var_guard::EnvVarGuard;
pub use error::display_error_chain;
pub use exec::{make_executable, make_non_executable, write_exec};
pub use install::FakeInstall;
pub use java::{ARGS_LOG, FAKE_FAILURE, FAKE_WARNING, FakeJava, read_args_log};

use closurec_env::{CONFIG_ENV, HOME_ENV, JAVA_HOME_ENV};

/// Clear every variable closurec consults, returning guards that restore them.
///
/// Callers must hold an [`EnvLock`] for as long as the guards live.
#[must_use]
pub fn isolate_env() -> Vec<EnvVarGuard> {
    [JAVA_HOME_ENV, HOME_ENV, CONFIG_ENV]
        .into_iter()
        .map(EnvVarGuard::remove)
        .collect()
}
