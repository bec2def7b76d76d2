//! Closure Compiler binding.
//!
//! `closurec` runs the Closure Compiler jar on a Java runtime it locates
//! itself: `JAVA_HOME` (or `java` on the search path) first, then a runtime
//! bundled under the closurec home directory. Sources and an option mapping
//! are turned into a validated argument vector before anything is spawned;
//! the compiler's stdout becomes the compiled code and its stderr is reported
//! as warnings when the run succeeds.
//!
//! ```no_run
//! use closurec::{CompileRequest, Compiler, options::Options};
//!
//! let compiler = Compiler::from_env()?;
//! let request = CompileRequest::new(["app.js"])
//!     .with_options(Options::new().with("compilation_level", "ADVANCED"));
//! let output = compiler.compile(request)?;
//! print!("{}", output.code);
//! # Ok::<(), closurec::CompileError>(())
//! ```

pub mod args;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod invoke;
pub mod layout;
pub mod options;
pub mod runner;
pub mod runtime;
pub mod setup;

pub use compiler::{
    CompileError, CompileOutput, CompileRequest, Compiler, InvocationStage, PreparedRun, compile,
};
