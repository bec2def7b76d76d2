//! Output helpers for the runner: stdout and capability-scoped file writes.

use anyhow::{Context, Result as AnyResult, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8 as cap_fs};
use std::io::{self, Write};
use tracing::info;

/// Return `true` when `path` is the CLI sentinel indicating "write to stdout".
#[must_use]
pub fn is_stdout_path(path: &Utf8Path) -> bool {
    path.as_str() == "-"
}

fn is_broken_pipe(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::BrokenPipe
}

fn write_all_ignoring_broken_pipe(writer: &mut impl Write, buf: &[u8]) -> io::Result<()> {
    match writer.write_all(buf) {
        Ok(()) => Ok(()),
        Err(err) if is_broken_pipe(&err) => Ok(()),
        Err(err) => Err(err),
    }
}

fn flush_ignoring_broken_pipe(writer: &mut impl Write) -> io::Result<()> {
    match writer.flush() {
        Ok(()) => Ok(()),
        Err(err) if is_broken_pipe(&err) => Ok(()),
        Err(err) => Err(err),
    }
}

/// Write `text` to standard output; a closed pipe is not an error.
pub fn write_stdout(text: &str) -> AnyResult<()> {
    let mut stdout = io::stdout().lock();
    write_all_ignoring_broken_pipe(&mut stdout, text.as_bytes()).context("write to stdout")?;
    flush_ignoring_broken_pipe(&mut stdout).context("flush stdout")?;
    Ok(())
}

/// Write `text` to standard error; a closed pipe is not an error.
pub fn write_stderr(text: &str) -> AnyResult<()> {
    let mut stderr = io::stderr().lock();
    write_all_ignoring_broken_pipe(&mut stderr, text.as_bytes()).context("write to stderr")?;
    flush_ignoring_broken_pipe(&mut stderr).context("flush stderr")?;
    Ok(())
}

fn write_file_in(dir: &cap_fs::Dir, path: &Utf8Path, text: &str) -> AnyResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        dir.create_dir_all(parent)
            .with_context(|| format!("create directory {parent}"))?;
    }
    let mut file = dir
        .create(path)
        .with_context(|| format!("create {path}"))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("write {path}"))?;
    file.flush().with_context(|| format!("flush {path}"))?;
    file.sync_all().with_context(|| format!("sync {path}"))?;
    Ok(())
}

fn derive_dir_and_relative(path: &Utf8Path) -> AnyResult<(cap_fs::Dir, Utf8PathBuf)> {
    if path.is_relative() {
        let dir = cap_fs::Dir::open_ambient_dir(".", ambient_authority())
            .context("open current directory")?;
        return Ok((dir, path.to_owned()));
    }

    let mut ancestors = path.ancestors();
    ancestors.next();
    let (base, dir) = ancestors
        .find_map(|candidate| {
            cap_fs::Dir::open_ambient_dir(candidate, ambient_authority())
                .ok()
                .map(|dir| (candidate.to_owned(), dir))
        })
        .ok_or_else(|| anyhow!("no existing ancestor directory for {path}"))?;
    let relative = path
        .strip_prefix(&base)
        .context("derive relative output path")?
        .to_owned();
    Ok((dir, relative))
}

/// Write `text` to `path`, creating missing parent directories.
pub fn write_output_file(path: &Utf8Path, text: &str) -> AnyResult<()> {
    let (dir, relative) = derive_dir_and_relative(path)?;
    write_file_in(&dir, &relative, text)?;
    info!("Wrote compiled output to {path}");
    Ok(())
}
