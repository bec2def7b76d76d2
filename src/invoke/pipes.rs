//! Reader and writer threads attached to a child's standard streams.

use std::{
    io::{self, Read, Write},
    thread,
};

use super::{
    StdinSource,
    error::{InvokeError, OutputStream},
};

const PIPE_CHUNK_SIZE: usize = 8192;

pub(super) type ReaderHandle = thread::JoinHandle<Result<Vec<u8>, InvokeError>>;
pub(super) type WriterHandle = thread::JoinHandle<io::Result<()>>;

/// Byte budget for a single captured stream.
#[derive(Debug, Clone, Copy)]
pub(super) struct PipeLimit {
    stream: OutputStream,
    limit: u64,
    consumed: u64,
}

impl PipeLimit {
    pub(super) const fn new(stream: OutputStream, limit: u64) -> Self {
        Self {
            stream,
            limit,
            consumed: 0,
        }
    }

    pub(super) fn record(&mut self, read: usize) -> Result<(), InvokeError> {
        let read_u64 = u64::try_from(read).unwrap_or(u64::MAX);
        self.consumed = self.consumed.saturating_add(read_u64);
        if self.consumed > self.limit {
            Err(InvokeError::OutputLimit {
                stream: self.stream,
                limit: self.limit,
            })
        } else {
            Ok(())
        }
    }
}

pub(super) fn spawn_pipe_reader<R>(pipe: Option<R>, limit: PipeLimit) -> Option<ReaderHandle>
where
    R: Read + Send + 'static,
{
    pipe.map(|reader| thread::spawn(move || read_pipe_capture(reader, limit)))
}

pub(super) fn join_reader(reader_handle: Option<ReaderHandle>) -> Result<Vec<u8>, InvokeError> {
    match reader_handle {
        Some(join_handle) => join_handle
            .join()
            .map_err(|_| InvokeError::Io(io::Error::other("pipe reader panicked")))?,
        None => Ok(Vec::new()),
    }
}

pub(super) fn spawn_stdin_writer<W>(pipe: Option<W>, source: StdinSource) -> Option<WriterHandle>
where
    W: Write + Send + 'static,
{
    let mut stdin = pipe?;
    match source {
        StdinSource::Null => None,
        StdinSource::Bytes(buffer) => Some(thread::spawn(move || stdin.write_all(&buffer))),
        StdinSource::Reader(mut reader) => Some(thread::spawn(move || {
            io::copy(&mut reader, &mut stdin).map(|_| ())
        })),
    }
}

/// Join the stdin writer. A closed pipe is tolerated: the exit status decides
/// whether the run failed.
pub(super) fn join_writer(writer_handle: Option<WriterHandle>) -> Result<(), InvokeError> {
    let Some(handle) = writer_handle else {
        return Ok(());
    };
    match handle.join() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) if err.kind() == io::ErrorKind::BrokenPipe => {
            tracing::debug!("child closed stdin before all input was written");
            Ok(())
        }
        Ok(Err(err)) => Err(InvokeError::Io(err)),
        Err(_) => Err(InvokeError::Io(io::Error::other("stdin writer panicked"))),
    }
}

/// Join the stdin writer if it has finished; otherwise leave it detached.
///
/// Called once the child has exited. A writer still running at that point is
/// blocked on its source (typically an interactive terminal) or on a pipe
/// nobody will read, so waiting for it would stall the caller.
pub(super) fn settle_writer(writer_handle: Option<WriterHandle>) -> Result<(), InvokeError> {
    match writer_handle {
        Some(handle) if !handle.is_finished() => {
            tracing::debug!("child exited before stdin was consumed; detaching writer");
            Ok(())
        }
        other => join_writer(other),
    }
}

/// Release helper threads after a failed wait without blocking.
///
/// A killed child may leave descendants holding its pipes open, so readers
/// that have not finished are detached rather than joined.
pub(super) fn cleanup(
    stdout_reader: &mut Option<ReaderHandle>,
    stderr_reader: &mut Option<ReaderHandle>,
    stdin_writer: &mut Option<WriterHandle>,
) {
    release_reader(OutputStream::Stdout, stdout_reader);
    release_reader(OutputStream::Stderr, stderr_reader);
    if let Some(handle) = stdin_writer.take() {
        if !handle.is_finished() {
            tracing::debug!("detaching stdin writer after failed wait");
        } else if let Err(join_err) = handle.join() {
            tracing::warn!("stdin writer thread panicked: {join_err:?}");
        }
    }
}

fn release_reader(stream: OutputStream, reader_handle: &mut Option<ReaderHandle>) {
    let Some(join_handle) = reader_handle.take() else {
        return;
    };
    if !join_handle.is_finished() {
        tracing::debug!(%stream, "pipe still held open by a descendant; detaching reader");
        return;
    }
    match join_handle.join() {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => {
            tracing::warn!(%stream, ?err, "pipe reader failed during cleanup");
        }
        Err(join_err) => {
            tracing::warn!(%stream, ?join_err, "pipe reader thread panicked");
        }
    }
}

fn read_pipe_capture<R>(mut reader: R, mut limit: PipeLimit) -> Result<Vec<u8>, InvokeError>
where
    R: Read,
{
    let mut buf = Vec::new();
    let mut chunk = [0_u8; PIPE_CHUNK_SIZE];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        if let Err(err) = limit.record(read) {
            // Keep draining so the child is not left blocked on a full pipe.
            io::copy(&mut reader, &mut io::sink())?;
            return Err(err);
        }
        buf.extend(chunk.iter().take(read).copied());
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    #[test]
    fn capture_collects_bytes_within_limit() {
        let data = b"payload".to_vec();
        let bytes = read_pipe_capture(
            Cursor::new(data.clone()),
            PipeLimit::new(OutputStream::Stdout, 128),
        )
        .expect("capture should succeed within the configured limit");
        assert_eq!(bytes, data);
    }

    #[test]
    fn capture_rejects_output_over_limit() {
        let err = read_pipe_capture(
            Cursor::new(vec![b'x'; 64]),
            PipeLimit::new(OutputStream::Stderr, 16),
        )
        .expect_err("output should exceed limit");
        match err {
            InvokeError::OutputLimit { stream, limit } => {
                assert_eq!(stream, OutputStream::Stderr);
                assert_eq!(limit, 16);
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn capture_accepts_output_exactly_at_limit() {
        let bytes = read_pipe_capture(
            Cursor::new(vec![b'x'; 16]),
            PipeLimit::new(OutputStream::Stdout, 16),
        )
        .expect("output at limit is allowed");
        assert_eq!(bytes.len(), 16);
    }

    #[test]
    fn missing_reader_joins_to_empty_output() {
        let bytes = join_reader(None).expect("no reader");
        assert!(bytes.is_empty());
    }

    #[test]
    fn broken_pipe_on_stdin_is_tolerated() {
        let handle = thread::spawn(|| Err(io::Error::from(io::ErrorKind::BrokenPipe)));
        join_writer(Some(handle)).expect("broken pipe tolerated");
    }

    #[test]
    fn unfinished_stdin_writer_is_detached() {
        let handle = thread::spawn(|| {
            thread::sleep(Duration::from_secs(30));
            Ok(())
        });
        let started = Instant::now();
        settle_writer(Some(handle)).expect("detached writer");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn cleanup_does_not_wait_for_open_pipes() {
        let mut stdout_reader: Option<ReaderHandle> = Some(thread::spawn(|| {
            thread::sleep(Duration::from_secs(30));
            Ok(Vec::new())
        }));
        let mut stderr_reader: Option<ReaderHandle> = None;
        let mut stdin_writer: Option<WriterHandle> = None;
        let started = Instant::now();
        cleanup(&mut stdout_reader, &mut stderr_reader, &mut stdin_writer);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(stdout_reader.is_none());
    }

    #[test]
    fn other_stdin_errors_are_reported() {
        let handle = thread::spawn(|| Err(io::Error::from(io::ErrorKind::PermissionDenied)));
        let err = join_writer(Some(handle)).expect_err("error surfaced");
        assert!(matches!(err, InvokeError::Io(ref io) if io.kind() == io::ErrorKind::PermissionDenied));
    }
}
