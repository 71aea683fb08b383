//! An external process used as a [`ChunkCodec`].
//!
//! The process reads encoded bytes on its stdin and writes decoded bytes to its stdout. Both
//! are bounded OS pipes, so writing all input before reading any output deadlocks as soon as
//! the process fills its stdout pipe while we are still blocked writing its stdin. To avoid
//! that, a drain task reads stdout for the whole lifetime of the process, independently of the
//! writes, and hands the bytes over an unbounded channel. The channel must stay unbounded: a
//! full channel would stall the drain task and bring the deadlock back.

use crate::{
    codec::{Chunk, ChunkCodec},
    error::{CodecError, Result},
};
use bytes::{Bytes, BytesMut};
use futures_core::future::BoxFuture;
use std::{
    ffi::{OsStr, OsString},
    fmt, io,
    process::Stdio,
};
use tokio::{
    io::{AsyncBufReadExt as _, AsyncReadExt as _, AsyncWriteExt as _, BufReader},
    process::{Child, ChildStderr, ChildStdin, ChildStdout, Command},
    runtime::Handle,
    sync::mpsc,
    task::JoinHandle,
};

/// Default size of each read from the process's stdout.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// How to launch a decoding process: an executable and a fixed argument list.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    program: OsString,
    args: Vec<OsString>,
    read_buffer_size: usize,
}

impl ProcessSpec {
    /// Launch `program`, found through `PATH` when it is not a path itself.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    /// The `bzip2` tool decompressing stdin to stdout (`bzip2 -d -c`).
    pub fn bunzip2() -> Self {
        Self::new("bzip2").args(["-d", "-c"])
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Appends several arguments.
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_owned()));
        self
    }

    /// Sets the size of each read from the process's stdout.
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// The program that will be launched.
    pub fn program(&self) -> &OsStr {
        &self.program
    }
}

/// A live child process behaving as a [`ChunkCodec`].
///
/// Each [`consume`](ChunkCodec::consume) writes the chunk to the process's stdin (waiting while
/// the process is slow to read it) and returns whatever stdout output has been drained since
/// the previous call. [`finish`](ChunkCodec::finish) closes stdin, waits for the process to
/// exit and returns the rest of its output; a non-zero exit is reported as
/// [`CodecError::ProcessFailed`] carrying that output.
///
/// Lines the process writes to stderr are logged as warnings and do not fail decoding by
/// themselves. After a failed `consume`, [`abort`](ChunkCodec::abort) kills the process and
/// waits for it to exit. Dropping the decoder before `finish` kills the process without waiting.
pub struct ProcessDecoder {
    program: String,
    child: Child,
    stdin: Option<ChildStdin>,
    output: mpsc::UnboundedReceiver<io::Result<Bytes>>,
    drain: Option<JoinHandle<()>>,
    stderr: Option<JoinHandle<()>>,
}

impl fmt::Debug for ProcessDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessDecoder")
            .field("program", &self.program)
            .field("pid", &self.child.id())
            .field("stdin_open", &self.stdin.is_some())
            .finish()
    }
}

impl ProcessDecoder {
    /// Launches the process and starts draining its output.
    ///
    /// Must be called from within a Tokio runtime. A missing executable fails here with
    /// [`CodecError::SpawnFailed`].
    pub fn spawn(spec: &ProcessSpec) -> Result<Self> {
        let program = spec.program.to_string_lossy().into_owned();
        let spawn_failed = |source| CodecError::SpawnFailed {
            program: program.clone(),
            source,
        };

        let handle = Handle::try_current().map_err(|err| spawn_failed(io::Error::other(err)))?;
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_failed)?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_failed(io::Error::other("stdout was not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| spawn_failed(io::Error::other("stderr was not captured")))?;

        let (sender, output) = mpsc::unbounded_channel();
        let drain = handle.spawn(drain_stdout(stdout, sender, spec.read_buffer_size));
        let stderr = handle.spawn(log_stderr(stderr, program.clone()));

        tracing::debug!(%program, pid = ?child.id(), "spawned decoder process");

        Ok(Self {
            program,
            child,
            stdin,
            output,
            drain: Some(drain),
            stderr: Some(stderr),
        })
    }

    /// The OS process id, or `None` once the process has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Collects everything the drain task has forwarded so far without waiting.
    fn take_ready(&mut self) -> Result<Bytes> {
        let mut ready = BytesMut::new();
        while let Ok(item) = self.output.try_recv() {
            ready.extend_from_slice(&item?);
        }
        Ok(ready.freeze())
    }
}

impl ChunkCodec for ProcessDecoder {
    fn consume(&mut self, chunk: Chunk) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(async move {
            let written = match self.stdin.as_mut() {
                Some(stdin) => stdin.write_all(chunk.data()).await,
                None => Ok(()),
            };

            match written {
                Ok(()) => {}
                // The process closed its stdin; its exit status decides the outcome.
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                    tracing::debug!(program = %self.program, "process stopped reading input");
                    self.stdin = None;
                }
                Err(err) => return Err(err.into()),
            }

            self.take_ready()
        })
    }

    fn finish(mut self: Box<Self>) -> BoxFuture<'static, Result<Bytes>> {
        Box::pin(async move {
            drop(self.stdin.take());
            let status = self.child.wait().await?;

            if let Some(drain) = self.drain.take() {
                drain.await.map_err(io::Error::other)?;
            }
            let mut output = BytesMut::new();
            while let Some(item) = self.output.recv().await {
                output.extend_from_slice(&item?);
            }
            if let Some(stderr) = self.stderr.take() {
                stderr.await.map_err(io::Error::other)?;
            }

            tracing::debug!(program = %self.program, %status, "decoder process exited");

            if status.success() {
                Ok(output.freeze())
            } else {
                Err(CodecError::ProcessFailed {
                    status,
                    output: output.freeze(),
                })
            }
        })
    }

    fn abort(mut self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            drop(self.stdin.take());
            // Fails only when the process has already exited, `wait` reaps it either way.
            let _ = self.child.start_kill();
            match self.child.wait().await {
                Ok(status) => {
                    tracing::debug!(program = %self.program, %status, "decoder process killed")
                }
                Err(err) => {
                    tracing::warn!(program = %self.program, %err, "failed to reap decoder process")
                }
            }
        })
    }
}

impl Drop for ProcessDecoder {
    fn drop(&mut self) {
        // The child itself is killed by `kill_on_drop`.
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
        if let Some(stderr) = self.stderr.take() {
            stderr.abort();
        }
    }
}

async fn drain_stdout(
    mut stdout: ChildStdout,
    sender: mpsc::UnboundedSender<io::Result<Bytes>>,
    read_buffer_size: usize,
) {
    loop {
        let mut buf = BytesMut::with_capacity(read_buffer_size);
        match stdout.read_buf(&mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if sender.send(Ok(buf.freeze())).is_err() {
                    break;
                }
            }
            Err(err) => {
                let _ = sender.send(Err(err));
                break;
            }
        }
    }
}

async fn log_stderr(stderr: ChildStderr, program: String) {
    let mut lines = BufReader::new(stderr).split(b'\n');
    loop {
        match lines.next_segment().await {
            Ok(Some(line)) => {
                tracing::warn!(%program, "{}", String::from_utf8_lossy(&line).trim_end());
            }
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(%program, %err, "stopped reading stderr");
                break;
            }
        }
    }
}

const _: () = {
    use crate::util::{_assert_send, _assert_sync};

    _assert_send::<ProcessDecoder>();
    _assert_send::<ProcessSpec>();
    _assert_sync::<ProcessSpec>();
};
