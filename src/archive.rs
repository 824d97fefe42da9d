//! Archive subprocess management and the chunk pump.
//!
//! Each download runs one compressor process (`zip -r - .` by default) with
//! the requested directory as its working directory and its stdout piped
//! back into the HTTP response. Nothing is written to disk and nothing is
//! cached: the archive exists only as bytes in flight.
//!
//! The invariant this module maintains is that the child process never
//! outlives the request. Every exit path — clean EOF, read failure, client
//! disconnect — goes through [`ZipProcess::shutdown`], which kills the child
//! and reaps it before the outcome is surfaced to the caller.

use std::fmt;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, warn};

use crate::response::ResponseSink;

/// Default size of one streamed chunk: 100 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 100 * 1024;

// ── ZipCommand ───────────────────────────────────────────────────────────────

/// The compressor invocation, resolved once at startup.
///
/// Defaults to `zip -r - .`, which recursively archives the working
/// directory to stdout. [`with_command`](ZipCommand::with_command) swaps in
/// a different producer — tests use shell one-liners, and a deployment
/// could substitute another archiver with the same stdout contract.
#[derive(Clone, Debug)]
pub struct ZipCommand {
    program: String,
    args: Vec<String>,
}

impl ZipCommand {
    pub fn new() -> Self {
        Self::with_command("zip", ["-r", "-", "."])
    }

    pub fn with_command<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Spawns the compressor with `dir` as its working directory and stdout
    /// piped. stdin and stderr are discarded. `kill_on_drop` backstops the
    /// explicit kill in [`ZipProcess::shutdown`] should the pump ever be
    /// dropped without running teardown.
    fn spawn(&self, dir: &Path) -> io::Result<ZipProcess> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("zip stdout was not captured"))?;

        debug!(pid = child.id(), dir = %dir.display(), "zip started");
        Ok(ZipProcess { child, stdout })
    }
}

impl Default for ZipCommand {
    fn default() -> Self {
        Self::new()
    }
}

// ── ZipProcess ───────────────────────────────────────────────────────────────

/// A running compressor child with its piped stdout.
struct ZipProcess {
    child: Child,
    stdout: ChildStdout,
}

impl ZipProcess {
    /// Reads at most `max` bytes of archive output. `None` at EOF.
    async fn read_chunk(&mut self, max: usize) -> io::Result<Option<Bytes>> {
        let mut buf = BytesMut::zeroed(max);
        let n = self.stdout.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf.freeze()))
    }

    /// Kills and reaps the child.
    ///
    /// Kill comes first: a compressor blocked on a full stdout pipe never
    /// exits on its own once the reader is gone, so waiting without killing
    /// could hang forever. Killing an already-exited child is harmless and
    /// logged at debug.
    async fn shutdown(mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!("zip kill skipped: {e}");
        }
        match self.child.wait().await {
            Ok(status) => debug!(%status, "zip terminated"),
            Err(e) => warn!("zip reap failed: {e}"),
        }
    }
}

// ── Streaming ────────────────────────────────────────────────────────────────

/// Per-request knobs for the chunk pump.
#[derive(Clone, Copy, Debug)]
pub struct StreamOptions {
    /// Upper bound on the size of one streamed chunk, in bytes.
    pub chunk_size: usize,
    /// Pause between consecutive chunk deliveries. Zero disables pacing.
    pub chunk_gap: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_gap: Duration::ZERO }
    }
}

/// What a completed stream delivered.
#[derive(Clone, Copy, Debug, Default)]
pub struct StreamSummary {
    pub chunks: u64,
    pub bytes: u64,
}

/// Why a stream ended without delivering a complete archive.
#[derive(Debug)]
pub enum StreamError {
    /// The compressor could not be spawned.
    Launch(io::Error),
    /// The compressor's stdout failed mid-stream.
    Read(io::Error),
    /// A chunk could not be delivered: the response body was dropped.
    Disconnected,
    /// The client went away while the pump was waiting to read or pacing.
    Cancelled,
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Launch(e) => write!(f, "failed to launch zip: {e}"),
            Self::Read(e) => write!(f, "failed to read zip output: {e}"),
            Self::Disconnected => f.write_str("client disconnected mid-download"),
            Self::Cancelled => f.write_str("download cancelled"),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Launch(e) | Self::Read(e) => Some(e),
            Self::Disconnected | Self::Cancelled => None,
        }
    }
}

/// Streams one archive: spawns the compressor in `dir`, pumps its stdout
/// into `sink` in chunks of at most `opts.chunk_size` bytes, and tears the
/// child down before returning, whatever the outcome.
///
/// With a non-zero `opts.chunk_gap` the pump sleeps between consecutive
/// deliveries — never before the first chunk and never after the last — so
/// an n-chunk download takes at least `(n - 1) * chunk_gap`.
///
/// # Errors
///
/// [`StreamError::Launch`] if the compressor fails to start.
/// [`StreamError::Read`] if its stdout fails mid-stream; the response body
/// is aborted so the client sees a broken transfer rather than a silently
/// truncated archive. [`StreamError::Disconnected`] and
/// [`StreamError::Cancelled`] report a client that went away. On every
/// error path the child has already been killed and reaped.
pub async fn stream_archive(
    zip: &ZipCommand,
    dir: &Path,
    sink: ResponseSink,
    opts: StreamOptions,
) -> Result<StreamSummary, StreamError> {
    let mut process = zip.spawn(dir).map_err(StreamError::Launch)?;
    let outcome = pump(&mut process, &sink, opts).await;
    process.shutdown().await;
    outcome
}

/// The read/pace/send loop. Teardown is the caller's job.
async fn pump(
    process: &mut ZipProcess,
    sink: &ResponseSink,
    opts: StreamOptions,
) -> Result<StreamSummary, StreamError> {
    let mut summary = StreamSummary::default();

    loop {
        // Reads can block for a long time on an idle compressor, so watch
        // for the client disappearing while we wait.
        let chunk = tokio::select! {
            res = process.read_chunk(opts.chunk_size) => match res {
                Ok(Some(chunk)) => chunk,
                Ok(None) => return Ok(summary),
                Err(e) => {
                    sink.abort(io::Error::new(e.kind(), e.to_string())).await;
                    return Err(StreamError::Read(e));
                }
            },
            () = sink.closed() => return Err(StreamError::Cancelled),
        };

        // Pace between deliveries only. EOF above exits before this point,
        // so the gap never trails the final chunk.
        if summary.chunks > 0 && !opts.chunk_gap.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(opts.chunk_gap) => {}
                () = sink.closed() => return Err(StreamError::Cancelled),
            }
        }

        summary.chunks += 1;
        summary.bytes += chunk.len() as u64;
        debug!(chunk = summary.chunks, bytes = chunk.len(), "sending archive chunk");
        sink.send(chunk).await.map_err(|_| StreamError::Disconnected)?;
    }
}
