//! Output relay for the child's stdout/stderr.
//!
//! The launcher and supervisor binaries are Rust programs, but output may
//! still contain non-UTF8 bytes (paths, third-party hook output). Using
//! `BufReader::lines()` would terminate the reader task on invalid UTF-8, so
//! lines are read as bytes and decoded lossily.

use biosvc_core::{LogSinkPort, OutputStream};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Log target for relayed child output.
pub const CHILD_LOG_TARGET: &str = "biosvc::child";

/// Log sink that forwards child output to `tracing`: stdout lines at info,
/// stderr lines at error.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSinkPort for TracingLogSink {
    fn append(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => info!(target: CHILD_LOG_TARGET, "{line}"),
            OutputStream::Stderr => error!(target: CHILD_LOG_TARGET, "{line}"),
        }
    }
}

/// Spawn relay tasks for whichever of the child's stdout/stderr are piped.
///
/// The tasks exit when their stream closes, which can be later than the
/// child's own exit if a descendant inherited the pipe.
pub fn spawn_relays(child: &mut Child, pid: u32, sink: &Arc<dyn LogSinkPort>) -> Vec<JoinHandle<()>> {
    let mut relays = Vec::with_capacity(2);

    if let Some(stdout) = child.stdout.take() {
        relays.push(spawn_stream_reader(
            stdout,
            pid,
            OutputStream::Stdout,
            Arc::clone(sink),
        ));
    }

    if let Some(stderr) = child.stderr.take() {
        relays.push(spawn_stream_reader(
            stderr,
            pid,
            OutputStream::Stderr,
            Arc::clone(sink),
        ));
    }

    relays
}

/// Read `stream` line by line and forward every non-empty line to `sink`.
pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    pid: u32,
    kind: OutputStream,
    sink: Arc<dyn LogSinkPort>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    if let Some(line) = decode_line(&mut buf) {
                        sink.append(kind, &line);
                    }
                }
                Err(e) => {
                    debug!(pid, stream = %kind, error = %e, "relay exiting due to read error");
                    break;
                }
            }
        }

        debug!(pid, stream = %kind, "relay task exiting");
    })
}

/// Strip the line terminator and decode. Empty lines yield `None`.
fn decode_line(buf: &mut Vec<u8>) -> Option<String> {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }

    if buf.is_empty() {
        return None;
    }

    Some(String::from_utf8_lossy(buf).into_owned())
}
