// src/exec/sink.rs

//! Output channels that child processes and failure reports are attached to.

use std::io::Write;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

/// Which standard stream of a child a sink is being attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Out,
    Err,
}

/// Thread-safe in-memory byte buffer, mostly useful for capturing output in
/// tests or embedding the supervisor in another program.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, bytes: &[u8]) {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        guard.extend_from_slice(bytes);
    }

    pub fn contents(&self) -> String {
        let guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        String::from_utf8_lossy(&guard).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

/// Destination for a project's standard output or error.
#[derive(Debug, Clone)]
pub enum OutputSink {
    Stdout,
    Stderr,
    Null,
    Buffer(SharedBuffer),
}

impl OutputSink {
    /// `Stdio` for a child stream. A sink matching the child's natural stream
    /// is inherited directly; anything else is piped and must be forwarded
    /// with [`OutputSink::forward`].
    pub fn stdio_for(&self, natural: StdStream) -> Stdio {
        match (self, natural) {
            (OutputSink::Stdout, StdStream::Out) | (OutputSink::Stderr, StdStream::Err) => {
                Stdio::inherit()
            }
            (OutputSink::Null, _) => Stdio::null(),
            _ => Stdio::piped(),
        }
    }

    pub fn needs_forwarding(&self, natural: StdStream) -> bool {
        !matches!(
            (self, natural),
            (OutputSink::Stdout, StdStream::Out)
                | (OutputSink::Stderr, StdStream::Err)
                | (OutputSink::Null, _)
        )
    }

    /// Write one line (a trailing newline is added).
    pub fn write_line(&self, line: &str) {
        match self {
            OutputSink::Stdout => {
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "{line}");
            }
            OutputSink::Stderr => {
                let mut err = std::io::stderr().lock();
                let _ = writeln!(err, "{line}");
            }
            OutputSink::Null => {}
            OutputSink::Buffer(buf) => {
                buf.append(line.as_bytes());
                buf.append(b"\n");
            }
        }
    }

    /// Copy a piped child stream into this sink, line by line, until EOF.
    pub fn forward<R>(&self, reader: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let sink = self.clone();
        tokio::spawn(async move {
            copy_lines(reader, &sink, None).await;
        })
    }

    /// Like [`OutputSink::forward`], but also keeps the last `keep` lines and
    /// returns them once the stream ends.
    pub fn forward_and_capture<R>(&self, reader: R, keep: usize) -> JoinHandle<Vec<String>>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let sink = self.clone();
        tokio::spawn(async move {
            let mut tail = Vec::new();
            copy_lines(reader, &sink, Some((&mut tail, keep))).await;
            tail
        })
    }
}

async fn copy_lines<R>(reader: R, sink: &OutputSink, mut tail: Option<(&mut Vec<String>, usize)>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                sink.write_line(&line);
                if let Some((buf, keep)) = tail.as_mut() {
                    if *keep > 0 {
                        if buf.len() == *keep {
                            buf.remove(0);
                        }
                        buf.push(line);
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                debug!(error = %err, "output forwarding stopped");
                break;
            }
        }
    }
}
