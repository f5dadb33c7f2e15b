//! Build runner
//!
//! Runs the build tool as a child process and streams its stdout onto the
//! status line. Only a bounded tail of the output is retained, for printing
//! when the build fails.

use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::DeployError;
use crate::storage::settings::BuildSettings;
use crate::terminal::{fit_to_width, StatusLine};

/// Fixed-capacity FIFO keeping the most recent items
#[derive(Debug, Clone)]
pub struct TailBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> TailBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `item`, evicting the oldest entries beyond capacity
    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items.into()
    }
}

/// Reassembles lines from arbitrarily split chunks
///
/// Both `\n` and `\r` end a line, so progress bars that redraw with `\r`
/// yield one line per redraw. Bytes are decoded only once a line is
/// complete, which keeps multi-byte characters intact across chunks.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                lines.push(String::from_utf8_lossy(&self.pending).into_owned());
                self.pending.clear();
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// The unterminated last line, if any
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}

/// Output of a successful build
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub status: ExitStatus,
    pub tail: Vec<String>,
}

/// Runs build commands and renders their progress
#[derive(Debug, Clone)]
pub struct BuildRunner {
    tail_capacity: usize,
    milestone: Regex,
}

impl BuildRunner {
    pub fn new(tail_capacity: usize, milestone_pattern: &str) -> Result<Self, DeployError> {
        Ok(Self {
            tail_capacity,
            milestone: Regex::new(milestone_pattern)?,
        })
    }

    pub fn from_settings(settings: &BuildSettings) -> Result<Self, DeployError> {
        Self::new(settings.tail_capacity, &settings.milestone_pattern)
    }

    /// Run `command` through `sh -c` inside `working_dir` until it exits
    ///
    /// A non-zero or signal exit becomes [`DeployError::BuildFailed`] carrying
    /// the stdout tail followed by the stderr tail.
    pub async fn run<W: Write>(
        &self,
        command: &str,
        working_dir: &Path,
        status_line: &mut StatusLine<W>,
    ) -> Result<BuildOutput, DeployError> {
        info!("Running build: {}", command);

        let mut child = Command::new("sh")
            .args(["-c", command])
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DeployError::Precondition(format!("Failed to start build '{}': {}", command, e)))?;

        let stderr = child.stderr.take();
        let capacity = self.tail_capacity;
        let stderr_task = tokio::spawn(async move {
            let mut tail = TailBuffer::new(capacity);
            if let Some(stderr) = stderr {
                drain_to_tail(stderr, &mut tail).await;
            }
            tail
        });

        let mut tail = TailBuffer::new(self.tail_capacity);
        if let Some(mut stdout) = child.stdout.take() {
            let mut assembler = LineAssembler::new();
            let mut chunk = [0u8; 8192];
            loop {
                let n = stdout.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                for line in assembler.push(&chunk[..n]) {
                    self.absorb(&line, &mut tail, status_line)?;
                }
            }
            if let Some(line) = assembler.finish() {
                self.absorb(&line, &mut tail, status_line)?;
            }
        }

        let status = child.wait().await?;
        let stderr_tail = stderr_task
            .await
            .unwrap_or_else(|_| TailBuffer::new(0));
        debug!("Build exited with {}", status);

        if !status.success() {
            status_line.finish()?;
            let mut lines = tail.into_vec();
            lines.extend(stderr_tail.into_vec());
            return Err(DeployError::BuildFailed {
                status: status.to_string(),
                tail: lines,
            });
        }

        status_line.update(" Build Success")?;
        status_line.finish()?;

        Ok(BuildOutput {
            status,
            tail: tail.into_vec(),
        })
    }

    fn absorb<W: Write>(
        &self,
        line: &str,
        tail: &mut TailBuffer<String>,
        status_line: &mut StatusLine<W>,
    ) -> Result<(), DeployError> {
        let line = fit_to_width(line, status_line.width());
        if line.is_empty() {
            return Ok(());
        }

        if self.milestone.is_match(&line) {
            status_line.commit(&line)?;
        } else {
            status_line.update(&line)?;
        }
        tail.push(line);
        Ok(())
    }
}

/// Read `reader` to EOF, keeping non-empty trimmed lines in `tail`
///
/// Undecodable bytes are replaced rather than ending the read, so the
/// writer never sees a closed pipe before it exits.
async fn drain_to_tail<R: AsyncRead + Unpin>(mut reader: R, tail: &mut TailBuffer<String>) {
    let mut assembler = LineAssembler::new();
    let mut chunk = [0u8; 4096];
    let mut keep = |line: String| {
        let line = line.trim();
        if !line.is_empty() {
            tail.push(line.to_string());
        }
    };

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => assembler.push(&chunk[..n]).into_iter().for_each(&mut keep),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Stopped reading build stderr: {}", e);
                break;
            }
        }
    }
    if let Some(line) = assembler.finish() {
        keep(line);
    }
}
