// Process runner backed by tokio child processes

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command as TokioCommand;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::errors::DownloadError;
use super::traits::{Invocation, ProcessRunner, StreamingRun};

const READ_BUF_SIZE: usize = 8 * 1024;
const DEFAULT_CHUNK_CAPACITY: usize = 64;

/// Spawns real processes. stdout and stderr are read concurrently and feed
/// the same chunk channel, so output arrives interleaved as the pipes yield it.
#[derive(Debug, Clone)]
pub struct TokioProcessRunner {
    chunk_capacity: usize,
}

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self {
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
        }
    }

    pub fn with_chunk_capacity(mut self, capacity: usize) -> Self {
        self.chunk_capacity = capacity.max(1);
        self
    }
}

impl Default for TokioProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    fn run_streaming(&self, invocation: &Invocation) -> Result<StreamingRun, DownloadError> {
        let mut command = TokioCommand::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        debug!("Spawning: {}", invocation);
        let mut child = command
            .spawn()
            .map_err(|e| DownloadError::launch(&invocation.program, &e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (chunk_tx, chunks) = mpsc::channel(self.chunk_capacity);
        let (exit_tx, exit) = oneshot::channel();
        let program = invocation.program.display().to_string();

        tokio::spawn(async move {
            let stdout_task = stdout.map(|pipe| tokio::spawn(pump(pipe, chunk_tx.clone())));
            let stderr_task = stderr.map(|pipe| tokio::spawn(pump(pipe, chunk_tx.clone())));
            drop(chunk_tx);

            for task in [stdout_task, stderr_task].into_iter().flatten() {
                if let Err(e) = task.await {
                    warn!("Output reader for {} failed: {}", program, e);
                }
            }

            let exit_code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!("Failed to wait for {}: {}", program, e);
                    None
                }
            };
            debug!("{} exited with {:?}", program, exit_code);
            let _ = exit_tx.send(exit_code);
        });

        Ok(StreamingRun { chunks, exit })
    }
}

/// Read a pipe until EOF, forwarding decoded text. Keeps draining after the
/// receiver goes away so the child never blocks on a full pipe.
async fn pump<R>(mut pipe: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut decoder = Utf8ChunkDecoder::default();
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut receiver_alive = true;

    loop {
        let n = match pipe.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to read process output: {}", e);
                break;
            }
        };
        let text = decoder.decode(&buf[..n]);
        if receiver_alive && !text.is_empty() && tx.send(text).await.is_err() {
            receiver_alive = false;
        }
    }

    let rest = decoder.finish();
    if receiver_alive && !rest.is_empty() {
        let _ = tx.send(rest).await;
    }
}

/// Lossy UTF-8 decoding over a byte stream. A multi-byte sequence cut by a
/// read boundary is held back until the next read completes it.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::with_capacity(self.pending.len());
        let mut start = 0;
        let mut keep_from = self.pending.len();

        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(s) => {
                    out.push_str(s);
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        None => {
                            keep_from = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..keep_from);
        out
    }

    /// Flush whatever is still held back
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::errors::ErrorKind;

    #[test]
    fn test_decoder_reassembles_split_sequence() {
        let bytes = "héllo".as_bytes();
        let mut decoder = Utf8ChunkDecoder::default();
        // 'é' is two bytes: split between them
        let first = decoder.decode(&bytes[..2]);
        let second = decoder.decode(&bytes[2..]);
        assert_eq!(first, "h");
        assert_eq!(second, "éllo");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8ChunkDecoder::default();
        let text = decoder.decode(&[b'a', 0xff, b'b']);
        assert_eq!(text, "a\u{FFFD}b");
    }

    #[test]
    fn test_decoder_flushes_truncated_tail() {
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.decode(&[b'x', 0xe2, 0x82]), "x");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[tokio::test]
    async fn test_missing_executable_is_launch_error() {
        let runner = TokioProcessRunner::new();
        let inv = Invocation::new("/definitely/not/here/yt-dlp", vec!["-F".into()]);
        let err = runner.run_capturing_all(&inv).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LaunchError);
        assert!(runner.run_streaming(&inv).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_both_streams_and_exit_code() {
        let runner = TokioProcessRunner::new();
        let inv = Invocation::new(
            "sh",
            vec!["-c".into(), "echo to-stdout; echo to-stderr 1>&2; exit 3".into()],
        );
        let captured = runner.run_capturing_all(&inv).await.unwrap();
        assert_eq!(captured.exit_code, Some(3));
        assert!(captured.output.contains("to-stdout"));
        assert!(captured.output.contains("to-stderr"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_working_dir_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TokioProcessRunner::new();
        let inv = Invocation::new("sh", vec!["-c".into(), "pwd".into()]).with_working_dir(dir.path());
        let captured = runner.run_capturing_all(&inv).await.unwrap();
        assert!(captured.success());
        let reported = std::path::PathBuf::from(captured.output.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_streaming_delivers_chunks_then_exit() {
        let runner = TokioProcessRunner::new().with_chunk_capacity(1);
        let inv = Invocation::new(
            "sh",
            vec!["-c".into(), "printf first; sleep 0.1; printf second".into()],
        );
        let mut run = runner.run_streaming(&inv).unwrap();

        let mut seen = String::new();
        let mut count = 0;
        while let Some(chunk) = run.chunks.recv().await {
            seen.push_str(&chunk);
            count += 1;
        }
        assert_eq!(seen, "firstsecond");
        assert!(count >= 2);
        assert_eq!(run.exit.await.unwrap(), Some(0));
    }
}
