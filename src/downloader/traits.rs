// Process runner trait definition

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

use super::errors::DownloadError;

/// A single external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Current directory of the child; relative output templates resolve here
    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Merged stdout/stderr of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub output: String,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A running process whose output is delivered incrementally.
///
/// `chunks` yields output slices in arrival order and closes once both pipes
/// hit EOF. `exit` resolves exactly once, after the last chunk was sent.
pub struct StreamingRun {
    pub chunks: mpsc::Receiver<String>,
    pub exit: oneshot::Receiver<Option<i32>>,
}

impl StreamingRun {
    /// Drain every chunk, then wait for the exit code
    pub async fn collect(mut self) -> CapturedOutput {
        let mut output = String::new();
        while let Some(chunk) = self.chunks.recv().await {
            output.push_str(&chunk);
        }
        // A dropped sender means the waiter task died; report it like a kill
        let exit_code = self.exit.await.unwrap_or(None);
        CapturedOutput { exit_code, output }
    }
}

/// Trait for launching external executables
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion and return the whole interleaved output
    async fn run_capturing_all(&self, invocation: &Invocation) -> Result<CapturedOutput, DownloadError> {
        Ok(self.run_streaming(invocation)?.collect().await)
    }

    /// Spawn and stream output. Spawn failures are reported here and nothing
    /// is delivered afterwards.
    fn run_streaming(&self, invocation: &Invocation) -> Result<StreamingRun, DownloadError>;
}
