// Error types for the downloader

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::Phase;

/// Coarse error category, what a UI branches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    LaunchError,
    EmptyInputError,
    ConcurrentOperationError,
    ExternalToolFailure,
    ParseAnomaly,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    /// Executable missing or not spawnable
    #[error("Failed to start {program}: {reason}")]
    Launch { program: String, reason: String },

    /// URL, format id or output folder missing
    #[error("Missing input: {0}")]
    EmptyInput(String),

    /// Another fetch or download is still running
    #[error("Another operation is in progress ({active})")]
    ConcurrentOperation { active: Phase },

    /// yt-dlp exited non-zero or reported an error
    #[error("{}", describe_tool_failure(.exit_code, .summary))]
    ExternalTool {
        exit_code: Option<i32>,
        summary: String,
        /// Captured output of the failed run
        log: String,
    },

    /// The listing succeeded but no format rows were recognised
    #[error("No formats found")]
    NoFormats,

    /// The caller dropped the operation before yt-dlp finished
    #[error("Operation abandoned while {phase}")]
    Interrupted { phase: Phase },
}

fn describe_tool_failure(exit_code: &Option<i32>, summary: &str) -> String {
    let status = match exit_code {
        Some(code) => format!("yt-dlp exited with code {}", code),
        None => "yt-dlp was terminated".to_string(),
    };
    if summary.is_empty() {
        status
    } else {
        format!("{}: {}", status, summary)
    }
}

impl DownloadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Launch { .. } => ErrorKind::LaunchError,
            Self::EmptyInput(_) => ErrorKind::EmptyInputError,
            Self::ConcurrentOperation { .. } => ErrorKind::ConcurrentOperationError,
            Self::ExternalTool { .. } => ErrorKind::ExternalToolFailure,
            Self::NoFormats => ErrorKind::ParseAnomaly,
            Self::Interrupted { .. } => ErrorKind::Interrupted,
        }
    }

    pub fn launch(program: &std::path::Path, err: &std::io::Error) -> Self {
        Self::Launch {
            program: program.display().to_string(),
            reason: err.to_string(),
        }
    }

    /// Exit code to hand back to the shell
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ExternalTool {
                exit_code: Some(code),
                ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}
