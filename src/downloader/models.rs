// Common data models for the downloader

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::errors::DownloadError;

/// Whether a listed format carries only audio, or video (possibly muxed with audio)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatKind {
    AudioOnly,
    VideoOrMuxed,
}

impl FormatKind {
    /// Classify a format description the way `yt-dlp -F` rows read.
    ///
    /// "audio only" always means audio. Otherwise the row is audio only when it
    /// mentions audio but never video.
    pub fn classify(description: &str) -> Self {
        let lower = description.to_lowercase();
        if lower.contains("audio only") || (lower.contains("audio") && !lower.contains("video")) {
            Self::AudioOnly
        } else {
            Self::VideoOrMuxed
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Self::AudioOnly)
    }
}

/// One selectable row of `yt-dlp -F` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatRecord {
    /// Format ID understood by yt-dlp (e.g., "137", "140")
    pub id: String,
    /// Rest of the row: resolution, codec, bitrate as printed by the tool
    pub description: String,
    pub kind: FormatKind,
}

impl FormatRecord {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            id: id.into(),
            kind: FormatKind::classify(&description),
            description,
        }
    }
}

impl fmt::Display for FormatRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.description)
    }
}

/// Lifecycle phase of the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    FetchingFormats,
    AwaitingSelection,
    Downloading,
    Completed,
    Failed,
}

impl Phase {
    /// A fetch or download is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::FetchingFormats | Self::Downloading)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::FetchingFormats => "fetching formats",
            Self::AwaitingSelection => "awaiting selection",
            Self::Downloading => "downloading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Chosen video and audio format ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub video_id: Option<String>,
    pub audio_id: Option<String>,
}

/// Snapshot of everything an observer may render
#[derive(Debug, Clone, Default)]
pub struct OperationState {
    pub phase: Phase,
    /// Download progress in [0.0, 1.0]; never decreases within one download
    pub progress: f64,
    pub last_error: Option<DownloadError>,
    /// Result of the last successful fetch
    pub formats: Vec<FormatRecord>,
    pub selection: Selection,
    /// Every captured output chunk plus status lines
    pub log: String,
}

impl OperationState {
    pub fn video_formats(&self) -> impl Iterator<Item = &FormatRecord> {
        self.formats.iter().filter(|f| !f.kind.is_audio())
    }

    pub fn audio_formats(&self) -> impl Iterator<Item = &FormatRecord> {
        self.formats.iter().filter(|f| f.kind.is_audio())
    }

    pub(crate) fn append_log(&mut self, text: &str) {
        self.log.push_str(text);
    }

    pub(crate) fn append_log_line(&mut self, line: &str) {
        if !self.log.is_empty() && !self.log.ends_with('\n') {
            self.log.push('\n');
        }
        self.log.push_str(line);
        self.log.push('\n');
    }
}

/// What to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadMode {
    /// Merge one video and one audio stream into an mp4
    Merged { video_id: String, audio_id: String },
    /// Extract audio and convert to mp3 at best quality
    AudioOnly,
}

/// Download request
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    /// Working directory of yt-dlp; the output template resolves inside it
    pub output_dir: PathBuf,
    pub mode: DownloadMode,
}

impl DownloadRequest {
    pub fn merged(
        url: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        video_id: impl Into<String>,
        audio_id: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            mode: DownloadMode::Merged {
                video_id: video_id.into(),
                audio_id: audio_id.into(),
            },
        }
    }

    pub fn audio_only(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            mode: DownloadMode::AudioOnly,
        }
    }

    /// Reject blank inputs before anything is spawned
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.url.trim().is_empty() {
            return Err(DownloadError::EmptyInput("video URL".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(DownloadError::EmptyInput("output folder".to_string()));
        }
        if let DownloadMode::Merged { video_id, audio_id } = &self.mode {
            if video_id.trim().is_empty() {
                return Err(DownloadError::EmptyInput("video format id".to_string()));
            }
            if audio_id.trim().is_empty() {
                return Err(DownloadError::EmptyInput("audio format id".to_string()));
            }
        }
        Ok(())
    }
}
