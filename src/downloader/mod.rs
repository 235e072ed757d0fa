// Downloader module - process orchestration around yt-dlp

pub mod errors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod tools;
pub mod traits;
pub mod utils;

pub use errors::{DownloadError, ErrorKind};
pub use format_selector::FormatSelector;
pub use models::{
    DownloadMode, DownloadRequest, FormatKind, FormatRecord, OperationState, Phase, Selection,
};
pub use orchestrator::Downloader;
pub use tools::{ToolInfo, ToolManager, ToolPaths, ToolType};
pub use traits::{CapturedOutput, Invocation, ProcessRunner, StreamingRun};
pub use utils::TokioProcessRunner;
