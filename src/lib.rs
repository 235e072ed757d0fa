pub mod config;
pub mod downloader;
pub mod ytdlp;

pub use downloader::{DownloadError, Downloader, FormatRecord, OperationState, Phase};
pub use ytdlp::{extract_progress, parse_formats};
