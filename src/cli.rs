use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "yt-dlp-front",
    about = "List yt-dlp formats and download the ones you pick",
    version
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Preferences file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the yt-dlp executable
    #[arg(long = "yt-dlp", global = true, env = "YT_DLP_PATH")]
    pub yt_dlp: Option<PathBuf>,

    /// Path to the ffmpeg executable handed to yt-dlp
    #[arg(long, global = true, env = "FFMPEG_PATH")]
    pub ffmpeg: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the formats available for a URL
    FetchFormats {
        /// Video URL
        url: String,

        /// Print the formats as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download one video and one audio format merged into an mp4
    Download {
        /// Video URL
        url: String,

        /// Video format id (default: picked from the format listing)
        #[arg(long)]
        video_id: Option<String>,

        /// Audio format id (default: picked from the format listing)
        #[arg(long)]
        audio_id: Option<String>,

        /// Output folder (default: the saved default folder)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Extract the audio track as mp3
    DownloadAudio {
        /// Video URL
        url: String,

        /// Output folder (default: the saved default folder)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show where yt-dlp and ffmpeg were found
    Tools,

    /// Show or change saved preferences
    Config {
        /// Show current preferences
        #[arg(long)]
        show: bool,

        /// Set the default download folder
        #[arg(long, value_name = "DIR")]
        set_default_folder: Option<PathBuf>,

        /// Reset preferences to defaults
        #[arg(long)]
        reset: bool,
    },
}
