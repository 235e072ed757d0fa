// yt-dlp command lines and output parsing

use regex::Regex;
use std::path::Path;

use crate::downloader::models::{DownloadMode, FormatRecord};

/// Output template, relative to the working directory
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";
/// Container for merged video+audio downloads
pub const MERGE_FORMAT: &str = "mp4";
/// Target encoding for audio extraction
pub const AUDIO_FORMAT: &str = "mp3";

lazy_static::lazy_static! {
    // "   137 mp4 1920x1080 ..." -> id + remainder (separator included)
    static ref FORMAT_ROW_RE: Regex = Regex::new(r"^\s*(\d+)(\s+.+)$").unwrap();
    // [download]  42.5% of 10.00MiB at 1.2MiB/s ETA 00:05
    static ref PROGRESS_RE: Regex = Regex::new(r"\[download\]\s+(\S+?)%").unwrap();
    static ref ERROR_LINE_RE: Regex = Regex::new(r"(?m)^\s*ERROR:.*$").unwrap();
}

/// Parse `yt-dlp -F` output into format rows.
///
/// Only lines starting with a numeric id are kept; headers, separators and
/// warnings fall through silently. Duplicate ids are kept in order. An id
/// padded only by whitespace still counts, with an empty description.
pub fn parse_formats(text: &str) -> Vec<FormatRecord> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter_map(|line| {
            let caps = FORMAT_ROW_RE.captures(line)?;
            let id = caps.get(1)?.as_str();
            let description = caps.get(2)?.as_str().trim();
            Some(FormatRecord::new(id, description))
        })
        .collect()
}

/// Latest download percentage in a chunk of output, as a fraction in [0, 1].
///
/// yt-dlp redraws its progress line with `\r`, so a chunk may carry several
/// readings; the last parseable one wins. Markers like `n/a%` are skipped.
pub fn extract_progress(chunk: &str) -> Option<f64> {
    PROGRESS_RE
        .captures_iter(chunk)
        .filter_map(|caps| caps[1].parse::<f64>().ok())
        .filter(|percent| percent.is_finite())
        .last()
        .map(|percent| (percent / 100.0).clamp(0.0, 1.0))
}

/// First `ERROR:` line yt-dlp printed, if any
pub fn find_error_line(output: &str) -> Option<&str> {
    ERROR_LINE_RE.find(output).map(|m| m.as_str().trim())
}

/// Short reason for a failed run: the error line, else the last non-empty line
pub fn failure_summary(output: &str) -> String {
    find_error_line(output)
        .or_else(|| output.lines().rev().map(str::trim).find(|l| !l.is_empty()))
        .map(|s| s.chars().take(200).collect())
        .unwrap_or_default()
}

/// `-F <url>`
pub fn list_formats_args(url: &str) -> Vec<String> {
    vec!["-F".to_string(), url.to_string()]
}

/// `<video>+<audio>`, the selector that makes yt-dlp fetch both and merge
pub fn merged_format_selector(video_id: &str, audio_id: &str) -> String {
    format!("{}+{}", video_id, audio_id)
}

/// Arguments for a download in the given mode
pub fn download_args(url: &str, mode: &DownloadMode, ffmpeg_path: &Path) -> Vec<String> {
    let mut args = vec![
        "--ffmpeg-location".to_string(),
        ffmpeg_path.to_string_lossy().to_string(),
    ];

    match mode {
        DownloadMode::Merged { video_id, audio_id } => {
            args.extend(vec![
                "-f".to_string(),
                merged_format_selector(video_id, audio_id),
                "--merge-output-format".to_string(),
                MERGE_FORMAT.to_string(),
            ]);
        }
        DownloadMode::AudioOnly => {
            args.extend(vec![
                "-x".to_string(),
                "--audio-format".to_string(),
                AUDIO_FORMAT.to_string(),
                // 0 = best
                "--audio-quality".to_string(),
                "0".to_string(),
            ]);
        }
    }

    args.push("-o".to_string());
    args.push(OUTPUT_TEMPLATE.to_string());
    args.push(url.to_string());
    args
}
