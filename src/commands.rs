use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use yt_dlp_front::config::Preferences;
use yt_dlp_front::downloader::{
    DownloadError, DownloadRequest, Downloader, FormatRecord, OperationState, Phase,
    ProcessRunner, Selection, TokioProcessRunner, ToolManager, ToolPaths,
};

#[derive(Serialize)]
struct Listing<'a> {
    formats: &'a [FormatRecord],
    selection: &'a Selection,
}

/// Runs CLI commands against one downloader and the saved preferences
pub struct CommandExecutor {
    downloader: Downloader,
    prefs: Preferences,
    prefs_path: Option<PathBuf>,
    quiet: bool,
}

impl CommandExecutor {
    pub fn new(prefs: Preferences, prefs_path: Option<PathBuf>, tools: ToolPaths, quiet: bool) -> Self {
        Self::with_runner(Arc::new(TokioProcessRunner::new()), prefs, prefs_path, tools, quiet)
    }

    pub fn with_runner(
        runner: Arc<dyn ProcessRunner>,
        prefs: Preferences,
        prefs_path: Option<PathBuf>,
        tools: ToolPaths,
        quiet: bool,
    ) -> Self {
        let downloader = Downloader::new(runner, tools).with_remembered(prefs.remembered());
        Self {
            downloader,
            prefs,
            prefs_path,
            quiet,
        }
    }

    pub async fn fetch_formats(&mut self, url: &str, json: bool) -> Result<()> {
        self.fetch_listing(url).await?;

        let state = self.downloader.snapshot();
        if json {
            let listing = Listing {
                formats: &state.formats,
                selection: &state.selection,
            };
            let out = serde_json::to_string_pretty(&listing).context("Failed to serialize formats")?;
            println!("{}", out);
        } else {
            print_listing(&state);
        }

        self.persist_selection();
        Ok(())
    }

    pub async fn download(
        &mut self,
        url: &str,
        video_id: Option<String>,
        audio_id: Option<String>,
        out: Option<PathBuf>,
    ) -> Result<()> {
        let output_dir = self.output_dir(out)?;

        let (video_id, audio_id) = match (video_id, audio_id) {
            (Some(video), Some(audio)) => (video, audio),
            (video, audio) => {
                info!("Format ids not given, fetching the listing to pick defaults");
                self.fetch_listing(url).await?;
                let selection = self.downloader.snapshot().selection;
                let video = video
                    .or(selection.video_id)
                    .ok_or_else(|| DownloadError::EmptyInput("video format id".to_string()))?;
                let audio = audio
                    .or(selection.audio_id)
                    .ok_or_else(|| DownloadError::EmptyInput("audio format id".to_string()))?;
                (video, audio)
            }
        };
        self.downloader.select_video(&video_id)?;
        self.downloader.select_audio(&audio_id)?;
        self.persist_selection();

        self.run_download(DownloadRequest::merged(url, output_dir, video_id, audio_id))
            .await
    }

    pub async fn download_audio(&mut self, url: &str, out: Option<PathBuf>) -> Result<()> {
        let output_dir = self.output_dir(out)?;
        self.run_download(DownloadRequest::audio_only(url, output_dir)).await
    }

    pub fn tools(&self) {
        let manager = ToolManager::new();
        for tool in manager.get_all_tools(self.downloader.tools()) {
            let status = match &tool.version {
                Some(version) => format!("✓ {}", version),
                None => "✗ not available".to_string(),
            };
            println!("{:<8} {:<40} {}", tool.name, tool.path, status);
        }
    }

    /// Fetch formats, echoing yt-dlp's own output when it fails
    async fn fetch_listing(&self, url: &str) -> Result<(), DownloadError> {
        let result = self.downloader.fetch_formats(url).await;
        if let Err(DownloadError::ExternalTool { log, .. }) = &result {
            // Show what yt-dlp said; it is the only useful diagnosis
            if !self.quiet {
                eprint!("{}", log);
            }
        }
        result.map(|_| ())
    }

    /// Drive a download while echoing output and progress
    async fn run_download(&self, request: DownloadRequest) -> Result<()> {
        let mut rx = self.downloader.subscribe();
        let mut printed = rx.borrow_and_update().log.len();

        let download = self.downloader.download(request);
        tokio::pin!(download);

        let result = loop {
            tokio::select! {
                result = &mut download => break result,
                Ok(()) = rx.changed() => render(&rx, &mut printed, self.quiet),
            }
        };
        render(&rx, &mut printed, self.quiet);
        if !self.quiet {
            eprintln!();
        }

        result?;
        Ok(())
    }

    /// `--out`, else the saved default folder. Created when missing.
    fn output_dir(&self, out: Option<PathBuf>) -> Result<PathBuf> {
        let dir = out
            .or_else(|| self.prefs.default_download_folder.clone())
            .ok_or_else(|| DownloadError::EmptyInput("output folder".to_string()))?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output folder {}", dir.display()))?;
        Ok(dir)
    }

    fn persist_selection(&mut self) {
        self.prefs.remember(&self.downloader.remembered());
        let Some(path) = &self.prefs_path else {
            debug!("No preferences path; selection not saved");
            return;
        };
        if let Err(e) = self.prefs.save(path) {
            warn!("Could not save preferences: {:#}", e);
        }
    }
}

fn print_listing(state: &OperationState) {
    println!("Video formats:");
    for format in state.video_formats() {
        println!("  {}", format);
    }
    println!("Audio formats:");
    for format in state.audio_formats() {
        println!("  {}", format);
    }
    println!(
        "Default selection: video {}, audio {}",
        state.selection.video_id.as_deref().unwrap_or("-"),
        state.selection.audio_id.as_deref().unwrap_or("-")
    );
}

fn render(rx: &watch::Receiver<OperationState>, printed: &mut usize, quiet: bool) {
    let state = rx.borrow();
    if quiet {
        *printed = state.log.len();
        return;
    }

    if let Some(fresh) = state.log.get(*printed..) {
        print!("{}", fresh);
        let _ = std::io::stdout().flush();
    }
    *printed = state.log.len();

    if state.phase == Phase::Downloading || state.phase == Phase::Completed {
        eprint!("\r[{:>5.1}%]", state.progress * 100.0);
        let _ = std::io::stderr().flush();
    }
}
