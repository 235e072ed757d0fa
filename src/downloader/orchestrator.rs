// Orchestrator: fetch/download lifecycle over a process runner
//
// One operation at a time. Every state change goes through the watch
// channel in a single update, so subscribers never observe a half-applied
// transition (e.g. progress moved but phase not yet).

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::errors::DownloadError;
use super::format_selector::FormatSelector;
use super::models::{DownloadMode, DownloadRequest, FormatRecord, OperationState, Phase, Selection};
use super::tools::ToolPaths;
use super::traits::{Invocation, ProcessRunner};
use crate::ytdlp;

pub struct Downloader {
    runner: Arc<dyn ProcessRunner>,
    tools: ToolPaths,
    state: watch::Sender<OperationState>,
    /// Ids carried over from earlier sessions and updated on every selection
    remembered: Mutex<Selection>,
}

impl Downloader {
    pub fn new(runner: Arc<dyn ProcessRunner>, tools: ToolPaths) -> Self {
        let (state, _) = watch::channel(OperationState::default());
        Self {
            runner,
            tools,
            state,
            remembered: Mutex::new(Selection::default()),
        }
    }

    pub fn with_remembered(self, selection: Selection) -> Self {
        *self.remembered.lock().unwrap_or_else(|e| e.into_inner()) = selection;
        self
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<OperationState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> OperationState {
        self.state.borrow().clone()
    }

    pub fn remembered(&self) -> Selection {
        self.remembered.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// List the formats offered for `url` and pick defaults
    pub async fn fetch_formats(&self, url: &str) -> Result<Vec<FormatRecord>, DownloadError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(DownloadError::EmptyInput("video URL".to_string()));
        }

        let operation = self.begin(Phase::FetchingFormats, |state| {
            state.formats.clear();
            state.selection = Selection::default();
            state.append_log_line("Fetching formats...");
        })?;
        info!("Fetching formats for {}", url);

        let invocation = Invocation::new(&self.tools.downloader, ytdlp::list_formats_args(url));
        let captured = match self.runner.run_capturing_all(&invocation).await {
            Ok(captured) => captured,
            Err(e) => {
                Self::fail_fetch(operation, "", e.clone());
                return Err(e);
            }
        };

        if !captured.success() || ytdlp::find_error_line(&captured.output).is_some() {
            let err = DownloadError::ExternalTool {
                exit_code: captured.exit_code,
                summary: ytdlp::failure_summary(&captured.output),
                log: captured.output.clone(),
            };
            Self::fail_fetch(operation, &captured.output, err.clone());
            return Err(err);
        }

        let formats = ytdlp::parse_formats(&captured.output);
        if formats.is_empty() {
            Self::fail_fetch(operation, &captured.output, DownloadError::NoFormats);
            return Err(DownloadError::NoFormats);
        }

        let selection = FormatSelector::default_selection(&formats, &self.remembered());
        self.remember(&selection);
        info!(
            "Found {} formats (video: {:?}, audio: {:?})",
            formats.len(),
            selection.video_id,
            selection.audio_id
        );

        operation.settle(|state| {
            state.append_log(&captured.output);
            state.append_log_line(&format!("Found {} formats.", formats.len()));
            state.phase = Phase::AwaitingSelection;
            state.formats = formats.clone();
            state.selection = selection;
        });

        Ok(formats)
    }

    pub fn select_video(&self, id: &str) -> Result<(), DownloadError> {
        let id = Self::non_empty(id, "video format id")?;
        self.update_selection(|selection| selection.video_id = Some(id))
    }

    pub fn select_audio(&self, id: &str) -> Result<(), DownloadError> {
        let id = Self::non_empty(id, "audio format id")?;
        self.update_selection(|selection| selection.audio_id = Some(id))
    }

    /// Merged download of the current selection
    pub async fn download_selected(
        &self,
        url: &str,
        output_dir: impl Into<PathBuf>,
    ) -> Result<(), DownloadError> {
        let selection = self.state.borrow().selection.clone();
        let video_id = selection
            .video_id
            .ok_or_else(|| DownloadError::EmptyInput("video format id".to_string()))?;
        let audio_id = selection
            .audio_id
            .ok_or_else(|| DownloadError::EmptyInput("audio format id".to_string()))?;
        self.download(DownloadRequest::merged(url, output_dir, video_id, audio_id))
            .await
    }

    /// Run a download to completion, streaming progress into the state
    pub async fn download(&self, request: DownloadRequest) -> Result<(), DownloadError> {
        request.validate()?;

        let label = match &request.mode {
            DownloadMode::Merged { .. } => "video",
            DownloadMode::AudioOnly => "MP3",
        };
        let operation = self.begin(Phase::Downloading, |state| {
            state.progress = 0.0;
            state.append_log_line(&format!("Starting {} download...", label));
        })?;
        info!("Starting {} download of {} into {}", label, request.url, request.output_dir.display());

        let args = ytdlp::download_args(request.url.trim(), &request.mode, &self.tools.transcoder);
        let invocation =
            Invocation::new(&self.tools.downloader, args).with_working_dir(&request.output_dir);

        let mut run = match self.runner.run_streaming(&invocation) {
            Ok(run) => run,
            Err(e) => {
                Self::fail_download(operation, e.clone());
                return Err(e);
            }
        };

        let mut output = String::new();
        while let Some(chunk) = run.chunks.recv().await {
            let reading = ytdlp::extract_progress(&chunk);
            self.state.send_modify(|state| {
                state.append_log(&chunk);
                if let Some(fraction) = reading {
                    if fraction > state.progress {
                        state.progress = fraction;
                    }
                }
            });
            output.push_str(&chunk);
        }

        // Sender dropped without a value: the waiter task died, treat as killed
        let exit_code = run.exit.await.unwrap_or(None);
        debug!("Download process finished with {:?}", exit_code);

        if exit_code == Some(0) {
            info!("{} download completed", label);
            operation.settle(|state| {
                state.phase = Phase::Completed;
                state.progress = 1.0;
                state.append_log_line(&format!("✅ {} download completed.", label));
            });
            return Ok(());
        }

        let err = DownloadError::ExternalTool {
            exit_code,
            summary: ytdlp::failure_summary(&output),
            log: output,
        };
        Self::fail_download(operation, err.clone());
        Err(err)
    }

    /// Enter a busy phase unless one is already active. The check and the
    /// transition happen under the channel's lock.
    fn begin<F>(&self, next: Phase, prepare: F) -> Result<ActiveOperation<'_>, DownloadError>
    where
        F: FnOnce(&mut OperationState),
    {
        let mut rejected = None;
        self.state.send_if_modified(|state| {
            if state.phase.is_busy() {
                rejected = Some(state.phase);
                return false;
            }
            debug!("Phase {} -> {}", state.phase, next);
            state.phase = next;
            state.last_error = None;
            prepare(state);
            true
        });

        match rejected {
            Some(active) => {
                warn!("Rejected request for {}: {} in progress", next, active);
                Err(DownloadError::ConcurrentOperation { active })
            }
            None => Ok(ActiveOperation {
                state: &self.state,
                phase: next,
                settled: false,
            }),
        }
    }

    fn update_selection<F>(&self, apply: F) -> Result<(), DownloadError>
    where
        F: FnOnce(&mut Selection),
    {
        let mut rejected = None;
        let mut updated = None;
        self.state.send_if_modified(|state| {
            if state.phase.is_busy() {
                rejected = Some(state.phase);
                return false;
            }
            apply(&mut state.selection);
            updated = Some(state.selection.clone());
            true
        });

        if let Some(active) = rejected {
            return Err(DownloadError::ConcurrentOperation { active });
        }
        if let Some(selection) = updated {
            self.remember(&selection);
        }
        Ok(())
    }

    fn remember(&self, selection: &Selection) {
        let mut remembered = self.remembered.lock().unwrap_or_else(|e| e.into_inner());
        if selection.video_id.is_some() {
            remembered.video_id = selection.video_id.clone();
        }
        if selection.audio_id.is_some() {
            remembered.audio_id = selection.audio_id.clone();
        }
    }

    fn fail_fetch(operation: ActiveOperation<'_>, output: &str, err: DownloadError) {
        warn!("Fetching formats failed: {}", err);
        operation.settle(|state| {
            state.append_log(output);
            state.append_log_line(&format!("❌ Failed to fetch formats: {}", err));
            reset_after_fetch(state, err);
        });
    }

    fn fail_download(operation: ActiveOperation<'_>, err: DownloadError) {
        warn!("Download failed: {}", err);
        operation.settle(|state| {
            state.append_log_line(&format!("❌ Download failed: {}", err));
            state.phase = Phase::Failed;
            state.last_error = Some(err);
        });
    }

    fn non_empty(value: &str, what: &str) -> Result<String, DownloadError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(DownloadError::EmptyInput(what.to_string()));
        }
        Ok(value.to_string())
    }
}

fn reset_after_fetch(state: &mut OperationState, err: DownloadError) {
    state.phase = Phase::Idle;
    state.formats.clear();
    state.selection = Selection::default();
    state.last_error = Some(err);
}

/// Holds the busy phase of a running fetch or download.
///
/// Every exit path settles it with the final state update. If the future
/// driving the operation is dropped first, `Drop` leaves the busy phase so
/// later requests are not rejected forever. The child process is left to
/// finish on its own.
struct ActiveOperation<'a> {
    state: &'a watch::Sender<OperationState>,
    phase: Phase,
    settled: bool,
}

impl ActiveOperation<'_> {
    fn settle<F>(mut self, apply: F)
    where
        F: FnOnce(&mut OperationState),
    {
        self.settled = true;
        self.state.send_modify(apply);
    }
}

impl Drop for ActiveOperation<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let err = DownloadError::Interrupted { phase: self.phase };
        warn!("{}", err);
        self.state.send_modify(|state| {
            state.append_log_line(&format!("❌ {}", err));
            if state.phase == Phase::FetchingFormats {
                reset_after_fetch(state, err);
            } else {
                state.phase = Phase::Failed;
                state.last_error = Some(err);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::errors::ErrorKind;
    use crate::downloader::traits::StreamingRun;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot};

    enum Script {
        Finished { chunks: Vec<&'static str>, exit: Option<i32> },
        LaunchFailure,
        Live(StreamingRun),
    }

    /// Plays back canned process runs in order
    #[derive(Default)]
    struct ScriptedRunner {
        scripts: Mutex<VecDeque<Script>>,
        invocations: Mutex<Vec<Invocation>>,
    }

    impl ScriptedRunner {
        fn with(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts.into()),
                invocations: Mutex::new(Vec::new()),
            })
        }

        fn invocations(&self) -> Vec<Invocation> {
            self.invocations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedRunner {
        fn run_streaming(&self, invocation: &Invocation) -> Result<StreamingRun, DownloadError> {
            self.invocations.lock().unwrap().push(invocation.clone());
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected process launch");
            match script {
                Script::Finished { chunks, exit } => {
                    let (chunk_tx, chunk_rx) = mpsc::channel(chunks.len() + 1);
                    for chunk in chunks {
                        chunk_tx.try_send(chunk.to_string()).unwrap();
                    }
                    let (exit_tx, exit_rx) = oneshot::channel();
                    exit_tx.send(exit).unwrap();
                    Ok(StreamingRun { chunks: chunk_rx, exit: exit_rx })
                }
                Script::LaunchFailure => Err(DownloadError::Launch {
                    program: invocation.program.display().to_string(),
                    reason: "No such file or directory".to_string(),
                }),
                Script::Live(run) => Ok(run),
            }
        }
    }

    fn tools() -> ToolPaths {
        ToolPaths {
            downloader: PathBuf::from("/bundle/yt-dlp"),
            transcoder: PathBuf::from("/bundle/ffmpeg"),
        }
    }

    fn listing() -> Script {
        Script::Finished {
            chunks: vec!["[info] Available formats:\n140 audio only, 128k\n", "137 1080p video\n18 360p\n"],
            exit: Some(0),
        }
    }

    fn live() -> (Script, mpsc::Sender<String>, oneshot::Sender<Option<i32>>) {
        let (chunk_tx, chunks) = mpsc::channel(8);
        let (exit_tx, exit) = oneshot::channel();
        (Script::Live(StreamingRun { chunks, exit }), chunk_tx, exit_tx)
    }

    #[tokio::test]
    async fn test_fetch_selects_defaults() {
        let runner = ScriptedRunner::with(vec![listing()]);
        let downloader = Downloader::new(runner.clone(), tools());

        let formats = downloader.fetch_formats("https://youtu.be/abc").await.unwrap();
        assert_eq!(formats.len(), 3);

        let state = downloader.snapshot();
        assert_eq!(state.phase, Phase::AwaitingSelection);
        assert_eq!(state.selection.video_id.as_deref(), Some("137"));
        assert_eq!(state.selection.audio_id.as_deref(), Some("140"));
        assert!(state.log.contains("137 1080p video"));
        assert_eq!(downloader.remembered(), state.selection);

        let inv = &runner.invocations()[0];
        assert_eq!(inv.program, PathBuf::from("/bundle/yt-dlp"));
        assert_eq!(inv.args, vec!["-F", "https://youtu.be/abc"]);
    }

    #[tokio::test]
    async fn test_remembered_selection_wins() {
        let runner = ScriptedRunner::with(vec![listing()]);
        let downloader = Downloader::new(runner, tools()).with_remembered(Selection {
            video_id: Some("18".into()),
            audio_id: None,
        });

        downloader.fetch_formats("https://youtu.be/abc").await.unwrap();
        let state = downloader.snapshot();
        assert_eq!(state.selection.video_id.as_deref(), Some("18"));
        assert_eq!(state.selection.audio_id.as_deref(), Some("140"));
    }

    #[tokio::test]
    async fn test_fetch_without_rows_is_parse_anomaly() {
        let runner = ScriptedRunner::with(vec![Script::Finished {
            chunks: vec!["[generic] nothing to list\n"],
            exit: Some(0),
        }]);
        let downloader = Downloader::new(runner, tools());

        let err = downloader.fetch_formats("https://x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseAnomaly);
        let state = downloader.snapshot();
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.last_error, Some(DownloadError::NoFormats));
        assert!(state.log.contains("nothing to list"));
    }

    #[tokio::test]
    async fn test_fetch_failure_clears_previous_result() {
        let runner = ScriptedRunner::with(vec![
            listing(),
            Script::Finished {
                chunks: vec!["ERROR: [generic] Unsupported URL: https://bad\n"],
                exit: Some(1),
            },
        ]);
        let downloader = Downloader::new(runner, tools());
        downloader.fetch_formats("https://good").await.unwrap();

        let err = downloader.fetch_formats("https://bad").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalToolFailure);
        assert!(err.to_string().contains("Unsupported URL"));

        let state = downloader.snapshot();
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.formats.is_empty());
        assert_eq!(state.selection, Selection::default());
    }

    #[tokio::test]
    async fn test_error_text_fails_fetch_even_on_exit_zero() {
        let runner = ScriptedRunner::with(vec![Script::Finished {
            chunks: vec!["137 1080p video\nERROR: something broke\n"],
            exit: Some(0),
        }]);
        let downloader = Downloader::new(runner, tools());
        let err = downloader.fetch_formats("https://x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalToolFailure);
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_fetch_launch_failure() {
        let runner = ScriptedRunner::with(vec![Script::LaunchFailure]);
        let downloader = Downloader::new(runner, tools());
        let err = downloader.fetch_formats("https://x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LaunchError);
        assert_eq!(downloader.snapshot().phase, Phase::Idle);
    }

    #[tokio::test]
    async fn test_empty_input_spawns_nothing() {
        let runner = ScriptedRunner::with(vec![]);
        let downloader = Downloader::new(runner.clone(), tools());

        let err = downloader.fetch_formats("   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyInputError);

        let err = downloader
            .download(DownloadRequest::merged("https://x", "/tmp", "", "140"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyInputError);

        let err = downloader.download_selected("https://x", "/tmp").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyInputError);

        assert!(runner.invocations().is_empty());
        assert_eq!(downloader.snapshot().phase, Phase::Idle);
    }

    #[tokio::test]
    async fn test_merged_download_completes() {
        let runner = ScriptedRunner::with(vec![
            listing(),
            Script::Finished {
                chunks: vec![
                    "[download] Destination: clip.f137.mp4\n",
                    "\r[download]  50.0% of 10MiB",
                    "\r[download]  20.0% of 1MiB",
                    "[Merger] Merging formats into \"clip.mp4\"\n",
                ],
                exit: Some(0),
            },
        ]);
        let downloader = Downloader::new(runner.clone(), tools());
        downloader.fetch_formats("https://youtu.be/abc").await.unwrap();

        let mut rx = downloader.subscribe();
        downloader.download_selected("https://youtu.be/abc", "/videos").await.unwrap();

        let state = rx.borrow_and_update().clone();
        assert_eq!(state.phase, Phase::Completed);
        assert_eq!(state.progress, 1.0);
        assert!(state.log.contains("[Merger] Merging formats"));

        let inv = &runner.invocations()[1];
        assert_eq!(inv.working_dir, Some(PathBuf::from("/videos")));
        assert_eq!(
            inv.args,
            vec![
                "--ffmpeg-location",
                "/bundle/ffmpeg",
                "-f",
                "137+140",
                "--merge-output-format",
                "mp4",
                "-o",
                "%(title)s.%(ext)s",
                "https://youtu.be/abc",
            ]
        );
    }

    #[tokio::test]
    async fn test_progress_never_decreases_while_downloading() {
        let (script, chunk_tx, exit_tx) = live();
        let runner = ScriptedRunner::with(vec![script]);
        let downloader = Arc::new(Downloader::new(runner, tools()));
        let mut rx = downloader.subscribe();

        let task = {
            let downloader = downloader.clone();
            tokio::spawn(async move {
                downloader
                    .download(DownloadRequest::audio_only("https://x", "/music"))
                    .await
            })
        };

        chunk_tx.send("[download]  60.0% of 4MiB".into()).await.unwrap();
        rx.wait_for(|s| s.progress >= 0.6).await.unwrap();
        chunk_tx.send("[download]  10.0% of 4MiB".into()).await.unwrap();
        chunk_tx.send("[ExtractAudio] Destination: song.mp3\n".into()).await.unwrap();
        rx.wait_for(|s| s.log.contains("ExtractAudio")).await.unwrap();
        assert!((downloader.snapshot().progress - 0.6).abs() < 1e-9);

        drop(chunk_tx);
        exit_tx.send(Some(0)).unwrap();
        task.await.unwrap().unwrap();
        assert_eq!(downloader.snapshot().phase, Phase::Completed);
    }

    #[tokio::test]
    async fn test_concurrent_download_is_rejected() {
        let (script, chunk_tx, exit_tx) = live();
        let runner = ScriptedRunner::with(vec![script]);
        let downloader = Arc::new(Downloader::new(runner.clone(), tools()));
        let mut rx = downloader.subscribe();

        let task = {
            let downloader = downloader.clone();
            tokio::spawn(async move {
                downloader
                    .download(DownloadRequest::merged("https://x", "/videos", "137", "140"))
                    .await
            })
        };

        chunk_tx.send("[download]  42.5% of 10MiB".into()).await.unwrap();
        rx.wait_for(|s| s.progress > 0.4).await.unwrap();
        let before = downloader.snapshot();
        assert_eq!(before.phase, Phase::Downloading);

        let err = downloader
            .download(DownloadRequest::audio_only("https://y", "/music"))
            .await
            .unwrap_err();
        assert_eq!(err, DownloadError::ConcurrentOperation { active: Phase::Downloading });
        let err = downloader.fetch_formats("https://y").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConcurrentOperationError);
        let err = downloader.select_video("18").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConcurrentOperationError);

        let after = downloader.snapshot();
        assert_eq!(after.phase, Phase::Downloading);
        assert_eq!(after.progress, before.progress);
        assert_eq!(after.log, before.log);
        assert_eq!(runner.invocations().len(), 1);

        drop(chunk_tx);
        exit_tx.send(Some(0)).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_failed_download_keeps_output() {
        let runner = ScriptedRunner::with(vec![Script::Finished {
            chunks: vec!["[youtube] abc: Downloading\n", "ERROR: Requested format is not available\n"],
            exit: Some(1),
        }]);
        let downloader = Downloader::new(runner, tools());

        let err = downloader
            .download(DownloadRequest::merged("https://x", "/videos", "999", "140"))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);

        let state = downloader.snapshot();
        assert_eq!(state.phase, Phase::Failed);
        let last_error = state.last_error.unwrap();
        assert_eq!(last_error.kind(), ErrorKind::ExternalToolFailure);
        assert!(state.log.contains("Requested format is not available"));
        match last_error {
            DownloadError::ExternalTool { summary, log, .. } => {
                assert_eq!(summary, "ERROR: Requested format is not available");
                assert!(log.contains("[youtube] abc: Downloading"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_download_launch_failure_marks_failed() {
        let runner = ScriptedRunner::with(vec![Script::LaunchFailure]);
        let downloader = Downloader::new(runner, tools());
        let err = downloader
            .download(DownloadRequest::audio_only("https://x", "/music"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LaunchError);
        assert_eq!(downloader.snapshot().phase, Phase::Failed);
    }

    #[tokio::test]
    async fn test_timed_out_download_releases_busy_phase() {
        let (script, chunk_tx, exit_tx) = live();
        let runner = ScriptedRunner::with(vec![script, listing()]);
        let downloader = Downloader::new(runner, tools());

        let pending = downloader.download(DownloadRequest::audio_only("https://x", "/music"));
        let timed_out = tokio::time::timeout(Duration::from_millis(50), pending).await;
        assert!(timed_out.is_err());

        let state = downloader.snapshot();
        assert_eq!(state.phase, Phase::Failed);
        assert_eq!(
            state.last_error,
            Some(DownloadError::Interrupted { phase: Phase::Downloading })
        );
        assert!(state.log.contains("abandoned"));

        // The abandoned process finishing later must not disturb the next run
        drop(chunk_tx);
        let _ = exit_tx.send(Some(0));
        downloader.fetch_formats("https://x").await.unwrap();
        assert_eq!(downloader.snapshot().phase, Phase::AwaitingSelection);
    }

    #[tokio::test]
    async fn test_abandoned_fetch_returns_to_idle() {
        let (script, _chunk_tx, _exit_tx) = live();
        let runner = ScriptedRunner::with(vec![listing(), script]);
        let downloader = Downloader::new(runner, tools());
        downloader.fetch_formats("https://good").await.unwrap();

        let pending = downloader.fetch_formats("https://slow");
        assert!(tokio::time::timeout(Duration::from_millis(50), pending).await.is_err());

        let state = downloader.snapshot();
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.formats.is_empty());
        assert_eq!(state.selection, Selection::default());
        assert_eq!(
            state.last_error.map(|e| e.kind()),
            Some(ErrorKind::Interrupted)
        );
        downloader.select_video("18").unwrap();
    }

    #[tokio::test]
    async fn test_manual_selection_is_remembered() {
        let runner = ScriptedRunner::with(vec![listing()]);
        let downloader = Downloader::new(runner, tools());
        downloader.fetch_formats("https://x").await.unwrap();

        downloader.select_video("18").unwrap();
        assert_eq!(downloader.snapshot().selection.video_id.as_deref(), Some("18"));
        assert_eq!(downloader.remembered().video_id.as_deref(), Some("18"));
        assert_eq!(downloader.remembered().audio_id.as_deref(), Some("140"));

        let err = downloader.select_audio(" ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyInputError);
    }
}
