use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::downloader::models::Selection;

const APP_DIR: &str = "yt-dlp-front";
const FILE_NAME: &str = "preferences.json";

/// Settings persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Last chosen video format id
    pub last_video_format: Option<String>,

    /// Last chosen audio format id
    pub last_audio_format: Option<String>,

    /// Folder used when no output folder is given
    pub default_download_folder: Option<PathBuf>,

    /// yt-dlp override (skips discovery)
    pub downloader_path: Option<PathBuf>,

    /// ffmpeg override (skips discovery)
    pub transcoder_path: Option<PathBuf>,
}

impl Preferences {
    /// `<config dir>/yt-dlp-front/preferences.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
    }

    /// Load from `path`; a missing file means defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read preferences from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse preferences in {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create preferences directory")?;
        }
        let json = self.show()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write preferences to {}", path.display()))?;
        Ok(())
    }

    pub fn show(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize preferences")
    }

    pub fn remembered(&self) -> Selection {
        Selection {
            video_id: self.last_video_format.clone(),
            audio_id: self.last_audio_format.clone(),
        }
    }

    /// Store the chosen ids; a side without a choice keeps its old value
    pub fn remember(&mut self, selection: &Selection) {
        if let Some(id) = &selection.video_id {
            self.last_video_format = Some(id.clone());
        }
        if let Some(id) = &selection.audio_id {
            self.last_audio_format = Some(id.clone());
        }
    }
}
