use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    /// File name on this platform
    pub fn binary_name(&self) -> String {
        if cfg!(target_os = "windows") {
            format!("{}.exe", self.as_str())
        } else {
            self.as_str().to_string()
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version", // ffmpeg uses a single dash
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: String,
    pub is_available: bool,
}

/// Where the downloader and the transcoder live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub downloader: PathBuf,
    /// Only handed to yt-dlp through `--ffmpeg-location`
    pub transcoder: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            downloader: PathBuf::from(ToolType::YtDlp.binary_name()),
            transcoder: PathBuf::from(ToolType::Ffmpeg.binary_name()),
        }
    }
}

pub struct ToolManager {
    /// Directory shipped alongside the executable
    bundle_dir: Option<PathBuf>,
}

impl ToolManager {
    pub fn new() -> Self {
        let bundle_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Self { bundle_dir }
    }

    pub fn with_bundle_dir(dir: Option<PathBuf>) -> Self {
        Self { bundle_dir: dir }
    }

    /// Resolve both tools; explicit paths are taken as given
    pub fn resolve_paths(&self, downloader: Option<&Path>, transcoder: Option<&Path>) -> ToolPaths {
        ToolPaths {
            downloader: self.resolve(ToolType::YtDlp, downloader),
            transcoder: self.resolve(ToolType::Ffmpeg, transcoder),
        }
    }

    /// Explicit path, then bundled copy, then common install locations, then
    /// `which`. Falls back to the bare name and lets the OS search PATH at
    /// spawn time.
    pub fn resolve(&self, tool_type: ToolType, explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        match self.detect_tool(tool_type) {
            Some(path) => {
                debug!("Found {} at {}", tool_type.as_str(), path.display());
                path
            }
            None => {
                debug!("{} not found, relying on PATH", tool_type.as_str());
                PathBuf::from(tool_type.binary_name())
            }
        }
    }

    pub fn get_tool_info(&self, tool_type: ToolType, path: &Path) -> ToolInfo {
        let version = self.get_version(path, tool_type);
        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            is_available: version.is_some(),
            version,
            path: path.display().to_string(),
        }
    }

    pub fn get_all_tools(&self, paths: &ToolPaths) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlp, &paths.downloader),
            self.get_tool_info(ToolType::Ffmpeg, &paths.transcoder),
        ]
    }

    fn detect_tool(&self, tool_type: ToolType) -> Option<PathBuf> {
        let binary_name = tool_type.binary_name();

        // 1. Bundled next to our own executable
        if let Some(dir) = &self.bundle_dir {
            for candidate in [dir.join("bin").join(&binary_name), dir.join(&binary_name)] {
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }

        // 2. Common install paths
        let common_paths = [
            format!("/opt/homebrew/bin/{}", binary_name),
            format!("/usr/local/bin/{}", binary_name),
            format!("/usr/bin/{}", binary_name),
        ];
        for path in common_paths {
            let path = PathBuf::from(path);
            if path.is_file() {
                return Some(path);
            }
        }

        // 3. PATH lookup
        let which = if cfg!(target_os = "windows") { "where" } else { "which" };
        if let Ok(output) = Command::new(which).arg(&binary_name).output() {
            if output.status.success() {
                let found = String::from_utf8_lossy(&output.stdout);
                if let Some(first) = found.lines().map(str::trim).find(|l| !l.is_empty()) {
                    return Some(PathBuf::from(first));
                }
            }
        }

        None
    }

    fn get_version(&self, path: &Path, tool_type: ToolType) -> Option<String> {
        match Command::new(path).arg(tool_type.version_arg()).output() {
            Ok(output) if output.status.success() => {
                let out = String::from_utf8_lossy(&output.stdout);
                // ffmpeg prints its whole build configuration
                out.lines().next().map(|l| l.trim().to_string())
            }
            _ => None,
        }
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}
