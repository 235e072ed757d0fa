// FormatSelector - default picks after a format listing
//
// Handles:
// - Remembered ids from earlier sessions (win when still offered)
// - HD preference for video (1080, then 720)
// - First audio-only row for audio

use super::models::{FormatKind, FormatRecord, Selection};

/// Resolution markers tried in order when nothing is remembered
const PREFERRED_VIDEO_MARKERS: [&str; 2] = ["1080", "720"];

pub struct FormatSelector;

impl FormatSelector {
    /// Default selection for a fresh listing
    pub fn default_selection(formats: &[FormatRecord], remembered: &Selection) -> Selection {
        Selection {
            video_id: Self::pick_video(formats, remembered.video_id.as_deref()).map(|f| f.id.clone()),
            audio_id: Self::pick_audio(formats, remembered.audio_id.as_deref()).map(|f| f.id.clone()),
        }
    }

    fn pick_video<'a>(formats: &'a [FormatRecord], remembered: Option<&str>) -> Option<&'a FormatRecord> {
        let videos: Vec<&FormatRecord> = formats
            .iter()
            .filter(|f| f.kind == FormatKind::VideoOrMuxed)
            .collect();

        if let Some(found) = Self::find_remembered(&videos, remembered) {
            return Some(found);
        }

        for marker in PREFERRED_VIDEO_MARKERS {
            if let Some(hd) = videos.iter().find(|f| f.description.contains(marker)).copied() {
                return Some(hd);
            }
        }

        videos.first().copied()
    }

    fn pick_audio<'a>(formats: &'a [FormatRecord], remembered: Option<&str>) -> Option<&'a FormatRecord> {
        let audios: Vec<&FormatRecord> = formats
            .iter()
            .filter(|f| f.kind == FormatKind::AudioOnly)
            .collect();

        Self::find_remembered(&audios, remembered).or_else(|| audios.first().copied())
    }

    fn find_remembered<'a>(
        candidates: &[&'a FormatRecord],
        remembered: Option<&str>,
    ) -> Option<&'a FormatRecord> {
        let id = remembered.filter(|id| !id.is_empty())?;
        candidates.iter().find(|f| f.id == id).copied()
    }
}
