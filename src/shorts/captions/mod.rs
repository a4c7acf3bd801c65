pub mod srt;

use std::time::Duration;

use crate::shorts::error::{ShortsError, ShortsResult};

/// End of the title cue: the largest timestamp SRT can express (99:59:59,999).
pub const TITLE_END: Duration = Duration::from_millis(359_999_999);

/// One time-coded caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionEvent {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// Ordered caption cues burned in as one layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaptionTrack {
    events: Vec<CaptionEvent>,
}

impl CaptionTrack {
    pub fn new(events: Vec<CaptionEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[CaptionEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// End of the last cue, if any.
    pub fn end(&self) -> Option<Duration> {
        self.events.iter().map(|event| event.end).max()
    }

    pub fn to_srt(&self) -> String {
        srt::render_srt(&self.events)
    }
}

/// Body and title caption layers of one job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Captions {
    pub body: CaptionTrack,
    pub title: CaptionTrack,
}

/// Build both caption tracks from a transcription SRT document and the title.
///
/// The body is re-emitted cue for cue; only encoding is normalized. The title
/// becomes a single cue from zero to [`TITLE_END`].
pub fn build_captions(transcript: &str, title: &str) -> ShortsResult<Captions> {
    let normalized = normalize_encoding(transcript);
    let events = srt::parse_srt(&normalized)
        .map_err(|err| ShortsError::TranscriptionFailed(format!("unreadable transcript: {err:#}")))?;

    Ok(Captions {
        body: CaptionTrack::new(events),
        title: title_track(title),
    })
}

fn title_track(title: &str) -> CaptionTrack {
    let title = title.trim();
    if title.is_empty() {
        return CaptionTrack::default();
    }
    CaptionTrack::new(vec![CaptionEvent {
        start: Duration::ZERO,
        end: TITLE_END,
        text: title.to_string(),
    }])
}

fn normalize_encoding(text: &str) -> String {
    text.trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}
