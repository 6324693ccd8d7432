use crate::audio::ResourceHandle;
use crate::report::ReportContext;
use serde::Serialize;
use std::fmt;

/// Default volume for a fresh controller
pub const DEFAULT_VOLUME: f32 = 0.8;

/// Slider range used while the duration is still unknown
const UNKNOWN_DURATION_RANGE: f64 = 100.0;

/// Podcast session status
///
/// State transitions:
/// ```text
/// idle → generating → playing ↔ paused
///            ↓   ↘ (no autoplay)
///          error   ready → playing
/// ```
/// Teardown and regenerate return any state to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Idle,
    Generating,
    Ready,
    Playing,
    Paused,
    Error,
}

impl PlaybackStatus {
    /// States in which a resource handle is held
    pub fn has_audio(&self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Paused)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Generating)
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of a podcast session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub report: ReportContext,
    pub status: PlaybackStatus,
    pub resource: Option<ResourceHandle>,
    pub position_secs: f64,
    /// `None` until the renderer reports a length
    pub duration_secs: Option<f64>,
    pub volume: f32,
    pub muted: bool,
    pub last_error: Option<String>,
    pub content_type: Option<String>,
}

impl SessionSnapshot {
    pub fn new(report: ReportContext, volume: f32, muted: bool) -> Self {
        Self {
            report,
            status: PlaybackStatus::Idle,
            resource: None,
            position_secs: 0.0,
            duration_secs: None,
            volume,
            muted,
            last_error: None,
            content_type: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    /// Fraction of the track played, for progress bars
    pub fn progress_ratio(&self) -> f64 {
        let range = self.duration_secs.unwrap_or(UNKNOWN_DURATION_RANGE);
        if range <= 0.0 {
            return 0.0;
        }
        (self.position_secs / range).clamp(0.0, 1.0)
    }

    pub fn position_label(&self) -> String {
        format_time(self.position_secs)
    }

    /// Duration label; `--:--` until audio exists and its length is known
    pub fn duration_label(&self) -> String {
        match (self.resource.as_ref(), self.duration_secs) {
            (Some(_), Some(duration)) => format_time(duration),
            _ => "--:--".to_string(),
        }
    }
}

/// Format seconds as `m:ss`, truncating fractional seconds
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }

    let whole = seconds.trunc() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}
