use super::probe::{extension_hint, AudioProbe};
use super::resource::ResourceHandle;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Capacity of a renderer's event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notification emitted by a renderer while a payload is attached
#[derive(Debug, Clone, PartialEq)]
pub enum RendererEvent {
    /// Playback cursor moved (seconds)
    PositionChanged(f64),
    /// Total length became known or changed (seconds)
    DurationChanged(f64),
    /// Playback reached the end of the media
    Ended,
    /// The renderer cannot produce audio for the attached payload
    Failed(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RendererError {
    #[error("Unable to decode podcast audio: {0}")]
    Decode(String),

    #[error("No audio attached to renderer")]
    NotAttached,

    #[error("Playback failed: {0}")]
    Playback(String),
}

/// Synthesized audio on its way to a renderer
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    /// Decode result computed ahead of `attach`; `None` when not probed yet
    pub probe: Option<Result<AudioProbe, RendererError>>,
}

impl MediaPayload {
    pub fn new(bytes: Bytes, content_type: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
            probe: None,
        }
    }

    pub fn extension_hint(&self) -> Option<&'static str> {
        extension_hint(self.content_type.as_deref())
    }

    /// Decode the stream properties on the blocking pool
    ///
    /// Walking an MP3 without a frame-count header touches every packet, so
    /// this runs before any session lock is taken.
    pub async fn probed(mut self) -> Self {
        let bytes = self.bytes.clone();
        let hint = self.extension_hint();

        match tokio::task::spawn_blocking(move || AudioProbe::from_bytes(bytes, hint)).await {
            Ok(result) => {
                if let Err(e) = &result {
                    debug!("Payload did not probe: {}", e);
                }
                self.probe = Some(result);
            }
            Err(e) => warn!("Payload probe task failed: {}", e),
        }

        self
    }

    /// The stored decode result, or a fresh probe when none was taken
    pub fn audio_probe(&self) -> Result<AudioProbe, RendererError> {
        match &self.probe {
            Some(result) => result.clone(),
            None => AudioProbe::from_bytes(self.bytes.clone(), self.extension_hint()),
        }
    }
}

/// Audio rendering primitive
///
/// A renderer plays one payload at a time. `attach` hands back the event
/// stream for that payload; the stream closes when the payload is detached
/// or replaced. Commands take effect immediately and never block.
pub trait Renderer: Send {
    /// Load a payload and subscribe to its events
    fn attach(
        &mut self,
        handle: &ResourceHandle,
        media: &MediaPayload,
    ) -> Result<mpsc::Receiver<RendererEvent>, RendererError>;

    /// Stop and unload the current payload, closing its event stream
    fn detach(&mut self);

    /// Start or resume playback
    fn play(&mut self) -> Result<(), RendererError>;

    fn pause(&mut self);

    /// Move the playback cursor (seconds, already clamped by the caller)
    fn seek(&mut self, position_secs: f64);

    fn set_volume(&mut self, volume: f32);

    fn set_muted(&mut self, muted: bool);

    /// Renderer name for logging
    fn name(&self) -> &str;
}
