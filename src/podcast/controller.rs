use super::download::{extension_for, save_payload};
use super::session::{PlaybackStatus, SessionSnapshot, DEFAULT_VOLUME};
use crate::audio::{
    GenerationError, MediaPayload, Renderer, RendererEvent, ResourceLease, ResourceManager,
    SynthesisGateway,
};
use crate::report::ReportContext;
use crate::settings::{Availability, SettingsStore};
use bytes::Bytes;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Capacity of the status transition channel
const TRANSITION_CHANNEL_CAPACITY: usize = 32;

/// Command-level failures
///
/// A session's failed generations and playback errors are not returned
/// here; they move the session to `error` with a retained message.
#[derive(Debug, Error)]
pub enum PodcastError {
    /// A required credential is missing; the play affordance should not be offered
    #[error("{reason}")]
    Unavailable { reason: String },

    #[error("No podcast audio has been generated yet")]
    NoAudio,

    /// Only returned by the one-shot save path; sessions record it as `error`
    #[error("{0}")]
    Generation(#[from] GenerationError),

    #[error("Failed to save podcast: {0}")]
    Io(#[from] std::io::Error),
}

/// Behaviour knobs for one controller
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Start playback as soon as generation succeeds
    pub autoplay: bool,

    /// Initial volume (0.0 to 1.0)
    pub volume: f32,

    pub muted: bool,

    /// Settings key that must hold a non-blank value before play is offered
    pub required_credential: Option<String>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            volume: DEFAULT_VOLUME,
            muted: false,
            required_credential: None,
        }
    }
}

struct SessionState {
    snapshot: SessionSnapshot,
    published: PlaybackStatus,

    renderer: Box<dyn Renderer>,
    lease: Option<ResourceLease>,
    pump: Option<JoinHandle<()>>,

    /// Bumped on every attach and detach; renderer events carry the value they were pumped under
    attachment: u64,

    /// Bumped on teardown and regenerate; generation results carry the value they started under
    epoch: u64,

    /// End of media was reached; the next play starts over
    at_end: bool,

    /// An explicit seek the renderer has not reported a position for yet
    seek_pending: bool,

    live: bool,
}

struct Shared {
    report: ReportContext,
    autoplay: bool,
    required_credential: Option<String>,
    gateway: Arc<dyn SynthesisGateway>,
    settings: Arc<dyn SettingsStore>,
    resources: ResourceManager,
    state: Mutex<SessionState>,
    snapshots: watch::Sender<SessionSnapshot>,
    transitions: broadcast::Sender<PlaybackStatus>,
}

/// Audio podcast controller
///
/// Owns one podcast session for one report: generates the audio on the first
/// play request, keeps the payload behind a revocable handle, and drives the
/// renderer. Commands never block; the generation request runs on a spawned
/// task, so the controller must be used inside a tokio runtime.
///
/// Dropping the controller tears the session down.
pub struct PodcastController {
    shared: Arc<Shared>,
}

impl PodcastController {
    pub fn new(
        report: ReportContext,
        gateway: Arc<dyn SynthesisGateway>,
        renderer: Box<dyn Renderer>,
        settings: Arc<dyn SettingsStore>,
        options: ControllerOptions,
    ) -> Self {
        let snapshot = SessionSnapshot::new(report, options.volume, options.muted);
        let (snapshots, _) = watch::channel(snapshot.clone());
        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);

        let mut renderer = renderer;
        renderer.set_volume(options.volume);
        renderer.set_muted(options.muted);

        info!(
            "Creating podcast controller for {} (gateway={}, renderer={})",
            report,
            gateway.name(),
            renderer.name()
        );

        let state = SessionState {
            snapshot,
            published: PlaybackStatus::Idle,
            renderer,
            lease: None,
            pump: None,
            attachment: 0,
            epoch: 0,
            at_end: false,
            seek_pending: false,
            live: true,
        };

        Self {
            shared: Arc::new(Shared {
                report,
                autoplay: options.autoplay,
                required_credential: options.required_credential,
                gateway,
                settings,
                resources: ResourceManager::new(),
                state: Mutex::new(state),
                snapshots,
                transitions,
            }),
        }
    }

    pub fn report(&self) -> &ReportContext {
        &self.shared.report
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.state.lock().snapshot.clone()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.shared.state.lock().snapshot.status
    }

    /// Latest session state, updated on every change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Stream of status changes as observers see them
    pub fn transitions(&self) -> broadcast::Receiver<PlaybackStatus> {
        self.shared.transitions.subscribe()
    }

    /// Store holding this controller's payloads
    pub fn resources(&self) -> &ResourceManager {
        &self.shared.resources
    }

    pub fn availability(&self) -> Availability {
        self.shared.availability()
    }

    /// Play, generating the audio first if none exists
    ///
    /// A request while generating is ignored. Failed generations are never
    /// retried automatically; calling `play` again from `error` is the retry.
    pub fn play(&self) -> Result<PlaybackStatus, PodcastError> {
        let mut state = self.shared.state.lock();
        if !state.live {
            return Ok(state.snapshot.status);
        }

        match state.snapshot.status {
            PlaybackStatus::Generating | PlaybackStatus::Playing => {}
            PlaybackStatus::Ready | PlaybackStatus::Paused => self.shared.resume(&mut state),
            PlaybackStatus::Idle | PlaybackStatus::Error => {
                if let Availability::Unavailable { reason } = self.shared.availability() {
                    return Err(PodcastError::Unavailable { reason });
                }
                self.shared.start_generation(&mut state);
            }
        }

        self.shared.commit(&mut state);
        Ok(state.snapshot.status)
    }

    pub fn pause(&self) -> PlaybackStatus {
        let mut state = self.shared.state.lock();
        if state.live && state.snapshot.status == PlaybackStatus::Playing {
            state.renderer.pause();
            state.snapshot.status = PlaybackStatus::Paused;
            self.shared.commit(&mut state);
        }
        state.snapshot.status
    }

    /// The dashboard's single play/pause button
    pub fn toggle(&self) -> Result<PlaybackStatus, PodcastError> {
        if self.status() == PlaybackStatus::Playing {
            Ok(self.pause())
        } else {
            self.play()
        }
    }

    /// Move the cursor, clamped to `[0, duration]`
    ///
    /// Returns the applied position, or `None` when there is no audio.
    pub fn seek(&self, target_secs: f64) -> Option<f64> {
        let mut state = self.shared.state.lock();
        if !state.live || state.lease.is_none() {
            return None;
        }

        let position = clamp_position(target_secs, state.snapshot.duration_secs);
        state.renderer.seek(position);
        state.snapshot.position_secs = position;
        state.at_end = false;
        state.seek_pending = true;
        self.shared.commit(&mut state);

        Some(position)
    }

    /// Set the volume; the value is passed through unclamped
    pub fn set_volume(&self, volume: f32) {
        let mut state = self.shared.state.lock();
        state.renderer.set_volume(volume);
        state.snapshot.volume = volume;
        self.shared.commit(&mut state);
    }

    pub fn set_muted(&self, muted: bool) {
        let mut state = self.shared.state.lock();
        state.renderer.set_muted(muted);
        state.snapshot.muted = muted;
        self.shared.commit(&mut state);
    }

    /// Flip mute and return the new value
    pub fn toggle_mute(&self) -> bool {
        let mut state = self.shared.state.lock();
        let muted = !state.snapshot.muted;
        state.renderer.set_muted(muted);
        state.snapshot.muted = muted;
        self.shared.commit(&mut state);
        muted
    }

    /// Throw away the current audio and synthesize it again
    pub fn regenerate(&self) -> Result<PlaybackStatus, PodcastError> {
        let mut state = self.shared.state.lock();
        if !state.live || state.snapshot.status == PlaybackStatus::Generating {
            return Ok(state.snapshot.status);
        }

        if let Availability::Unavailable { reason } = self.shared.availability() {
            return Err(PodcastError::Unavailable { reason });
        }

        info!("Regenerating podcast for {}", self.shared.report);
        self.shared.reset(&mut state);
        self.shared.commit(&mut state);

        self.shared.start_generation(&mut state);
        self.shared.commit(&mut state);
        Ok(state.snapshot.status)
    }

    /// Release everything and stop reacting to late results and events
    pub fn teardown(&self) {
        let mut state = self.shared.state.lock();
        if !state.live {
            return;
        }

        info!("Tearing down podcast controller for {}", self.shared.report);
        self.shared.reset(&mut state);
        state.live = false;
        self.shared.commit(&mut state);
    }

    /// File name and bytes for the save-locally action
    pub fn download_payload(&self) -> Result<(String, Bytes), PodcastError> {
        let state = self.shared.state.lock();
        let lease = state.lease.as_ref().ok_or(PodcastError::NoAudio)?;
        let payload = lease.payload().ok_or(PodcastError::NoAudio)?;
        Ok((download_name(&state.snapshot), payload))
    }

    /// File name the save-locally action would use, if audio exists
    pub fn download_name(&self) -> Option<String> {
        let state = self.shared.state.lock();
        state.lease.as_ref().map(|_| download_name(&state.snapshot))
    }

    /// Save the current audio into `dir` and return the written path
    pub async fn save_to(&self, dir: &Path) -> Result<PathBuf, PodcastError> {
        let (name, payload) = self.download_payload()?;
        Ok(save_payload(dir, &name, &payload).await?)
    }
}

impl Drop for PodcastController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Shared {
    fn availability(&self) -> Availability {
        Availability::check(self.settings.as_ref(), self.required_credential.as_deref())
    }

    fn is_current(&self, epoch: u64) -> bool {
        let state = self.state.lock();
        state.live && state.epoch == epoch
    }

    /// Publish the snapshot, and the status if it changed since the last publish
    fn commit(&self, state: &mut SessionState) {
        let status = state.snapshot.status;
        if status != state.published {
            debug!("Podcast {}: {} -> {}", self.report, state.published, status);
            state.published = status;
            let _ = self.transitions.send(status);
        }
        self.snapshots.send_replace(state.snapshot.clone());
    }

    fn start_generation(self: &Arc<Self>, state: &mut SessionState) {
        self.detach(state);
        state.snapshot.last_error = None;
        state.snapshot.status = PlaybackStatus::Generating;

        let shared = Arc::clone(self);
        let epoch = state.epoch;

        info!("Generating podcast for {}", self.report);
        tokio::spawn(async move {
            let result = shared.gateway.generate(&shared.report).await.map(|audio| {
                MediaPayload::new(audio.bytes, audio.content_type)
            });

            // Decode outside the session lock; skip it for results that will be discarded
            let result = match result {
                Ok(media) if shared.is_current(epoch) => Ok(media.probed().await),
                other => other,
            };
            shared.finish_generation(epoch, result);
        });
    }

    fn finish_generation(
        self: &Arc<Self>,
        epoch: u64,
        result: Result<MediaPayload, GenerationError>,
    ) {
        let mut state = self.state.lock();
        if !state.live || state.epoch != epoch || state.snapshot.status != PlaybackStatus::Generating
        {
            debug!("Discarding generation result for a replaced podcast session");
            return;
        }

        match result {
            Ok(media) => self.install(&mut state, media),
            Err(e) => {
                warn!("Podcast generation failed for {}: {}", self.report, e);
                state.snapshot.status = PlaybackStatus::Error;
                state.snapshot.last_error = Some(e.to_string());
            }
        }

        self.commit(&mut state);
    }

    /// Acquire, attach and (with autoplay) start the freshly generated audio
    ///
    /// Runs under one lock, so observers go straight from `generating` to
    /// `playing`.
    fn install(self: &Arc<Self>, state: &mut SessionState, media: MediaPayload) {
        self.detach(state);

        let lease = self.resources.lease(media.bytes.clone());
        let events = match state.renderer.attach(lease.handle(), &media) {
            Ok(events) => events,
            Err(e) => {
                drop(lease);
                self.fail(state, e.to_string());
                return;
            }
        };

        state.attachment += 1;
        state.pump = Some(self.spawn_pump(state.attachment, events));
        state.renderer.set_volume(state.snapshot.volume);
        state.renderer.set_muted(state.snapshot.muted);

        state.snapshot.resource = Some(lease.handle().clone());
        state.snapshot.content_type = media.content_type;
        state.snapshot.position_secs = 0.0;
        state.snapshot.duration_secs = None;
        state.snapshot.status = PlaybackStatus::Ready;
        state.at_end = false;
        state.seek_pending = false;

        info!("Podcast audio ready for {} at {}", self.report, lease.handle());
        state.lease = Some(lease);

        if self.autoplay {
            self.resume(state);
        }
    }

    fn resume(&self, state: &mut SessionState) {
        if state.at_end {
            state.renderer.seek(0.0);
            state.snapshot.position_secs = 0.0;
            state.at_end = false;
        }

        match state.renderer.play() {
            Ok(()) => state.snapshot.status = PlaybackStatus::Playing,
            Err(e) => self.fail(state, e.to_string()),
        }
    }

    fn spawn_pump(
        self: &Arc<Self>,
        attachment: u64,
        mut events: mpsc::Receiver<RendererEvent>,
    ) -> JoinHandle<()> {
        let weak: Weak<Shared> = Arc::downgrade(self);

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                shared.apply_event(attachment, event);
            }
        })
    }

    fn apply_event(&self, attachment: u64, event: RendererEvent) {
        let mut state = self.state.lock();
        if !state.live || state.attachment != attachment {
            debug!("Discarding stale renderer event {:?}", event);
            return;
        }

        match event {
            RendererEvent::PositionChanged(position) => {
                let position = clamp_position(position, state.snapshot.duration_secs);
                state.snapshot.position_secs = position;
                state.seek_pending = false;

                // The cursor left the end (a seek the renderer echoed after `Ended`)
                if state.at_end && state.snapshot.duration_secs.is_some_and(|d| position < d) {
                    state.at_end = false;
                }
            }
            RendererEvent::DurationChanged(duration) => {
                if duration.is_finite() && duration > 0.0 {
                    state.snapshot.duration_secs = Some(duration);
                    state.snapshot.position_secs = state.snapshot.position_secs.min(duration);
                }
            }
            RendererEvent::Ended => {
                // A seek issued after the renderer queued `Ended` keeps its target
                state.at_end = !state.seek_pending;
                if state.snapshot.status == PlaybackStatus::Playing {
                    state.snapshot.status = PlaybackStatus::Paused;
                }
            }
            RendererEvent::Failed(message) => {
                warn!("Renderer failed for {}: {}", self.report, message);
                self.fail(&mut state, message);
            }
        }

        self.commit(&mut state);
    }

    fn fail(&self, state: &mut SessionState, message: String) {
        self.detach(state);
        state.snapshot.status = PlaybackStatus::Error;
        state.snapshot.last_error = Some(message);
    }

    /// Drop the audio and return to idle; late generation results become stale
    fn reset(&self, state: &mut SessionState) {
        state.epoch += 1;
        self.detach(state);
        state.snapshot.last_error = None;
        state.snapshot.status = PlaybackStatus::Idle;
    }

    /// Unsubscribe, detach the renderer, then release the handle
    fn detach(&self, state: &mut SessionState) {
        if let Some(pump) = state.pump.take() {
            pump.abort();
        }
        state.attachment += 1;

        if let Some(lease) = state.lease.take() {
            state.renderer.detach();
            drop(lease);
        }

        state.snapshot.resource = None;
        state.snapshot.content_type = None;
        state.snapshot.position_secs = 0.0;
        state.snapshot.duration_secs = None;
        state.at_end = false;
        state.seek_pending = false;
    }
}

fn clamp_position(target: f64, duration: Option<f64>) -> f64 {
    if target.is_nan() {
        return 0.0;
    }

    let position = target.max(0.0);
    match duration {
        Some(duration) => position.min(duration),
        None => position,
    }
}

fn download_name(snapshot: &SessionSnapshot) -> String {
    snapshot
        .report
        .download_name(extension_for(snapshot.content_type.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_position() {
        assert_eq!(clamp_position(-5.0, Some(180.0)), 0.0);
        assert_eq!(clamp_position(250.0, Some(180.0)), 180.0);
        assert_eq!(clamp_position(90.5, Some(180.0)), 90.5);
        assert_eq!(clamp_position(f64::NAN, Some(180.0)), 0.0);
        assert_eq!(clamp_position(250.0, None), 250.0);
        assert_eq!(clamp_position(f64::NEG_INFINITY, None), 0.0);
    }
}
