//! Clock-driven renderer
//!
//! `HeadlessRenderer` decodes the payload's stream metadata to learn its
//! length and then advances a playback cursor on a tokio interval, emitting
//! the same progress/duration/end notifications a media element would. It
//! produces no sound, which makes it suitable for servers and tests.

use super::renderer::{MediaPayload, Renderer, RendererError, RendererEvent, EVENT_CHANNEL_CAPACITY};
use super::resource::ResourceHandle;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Default cursor resolution
pub const DEFAULT_TICK: Duration = Duration::from_millis(250);

#[derive(Default)]
struct Transport {
    position: f64,
    duration: f64,
    playing: bool,
    events: Option<mpsc::Sender<RendererEvent>>,
}

pub struct HeadlessRenderer {
    tick: Duration,
    transport: Arc<Mutex<Transport>>,
    clock: Option<JoinHandle<()>>,
    attached: Option<ResourceHandle>,
    volume: f32,
    muted: bool,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::with_tick(DEFAULT_TICK)
    }

    pub fn with_tick(tick: Duration) -> Self {
        Self {
            tick,
            transport: Arc::new(Mutex::new(Transport::default())),
            clock: None,
            attached: None,
            volume: 1.0,
            muted: false,
        }
    }

    pub fn position(&self) -> f64 {
        self.transport.lock().position
    }

    pub fn is_playing(&self) -> bool {
        self.transport.lock().playing
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn attached(&self) -> Option<&ResourceHandle> {
        self.attached.as_ref()
    }

    fn stop_clock(&mut self) {
        if let Some(clock) = self.clock.take() {
            clock.abort();
        }
    }

    fn spawn_clock(&self) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let tick = self.tick;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;

                let (events, ended, sender) = {
                    let mut t = transport.lock();
                    if !t.playing {
                        break;
                    }

                    t.position = (t.position + tick.as_secs_f64()).min(t.duration);
                    let ended = t.position >= t.duration;
                    let mut events = vec![RendererEvent::PositionChanged(t.position)];
                    if ended {
                        t.playing = false;
                        events.push(RendererEvent::Ended);
                    }
                    (events, ended, t.events.clone())
                };

                let Some(sender) = sender else { break };
                for event in events {
                    if sender.send(event).await.is_err() {
                        return;
                    }
                }

                if ended {
                    break;
                }
            }
        })
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HeadlessRenderer {
    fn attach(
        &mut self,
        handle: &ResourceHandle,
        media: &MediaPayload,
    ) -> Result<mpsc::Receiver<RendererEvent>, RendererError> {
        self.detach();

        let probe = media.audio_probe()?;
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        // Fresh channel, cannot be full
        let _ = tx.try_send(RendererEvent::DurationChanged(probe.duration_seconds));

        {
            let mut t = self.transport.lock();
            *t = Transport {
                position: 0.0,
                duration: probe.duration_seconds,
                playing: false,
                events: Some(tx),
            };
        }

        info!(
            "Attached {} ({:.1}s) to headless renderer",
            handle, probe.duration_seconds
        );
        self.attached = Some(handle.clone());

        Ok(rx)
    }

    fn detach(&mut self) {
        self.stop_clock();
        *self.transport.lock() = Transport::default();

        if let Some(handle) = self.attached.take() {
            debug!("Detached {} from headless renderer", handle);
        }
    }

    fn play(&mut self) -> Result<(), RendererError> {
        {
            let mut t = self.transport.lock();
            if t.events.is_none() {
                return Err(RendererError::NotAttached);
            }
            // Playing a finished track starts it over
            if t.position >= t.duration {
                t.position = 0.0;
            }
            t.playing = true;
        }

        self.stop_clock();
        self.clock = Some(self.spawn_clock());
        Ok(())
    }

    fn pause(&mut self) {
        self.transport.lock().playing = false;
        self.stop_clock();
    }

    fn seek(&mut self, position_secs: f64) {
        let mut t = self.transport.lock();
        let Some(sender) = t.events.clone() else {
            return;
        };

        t.position = position_secs.clamp(0.0, t.duration);
        // Dropping a position update under backpressure is harmless; the next tick resends it
        let _ = sender.try_send(RendererEvent::PositionChanged(t.position));
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn name(&self) -> &str {
        "headless"
    }
}

impl Drop for HeadlessRenderer {
    fn drop(&mut self) {
        self.stop_clock();
    }
}
