// Shared test doubles for the podcast controller
//
// Not every test binary uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use pulse_podcast::{
    ControllerOptions, GenerationError, MediaPayload, MemorySettings, PlaybackStatus,
    PodcastController, Renderer, RendererError, RendererEvent, ReportContext, ResourceHandle,
    SessionSnapshot, SettingsStore, SynthesisGateway, SynthesizedAudio,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

pub const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Gateway
// ============================================================================

/// Gateway with a scripted outcome and an optional gate the test opens
pub struct ScriptedGateway {
    calls: AtomicUsize,
    completed: AtomicUsize,
    outcome: Mutex<Result<SynthesizedAudio, GenerationError>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedGateway {
    pub fn succeeding(bytes: Bytes, content_type: Option<&str>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            outcome: Mutex::new(Ok(SynthesizedAudio {
                bytes,
                content_type: content_type.map(str::to_string),
            })),
            gate: None,
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            outcome: Mutex::new(Err(error)),
            gate: None,
        }
    }

    /// Hold every call until the returned semaphore receives a permit
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn set_outcome(&self, outcome: Result<SynthesizedAudio, GenerationError>) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Wait until `n` calls have returned to the controller
    pub async fn wait_completed(&self, n: usize) {
        tokio::time::timeout(WAIT, async {
            while self.completed() < n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("gateway call did not complete");

        // Let the spawned task apply (or discard) the result
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl SynthesisGateway for ScriptedGateway {
    async fn generate(&self, _report: &ReportContext) -> Result<SynthesizedAudio, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        let outcome = self.outcome.lock().unwrap().clone();
        self.completed.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Renderer
// ============================================================================

#[derive(Default)]
pub struct RendererLog {
    pub attached: Option<ResourceHandle>,
    pub attach_count: usize,
    /// Whether the last attached payload arrived already decoded, and its length
    pub pre_probed: Option<Option<f64>>,
    pub detach_count: usize,
    pub play_count: usize,
    pub pause_count: usize,
    pub seeks: Vec<f64>,
    pub volume: Option<f32>,
    pub muted: Option<bool>,
    pub fail_play: Option<String>,
    sender: Option<mpsc::Sender<RendererEvent>>,
}

/// Renderer whose events are injected by the test
pub struct ManualRenderer {
    log: Arc<Mutex<RendererLog>>,
}

/// Test-side view of a `ManualRenderer`
#[derive(Clone)]
pub struct RendererProbe {
    log: Arc<Mutex<RendererLog>>,
}

impl ManualRenderer {
    pub fn new() -> (Self, RendererProbe) {
        let log = Arc::new(Mutex::new(RendererLog::default()));
        (
            Self {
                log: Arc::clone(&log),
            },
            RendererProbe { log },
        )
    }
}

impl Renderer for ManualRenderer {
    fn attach(
        &mut self,
        handle: &ResourceHandle,
        media: &MediaPayload,
    ) -> Result<mpsc::Receiver<RendererEvent>, RendererError> {
        let (tx, rx) = mpsc::channel(64);
        let mut log = self.log.lock().unwrap();
        log.attached = Some(handle.clone());
        log.attach_count += 1;
        log.pre_probed = Some(
            media
                .probe
                .as_ref()
                .and_then(|probe| probe.as_ref().ok())
                .map(|probe| probe.duration_seconds),
        );
        log.sender = Some(tx);
        Ok(rx)
    }

    fn detach(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.attached = None;
        log.sender = None;
        log.detach_count += 1;
    }

    fn play(&mut self) -> Result<(), RendererError> {
        let mut log = self.log.lock().unwrap();
        if let Some(reason) = log.fail_play.clone() {
            return Err(RendererError::Playback(reason));
        }
        if log.attached.is_none() {
            return Err(RendererError::NotAttached);
        }
        log.play_count += 1;
        Ok(())
    }

    fn pause(&mut self) {
        self.log.lock().unwrap().pause_count += 1;
    }

    fn seek(&mut self, position_secs: f64) {
        self.log.lock().unwrap().seeks.push(position_secs);
    }

    fn set_volume(&mut self, volume: f32) {
        self.log.lock().unwrap().volume = Some(volume);
    }

    fn set_muted(&mut self, muted: bool) {
        self.log.lock().unwrap().muted = Some(muted);
    }

    fn name(&self) -> &str {
        "manual"
    }
}

impl RendererProbe {
    pub fn with<R>(&self, f: impl FnOnce(&RendererLog) -> R) -> R {
        f(&self.log.lock().unwrap())
    }

    pub fn fail_play(&self, reason: &str) {
        self.log.lock().unwrap().fail_play = Some(reason.to_string());
    }

    /// Sender for the currently attached payload's event stream
    pub fn sender(&self) -> mpsc::Sender<RendererEvent> {
        self.log
            .lock()
            .unwrap()
            .sender
            .clone()
            .expect("no payload attached")
    }

    pub async fn emit(&self, event: RendererEvent) {
        self.sender()
            .send(event)
            .await
            .expect("controller stopped listening");
    }
}

// ============================================================================
// Controller helpers
// ============================================================================

pub fn controller(
    gateway: Arc<dyn SynthesisGateway>,
    renderer: Box<dyn Renderer>,
) -> PodcastController {
    controller_with(
        ReportContext::daily(),
        gateway,
        renderer,
        Arc::new(MemorySettings::new()),
        ControllerOptions::default(),
    )
}

pub fn controller_with(
    report: ReportContext,
    gateway: Arc<dyn SynthesisGateway>,
    renderer: Box<dyn Renderer>,
    settings: Arc<dyn SettingsStore>,
    options: ControllerOptions,
) -> PodcastController {
    PodcastController::new(report, gateway, renderer, settings, options)
}

/// Wait until the session satisfies `predicate` and return that snapshot
pub async fn wait_until(
    controller: &PodcastController,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut updates = controller.subscribe();
    let snapshot = tokio::time::timeout(WAIT, updates.wait_for(predicate))
        .await
        .expect("timed out waiting for session state")
        .expect("controller dropped");
    snapshot.clone()
}

pub async fn wait_for_status(
    controller: &PodcastController,
    status: PlaybackStatus,
) -> SessionSnapshot {
    wait_until(controller, |s| s.status == status).await
}

// ============================================================================
// Payloads
// ============================================================================

/// Silent 16-bit mono WAV of the given length
pub fn wav_payload(seconds: f64, sample_rate: u32) -> Bytes {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        let samples = (seconds * sample_rate as f64).round() as usize;
        for _ in 0..samples {
            writer.write_sample(0i16).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }

    Bytes::from(cursor.into_inner())
}

pub fn mp3_bytes() -> Bytes {
    Bytes::from_static(b"ID3\x04\x00\x00\x00\x00\x00\x00fake-mp3-frames")
}
