// Integration tests for payload probing and the clock-driven renderer

mod common;

use bytes::Bytes;
use common::*;
use pulse_podcast::{
    AudioProbe, HeadlessRenderer, MediaPayload, PlaybackStatus, Renderer, RendererError,
    RendererEvent, ResourceManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const TICK: Duration = Duration::from_millis(250);

async fn next_event(events: &mut mpsc::Receiver<RendererEvent>) -> RendererEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for renderer event")
        .expect("event stream closed")
}

#[test]
fn test_probe_wav_duration() {
    let probe = AudioProbe::from_bytes(wav_payload(2.0, 8_000), Some("wav")).unwrap();

    assert!((probe.duration_seconds - 2.0).abs() < 1e-6);
    assert_eq!(probe.sample_rate, Some(8_000));
    assert_eq!(probe.channels, Some(1));
}

#[test]
fn test_probe_rejects_garbage() {
    let result = AudioProbe::from_bytes(Bytes::from_static(b"definitely not audio"), None);
    assert!(matches!(result, Err(RendererError::Decode(_))));
}

#[test]
fn test_probe_rejects_empty_wav() {
    let result = AudioProbe::from_bytes(wav_payload(0.0, 8_000), None);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_payload_decoded_ahead_of_attach() {
    let media = MediaPayload::new(wav_payload(1.5, 8_000), Some("audio/wav".to_string()))
        .probed()
        .await;

    assert_eq!(media.extension_hint(), Some("wav"));
    let probe = media.probe.clone().unwrap().unwrap();
    assert!((probe.duration_seconds - 1.5).abs() < 1e-6);

    // Undecodable payloads keep the failure for the renderer to report
    let garbage = MediaPayload::new(Bytes::from_static(b"definitely not audio"), None)
        .probed()
        .await;
    assert!(matches!(garbage.probe, Some(Err(RendererError::Decode(_)))));
    assert!(garbage.audio_probe().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_headless_uses_precomputed_duration() {
    let resources = ResourceManager::new();
    let payload = wav_payload(1.0, 8_000);
    let handle = resources.acquire(payload.clone());
    let media = MediaPayload::new(payload, Some("audio/wav".to_string()))
        .probed()
        .await;

    let mut renderer = HeadlessRenderer::with_tick(TICK);
    let mut events = renderer.attach(&handle, &media).unwrap();
    assert_eq!(next_event(&mut events).await, RendererEvent::DurationChanged(1.0));
}

#[tokio::test(start_paused = true)]
async fn test_headless_reports_duration_progress_and_end() {
    let resources = ResourceManager::new();
    let payload = wav_payload(1.0, 8_000);
    let handle = resources.acquire(payload.clone());

    let mut renderer = HeadlessRenderer::with_tick(TICK);
    let mut events = renderer.attach(&handle, &MediaPayload::new(payload, None)).unwrap();
    assert_eq!(renderer.attached(), Some(&handle));

    assert_eq!(next_event(&mut events).await, RendererEvent::DurationChanged(1.0));

    renderer.play().unwrap();
    assert!(renderer.is_playing());

    for expected in [0.25, 0.5, 0.75, 1.0] {
        assert_eq!(
            next_event(&mut events).await,
            RendererEvent::PositionChanged(expected)
        );
    }
    assert_eq!(next_event(&mut events).await, RendererEvent::Ended);
    assert!(!renderer.is_playing());

    // Playing a finished track starts it over
    renderer.play().unwrap();
    assert_eq!(renderer.position(), 0.0);
    assert_eq!(
        next_event(&mut events).await,
        RendererEvent::PositionChanged(0.25)
    );
}

#[tokio::test(start_paused = true)]
async fn test_headless_seek_and_pause() {
    let resources = ResourceManager::new();
    let payload = wav_payload(2.0, 8_000);
    let handle = resources.acquire(payload.clone());

    let mut renderer = HeadlessRenderer::with_tick(TICK);
    let mut events = renderer.attach(&handle, &MediaPayload::new(payload, None)).unwrap();
    assert_eq!(next_event(&mut events).await, RendererEvent::DurationChanged(2.0));

    renderer.seek(1.5);
    assert_eq!(next_event(&mut events).await, RendererEvent::PositionChanged(1.5));

    renderer.seek(10.0);
    assert_eq!(next_event(&mut events).await, RendererEvent::PositionChanged(2.0));

    renderer.seek(0.5);
    assert_eq!(next_event(&mut events).await, RendererEvent::PositionChanged(0.5));

    renderer.play().unwrap();
    assert_eq!(next_event(&mut events).await, RendererEvent::PositionChanged(0.75));

    renderer.pause();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(events.try_recv().is_err(), "paused renderer must stay silent");
    assert_eq!(renderer.position(), 0.75);
}

#[tokio::test(start_paused = true)]
async fn test_headless_detach_closes_stream() {
    let resources = ResourceManager::new();
    let payload = wav_payload(1.0, 8_000);
    let handle = resources.acquire(payload.clone());

    let mut renderer = HeadlessRenderer::with_tick(TICK);
    let mut events = renderer.attach(&handle, &MediaPayload::new(payload, None)).unwrap();
    renderer.play().unwrap();
    renderer.detach();

    assert!(renderer.attached().is_none());
    assert!(matches!(renderer.play(), Err(RendererError::NotAttached)));

    // Only the duration notification queued before detaching remains
    assert_eq!(next_event(&mut events).await, RendererEvent::DurationChanged(1.0));
    assert_eq!(events.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_session_with_headless_renderer_plays_to_end() {
    let gateway = Arc::new(ScriptedGateway::succeeding(
        wav_payload(1.0, 8_000),
        Some("audio/wav"),
    ));
    let controller = controller(gateway.clone(), Box::new(HeadlessRenderer::with_tick(TICK)));

    controller.play().unwrap();
    let playing = wait_for_status(&controller, PlaybackStatus::Playing).await;
    assert!(playing.resource.is_some());

    let ended = wait_for_status(&controller, PlaybackStatus::Paused).await;
    assert_eq!(ended.duration_secs, Some(1.0));
    assert_eq!(ended.position_secs, 1.0);
    assert_eq!(ended.progress_ratio(), 1.0);
    assert_eq!(ended.duration_label(), "0:01");
    assert_eq!(controller.download_name().as_deref(), Some("daily_podcast.wav"));

    // Replay starts from the top with the same audio
    controller.play().unwrap();
    assert_eq!(controller.snapshot().position_secs, 0.0);
    wait_for_status(&controller, PlaybackStatus::Paused).await;
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_session_with_undecodable_payload_errors() {
    let gateway = Arc::new(ScriptedGateway::succeeding(
        Bytes::from_static(b"definitely not audio"),
        Some("audio/mpeg"),
    ));
    let controller = controller(gateway, Box::new(HeadlessRenderer::with_tick(TICK)));

    controller.play().unwrap();
    let snapshot = wait_for_status(&controller, PlaybackStatus::Error).await;

    let message = snapshot.last_error.unwrap();
    assert!(
        message.starts_with("Unable to decode podcast audio"),
        "unexpected error: {}",
        message
    );
    assert!(snapshot.resource.is_none());
    assert_eq!(controller.resources().live_count(), 0);
}
