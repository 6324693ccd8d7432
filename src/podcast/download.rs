use super::controller::PodcastError;
use crate::audio::probe::extension_hint;
use crate::audio::{MediaPayload, SynthesisGateway};
use crate::report::ReportContext;
use crate::settings::{Availability, SettingsStore};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Extension used when the endpoint does not announce a known media type
pub const DEFAULT_EXTENSION: &str = "mp3";

/// File extension for a synthesized payload's media type
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    extension_hint(content_type).unwrap_or(DEFAULT_EXTENSION)
}

/// Write a payload into `dir` under `name`, creating the directory if needed
pub async fn save_payload(dir: &Path, name: &str, payload: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let path = dir.join(name);
    tokio::fs::write(&path, payload).await?;

    info!("Saved podcast ({} bytes) to {}", payload.len(), path.display());
    Ok(path)
}

/// A podcast written by the save-locally action
#[derive(Debug, Clone, PartialEq)]
pub struct SavedPodcast {
    pub path: PathBuf,
    /// Length, when the payload could be decoded
    pub duration_secs: Option<f64>,
}

/// Synthesize a report's podcast and save it into `dir` without playing it
///
/// The file is written whether or not the payload decodes; the length is
/// reported only when it can be read.
pub async fn generate_and_save(
    gateway: &dyn SynthesisGateway,
    settings: &dyn SettingsStore,
    required_credential: Option<&str>,
    report: &ReportContext,
    dir: &Path,
) -> Result<SavedPodcast, PodcastError> {
    if let Availability::Unavailable { reason } = Availability::check(settings, required_credential)
    {
        return Err(PodcastError::Unavailable { reason });
    }

    let audio = gateway.generate(report).await?;
    let media = MediaPayload::new(audio.bytes, audio.content_type).probed().await;

    let name = report.download_name(extension_for(media.content_type.as_deref()));
    let path = save_payload(dir, &name, &media.bytes).await?;

    let duration_secs = match &media.probe {
        Some(Ok(probe)) => Some(probe.duration_seconds),
        Some(Err(e)) => {
            warn!("Saved {} but it could not be decoded: {}", path.display(), e);
            None
        }
        None => None,
    };

    Ok(SavedPodcast {
        path,
        duration_secs,
    })
}
