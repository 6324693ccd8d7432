use super::renderer::RendererError;
use bytes::Bytes;
use std::io::{Cursor, ErrorKind};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};
use tracing::debug;

/// Stream properties of an in-memory audio payload
#[derive(Debug, Clone, PartialEq)]
pub struct AudioProbe {
    pub duration_seconds: f64,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl AudioProbe {
    /// Decode container metadata and verify a decoder exists for the stream
    pub fn from_bytes(payload: Bytes, extension: Option<&str>) -> Result<Self, RendererError> {
        let size = payload.len();
        let source = MediaSourceStream::new(Box::new(Cursor::new(payload)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                source,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| RendererError::Decode(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| RendererError::Decode("no audio track".to_string()))?;

        let track_id = track.id;
        let params = track.codec_params.clone();

        symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| RendererError::Decode(e.to_string()))?;

        let sample_rate = params.sample_rate;
        let channels = params.channels.map(|c| c.count() as u16);

        let frames = match params.n_frames {
            Some(frames) => frames,
            // No frame count in the header (e.g. MP3 without a Xing tag): walk the packets
            None => {
                let mut total = 0u64;
                loop {
                    match format.next_packet() {
                        Ok(packet) if packet.track_id() == track_id => total += packet.dur,
                        Ok(_) => {}
                        Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                            break
                        }
                        Err(SymphoniaError::ResetRequired) => break,
                        Err(e) => return Err(RendererError::Decode(e.to_string())),
                    }
                }
                total
            }
        };

        let time_base = params
            .time_base
            .or_else(|| sample_rate.map(|rate| TimeBase::new(1, rate)))
            .ok_or_else(|| RendererError::Decode("stream has no time base".to_string()))?;

        let duration_seconds = seconds(time_base.calc_time(frames));
        if duration_seconds <= 0.0 {
            return Err(RendererError::Decode("payload contains no audio".to_string()));
        }

        debug!(
            "Probed {} byte payload: {:.2}s, {:?} Hz, {:?} channels",
            size, duration_seconds, sample_rate, channels
        );

        Ok(Self {
            duration_seconds,
            sample_rate,
            channels,
        })
    }
}

/// Container extension for a media type, used as a probe hint
///
/// Parameters such as `; codecs=vorbis` are ignored; unknown types give `None`.
pub fn extension_hint(content_type: Option<&str>) -> Option<&'static str> {
    let essence = content_type?
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/ogg" | "audio/vorbis" | "audio/opus" => Some("ogg"),
        "audio/aac" | "audio/mp4" | "audio/x-m4a" => Some("aac"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        _ => None,
    }
}

fn seconds(time: Time) -> f64 {
    time.seconds as f64 + time.frac
}
