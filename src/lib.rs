pub mod audio;
pub mod config;
pub mod http;
pub mod podcast;
pub mod report;
pub mod settings;

pub use audio::{
    AudioProbe, GenerationError, HeadlessRenderer, HttpSynthesisGateway, MediaPayload, Renderer,
    RendererError, RendererEvent, ResourceHandle, ResourceLease, ResourceManager,
    SynthesisGateway, SynthesizedAudio,
};
pub use config::Config;
pub use http::{create_router, AppState, ControllerFactory};
pub use podcast::{
    format_time, generate_and_save, ControllerOptions, PlaybackStatus, PodcastController,
    PodcastError, SavedPodcast, SessionSnapshot,
};
pub use report::{ReportContext, ReportKind};
pub use settings::{Availability, JsonSettings, MemorySettings, SettingsStore};
