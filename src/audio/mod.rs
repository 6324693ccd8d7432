pub mod gateway;
pub mod headless;
pub mod probe;
pub mod renderer;
pub mod resource;

pub use gateway::{GenerationError, HttpSynthesisGateway, SynthesisGateway, SynthesizedAudio};
pub use headless::HeadlessRenderer;
pub use probe::AudioProbe;
pub use renderer::{MediaPayload, Renderer, RendererError, RendererEvent};
pub use resource::{ResourceHandle, ResourceLease, ResourceManager};
