//! Audio podcast controller
//!
//! This module provides the `PodcastController` that manages:
//! - On-demand synthesis of a report's narration
//! - Ownership and release of the resulting audio payload
//! - Playback state, kept in sync with the renderer's event stream
//! - The save-locally download action

mod controller;
mod download;
mod session;

pub use controller::{ControllerOptions, PodcastController, PodcastError};
pub use download::{extension_for, generate_and_save, SavedPodcast};
pub use session::{format_time, PlaybackStatus, SessionSnapshot, DEFAULT_VOLUME};
