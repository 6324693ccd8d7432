//! HTTP control API for the dashboard
//!
//! This module provides a REST API over one podcast session per report kind:
//! - GET /podcast/:kind - Session state
//! - POST /podcast/:kind/session - Start a session for a dated report
//! - POST /podcast/:kind/{play,pause,toggle,regenerate} - Playback control
//! - POST /podcast/:kind/{seek,volume,mute} - Cursor and output control
//! - GET /podcast/:kind/download - Save the generated audio
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, PodcastStatusResponse};
pub use routes::create_router;
pub use state::{AppState, ControllerFactory};
