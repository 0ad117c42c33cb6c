pub mod index;
pub mod multipart;
pub mod snapshot;
pub mod state;
pub mod stream;

use crate::broker::FrameBroker;
use crate::config::ServerConfig;
use crate::registry::ClientRegistry;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// Capture parameters as actually negotiated by the [`crate::source::FrameSource`],
/// which may differ from what `ServerConfig` requested.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub device_name: String,
    pub width: u32,
    pub height: u32,
    pub desired_fps: u32,
}

/// Shared state handed to every axum handler.
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<FrameBroker>,
    pub registry: Arc<ClientRegistry>,
    pub config: Arc<ServerConfig>,
    pub source_info: Arc<SourceInfo>,
    pub placeholder: Arc<Vec<u8>>,
}

/// Assemble the full HTTP surface: `/`, `/{stream-name}`, `/state`, `/snapshot`.
pub fn build_router(state: AppState) -> Router {
    let stream_path = format!("/{}", state.config.stream_name);

    Router::new()
        .route("/", get(index::index_handler))
        .route(&stream_path, get(stream::stream_handler))
        .route("/state", get(state::state_handler))
        .route("/snapshot", get(snapshot::snapshot_handler))
        .with_state(state)
}
