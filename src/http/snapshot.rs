use super::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use tracing::trace;

/// `GET /snapshot` — the latest encoded frame, or a deterministic
/// placeholder if none has ever been published.
///
/// One prior variant of this kind of streamer could return an empty
/// body under the dedup rule; this is a behavioral fix, not a port of
/// that bug — always 200 with a valid JPEG body.
pub async fn snapshot_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.config.log_requests {
        trace!("snapshot requested");
    }

    let jpeg = match state.broker.latest().await {
        Some(frame) => frame.jpeg.as_ref().clone(),
        None => state.placeholder.as_ref().clone(),
    };

    ([(header::CONTENT_TYPE, "image/jpeg")], jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::FrameBroker;
    use crate::config::{Device, ServerConfig};
    use crate::frame::EncodedFrame;
    use crate::http::SourceInfo;
    use crate::registry::ClientRegistry;
    use axum::body::to_bytes;
    use axum::response::Response;
    use std::sync::Arc;

    fn test_state() -> AppState {
        AppState {
            broker: Arc::new(FrameBroker::new()),
            registry: Arc::new(ClientRegistry::new()),
            config: Arc::new(ServerConfig {
                stream_name: "stream".into(),
                output_size: Some((640, 480)),
                quality: 80,
                target_fps: 30,
                host: "localhost".into(),
                port: 8000,
                device: Device::Index(0),
                log_requests: true,
            }),
            source_info: Arc::new(SourceInfo {
                device_name: "mock".into(),
                width: 640,
                height: 480,
                desired_fps: 30,
            }),
            placeholder: Arc::new(vec![0xFF, 0xD8, 0x00, 0xFF, 0xD9]),
        }
    }

    #[tokio::test]
    async fn returns_placeholder_when_no_frame_published() {
        let state = test_state();
        let response: Response = snapshot_handler(State(state)).await.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), &[0xFF, 0xD8, 0x00, 0xFF, 0xD9][..]);
    }

    #[tokio::test]
    async fn returns_latest_published_frame() {
        let state = test_state();
        state
            .broker
            .publish(EncodedFrame::new(vec![1, 2, 3], 4, 4, 0))
            .await;
        let response: Response = snapshot_handler(State(state)).await.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), &[1, 2, 3][..]);
    }
}
