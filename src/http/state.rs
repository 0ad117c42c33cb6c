use super::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// `GET /state` — a JSON snapshot of encoder, source, and stream stats.
///
/// Field shape is bit-exact: `captured_fps` and `queued_fps`
/// both source from the broker's `per_second_fps` single-window
/// counter, not the older bandwidth-deque scheme some prior variants of
/// this kind of streamer used.
pub async fn state_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.broker.snapshot().await;
    let sessions = state.registry.snapshot();

    let clients_stat: serde_json::Map<String, serde_json::Value> = sessions
        .iter()
        .map(|session| {
            (
                session.client_id.clone(),
                json!({
                    "key": session.key,
                    "advance_headers": session.advance_headers,
                    "extra_headers": false,
                    "zero_data": false,
                    "fps": session.fps,
                }),
            )
        })
        .collect();

    Json(json!({
        "ok": "true",
        "result": {
            "instance_id": "",
            "encoder": {
                "type": "CPU",
                "quality": state.config.quality,
            },
            "source": {
                "resolution": {
                    "width": state.source_info.width,
                    "height": state.source_info.height,
                },
                "online": snapshot.online,
                "desired_fps": state.source_info.desired_fps,
                "captured_fps": snapshot.per_second_fps,
            },
            "stream": {
                "queued_fps": snapshot.per_second_fps,
                "clients": sessions.len(),
                "clients_stat": clients_stat,
            },
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::FrameBroker;
    use crate::config::{Device, ServerConfig};
    use crate::http::SourceInfo;
    use crate::registry::ClientRegistry;
    use axum::body::to_bytes;
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
            placeholder: Arc::new(vec![]),
        }
    }

    #[tokio::test]
    async fn state_json_has_expected_shape() {
        let state = test_state();
        let response = state_handler(State(state)).await.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["ok"], "true");
        assert_eq!(value["result"]["encoder"]["quality"], 80);
        assert_eq!(value["result"]["source"]["resolution"]["width"], 640);
        assert_eq!(value["result"]["stream"]["clients"], 0);
    }
}
