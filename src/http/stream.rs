use super::multipart::{format_part, PartHeader};
use super::AppState;
use crate::broker::Cancelled;
use crate::registry::{ClientRegistry, ClientSession};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    client_id: Option<String>,
    key: Option<String>,
    advance_headers: Option<String>,
}

fn random_client_id() -> String {
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap())
        .collect()
}

/// Deregisters a [`ClientSession`] when the stream body is dropped,
/// which is how a client disconnect surfaces here: axum stops polling
/// the `async-stream` generator and drops its locals, including this
/// guard. There is no explicit `PeerClosed` write error to catch — the
/// generator never observes the socket directly.
pub struct SessionGuard {
    registry: Arc<ClientRegistry>,
    client_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.deregister(&self.client_id);
    }
}

pub async fn stream_handler(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> impl IntoResponse {
    let client_id = query.client_id.unwrap_or_else(random_client_id);
    let key = query.key.unwrap_or_else(|| "0".to_string());
    let advance_headers = query.advance_headers.as_deref() == Some("1");

    if state.config.log_requests {
        info!(client_id = %client_id, "stream session opening");
    }

    state.registry.register(ClientSession::new(
        client_id.clone(),
        key.clone(),
        advance_headers,
    ));

    let cookie = format!("stream_client={}/{}; Path=/; Max-Age=30", key, client_id);

    let guard = SessionGuard {
        registry: Arc::clone(&state.registry),
        client_id: client_id.clone(),
    };

    let device_name = state.source_info.device_name.clone();
    let broker = Arc::clone(&state.broker);
    let registry = Arc::clone(&state.registry);

    let body_stream = async_stream::stream! {
        let _guard = guard;
        let mut subscription = broker.subscribe();

        loop {
            let frame = match subscription.next().await {
                Ok(frame) => frame,
                Err(Cancelled) => break,
            };

            let snapshot = broker.snapshot().await;

            let mut headers = vec![
                PartHeader { name: "Content-Type", value: "image/jpeg".to_string() },
                PartHeader { name: "Content-Length", value: frame.jpeg.len().to_string() },
                PartHeader { name: "X-UStreamer-Online", value: snapshot.online.to_string() },
                PartHeader { name: "X-UStreamer-Width", value: frame.width.to_string() },
                PartHeader { name: "X-UStreamer-Height", value: frame.height.to_string() },
                PartHeader { name: "X-UStreamer-Name", value: device_name.clone() },
                PartHeader { name: "X-Timestamp", value: frame.captured_at_ms.to_string() },
                PartHeader { name: "Cache-Control", value: "no-store".to_string() },
                PartHeader { name: "Pragma", value: "no-cache".to_string() },
                PartHeader { name: "Expires", value: "0".to_string() },
            ];

            if advance_headers {
                headers.retain(|h| h.name != "Content-Length" && !h.name.starts_with("X-UStreamer-"));
            }

            let part = format_part(&headers, &frame.jpeg);
            registry.record_write(&client_id, snapshot.per_second_fps);
            yield Ok::<_, axum::Error>(Bytes::from(part));
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace;boundary=frame",
        )
        .header(header::SET_COOKIE, cookie)
        .body(axum::body::Body::from_stream(body_stream))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_client_id_is_eight_hex_chars() {
        let id = random_client_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
