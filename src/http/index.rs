use super::AppState;
use axum::extract::State;
use axum::response::{Html, IntoResponse};

/// `GET /` — a tiny static HTML index listing the three stream URLs.
pub async fn index_handler(State(state): State<AppState>) -> impl IntoResponse {
    let base = format!("http://{}:{}", state.config.host, state.config.port);
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>mjpeg-streamer</title>
</head>
<body>
    <ul>
        <li><a href="{base}/{name}">{base}/{name}</a> — MJPEG stream</li>
        <li><a href="{base}/state">{base}/state</a> — JSON status</li>
        <li><a href="{base}/snapshot">{base}/snapshot</a> — single JPEG snapshot</li>
    </ul>
</body>
</html>
"#,
        base = base,
        name = state.config.stream_name,
    );

    Html(html)
}
