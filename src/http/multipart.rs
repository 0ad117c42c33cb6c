//! Byte-exact `multipart/x-mixed-replace` part formatter.
//!
//! Deliberately hand-rolled rather than built on a generic multipart
//! crate: the wire shape (`--frame\r\n`, headers, blank line, body,
//! trailing `\r\n`, no close boundary while the session is alive) is
//! small enough that a dedicated formatter is both simpler and exact.

pub const BOUNDARY: &str = "frame";

/// One ordered header to emit on a part, kept as a plain pair rather
/// than an `HeaderMap` so the header-shaping policy in
/// [`crate::http::stream`] can filter by name prefix without pulling in
/// axum's header types here.
pub struct PartHeader {
    pub name: &'static str,
    pub value: String,
}

/// Render one multipart part as raw bytes: boundary line, headers,
/// blank line, body, trailing CRLF.
pub fn format_part(headers: &[PartHeader], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 256);
    out.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    for header in headers {
        out.extend_from_slice(format!("{}: {}\r\n", header.name, header.value).as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out.extend_from_slice(b"\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_boundary_headers_and_body() {
        let headers = vec![
            PartHeader {
                name: "Content-Type",
                value: "image/jpeg".into(),
            },
            PartHeader {
                name: "X-UStreamer-Width",
                value: "640".into(),
            },
        ];
        let part = format_part(&headers, b"JPEGDATA");
        let text = String::from_utf8_lossy(&part);
        assert!(text.starts_with("--frame\r\n"));
        assert!(text.contains("Content-Type: image/jpeg\r\n"));
        assert!(text.contains("X-UStreamer-Width: 640\r\n"));
        assert!(text.ends_with("JPEGDATA\r\n"));
        assert!(text.contains("\r\n\r\nJPEGDATA"));
    }

    #[test]
    fn empty_headers_still_has_blank_line_before_body() {
        let part = format_part(&[], b"X");
        assert_eq!(part, b"--frame\r\n\r\nX\r\n");
    }
}
