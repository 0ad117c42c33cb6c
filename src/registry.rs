use crate::frame::now_ms;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Bookkeeping for one in-flight streaming connection, keyed by its
/// `client_id` cookie value.
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub client_id: String,
    pub key: String,
    pub advance_headers: bool,
    pub connected_at_ms: u64,
    pub last_write_at_ms: u64,
    pub frames_sent: u64,
    /// Last `per_second_fps` the broker reported at this session's most
    /// recent successful part write.
    pub fps: u32,
}

impl ClientSession {
    pub fn new(client_id: String, key: String, advance_headers: bool) -> Self {
        let now = now_ms();
        Self {
            client_id,
            key,
            advance_headers,
            connected_at_ms: now,
            last_write_at_ms: now,
            frames_sent: 0,
            fps: 0,
        }
    }
}

/// Tracks every currently-connected client session. `size()` is the
/// number of in-flight `/{name}` sessions at any instant, matching
/// at-a-glance model of who is currently streaming.
///
/// Uses a plain blocking mutex rather than `tokio::sync::Mutex`: session
/// bookkeeping is a handful of HashMap operations, never held across an
/// `.await`, and a synchronous lock lets callers deregister from a
/// `Drop` impl (see [`crate::http::stream::SessionGuard`]) when a
/// client disconnects mid-stream.
pub struct ClientRegistry {
    sessions: Mutex<HashMap<String, ClientSession>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Register a session. Idempotent: registering the same `client_id`
    /// twice replaces the prior entry rather than creating a duplicate.
    pub fn register(&self, session: ClientSession) {
        let mut sessions = self.sessions.lock().unwrap();
        debug!(client_id = %session.client_id, "client session registered");
        sessions.insert(session.client_id.clone(), session);
    }

    /// Remove a session. A no-op if it is already gone.
    pub fn deregister(&self, client_id: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.remove(client_id).is_some() {
            debug!(client_id, "client session deregistered");
        }
    }

    /// Record that a frame was written to the given session, bumping
    /// its write timestamp and frame counter.
    pub fn record_write(&self, client_id: &str, fps: u32) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(client_id) {
            session.last_write_at_ms = now_ms();
            session.frames_sent += 1;
            session.fps = fps;
        }
    }

    /// Number of currently-registered sessions.
    pub fn size(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn snapshot(&self) -> Vec<ClientSession> {
        self.sessions.lock().unwrap().values().cloned().collect()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
