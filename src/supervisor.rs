use crate::broker::FrameBroker;
use crate::config::ServerConfig;
use crate::encoder::Encoder;
use crate::error::{SourceError, StreamerError};
use crate::http::{build_router, AppState, SourceInfo};
use crate::registry::ClientRegistry;
use crate::source::FrameSource;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Number of consecutive `TransientReadFailure`s the capture loop
/// tolerates before escalating to a fatal stop.
const MAX_CONSECUTIVE_READ_FAILURES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

struct RunningHandles {
    capture_task: JoinHandle<()>,
    server_task: JoinHandle<()>,
    cancellation: CancellationToken,
    addr: SocketAddr,
}

/// Owns the full lifecycle of one streaming instance: the capture
/// loop, the FrameBroker, and the HTTP listener. State machine:
/// `Stopped -> Starting -> Running -> Stopping -> Stopped`.
pub struct Supervisor {
    config: Arc<ServerConfig>,
    broker: Arc<FrameBroker>,
    registry: Arc<ClientRegistry>,
    state: Mutex<RunState>,
    running: Mutex<Option<RunningHandles>>,
}

impl Supervisor {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            broker: Arc::new(FrameBroker::new()),
            registry: Arc::new(ClientRegistry::new()),
            state: Mutex::new(RunState::Stopped),
            running: Mutex::new(None),
        }
    }

    /// Start the capture loop and HTTP listener. `source` must already
    /// be open, with its negotiated resolution readable via
    /// [`FrameSource::resolution`]. Idempotent: calling `start` while
    /// already running logs a warning and returns the existing bind
    /// address. On failure (currently only a bind error) the supervisor
    /// is left exactly as it was before the call — no capture task is
    /// left running and a later `start()` is free to retry.
    pub async fn start(
        &self,
        mut source: Box<dyn FrameSource>,
        device_name: String,
    ) -> Result<SocketAddr, StreamerError> {
        let mut state = self.state.lock().await;
        if *state != RunState::Stopped {
            warn!("start() called while supervisor is not stopped; ignoring");
            let running = self.running.lock().await;
            return running
                .as_ref()
                .map(|h| h.addr)
                .ok_or_else(|| StreamerError::InvalidArgument("supervisor in inconsistent state".into()));
        }
        *state = RunState::Starting;
        drop(state);

        let (width, height) = source.resolution();
        let source_info = Arc::new(SourceInfo {
            device_name,
            width,
            height,
            desired_fps: self.config.target_fps,
        });

        let encoder = Arc::new(Encoder::new(self.config.quality, Some((width, height))));
        let placeholder = Arc::new(Encoder::placeholder());

        let app_state = AppState {
            broker: Arc::clone(&self.broker),
            registry: Arc::clone(&self.registry),
            config: Arc::clone(&self.config),
            source_info,
            placeholder,
        };
        let router = build_router(app_state);

        // Bind before spawning anything that would otherwise need to be
        // torn down on failure: a bind error must leave the supervisor
        // exactly as it was before this call, not holding an orphaned
        // capture task and an open camera device.
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                *self.state.lock().await = RunState::Stopped;
                return Err(StreamerError::Stream(crate::error::StreamError::BindFailed {
                    address: bind_addr,
                    source: e,
                }));
            }
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                *self.state.lock().await = RunState::Stopped;
                return Err(StreamerError::Io(e));
            }
        };

        info!("mjpeg-streamer listening on {}", addr);

        let cancellation = CancellationToken::new();
        let capture_task = self.spawn_capture_loop(source, encoder, cancellation.clone());

        let shutdown_signal = cancellation.clone();
        let server_task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown_signal.cancelled().await })
                .await;
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
            }
        });

        *self.running.lock().await = Some(RunningHandles {
            capture_task,
            server_task,
            cancellation,
            addr,
        });
        *self.state.lock().await = RunState::Running;

        Ok(addr)
    }

    fn spawn_capture_loop(
        &self,
        mut source: Box<dyn FrameSource>,
        encoder: Arc<Encoder>,
        cancellation: CancellationToken,
    ) -> JoinHandle<()> {
        let broker = Arc::clone(&self.broker);

        tokio::spawn(async move {
            let mut consecutive_failures = 0u32;

            loop {
                if cancellation.is_cancelled() {
                    break;
                }

                let frame = tokio::select! {
                    _ = cancellation.cancelled() => break,
                    result = source.read_frame() => result,
                };

                match frame {
                    Ok(frame) => {
                        consecutive_failures = 0;
                        match encoder.encode(&frame) {
                            Ok(encoded) => broker.publish(encoded).await,
                            Err(e) => warn!("frame encode failed, dropping frame: {}", e),
                        }
                    }
                    Err(SourceError::TransientReadFailure { details }) => {
                        consecutive_failures += 1;
                        debug!("transient read failure ({}): {}", consecutive_failures, details);
                        if consecutive_failures >= MAX_CONSECUTIVE_READ_FAILURES {
                            error!(
                                "{} consecutive read failures, escalating to fatal",
                                consecutive_failures
                            );
                            break;
                        }
                    }
                    Err(SourceError::DeviceUnavailable { device, details }) => {
                        error!("camera device {} became unavailable: {}", device, details);
                        break;
                    }
                }
            }

            broker.close();
            debug!("capture loop exited");
        })
    }

    /// Signal graceful shutdown: cancels the broker and all in-flight
    /// sessions, stops the HTTP listener, and waits for the capture
    /// loop to exit. A no-op with a warning if not running.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if *state != RunState::Running {
            warn!("stop() called while supervisor is not running; ignoring");
            return;
        }
        *state = RunState::Stopping;
        drop(state);

        let handles = self.running.lock().await.take();
        if let Some(handles) = handles {
            handles.cancellation.cancel();
            self.broker.close();

            if let Err(e) = handles.capture_task.await {
                error!("capture task panicked: {}", e);
            }
            if let Err(e) = handles.server_task.await {
                error!("server task panicked: {}", e);
            }
        }

        *self.state.lock().await = RunState::Stopped;
        info!("supervisor stopped");
    }

    pub fn broker(&self) -> Arc<FrameBroker> {
        Arc::clone(&self.broker)
    }

    pub fn registry(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.registry)
    }
}
