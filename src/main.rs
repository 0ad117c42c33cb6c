use clap::Parser;
use mjpeg_streamer::config::{Args, Device, ServerConfig};
use mjpeg_streamer::error::{SourceError, StreamerError};
use mjpeg_streamer::source::mock::MockFrameSource;
use mjpeg_streamer::source::FrameSource;
use mjpeg_streamer::supervisor::Supervisor;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args);

    let config = match ServerConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("invalid arguments: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    info!("starting mjpeg-streamer v{}", env!("CARGO_PKG_VERSION"));

    let (source, device_name): (Box<dyn FrameSource>, String) = match open_source(&config) {
        Ok(pair) => pair,
        Err(e) => {
            error!("failed to open capture device: {}", e);
            std::process::exit(StreamerError::Source(e).exit_code());
        }
    };

    let supervisor = Supervisor::new(config);

    if let Err(e) = supervisor.start(source, device_name).await {
        error!("failed to start server: {}", e);
        std::process::exit(e.exit_code());
    }

    wait_for_shutdown_signal().await;

    info!("shutdown signal received, stopping gracefully");
    supervisor.stop().await;

    info!("mjpeg-streamer exited cleanly");
    std::process::exit(0);
}

/// Opens the requested capture device. Falls back to a synthetic mock
/// source on non-Linux platforms, since the V4L2 backend only compiles
/// there; the mock is never used on Linux.
#[cfg(target_os = "linux")]
fn open_source(config: &ServerConfig) -> Result<(Box<dyn FrameSource>, String), SourceError> {
    use mjpeg_streamer::source::v4l2::V4l2FrameSource;

    let requested = config.output_size.unwrap_or((640, 480));
    let device_path = match &config.device {
        Device::Index(index) => format!("/dev/video{}", index),
        Device::Name(name) => {
            let matched = V4l2FrameSource::enumerate()
                .into_iter()
                .find(|d| d.name == *name)
                .ok_or_else(|| SourceError::DeviceUnavailable {
                    device: name.clone(),
                    details: "no device matched the requested name".into(),
                })?;
            format!("/dev/video{}", matched.index)
        }
    };

    let source = V4l2FrameSource::open(&device_path, requested)?;
    Ok((Box::new(source), device_path))
}

#[cfg(not(target_os = "linux"))]
fn open_source(config: &ServerConfig) -> Result<(Box<dyn FrameSource>, String), SourceError> {
    warn!("V4L2 capture is only available on Linux; using a synthetic mock source");
    let (width, height) = config.output_size.unwrap_or((640, 480));
    let source = MockFrameSource::new(width, height, config.target_fps);
    Ok((Box::new(source), "mock".to_string()))
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
            _ = sigterm.recv() => info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received Ctrl+C");
    }
}

fn init_logging(args: &Args) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mjpeg_streamer={}", log_level)));

    let fmt_layer = match args.log_format.as_str() {
        "json" => fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        "pretty" => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        "compact" => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        other => {
            eprintln!("warning: unknown --log-format '{}', using compact", other);
            fmt::layer().compact().boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();
}
