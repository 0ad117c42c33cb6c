use crate::error::StreamerError;
use clap::Parser;

/// Which capture device to open: by numeric index or by friendly name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Device {
    Index(u32),
    Name(String),
}

/// CLI surface for the supervisor entry point, per the `mjpeg-streamer`
/// binary contract.
#[derive(Parser, Debug)]
#[command(name = "mjpeg-streamer")]
#[command(about = "MJPEG streaming server for a local camera")]
#[command(version)]
pub struct Args {
    /// Camera device index (e.g. 0 for /dev/video0)
    #[arg(long, conflicts_with = "device_name")]
    pub device: Option<u32>,

    /// Camera device friendly name (platform-dependent lookup)
    #[arg(long)]
    pub device_name: Option<String>,

    /// Capture resolution as WxH
    #[arg(long, default_value = "640x480")]
    pub resolution: String,

    /// JPEG quality, 1-100
    #[arg(long, default_value_t = 100)]
    pub quality: u8,

    /// Target capture frames per second
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Bind host
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Bind port
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Stream name served at GET /{name}
    #[arg(long, default_value = "stream")]
    pub stream_name: String,

    /// Enable debug level logging
    #[arg(long)]
    pub debug: bool,

    /// Enable verbose (info level) logging
    #[arg(long)]
    pub verbose: bool,

    /// Quiet mode: errors only
    #[arg(long)]
    pub quiet: bool,

    /// Log output format: pretty, compact, or json
    #[arg(long, default_value = "compact")]
    pub log_format: String,

    /// Disable access logging for stream requests
    #[arg(long)]
    pub no_log_requests: bool,
}

/// Immutable, validated server configuration derived from CLI args.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub stream_name: String,
    pub output_size: Option<(u32, u32)>,
    pub quality: u8,
    pub target_fps: u32,
    pub host: String,
    pub port: u16,
    pub device: Device,
    pub log_requests: bool,
}

impl ServerConfig {
    /// Build and validate a [`ServerConfig`] from parsed CLI args.
    ///
    /// Returns `StreamerError::InvalidArgument` for anything the CLI
    /// contract says should abort before start with exit code 1.
    pub fn from_args(args: &Args) -> Result<Self, StreamerError> {
        let device = match (&args.device, &args.device_name) {
            (Some(index), None) => Device::Index(*index),
            (None, Some(name)) => Device::Name(name.clone()),
            (None, None) => Device::Index(0),
            (Some(_), Some(_)) => {
                return Err(StreamerError::InvalidArgument(
                    "--device and --device-name are mutually exclusive".into(),
                ))
            }
        };

        let output_size = Some(parse_resolution(&args.resolution)?);

        if args.quality == 0 {
            return Err(StreamerError::InvalidArgument(
                "--quality must be in 1..=100".into(),
            ));
        }
        let quality = args.quality.min(100);

        if args.fps == 0 {
            return Err(StreamerError::InvalidArgument(
                "--fps must be greater than 0".into(),
            ));
        }

        let stream_name = normalize_stream_name(&args.stream_name);

        Ok(Self {
            stream_name,
            output_size,
            quality,
            target_fps: args.fps,
            host: args.host.clone(),
            port: args.port,
            device,
            log_requests: !args.no_log_requests,
        })
    }
}

/// Lowercase a stream name and replace spaces with underscores, per
/// matching the wire format `ServerConfig` expects.
pub fn normalize_stream_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

fn parse_resolution(spec: &str) -> Result<(u32, u32), StreamerError> {
    let (w, h) = spec.split_once('x').ok_or_else(|| {
        StreamerError::InvalidArgument(format!("invalid --resolution '{}', expected WxH", spec))
    })?;

    let width: u32 = w
        .parse()
        .map_err(|_| StreamerError::InvalidArgument(format!("invalid width in '{}'", spec)))?;
    let height: u32 = h
        .parse()
        .map_err(|_| StreamerError::InvalidArgument(format!("invalid height in '{}'", spec)))?;

    if width == 0 || height == 0 {
        return Err(StreamerError::InvalidArgument(
            "resolution width/height must be non-zero".into(),
        ));
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            device: None,
            device_name: None,
            resolution: "640x480".into(),
            quality: 100,
            fps: 30,
            host: "localhost".into(),
            port: 8000,
            stream_name: "stream".into(),
            debug: false,
            verbose: false,
            quiet: false,
            log_format: "compact".into(),
            no_log_requests: false,
        }
    }

    #[test]
    fn parses_valid_resolution() {
        assert_eq!(parse_resolution("1280x720").unwrap(), (1280, 720));
    }

    #[test]
    fn rejects_malformed_resolution() {
        assert!(parse_resolution("1280").is_err());
        assert!(parse_resolution("axb").is_err());
        assert!(parse_resolution("0x480").is_err());
    }

    #[test]
    fn stream_name_is_lowercased_and_underscored() {
        assert_eq!(normalize_stream_name("My Stream"), "my_stream");
    }

    #[test]
    fn quality_is_clamped_to_100() {
        let mut args = base_args();
        args.quality = 100;
        let config = ServerConfig::from_args(&args).unwrap();
        assert_eq!(config.quality, 100);
    }

    #[test]
    fn zero_quality_is_rejected() {
        let mut args = base_args();
        args.quality = 0;
        assert!(ServerConfig::from_args(&args).is_err());
    }

    #[test]
    fn zero_fps_is_rejected() {
        let mut args = base_args();
        args.fps = 0;
        assert!(ServerConfig::from_args(&args).is_err());
    }

    #[test]
    fn device_and_device_name_are_mutually_exclusive() {
        let mut args = base_args();
        args.device = Some(1);
        args.device_name = Some("Integrated Camera".into());
        assert!(ServerConfig::from_args(&args).is_err());
    }

    #[test]
    fn default_device_is_index_zero() {
        let args = base_args();
        let config = ServerConfig::from_args(&args).unwrap();
        assert_eq!(config.device, Device::Index(0));
    }
}
